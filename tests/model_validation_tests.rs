use blog_api::{
    envelope::{ApiResponse, Enveloped, ResponseStatus},
    models::{Comment, Post, PostImage, RegisterRequest, UpdatePostRequest, User},
};
use axum::{http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        password: "pw".to_string(),
    }
}

// --- Serialization ---

#[test]
fn test_user_json_has_no_password_field() {
    let user = User {
        id: Uuid::new_v4(),
        email: "a@x.com".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        created_at: Utc::now(),
    };

    let value = serde_json::to_value(&user).unwrap();
    let object = value.as_object().unwrap();

    assert!(!object.contains_key("password"));
    assert!(!object.contains_key("password_hash"));
    assert_eq!(value["email"], "a@x.com");
}

#[test]
fn test_comment_owner_keys_are_renamed() {
    let user_id = Uuid::new_v4();
    let comment = Comment {
        id: 3,
        content: "Nice".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        post_id: 7,
        user_id,
    };

    let value = serde_json::to_value(&comment).unwrap();

    assert_eq!(value["post"], 7);
    assert_eq!(value["user"], json!(user_id));
    assert!(value.get("post_id").is_none());
    assert!(value.get("user_id").is_none());
}

#[test]
fn test_post_serializes_author_and_images() {
    let author = Uuid::new_v4();
    let post = Post {
        id: 1,
        title: "Hello".to_string(),
        content: "World".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        author,
        images: vec![PostImage {
            id: 9,
            post_id: 1,
            image_url: "http://img/1.png".to_string(),
            uploaded_at: Utc::now(),
        }],
    };

    let value = serde_json::to_value(&post).unwrap();

    assert_eq!(value["author"], json!(author));
    assert_eq!(value["images"][0]["post"], 1);
    assert_eq!(value["images"][0]["image_url"], "http://img/1.png");
}

#[test]
fn test_update_post_request_omits_absent_fields() {
    let changes = UpdatePostRequest {
        title: Some("New".to_string()),
        content: None,
    };

    let value = serde_json::to_value(&changes).unwrap();
    assert_eq!(value, json!({ "title": "New" }));

    let parsed: UpdatePostRequest = serde_json::from_str("{}").unwrap();
    assert!(parsed.title.is_none());
    assert!(parsed.content.is_none());
}

// --- Validation ---

#[test]
fn test_register_request_validation() {
    assert!(register_request("a@x.com").validate().is_ok());
    assert!(register_request("not-an-email").validate().is_err());

    let mut blank_name = register_request("a@x.com");
    blank_name.first_name = String::new();
    assert!(blank_name.validate().is_err());

    let mut long_name = register_request("a@x.com");
    long_name.last_name = "x".repeat(151);
    assert!(long_name.validate().is_err());
}

#[test]
fn test_update_post_request_validation() {
    let too_long = UpdatePostRequest {
        title: Some("t".repeat(256)),
        content: None,
    };
    assert!(too_long.validate().is_err());

    let empty_content = UpdatePostRequest {
        title: None,
        content: Some(String::new()),
    };
    assert!(empty_content.validate().is_err());

    assert!(UpdatePostRequest::default().validate().is_ok());
}

// --- Envelope ---

#[test]
fn test_response_status_codes_serialize_as_strings() {
    let cases = [
        (ResponseStatus::Success, "01"),
        (ResponseStatus::Failure, "02"),
        (ResponseStatus::Unauthorized, "03"),
        (ResponseStatus::NotFound, "04"),
        (ResponseStatus::Forbidden, "05"),
        (ResponseStatus::InternalError, "06"),
        (ResponseStatus::BadRequest, "07"),
    ];

    for (status, code) in cases {
        assert_eq!(serde_json::to_value(status).unwrap(), json!(code));
    }
}

#[test]
fn test_response_status_from_http() {
    assert_eq!(
        ResponseStatus::from_http(StatusCode::CREATED),
        ResponseStatus::Success
    );
    assert_eq!(
        ResponseStatus::from_http(StatusCode::UNPROCESSABLE_ENTITY),
        ResponseStatus::Failure
    );
    assert_eq!(
        ResponseStatus::from_http(StatusCode::BAD_GATEWAY),
        ResponseStatus::InternalError
    );
}

#[test]
fn test_failure_envelope_has_null_data() {
    let body: ApiResponse<()> = ApiResponse::failure(ResponseStatus::NotFound, "Post not found");

    let value = serde_json::to_value(&body).unwrap();

    assert_eq!(
        value,
        json!({ "status_code": "04", "message": "Post not found", "data": null })
    );
}

#[test]
fn test_enveloped_keeps_http_status() {
    let response = Enveloped::created(json!({ "id": 1 }), "Created").into_response();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = Enveloped::error(StatusCode::FORBIDDEN, "nope").into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
