//! Postgres-backed repository tests. They need a live database:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

use blog_api::{
    models::{NewUser, UpdatePostRequest},
    repository::{OwnerCheck, PostgresRepository, Repository, RepositoryError},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Every test uses fresh, random emails so runs never collide.
async fn create_test_user(repo: &PostgresRepository) -> Uuid {
    repo.create_user(NewUser {
        email: format!("{}@test.com", Uuid::new_v4()),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
    })
    .await
    .expect("Failed to create test user")
    .id
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_email_is_reported() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = format!("{}@test.com", Uuid::new_v4());
    let new_user = NewUser {
        email: email.clone(),
        first_name: "A".to_string(),
        last_name: "B".to_string(),
        password_hash: "hash".to_string(),
    };

    repo.create_user(new_user.clone()).await.unwrap();
    let second = repo.create_user(new_user).await;

    assert!(matches!(second, Err(RepositoryError::Duplicate(_))));
    let found = repo.find_user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(found.email, email);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_post_with_images_and_fetch() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&repo).await;

    let post = repo
        .create_post(
            author,
            "Integration".to_string(),
            "Body".to_string(),
            vec!["http://img/1.png".to_string(), "http://img/2.png".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(post.author, author);
    assert_eq!(post.images.len(), 2);

    let fetched = repo.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Integration");
    let urls: Vec<&str> = fetched.images.iter().map(|i| i.image_url.as_str()).collect();
    assert_eq!(urls, vec!["http://img/1.png", "http://img/2.png"]);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_owner_checks() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&repo).await;
    let other = create_test_user(&repo).await;
    let post = repo
        .create_post(author, "Owned".to_string(), "Body".to_string(), vec![])
        .await
        .unwrap();

    let changes = UpdatePostRequest {
        title: Some("Stolen".to_string()),
        content: None,
    };
    let rejected = repo.update_post(post.id, other, changes.clone()).await.unwrap();
    assert!(matches!(rejected, OwnerCheck::NotOwner));

    let missing = repo.update_post(i64::MAX, author, changes.clone()).await.unwrap();
    assert!(matches!(missing, OwnerCheck::Missing));

    let OwnerCheck::Applied(updated) = repo.update_post(post.id, author, changes).await.unwrap()
    else {
        panic!("author update should apply");
    };
    assert_eq!(updated.title, "Stolen");
    assert_eq!(updated.content, "Body");

    assert!(matches!(
        repo.delete_post(post.id, other).await.unwrap(),
        OwnerCheck::NotOwner
    ));
    assert!(matches!(
        repo.delete_post(post.id, author).await.unwrap(),
        OwnerCheck::Applied(())
    ));
    assert!(repo.get_post(post.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_comments_batch_and_cascade() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&repo).await;
    let first = repo
        .create_post(author, "One".to_string(), "Body".to_string(), vec![])
        .await
        .unwrap();
    let second = repo
        .create_post(author, "Two".to_string(), "Body".to_string(), vec![])
        .await
        .unwrap();

    assert!(repo.add_comment(i64::MAX, author, "void".to_string()).await.unwrap().is_none());

    let c1 = repo
        .add_comment(first.id, author, "a".to_string())
        .await
        .unwrap()
        .unwrap();
    repo.add_comment(second.id, author, "b".to_string())
        .await
        .unwrap()
        .unwrap();

    let comments = repo.comments_for_posts(&[first.id, second.id]).await.unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].id, c1.id);

    repo.delete_post(first.id, author).await.unwrap();
    let remaining = repo.comments_for_posts(&[first.id, second.id]).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].post_id, second.id);
}
