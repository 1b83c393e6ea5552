//! Business rules. Handlers translate HTTP into calls on these services, passing the
//! authenticated caller explicitly; services never look at request state.

pub mod auth;
pub mod content;

pub use auth::AuthService;
pub use content::ContentService;
