/// Router Module Index
///
/// Routing is split by access level so authentication is applied once per module as a layer,
/// never route by route.

/// Routes accessible without a bearer token: health, registration, login, token refresh.
pub mod public;

/// Routes protected by the `AuthUser` middleware. Every handler receives the caller explicitly.
pub mod authenticated;
