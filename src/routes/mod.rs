/// Router Module Index
///
/// Routing is split by access level, and each level is guarded once at the
/// router layer rather than inside handlers.

/// Routes open to anonymous clients: login, registration, logout and
/// the published resource listing.
pub mod public;

/// Routes behind `auth::require_login`. Requires a valid session.
pub mod authenticated;

/// Routes behind `auth::require_admin`. Requires a session with role `admin`.
pub mod admin;
