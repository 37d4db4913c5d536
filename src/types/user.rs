//! User records owned by the authentication layer
//!
//! The engine only needs the id and username; the credential hash is carried
//! so an in-process directory can stand in for the real auth subsystem.

/// User identifier
pub type UserId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Unique login name, also used to address transfer recipients
    pub username: String,
    pub credential_hash: String,
}
