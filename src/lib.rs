//! # edu-auth (Authentication & Authorization Core)
//!
//! `edu-auth` is the identity authority shared by the education platform's
//! services. It verifies credentials, gates registration, login and password
//! reset behind an emailed six-digit code, and issues access/refresh token
//! pairs.
//!
//! ## Tokens
//!
//! - **Access tokens** are HS256 JWTs carrying the user id, role, a fixed
//!   expiry, a digest of the server stamp and the user's `password_changed_at`
//!   epoch. They are never stored. A token is rejected as soon as the live
//!   epoch is newer than the embedded one, so a password reset revokes every
//!   outstanding access token without a denylist.
//! - **Refresh tokens** are opaque random strings. Only their SHA-256 digest is
//!   stored; every refresh rotates the row in place with a single conditional
//!   update keyed by the presented digest.
//!
//! ## Cross-service authorization
//!
//! Downstream services never see the signing secret. They put a
//! [`guard::RoleGuard`] in front of their routes, which asks the `CheckAccess`
//! RPC ([`rpc`]) whether the bearer token is valid and holds one of the
//! required roles, and injects the caller's id into the request.

pub mod api;
pub mod auth;
pub mod cli;
pub mod email;
pub mod guard;
pub mod rpc;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
