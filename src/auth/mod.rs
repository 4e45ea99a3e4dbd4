//! Domain core: credentials, one-time codes, tokens and the flows composing them.

pub mod code;
pub mod config;
pub mod error;
pub mod models;
pub mod password;
pub mod service;
pub mod sweeper;
pub mod token;
pub mod verification;

pub use config::{AuthConfig, HashCost};
pub use error::{AuthError, AuthResult, ErrorKind};
pub use models::{Role, TokenClaims, TokenPair, User, VerificationKind};
pub use service::{AuthService, LoginOutcome, SweepReport};
pub use sweeper::{spawn_sweeper, SWEEP_INTERVAL};
