//! Map validated CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, smtp, ARG_DSN, ARG_GRPC_PORT, ARG_PORT};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let grpc_port = matches.get_one::<u16>(ARG_GRPC_PORT).copied().unwrap_or(9090);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let smtp = smtp::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        grpc_port,
        dsn,
        jwt_secret: auth_opts.jwt_secret,
        token_stamp: auth_opts.token_stamp,
        password_pepper: auth_opts.password_pepper,
        access_ttl_seconds: auth_opts.access_ttl_seconds,
        refresh_ttl_seconds: auth_opts.refresh_ttl_seconds,
        smtp,
    }))
}
