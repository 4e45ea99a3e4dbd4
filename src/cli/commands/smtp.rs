use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::email::SmtpConfig;

pub const ARG_SMTP_HOST: &str = "smtp-host";
pub const ARG_SMTP_PORT: &str = "smtp-port";
pub const ARG_SMTP_USERNAME: &str = "smtp-username";
pub const ARG_SMTP_PASSWORD: &str = "smtp-password";
pub const ARG_SMTP_FROM: &str = "smtp-from";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SMTP_HOST)
                .long(ARG_SMTP_HOST)
                .help("SMTP relay; when unset, codes are only logged as sent")
                .env("EDU_AUTH_SMTP_HOST"),
        )
        .arg(
            Arg::new(ARG_SMTP_PORT)
                .long(ARG_SMTP_PORT)
                .help("SMTP relay port")
                .env("EDU_AUTH_SMTP_PORT")
                .default_value("587")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SMTP_USERNAME)
                .long(ARG_SMTP_USERNAME)
                .help("SMTP username")
                .env("EDU_AUTH_SMTP_USERNAME")
                .requires(ARG_SMTP_HOST),
        )
        .arg(
            Arg::new(ARG_SMTP_PASSWORD)
                .long(ARG_SMTP_PASSWORD)
                .help("SMTP password")
                .env("EDU_AUTH_SMTP_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_SMTP_HOST),
        )
        .arg(
            Arg::new(ARG_SMTP_FROM)
                .long(ARG_SMTP_FROM)
                .help("Sender address, e.g. \"Edu Platform <no-reply@edu-platform.dev>\"")
                .env("EDU_AUTH_SMTP_FROM")
                .requires(ARG_SMTP_HOST),
        )
}

/// SMTP settings, or `None` when no relay host is configured.
///
/// # Errors
/// Returns an error if a host is set without credentials or sender.
pub fn parse(matches: &ArgMatches) -> Result<Option<SmtpConfig>> {
    let Some(host) = matches.get_one::<String>(ARG_SMTP_HOST).cloned() else {
        return Ok(None);
    };

    let required = |id: &str| {
        matches
            .get_one::<String>(id)
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --{id} (required with --{ARG_SMTP_HOST})"))
    };

    let username = required(ARG_SMTP_USERNAME)?;
    let password = SecretString::from(required(ARG_SMTP_PASSWORD)?);
    let from = required(ARG_SMTP_FROM)?;
    let port = matches.get_one::<u16>(ARG_SMTP_PORT).copied().unwrap_or(587);

    Ok(Some(
        SmtpConfig::new(host, username, password, from).with_port(port),
    ))
}
