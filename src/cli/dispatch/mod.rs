//! Map parsed CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, mail, ARG_DSN, ARG_PORT};
use anyhow::Result;

/// # Errors
/// Returns an error if arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches.get_one::<String>(ARG_DSN).cloned();

    let auth_opts = auth::Options::parse(matches)?;
    let mail_opts = mail::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url: auth_opts.frontend_base_url,
        token_ttl_seconds: auth_opts.token_ttl_seconds,
        token_cleanup_interval_seconds: auth_opts.token_cleanup_interval_seconds,
        smtp: mail_opts.smtp,
    }))
}
