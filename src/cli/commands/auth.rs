use crate::auth::MAX_TOKEN_TTL_SECONDS;
use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_TOKEN_CLEANUP_INTERVAL_SECONDS: &str = "token-cleanup-interval-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL used for activation and password reset links")
                .env("ACCOUNTS_FRONTEND_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Seconds a bearer token stays valid after its last use")
                .env("ACCOUNTS_TOKEN_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_TOKEN_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_TOKEN_CLEANUP_INTERVAL_SECONDS)
                .long(ARG_TOKEN_CLEANUP_INTERVAL_SECONDS)
                .help("Seconds between expired token sweeps")
                .env("ACCOUNTS_TOKEN_CLEANUP_INTERVAL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub token_ttl_seconds: u64,
    pub token_cleanup_interval_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is somehow absent.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_FRONTEND_BASE_URL}"))?;
        let token_ttl_seconds = matches
            .get_one::<u64>(ARG_TOKEN_TTL_SECONDS)
            .copied()
            .unwrap_or(604_800);
        let token_cleanup_interval_seconds = matches
            .get_one::<u64>(ARG_TOKEN_CLEANUP_INTERVAL_SECONDS)
            .copied()
            .unwrap_or(3600);

        Ok(Self {
            frontend_base_url,
            token_ttl_seconds,
            token_cleanup_interval_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        with_args(Command::new("accounts"))
    }

    #[test]
    fn defaults() -> Result<()> {
        temp_env::with_vars(
            [
                ("ACCOUNTS_FRONTEND_BASE_URL", None::<&str>),
                ("ACCOUNTS_TOKEN_TTL_SECONDS", None),
                ("ACCOUNTS_TOKEN_CLEANUP_INTERVAL_SECONDS", None),
            ],
            || {
                let matches = command().get_matches_from(vec!["accounts"]);
                let options = Options::parse(&matches)?;
                assert_eq!(options.frontend_base_url, "http://localhost:8080");
                assert_eq!(options.token_ttl_seconds, 604_800);
                assert_eq!(options.token_cleanup_interval_seconds, 3600);
                Ok(())
            },
        )
    }

    #[test]
    fn from_env() -> Result<()> {
        temp_env::with_vars(
            [
                ("ACCOUNTS_FRONTEND_BASE_URL", Some("https://accounts.dev")),
                ("ACCOUNTS_TOKEN_TTL_SECONDS", Some("60")),
                ("ACCOUNTS_TOKEN_CLEANUP_INTERVAL_SECONDS", Some("5")),
            ],
            || {
                let matches = command().get_matches_from(vec!["accounts"]);
                let options = Options::parse(&matches)?;
                assert_eq!(options.frontend_base_url, "https://accounts.dev");
                assert_eq!(options.token_ttl_seconds, 60);
                assert_eq!(options.token_cleanup_interval_seconds, 5);
                Ok(())
            },
        )
    }

    #[test]
    fn zero_ttl_is_rejected() {
        temp_env::with_vars([("ACCOUNTS_TOKEN_TTL_SECONDS", None::<&str>)], || {
            let result =
                command().try_get_matches_from(vec!["accounts", "--token-ttl-seconds", "0"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn ttl_is_bounded_at_ten_years() -> Result<()> {
        temp_env::with_vars([("ACCOUNTS_TOKEN_TTL_SECONDS", None::<&str>)], || {
            let matches = command().try_get_matches_from(vec![
                "accounts",
                "--token-ttl-seconds",
                "315360000",
            ])?;
            assert_eq!(Options::parse(&matches)?.token_ttl_seconds, 315_360_000);

            for too_long in ["315360001", "10000000000000", "18446744073709551615"] {
                let result = command().try_get_matches_from(vec![
                    "accounts",
                    "--token-ttl-seconds",
                    too_long,
                ]);
                assert!(result.is_err(), "{too_long}");
            }
            Ok(())
        })
    }
}
