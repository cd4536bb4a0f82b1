use crate::mail::SmtpConfig;
use anyhow::{anyhow, Result};
use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SMTP_HOST: &str = "smtp-host";
pub const ARG_SMTP_PORT: &str = "smtp-port";
pub const ARG_SMTP_USERNAME: &str = "smtp-username";
pub const ARG_SMTP_PASSWORD: &str = "smtp-password";
pub const ARG_SMTP_STARTTLS: &str = "smtp-starttls";
pub const ARG_MAIL_FROM: &str = "mail-from";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SMTP_HOST)
                .long(ARG_SMTP_HOST)
                .help("SMTP relay host; mail is only logged when unset")
                .env("ACCOUNTS_SMTP_HOST"),
        )
        .arg(
            Arg::new(ARG_SMTP_PORT)
                .long(ARG_SMTP_PORT)
                .help("SMTP relay port")
                .env("ACCOUNTS_SMTP_PORT")
                .default_value("587")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SMTP_USERNAME)
                .long(ARG_SMTP_USERNAME)
                .help("SMTP username")
                .env("ACCOUNTS_SMTP_USERNAME")
                .requires(ARG_SMTP_PASSWORD),
        )
        .arg(
            Arg::new(ARG_SMTP_PASSWORD)
                .long(ARG_SMTP_PASSWORD)
                .help("SMTP password")
                .env("ACCOUNTS_SMTP_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_SMTP_USERNAME),
        )
        .arg(
            Arg::new(ARG_SMTP_STARTTLS)
                .long(ARG_SMTP_STARTTLS)
                .help("Use STARTTLS when talking to the relay")
                .env("ACCOUNTS_SMTP_STARTTLS")
                .default_value("true")
                .action(ArgAction::Set)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_MAIL_FROM)
                .long(ARG_MAIL_FROM)
                .help("Sender address for outgoing mail")
                .env("ACCOUNTS_MAIL_FROM")
                .default_value("Accounts <info@accounts.dev>"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub smtp: Option<SmtpConfig>,
}

impl Options {
    /// # Errors
    /// Returns an error if only one of username and password is present.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let Some(host) = matches.get_one::<String>(ARG_SMTP_HOST).cloned() else {
            return Ok(Self { smtp: None });
        };

        let mut config = SmtpConfig::new(host)
            .with_port(matches.get_one::<u16>(ARG_SMTP_PORT).copied().unwrap_or(587))
            .with_starttls(
                matches
                    .get_one::<bool>(ARG_SMTP_STARTTLS)
                    .copied()
                    .unwrap_or(true),
            );

        if let Some(from) = matches.get_one::<String>(ARG_MAIL_FROM) {
            config = config.with_from(from.clone());
        }

        match (
            matches.get_one::<String>(ARG_SMTP_USERNAME),
            matches.get_one::<String>(ARG_SMTP_PASSWORD),
        ) {
            (Some(username), Some(password)) => {
                config = config
                    .with_credentials(username.clone(), SecretString::from(password.clone()));
            }
            (None, None) => {}
            _ => return Err(anyhow!("SMTP username and password must be set together")),
        }

        Ok(Self { smtp: Some(config) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 6] = [
        "ACCOUNTS_SMTP_HOST",
        "ACCOUNTS_SMTP_PORT",
        "ACCOUNTS_SMTP_USERNAME",
        "ACCOUNTS_SMTP_PASSWORD",
        "ACCOUNTS_SMTP_STARTTLS",
        "ACCOUNTS_MAIL_FROM",
    ];

    fn command() -> Command {
        with_args(Command::new("accounts"))
    }

    #[test]
    fn no_host_means_no_smtp() -> Result<()> {
        temp_env::with_vars(VARS.map(|k| (k, None::<&str>)), || {
            let matches = command().get_matches_from(vec!["accounts"]);
            assert!(Options::parse(&matches)?.smtp.is_none());
            Ok(())
        })
    }

    #[test]
    fn smtp_from_env() -> Result<()> {
        temp_env::with_vars(
            [
                ("ACCOUNTS_SMTP_HOST", Some("smtp.accounts.dev")),
                ("ACCOUNTS_SMTP_PORT", Some("2525")),
                ("ACCOUNTS_SMTP_USERNAME", Some("mailer")),
                ("ACCOUNTS_SMTP_PASSWORD", Some("secret")),
                ("ACCOUNTS_SMTP_STARTTLS", Some("false")),
                ("ACCOUNTS_MAIL_FROM", Some("Team <team@accounts.dev>")),
            ],
            || {
                let matches = command().get_matches_from(vec!["accounts"]);
                let smtp = Options::parse(&matches)?
                    .smtp
                    .ok_or_else(|| anyhow!("smtp missing"))?;
                assert_eq!(smtp.host(), "smtp.accounts.dev");
                assert_eq!(smtp.port(), 2525);
                assert!(!smtp.starttls());
                assert_eq!(smtp.from(), "Team <team@accounts.dev>");
                Ok(())
            },
        )
    }

    #[test]
    fn username_requires_password() {
        temp_env::with_vars(VARS.map(|k| (k, None::<&str>)), || {
            let result = command().try_get_matches_from(vec![
                "accounts",
                "--smtp-host",
                "smtp.accounts.dev",
                "--smtp-username",
                "mailer",
            ]);
            assert!(result.is_err());
        });
    }
}
