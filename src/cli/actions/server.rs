use crate::{
    accounts::Accounts,
    api::{self, AppState},
    auth::{
        AuthConfig, Authenticator, CleanupScheduler, CredentialVerifier, PasswordReset,
        SystemClock, TokenManager,
    },
    mail::{LogMailer, Mailer, SmtpConfig, SmtpMailer},
    store::{MemoryStore, PgStore, Store},
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub frontend_base_url: String,
    pub token_ttl_seconds: u64,
    pub token_cleanup_interval_seconds: u64,
    pub smtp: Option<SmtpConfig>,
}

/// Wire the services together and serve until shutdown.
///
/// # Errors
/// Returns an error if the database is unreachable, the mailer cannot be
/// built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store: Arc<dyn Store> = if let Some(dsn) = &args.dsn {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;
        info!("using postgres store");
        Arc::new(PgStore::new(pool))
    } else {
        warn!("no DSN given, accounts are kept in memory and lost on exit");
        Arc::new(MemoryStore::new())
    };

    let mailer: Arc<dyn Mailer> = match &args.smtp {
        Some(config) => {
            info!(host = config.host(), port = config.port(), "using SMTP mailer");
            Arc::new(SmtpMailer::new(config)?)
        }
        None => {
            warn!("no SMTP host given, outgoing mail is only logged");
            Arc::new(LogMailer)
        }
    };

    let config = AuthConfig::new(args.frontend_base_url)
        .with_token_ttl_seconds(args.token_ttl_seconds)
        .with_cleanup_interval_seconds(args.token_cleanup_interval_seconds);

    let verifier = CredentialVerifier::recommended()?;
    let tokens = TokenManager::new(store.clone(), Arc::new(SystemClock), config.token_ttl());

    let state = Arc::new(AppState {
        auth: Authenticator::new(store.clone(), verifier.clone(), tokens.clone()),
        reset: PasswordReset::new(
            store.clone(),
            verifier.clone(),
            mailer.clone(),
            config.clone(),
        ),
        accounts: Accounts::new(store, verifier, mailer, config.clone()),
    });

    let cleanup = CleanupScheduler::start(tokens, config.cleanup_interval());

    api::new(args.port, state, config.frontend_base_url(), cleanup).await
}
