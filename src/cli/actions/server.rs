use crate::{
    api,
    auth::{spawn_sweeper, AuthConfig, AuthService, SWEEP_INTERVAL},
    cli::telemetry,
    email::{EmailNotifier, LogEmailSender, SmtpConfig, SmtpEmailSender},
    rpc,
    store::PgStore,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::watch};
use tracing::{error, info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub grpc_port: u16,
    pub dsn: SecretString,
    pub jwt_secret: SecretString,
    pub token_stamp: SecretString,
    pub password_pepper: SecretString,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub smtp: Option<SmtpConfig>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be
/// applied, a port cannot be bound, or either server fails.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(args.dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool.clone()));
    store
        .apply_schema()
        .await
        .context("Failed to apply database schema")?;

    let notifier: Arc<dyn EmailNotifier> = match &args.smtp {
        Some(smtp) => Arc::new(SmtpEmailSender::new(smtp)?),
        None => {
            warn!("no SMTP relay configured, verification codes are not delivered");
            Arc::new(LogEmailSender)
        }
    };

    let config = AuthConfig::new(args.jwt_secret, args.token_stamp, args.password_pepper)
        .with_access_ttl_seconds(args.access_ttl_seconds)
        .with_refresh_ttl_seconds(args.refresh_ttl_seconds);
    let auth = AuthService::with_store(store, notifier, &config)?;

    let http_listener = TcpListener::bind(format!("::0:{}", args.port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", args.port))?;
    let grpc_listener = TcpListener::bind(format!("::0:{}", args.grpc_port))
        .await
        .with_context(|| format!("Failed to bind gRPC port {}", args.grpc_port))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Gracefully shutdown"),
            Err(err) => error!("Failed to listen for shutdown signal: {err}"),
        }
        let _ = shutdown_tx.send(true);
    });

    let sweeper = spawn_sweeper(auth.clone(), SWEEP_INTERVAL, shutdown_rx.clone());

    let app = api::app(auth.clone(), Some(pool));
    let served = tokio::try_join!(
        api::serve(http_listener, app, wait_for_shutdown(shutdown_rx.clone())),
        rpc::serve(auth, grpc_listener, wait_for_shutdown(shutdown_rx)),
    );

    sweeper.abort();
    telemetry::shutdown_tracer();

    served.map(|_| ())
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    // A dropped sender also means shutdown.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

fn log_startup_args(args: &Args) {
    info!(
        port = args.port,
        grpc_port = args.grpc_port,
        access_ttl_seconds = args.access_ttl_seconds,
        refresh_ttl_seconds = args.refresh_ttl_seconds,
        smtp = args.smtp.as_ref().map_or("disabled", SmtpConfig::host),
        "starting edu-auth"
    );
}
