use anyhow::Result;
use std::{sync::Arc, time::Duration};
use storefront_billing::{
    axum_http::http_serve,
    config::{config_loader, config_model::DotEnvyConfig},
    infra::{
        db::{
            postgres::postgres_connection::{self, PgPoolSquad},
            repositories::notification_outbox::NotificationOutboxPostgres,
        },
        notifications::line::LineMessagingSink,
    },
    observability,
    usecases::notification_dispatch::{DispatchSettings, NotificationDispatcher},
};
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("storefront-billing exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_observability("storefront-billing")?;

    let dotenvy_env = Arc::new(config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = Arc::new(postgres_connection::establish_connection(
        &dotenvy_env.database,
    )?);
    info!("Postgres connection has been established");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(http_serve::shutdown_signal(shutdown_tx));

    spawn_notification_dispatcher(&dotenvy_env, &postgres_pool, shutdown_rx.clone())?;

    http_serve::start(dotenvy_env, postgres_pool, shutdown_rx).await?;

    Ok(())
}

fn spawn_notification_dispatcher(
    config: &DotEnvyConfig,
    db_pool: &Arc<PgPoolSquad>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let Some(token) = config.notifications.line_channel_access_token.clone() else {
        warn!("LINE_CHANNEL_ACCESS_TOKEN is not set; order notifications stay queued");
        return Ok(());
    };

    let send_timeout = Duration::from_secs(config.notifications.send_timeout_secs);
    let sink = LineMessagingSink::new(token, send_timeout)?;
    let settings = DispatchSettings {
        max_attempts: config.notifications.max_attempts,
        poll_interval: Duration::from_secs(config.notifications.poll_interval_secs),
        send_timeout,
    };

    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::new(NotificationOutboxPostgres::new(Arc::clone(db_pool))),
        Arc::new(sink),
        settings,
    ));
    tokio::spawn(dispatcher.run(shutdown));
    info!("Notification dispatcher has been started");

    Ok(())
}
