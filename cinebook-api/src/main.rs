use cinebook_api::{app, worker, AppState, AuthConfig};
use cinebook_booking::BookingEngine;
use cinebook_core::{SeatLedger, SystemClock};
use cinebook_store::{app_config::Config, DbClient, RedisClient};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinebook_api=debug,cinebook_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting Cinebook API on port {}", config.server.port);

    let db = DbClient::new(&config.database).await?;
    db.migrate().await?;
    let ledger: Arc<dyn SeatLedger> = Arc::new(db.seat_ledger());

    let engine = Arc::new(BookingEngine::new(
        ledger,
        Arc::new(SystemClock),
        config.booking.expiry_policy()?,
        config.booking.payment_provider.clone(),
    ));

    let redis = match &config.redis {
        Some(redis) => match RedisClient::new(&redis.url).await {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!("Redis unavailable, rate limiting disabled: {}", e);
                None
            }
        },
        None => None,
    };

    if config.booking.sweep_interval_seconds > 0 {
        worker::start_expiry_worker(engine.clone(), Duration::from_secs(config.booking.sweep_interval_seconds));
    }

    let app_state = AppState {
        engine,
        redis,
        auth: AuthConfig { secret: config.auth.jwt_secret.clone() },
        webhook_secret: config.payments.webhook_secret.clone(),
        rate_limit: config.rate_limit.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
