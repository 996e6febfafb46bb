use cinebook_booking::BookingEngine;
use cinebook_store::app_config::RateLimitConfig;
use cinebook_store::RedisClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    /// Rate limiting is skipped when this is `None`.
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub webhook_secret: String,
    pub rate_limit: RateLimitConfig,
}
