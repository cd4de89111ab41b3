use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use api::{
    AppState,
    config::Settings,
    payment::StripeClient,
    repositories::BookingRepository,
    routes,
};
use auth::{
    TokenService,
    bootstrap::ensure_default_admin,
    repositories::UserRepository,
    routes::AuthState,
};
use common::{database::init_pool, migrations};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,common=info,tower_http=info".into()),
        )
        .init();

    let settings = Settings::load().context("failed to load configuration")?;
    info!(environment = %settings.server.environment, "Starting portfolio API");

    let pool = init_pool(&settings.database).await?;
    migrations::run(&pool).await?;

    let users = Arc::new(UserRepository::new(pool.clone()));
    let tokens = TokenService::new(settings.jwt.clone())?;
    if let Some(admin) = ensure_default_admin(users.as_ref(), &settings.admin).await? {
        info!(user_id = %admin.id, email = %admin.email, "Default admin created");
    }

    if settings.stripe.secret_key.is_empty() {
        warn!("Stripe secret key not configured; checkout will be unavailable");
    }
    if settings.stripe.webhook_secret.is_empty() {
        warn!("Stripe webhook secret not configured; every webhook will be rejected");
    }
    let processor = Arc::new(StripeClient::new(settings.stripe.clone())?);
    let bookings = Arc::new(BookingRepository::new(pool.clone()));

    let state = AppState::new(&settings, pool, bookings, processor, tokens.clone());
    let auth_state =
        AuthState::new(users, tokens).with_trusted_proxies(state.trusted_proxies.clone());
    if state.trusted_proxies.is_empty() {
        info!("No trusted proxies configured; rate limits key on the socket peer");
    }

    let limiters = [state.contact_limiter.clone(), auth_state.login_limiter.clone()];
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(Duration::from_secs(5 * 60));
        loop {
            sweep.tick().await;
            for limiter in &limiters {
                limiter.purge_expired().await;
            }
        }
    });

    let app = routes::create_router(state, auth_state, &settings.server.cors_origin);

    let addr: SocketAddr = settings.server.bind_address().parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Portfolio API listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
