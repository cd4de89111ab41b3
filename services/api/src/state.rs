//! Application state shared across handlers

use std::sync::Arc;

use auth::{
    TokenService,
    middleware::TrustedProxies,
    rate_limiter::{RateLimiter, RateLimiterConfig},
};
use sqlx::PgPool;

use crate::{
    checkout::{CheckoutConfig, CheckoutService},
    config::Settings,
    payment::PaymentProcessor,
    pricing::RateTable,
    repositories::{BookingStore, ContactRepository, MediaRepository},
    storage::MediaStorage,
    webhook::WebhookReconciler,
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub bookings: Arc<dyn BookingStore>,
    pub checkout: CheckoutService,
    pub webhooks: WebhookReconciler,
    pub media: MediaRepository,
    pub contacts: ContactRepository,
    pub storage: MediaStorage,
    pub tokens: TokenService,
    pub contact_limiter: RateLimiter,
    pub trusted_proxies: TrustedProxies,
}

impl AppState {
    /// Wire every service from its own config section
    pub fn new(
        settings: &Settings,
        db_pool: PgPool,
        bookings: Arc<dyn BookingStore>,
        processor: Arc<dyn PaymentProcessor>,
        tokens: TokenService,
    ) -> Self {
        let checkout = CheckoutService::new(
            bookings.clone(),
            processor,
            RateTable::from_config(&settings.pricing),
            CheckoutConfig::from_stripe(&settings.stripe),
        );
        let webhooks = WebhookReconciler::from_stripe(bookings.clone(), &settings.stripe);

        Self {
            media: MediaRepository::new(db_pool.clone()),
            contacts: ContactRepository::new(db_pool.clone()),
            storage: MediaStorage::new(&settings.uploads),
            contact_limiter: RateLimiter::new(RateLimiterConfig::contact()),
            trusted_proxies: TrustedProxies::parse(&settings.server.trusted_proxies),
            db_pool,
            bookings,
            checkout,
            webhooks,
            tokens,
        }
    }
}
