//! Hourly rate table used to price bookings
//!
//! Prices are integer cents. A booking's price is computed once, when the
//! booking is created, as `hourly rate * duration`.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::models::booking::ServiceType;

/// Rate used when a category has no entry in the table
pub const DEFAULT_RATE_CENTS: i64 = 15_000;

/// Largest hourly rate accepted from configuration
pub const MAX_RATE_CENTS: i64 = 100_000_000;

fn acceptable(cents: i64) -> bool {
    (0..=MAX_RATE_CENTS).contains(&cents)
}

/// Optional per-category overrides, keyed by service type name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub hourly_rates: HashMap<String, i64>,
    pub default_rate_cents: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct RateTable {
    rates: HashMap<ServiceType, i64>,
    default_rate: i64,
}

impl Default for RateTable {
    fn default() -> Self {
        let rates = HashMap::from([
            (ServiceType::Portrait, 15_000),
            (ServiceType::Wedding, 30_000),
            (ServiceType::Event, 20_000),
            (ServiceType::Commercial, 25_000),
            (ServiceType::Sports, 18_000),
            (ServiceType::Nature, 12_000),
        ]);
        Self {
            rates,
            default_rate: DEFAULT_RATE_CENTS,
        }
    }
}

impl RateTable {
    /// Build a table from explicit rates
    pub fn new(rates: HashMap<ServiceType, i64>, default_rate: i64) -> Self {
        Self {
            rates,
            default_rate,
        }
    }

    /// Standard rates with the configured overrides applied
    pub fn from_config(config: &PricingConfig) -> Self {
        let mut table = Self::default();
        for (name, cents) in &config.hourly_rates {
            match name.parse::<ServiceType>() {
                Ok(service) if acceptable(*cents) => {
                    table.rates.insert(service, *cents);
                }
                _ => warn!(service = %name, cents, "Ignoring invalid rate override"),
            }
        }
        match config.default_rate_cents {
            Some(cents) if acceptable(cents) => table.default_rate = cents,
            Some(cents) => warn!(cents, "Ignoring invalid default rate"),
            None => {}
        }
        table
    }

    pub fn hourly_rate(&self, service: ServiceType) -> i64 {
        self.rates.get(&service).copied().unwrap_or(self.default_rate)
    }

    /// Total price in cents for `hours` of `service`, or `None` when the
    /// product does not fit in an `i64`
    pub fn price_cents(&self, service: ServiceType, hours: i32) -> Option<i64> {
        self.hourly_rate(service).checked_mul(i64::from(hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_is_rate_times_duration() {
        let table = RateTable::default();
        for service in ServiceType::ALL {
            for hours in 1..=24 {
                assert_eq!(
                    table.price_cents(service, hours),
                    Some(table.hourly_rate(service) * i64::from(hours))
                );
            }
        }
        assert_eq!(table.price_cents(ServiceType::Portrait, 3), Some(45_000));
        assert_eq!(table.price_cents(ServiceType::Wedding, 8), Some(240_000));
    }

    #[test]
    fn test_missing_category_uses_default_rate() {
        let table = RateTable::new(HashMap::from([(ServiceType::Wedding, 1_000)]), 500);
        assert_eq!(table.hourly_rate(ServiceType::Wedding), 1_000);
        assert_eq!(table.hourly_rate(ServiceType::Nature), 500);
    }

    #[test]
    fn test_config_overrides() {
        let config = PricingConfig {
            hourly_rates: HashMap::from([
                ("nature".to_string(), 9_900),
                ("drone".to_string(), 1),
            ]),
            default_rate_cents: None,
        };
        let table = RateTable::from_config(&config);
        assert_eq!(table.hourly_rate(ServiceType::Nature), 9_900);
        assert_eq!(table.hourly_rate(ServiceType::Portrait), 15_000);
    }

    #[test]
    fn test_out_of_range_overrides_are_ignored() {
        let config = PricingConfig {
            hourly_rates: HashMap::from([
                ("wedding".to_string(), i64::MAX),
                ("event".to_string(), -1),
                ("sports".to_string(), MAX_RATE_CENTS),
            ]),
            default_rate_cents: Some(i64::MAX / 2),
        };
        let table = RateTable::from_config(&config);
        assert_eq!(table.hourly_rate(ServiceType::Wedding), 30_000);
        assert_eq!(table.hourly_rate(ServiceType::Event), 20_000);
        assert_eq!(table.hourly_rate(ServiceType::Sports), MAX_RATE_CENTS);
        assert_eq!(table.default_rate, DEFAULT_RATE_CENTS);
        assert_eq!(
            table.price_cents(ServiceType::Sports, 24),
            Some(MAX_RATE_CENTS * 24)
        );
    }

    #[test]
    fn test_overflowing_price_is_none() {
        let table = RateTable::new(HashMap::from([(ServiceType::Wedding, i64::MAX)]), 0);
        assert_eq!(table.price_cents(ServiceType::Wedding, 2), None);
        assert_eq!(table.price_cents(ServiceType::Wedding, 1), Some(i64::MAX));
    }
}
