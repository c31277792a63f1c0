//! Service fee schedule shown alongside the request form

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// A single priced service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFee {
    pub service: String,
    pub price: Decimal,
}

/// Fee schedule (display only; no payment is taken)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    pub currency: String,
    pub callout_fee: Decimal,
    pub per_km: Decimal,
    pub services: Vec<ServiceFee>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            callout_fee: Decimal::new(4900, 2),
            per_km: Decimal::new(250, 2),
            services: vec![
                ServiceFee {
                    service: "Jump start".to_string(),
                    price: Decimal::new(3500, 2),
                },
                ServiceFee {
                    service: "Tire change".to_string(),
                    price: Decimal::new(5500, 2),
                },
                ServiceFee {
                    service: "Fuel delivery".to_string(),
                    price: Decimal::new(4000, 2),
                },
                ServiceFee {
                    service: "Lockout".to_string(),
                    price: Decimal::new(6000, 2),
                },
                ServiceFee {
                    service: "Towing (base)".to_string(),
                    price: Decimal::new(9500, 2),
                },
            ],
        }
    }
}

impl FeeSchedule {
    /// Estimated total for a service and towing distance
    ///
    /// Unknown services are `NotFound`; a total that does not fit in a
    /// `Decimal` is a validation error.
    pub fn estimate(&self, service: &str, distance_km: Decimal) -> Result<Decimal> {
        let fee = self
            .services
            .iter()
            .find(|f| f.service.eq_ignore_ascii_case(service))
            .ok_or_else(|| {
                let known: Vec<&str> = self.services.iter().map(|f| f.service.as_str()).collect();
                Error::not_found(format!(
                    "Unknown service '{}'. Known services: {}",
                    service,
                    known.join(", ")
                ))
            })?;

        self.per_km
            .checked_mul(distance_km)
            .and_then(|towing| towing.checked_add(fee.price))
            .and_then(|subtotal| subtotal.checked_add(self.callout_fee))
            .ok_or_else(|| Error::validation("Distance is too large to estimate"))
    }
}
