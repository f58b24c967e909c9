use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use rand::Rng;
use tokio::sync::RwLock;
use tracing::info;

use super::ServiceError;
use crate::domain::MatchedOffer;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveOffer {
    #[serde(flatten)]
    pub offer: MatchedOffer,
    pub redemptions: u32,
}

/// Form input for a new vendor offer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferDraft {
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub offer_type: String,
    #[serde(default)]
    pub service_category: String,
    #[serde(default)]
    pub discount_value: String,
    /// Coverage radius in kilometres, as typed.
    #[serde(default)]
    pub coverage_km: String,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub expiry_date: String,
}

impl OfferDraft {
    fn validate(&self) -> Result<(f64, NaiveDate), ServiceError> {
        let fields = [
            &self.vendor_name,
            &self.offer_type,
            &self.service_category,
            &self.discount_value,
            &self.coverage_km,
            &self.expiry_date,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ServiceError::InvalidInput(
                "All offer fields are required".to_string(),
            ));
        }
        let distance_km: f64 = self
            .coverage_km
            .trim()
            .parse()
            .ok()
            .filter(|km: &f64| km.is_finite() && *km >= 0.0)
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!("Invalid coverage area: {}", self.coverage_km))
            })?;
        let expiry = NaiveDate::parse_from_str(self.expiry_date.trim(), "%Y-%m-%d").map_err(|_| {
            ServiceError::InvalidInput(format!("Invalid expiry date: {}", self.expiry_date))
        })?;
        Ok((distance_km, expiry))
    }
}

/// Offers published by vendors, newest first.
#[derive(Default)]
pub struct OfferBoard {
    offers: RwLock<Vec<ActiveOffer>>,
}

impl OfferBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self) -> Vec<ActiveOffer> {
        self.offers.read().await.clone()
    }

    pub async fn publish(&self, draft: &OfferDraft) -> Result<ActiveOffer, ServiceError> {
        let (distance_km, expiry) = draft.validate()?;
        let vendor_name = draft.vendor_name.trim();

        let mut offers = self.offers.write().await;
        let offer_id = unique_offer_id(&offers);
        let offer = ActiveOffer {
            offer: MatchedOffer {
                offer_id,
                vendor_name: vendor_name.to_string(),
                offer_type: draft.offer_type.trim().to_string(),
                service_category: draft.service_category.trim().to_string(),
                discount_value: draft.discount_value.trim().to_string(),
                distance_km,
                expiry_date: expiry.format("%Y-%m-%d").to_string(),
                redemption_code: redemption_code(vendor_name),
            },
            redemptions: 0,
        };
        offers.insert(0, offer.clone());
        info!(
            "Published offer {} for {}",
            offer.offer.offer_id, offer.offer.vendor_name
        );
        Ok(offer)
    }
}

fn unique_offer_id(existing: &[ActiveOffer]) -> String {
    let base = format!("offer{}", Utc::now().timestamp_millis());
    let taken = |id: &str| existing.iter().any(|o| o.offer.offer_id == id);
    if !taken(&base) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// First three letters of the vendor name, upper-cased, plus a number below 1000.
fn redemption_code(vendor_name: &str) -> String {
    let prefix: String = vendor_name.chars().take(3).collect::<String>().to_uppercase();
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!("{}{}", prefix, suffix)
}
