use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::null_default;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedOffer {
    pub offer_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub vendor_name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub offer_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub service_category: String,
    #[serde(default, deserialize_with = "null_default")]
    pub discount_value: String,
    #[serde(default, deserialize_with = "null_default")]
    pub distance_km: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub expiry_date: String,
    #[serde(default, deserialize_with = "null_default")]
    pub redemption_code: String,
}

/// Reply of the supply matching agent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SupplyResult {
    #[serde(default, deserialize_with = "null_default")]
    pub matched_offers: Vec<MatchedOffer>,
    #[serde(default, deserialize_with = "null_default")]
    pub recommended_clinics: Vec<Value>,
    #[serde(default, deserialize_with = "null_default")]
    pub notification_sent: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub relevance_score: f64,
}

impl SupplyResult {
    pub const SHAPE: &'static str = "supply matching";

    /// Matched offers, nearest first.
    pub fn nearest_offers(&self) -> Vec<MatchedOffer> {
        let mut offers = self.matched_offers.clone();
        offers.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        offers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decode;
    use serde_json::json;

    #[test]
    fn decodes_and_orders_offers() {
        let supply: SupplyResult = decode(
            SupplyResult::SHAPE,
            json!({
                "matched_offers": [
                    {"offer_id": "offer123", "vendor_name": "Healthy Paws Veterinary", "distance_km": 4.5},
                    {"offer_id": "offer456", "vendor_name": "PetCare Plus", "distance_km": 3.2}
                ],
                "notification_sent": true,
                "relevance_score": 0.82
            }),
        )
        .unwrap();
        let nearest = supply.nearest_offers();
        assert_eq!(nearest[0].offer_id, "offer456");
        assert_eq!(nearest[1].redemption_code, "");
        assert!(supply.recommended_clinics.is_empty());
    }
}
