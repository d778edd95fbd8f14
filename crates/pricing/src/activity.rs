//! Promotion activity observation for the window sweep.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use destore_core::{Entity, PromotionId, StoreId};

use crate::events::PromotionActivityChanged;
use crate::promotion::Promotion;

/// Remembers the last observed activity of each promotion and reports flips.
///
/// The first observation of a promotion only records its state; a promotion
/// that disappears from the observed set is forgotten.
#[derive(Debug, Default)]
pub struct PromotionActivityTracker {
    observed: HashMap<PromotionId, bool>,
}

impl PromotionActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the full promotion set at `now`, returning one event (with the
    /// promotion's store scope) per promotion whose activity flipped.
    pub fn observe(
        &mut self,
        promotions: &[Promotion],
        now: DateTime<Utc>,
    ) -> Vec<(Option<StoreId>, PromotionActivityChanged)> {
        let mut flips = Vec::new();
        let mut seen = HashMap::with_capacity(promotions.len());

        for promo in promotions {
            let active = promo.is_currently_active(now);
            if let Some(&was_active) = self.observed.get(&promo.id()) {
                if was_active != active {
                    flips.push((promo.store_id(), PromotionActivityChanged::new(promo, active)));
                }
            }
            seen.insert(promo.id(), active);
        }

        self.observed = seen;
        flips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promotion::{NewPromotion, PromotionKind};
    use chrono::Duration;

    #[test]
    fn reports_start_then_end_once_each() {
        let t0 = Utc::now();
        let promo = Promotion::create(
            &NewPromotion {
                name: "Weekend".to_string(),
                description: None,
                kind: PromotionKind::FreeDelivery,
                store_id: Some(StoreId::new(4)),
                start_date: Some(t0 + Duration::minutes(1)),
                end_date: Some(t0 + Duration::minutes(10)),
            },
            t0,
        )
        .unwrap();
        let all = vec![promo];
        let mut tracker = PromotionActivityTracker::new();

        assert!(tracker.observe(&all, t0).is_empty());

        let started = tracker.observe(&all, t0 + Duration::minutes(2));
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].0, Some(StoreId::new(4)));
        assert!(started[0].1.started);

        assert!(tracker.observe(&all, t0 + Duration::minutes(3)).is_empty());

        let ended = tracker.observe(&all, t0 + Duration::minutes(11));
        assert_eq!(ended.len(), 1);
        assert!(!ended[0].1.started);
    }

    #[test]
    fn first_observation_only_records() {
        let promo = Promotion::create(
            &NewPromotion {
                name: "Always".to_string(),
                description: None,
                kind: PromotionKind::ThreeForTwo,
                store_id: None,
                start_date: None,
                end_date: None,
            },
            Utc::now(),
        )
        .unwrap();
        let mut tracker = PromotionActivityTracker::new();
        assert!(tracker.observe(&[promo], Utc::now()).is_empty());
    }
}
