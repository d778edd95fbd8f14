//! Discount calculator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use destore_core::{DomainError, DomainResult, Money};
use destore_core::money::round_half_up;

use crate::promotion::{Promotion, PromotionKind};

/// Effective price of `base` under `promotion` at `now`.
///
/// No promotion, or a promotion outside its activity window, leaves the base
/// price unchanged.
pub fn price(base: Money, promotion: Option<&Promotion>, now: DateTime<Utc>) -> DomainResult<Money> {
    match promotion {
        Some(promo) if promo.is_currently_active(now) => apply_discount(base, promo.kind()),
        _ => Ok(base),
    }
}

/// The discount rule for a promotion type, independent of its activity.
///
/// Fails with `Validation` when an intermediate result leaves the decimal
/// range.
pub fn apply_discount(base: Money, kind: &PromotionKind) -> DomainResult<Money> {
    let amount = base.amount();
    let discounted = match kind {
        PromotionKind::PercentageDiscount { percentage } => {
            let discount = amount
                .checked_mul(*percentage)
                .and_then(|d| d.checked_div(Decimal::ONE_HUNDRED))
                .ok_or_else(DomainError::out_of_range)?;
            amount
                .checked_sub(round_half_up(discount, 2))
                .ok_or_else(DomainError::out_of_range)?
        }
        PromotionKind::FixedDiscount { amount: off } => {
            let rest = amount
                .checked_sub(off.amount())
                .ok_or_else(DomainError::out_of_range)?;
            return Ok(Money::new(rest).non_negative());
        }
        PromotionKind::BuyOneGetOneFree => amount
            .checked_div(Decimal::TWO)
            .ok_or_else(DomainError::out_of_range)?,
        PromotionKind::ThreeForTwo => amount
            .checked_mul(Decimal::TWO)
            .and_then(|double| double.checked_div(Decimal::from(3)))
            .ok_or_else(DomainError::out_of_range)?,
        PromotionKind::FreeDelivery => return Ok(base),
    };
    Ok(Money::new(round_half_up(discounted, 2)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promotion::NewPromotion;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn money(d: Decimal) -> Money {
        Money::new(d)
    }

    fn promotion(kind: PromotionKind) -> Promotion {
        Promotion::create(
            &NewPromotion {
                name: "promo".to_string(),
                description: None,
                kind,
                store_id: None,
                start_date: None,
                end_date: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn percentage_discount() {
        let p = promotion(PromotionKind::PercentageDiscount { percentage: dec!(10) });
        assert_eq!(price(money(dec!(100.00)), Some(&p), Utc::now()).unwrap(), money(dec!(90.00)));
    }

    #[test]
    fn percentage_discount_rounds_half_up() {
        // 12.5% of 0.99 = 0.12375 -> 0.12
        let p = promotion(PromotionKind::PercentageDiscount { percentage: dec!(12.5) });
        assert_eq!(price(money(dec!(0.99)), Some(&p), Utc::now()).unwrap(), money(dec!(0.87)));
    }

    #[test]
    fn fixed_discount_never_goes_negative() {
        let p = promotion(PromotionKind::FixedDiscount { amount: money(dec!(15.00)) });
        assert_eq!(price(money(dec!(100.00)), Some(&p), Utc::now()).unwrap(), money(dec!(85.00)));
        assert_eq!(price(money(dec!(10.00)), Some(&p), Utc::now()).unwrap(), Money::ZERO);
    }

    #[test]
    fn buy_one_get_one_free_halves_with_half_up_rounding() {
        let p = promotion(PromotionKind::BuyOneGetOneFree);
        assert_eq!(price(money(dec!(9.99)), Some(&p), Utc::now()).unwrap(), money(dec!(5.00)));
    }

    #[test]
    fn three_for_two() {
        let p = promotion(PromotionKind::ThreeForTwo);
        assert_eq!(price(money(dec!(10.00)), Some(&p), Utc::now()).unwrap(), money(dec!(6.67)));
        assert_eq!(price(money(dec!(3.00)), Some(&p), Utc::now()).unwrap(), money(dec!(2.00)));
    }

    #[test]
    fn free_delivery_leaves_price_unchanged() {
        let p = promotion(PromotionKind::FreeDelivery);
        assert_eq!(price(money(dec!(19.99)), Some(&p), Utc::now()).unwrap(), money(dec!(19.99)));
    }

    #[test]
    fn no_or_inactive_promotion_returns_base() {
        let base = money(dec!(42.00));
        assert_eq!(price(base, None, Utc::now()).unwrap(), base);

        let p = promotion(PromotionKind::BuyOneGetOneFree);
        let past_end = Utc::now() + Duration::days(1);
        let expired = p
            .update(&crate::promotion::PromotionUpdate {
                end_date: Some(Utc::now()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(price(base, Some(&expired), past_end).unwrap(), base);
    }

    #[test]
    fn amounts_beyond_decimal_range_are_rejected() {
        let huge = Money::new(Decimal::MAX);
        let kinds = [
            PromotionKind::PercentageDiscount { percentage: dec!(50) },
            PromotionKind::ThreeForTwo,
        ];
        for kind in &kinds {
            let err = apply_discount(huge, kind).unwrap_err();
            assert_eq!(err, DomainError::out_of_range());
        }
    }

    #[test]
    fn halving_the_largest_amount_stays_in_range() {
        let huge = Money::new(Decimal::MAX);
        assert!(apply_discount(huge, &PromotionKind::BuyOneGetOneFree).is_ok());
        assert_eq!(apply_discount(huge, &PromotionKind::FreeDelivery).unwrap(), huge);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn base_price() -> impl Strategy<Value = Money> {
            (0i64..1_000_000).prop_map(|pennies| Money::new(Decimal::new(pennies, 2)))
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            #[test]
            fn discounted_price_is_between_zero_and_base(
                base in base_price(),
                pct in 1u32..=100,
                off in 1i64..100_000,
            ) {
                let kinds = [
                    PromotionKind::PercentageDiscount { percentage: Decimal::from(pct) },
                    PromotionKind::FixedDiscount { amount: Money::new(Decimal::new(off, 2)) },
                    PromotionKind::BuyOneGetOneFree,
                    PromotionKind::ThreeForTwo,
                    PromotionKind::FreeDelivery,
                ];

                for kind in &kinds {
                    let discounted = apply_discount(base, kind).unwrap();
                    prop_assert!(!discounted.is_negative());
                    prop_assert!(discounted <= base);
                    prop_assert!(discounted.amount().scale() <= 2);
                }
            }
        }
    }
}
