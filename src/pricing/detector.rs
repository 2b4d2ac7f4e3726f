//! Price movement detection with configurable noise thresholds

use rust_decimal::Decimal;

use crate::common::types::{PriceAlert, PriceEntry, WatchItem};

/// Decides whether a fresh snapshot is worth an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementDetector {
    /// Absolute price changes below this are noise (EUR)
    min_abs_change: Decimal,
    /// Relative changes below this are noise (percent)
    min_pct_change: Decimal,
}

impl Default for MovementDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl MovementDetector {
    pub fn new(min_abs_change: Decimal, min_pct_change: Decimal) -> Self {
        Self {
            min_abs_change,
            min_pct_change,
        }
    }

    /// 0.01 EUR and 0.5 percent
    pub fn with_defaults() -> Self {
        Self::new(Decimal::new(1, 2), Decimal::new(5, 1))
    }

    /// Compare the newest snapshot with the previously stored entry.
    ///
    /// The snapshot is sorted by ascending price and the comparison uses its
    /// last element, i.e. the highest-priced matching listing.
    ///
    /// A movement is suppressed only when both the absolute and the relative
    /// change are below their thresholds.
    pub fn detect(
        &self,
        watch_item: &WatchItem,
        entries: &[PriceEntry],
        previous: Option<&PriceEntry>,
    ) -> Option<PriceAlert> {
        let latest = entries.last()?;

        let Some(previous) = previous else {
            let message = format!(
                "Started tracking {}: {:.2}€ with {} available copies.",
                watch_item.product_name,
                latest.price_eur.round_dp(2),
                latest.available_quantity
            );
            return Some(PriceAlert {
                watch_item: watch_item.clone(),
                message,
            });
        };

        let change = latest.price_eur - previous.price_eur;
        let percent = if previous.price_eur > Decimal::ZERO {
            // Saturates when the ratio does not fit, e.g. after a near-zero price
            change
                .checked_div(previous.price_eur)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or(if change.is_sign_negative() {
                    Decimal::MIN
                } else {
                    Decimal::MAX
                })
        } else {
            Decimal::ZERO
        };

        if change.abs() < self.min_abs_change && percent.abs() < self.min_pct_change {
            return None;
        }

        let direction = if change < Decimal::ZERO {
            "decreased"
        } else {
            "increased"
        };
        let percent = percent.round_dp(1);
        let sign = if percent.is_sign_negative() { "" } else { "+" };
        let message = format!(
            "{} price {} to {:.2}€ ({}{:.1}%) with {} copies available.",
            watch_item.product_name,
            direction,
            latest.price_eur.round_dp(2),
            sign,
            percent,
            latest.available_quantity
        );
        Some(PriceAlert {
            watch_item: watch_item.clone(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::ProductFilter;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn item() -> WatchItem {
        WatchItem::new("demo", "Demo Card", ProductFilter::new("https://example.com/card"))
    }

    fn entry(price: Decimal, quantity: u32) -> PriceEntry {
        PriceEntry::new(Utc::now(), price, quantity, None)
    }

    #[test]
    fn test_empty_snapshot_never_alerts() {
        let detector = MovementDetector::with_defaults();
        assert!(detector.detect(&item(), &[], None).is_none());
        assert!(detector
            .detect(&item(), &[], Some(&entry(dec!(1), 1)))
            .is_none());
    }

    #[test]
    fn test_first_observation_alerts() {
        let detector = MovementDetector::with_defaults();
        let alert = detector
            .detect(&item(), &[entry(dec!(12.5), 4)], None)
            .unwrap();

        assert_eq!(alert.watch_item.product_id, "demo");
        assert_eq!(
            alert.message,
            "Started tracking Demo Card: 12.50€ with 4 available copies."
        );
    }

    #[test]
    fn test_increase_alerts_with_signed_percent() {
        let detector = MovementDetector::with_defaults();
        let alert = detector
            .detect(&item(), &[entry(dec!(10.50), 3)], Some(&entry(dec!(10.00), 1)))
            .unwrap();

        assert_eq!(
            alert.message,
            "Demo Card price increased to 10.50€ (+5.0%) with 3 copies available."
        );
    }

    #[test]
    fn test_decrease_alerts() {
        let detector = MovementDetector::with_defaults();
        let alert = detector
            .detect(&item(), &[entry(dec!(8), 2)], Some(&entry(dec!(10), 1)))
            .unwrap();

        assert!(alert.message.contains("decreased to 8.00€"));
        assert!(alert.message.contains("(-20.0%)"));
    }

    #[test]
    fn test_noise_is_suppressed() {
        let detector = MovementDetector::with_defaults();
        let previous = entry(dec!(10.00), 1);

        assert!(detector
            .detect(&item(), &[entry(dec!(10.005), 1)], Some(&previous))
            .is_none());
        assert!(detector
            .detect(&item(), &[entry(dec!(10.00), 7)], Some(&previous))
            .is_none());
    }

    #[test]
    fn test_small_absolute_but_large_relative_change_alerts() {
        let detector = MovementDetector::with_defaults();
        let alert = detector.detect(&item(), &[entry(dec!(0.025), 1)], Some(&entry(dec!(0.02), 1)));
        assert!(alert.is_some());
    }

    #[test]
    fn test_zero_previous_price_uses_absolute_change() {
        let detector = MovementDetector::with_defaults();
        let alert = detector
            .detect(&item(), &[entry(dec!(1), 1)], Some(&entry(dec!(0), 1)))
            .unwrap();
        assert!(alert.message.contains("increased to 1.00€ (+0.0%)"));
    }

    #[test]
    fn test_huge_relative_change_alerts_without_overflow() {
        let detector = MovementDetector::with_defaults();
        let alert = detector
            .detect(
                &item(),
                &[entry(dec!(100000000000), 1)],
                Some(&entry(dec!(0.00000000000000000001), 1)),
            )
            .unwrap();

        assert!(alert
            .message
            .starts_with("Demo Card price increased to 100000000000.00€ (+"));
    }

    #[test]
    fn test_uses_last_entry_of_sorted_snapshot() {
        let detector = MovementDetector::with_defaults();
        let snapshot = [entry(dec!(5), 1), entry(dec!(10), 2), entry(dec!(20), 9)];
        assert!(detector
            .detect(&item(), &snapshot, Some(&entry(dec!(20), 1)))
            .is_none());

        let first = detector.detect(&item(), &snapshot, None).unwrap();
        assert!(first.message.contains("20.00€ with 9 available copies"));
    }
}
