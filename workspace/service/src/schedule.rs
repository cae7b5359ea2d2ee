use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{ServiceError, ServiceResult};

/// Upper bound on the number of installments a debt may carry.
pub const MAX_INSTALLMENTS: i32 = 240;

/// Upper bound on the months between two consecutive due dates.
pub const MAX_MONTH_INTERVAL: i32 = 12;

/// One slot of a generated repayment schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    /// 1-based position within the schedule.
    pub sequence: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

/// Rounds a monetary amount half-up to two decimal places.
pub fn quantize(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Generates the installment schedule for a debt.
///
/// Per-installment amount is `principal / count` rounded down to
/// cents; the last installment absorbs the leftover cents so the
/// amounts always sum exactly to the principal and every amount stays
/// at least one cent. The principal must cover a cent per installment.
/// Due date `k` (1-based)
/// is `start_date` shifted forward by `(k - 1) * month_interval`
/// months, with the day-of-month clamped to the last valid day of the
/// target month (Jan 31 plus one month lands on Feb 28/29).
pub fn build_schedule(
    principal: Decimal,
    count: i32,
    start_date: NaiveDate,
    month_interval: i32,
) -> ServiceResult<Vec<ScheduleEntry>> {
    if principal <= Decimal::ZERO {
        return Err(ServiceError::validation("principal must be positive"));
    }
    if quantize(principal) != principal {
        return Err(ServiceError::validation(
            "principal must have at most two decimal places",
        ));
    }
    if !(1..=MAX_INSTALLMENTS).contains(&count) {
        return Err(ServiceError::validation(format!(
            "installment count must be between 1 and {MAX_INSTALLMENTS}"
        )));
    }
    if !(1..=MAX_MONTH_INTERVAL).contains(&month_interval) {
        return Err(ServiceError::validation(format!(
            "month interval must be between 1 and {MAX_MONTH_INTERVAL}"
        )));
    }
    if principal < Decimal::new(count as i64, 2) {
        return Err(ServiceError::validation(
            "principal must cover at least 0.01 per installment",
        ));
    }

    let per_installment = (principal / Decimal::from(count))
        .round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity);
    let mut entries = Vec::with_capacity(count as usize);
    for k in 1..=count {
        let months = ((k - 1) * month_interval) as u32;
        let due_date = start_date
            .checked_add_months(Months::new(months))
            .ok_or_else(|| ServiceError::validation("due date out of range"))?;
        let amount = if k == count {
            // The remainder of the division lands here.
            principal - per_installment * Decimal::from(count - 1)
        } else {
            per_installment
        };
        entries.push(ScheduleEntry {
            sequence: k,
            due_date,
            amount,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn even_split_monthly() {
        let entries = build_schedule(dec!(1000.00), 10, date(2024, 1, 1), 1).unwrap();
        assert_eq!(entries.len(), 10);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.sequence, i as i32 + 1);
            assert_eq!(entry.amount, dec!(100.00));
            assert_eq!(entry.due_date, date(2024, 1 + i as u32, 1));
        }
    }

    #[test]
    fn remainder_lands_on_last_installment() {
        let entries = build_schedule(dec!(100.00), 3, date(2024, 1, 1), 1).unwrap();
        assert_eq!(entries[0].amount, dec!(33.33));
        assert_eq!(entries[1].amount, dec!(33.33));
        assert_eq!(entries[2].amount, dec!(33.34));
    }

    #[test]
    fn amounts_sum_to_principal() {
        let principal = dec!(7777.77);
        for count in [1, 2, 3, 7, 11, 59, 240] {
            let entries = build_schedule(principal, count, date(2024, 3, 15), 1).unwrap();
            assert_eq!(entries.len(), count as usize);
            let sum: Decimal = entries.iter().map(|e| e.amount).sum();
            assert_eq!(sum, principal, "sum mismatch for count={count}");
        }
    }

    #[test]
    fn small_principals_keep_every_amount_positive() {
        for (principal, count) in [
            (dec!(1.00), 100),
            (dec!(2.39), 150),
            (dec!(2.40), 240),
            (dec!(0.03), 3),
        ] {
            let entries = build_schedule(principal, count, date(2024, 1, 1), 1).unwrap();
            let sum: Decimal = entries.iter().map(|e| e.amount).sum();
            assert_eq!(sum, principal, "sum mismatch for {principal}/{count}");
            for entry in &entries {
                assert!(
                    entry.amount >= dec!(0.01),
                    "installment {} of {principal}/{count} is {}",
                    entry.sequence,
                    entry.amount
                );
            }
        }
    }

    #[test]
    fn rejects_principal_below_a_cent_per_installment() {
        let start = date(2024, 1, 1);
        assert!(build_schedule(dec!(1.00), 150, start, 1).is_err());
        assert!(build_schedule(dec!(0.10), 240, start, 1).is_err());
        assert!(build_schedule(dec!(0.02), 3, start, 1).is_err());
    }

    #[test]
    fn due_dates_clamp_to_month_end() {
        let entries = build_schedule(dec!(300.00), 4, date(2024, 1, 31), 1).unwrap();
        assert_eq!(entries[0].due_date, date(2024, 1, 31));
        // 2024 is a leap year
        assert_eq!(entries[1].due_date, date(2024, 2, 29));
        assert_eq!(entries[2].due_date, date(2024, 3, 31));
        assert_eq!(entries[3].due_date, date(2024, 4, 30));
    }

    #[test]
    fn non_leap_february_clamps_to_28() {
        let entries = build_schedule(dec!(200.00), 2, date(2023, 1, 30), 1).unwrap();
        assert_eq!(entries[1].due_date, date(2023, 2, 28));
    }

    #[test]
    fn interval_spacing() {
        let entries = build_schedule(dec!(600.00), 3, date(2024, 1, 15), 6).unwrap();
        assert_eq!(entries[0].due_date, date(2024, 1, 15));
        assert_eq!(entries[1].due_date, date(2024, 7, 15));
        assert_eq!(entries[2].due_date, date(2025, 1, 15));
    }

    #[test]
    fn rejects_out_of_range_input() {
        let start = date(2024, 1, 1);
        assert!(build_schedule(dec!(0), 10, start, 1).is_err());
        assert!(build_schedule(dec!(-5.00), 10, start, 1).is_err());
        assert!(build_schedule(dec!(100.00), 0, start, 1).is_err());
        assert!(build_schedule(dec!(100.00), 241, start, 1).is_err());
        assert!(build_schedule(dec!(100.00), 10, start, 0).is_err());
        assert!(build_schedule(dec!(100.00), 10, start, 13).is_err());
        assert!(build_schedule(dec!(100.001), 10, start, 1).is_err());
    }
}
