//! # Subscription Scheduler
//!
//! Pure scheduling logic: the subscription state machine, billing-date
//! arithmetic, and the retry ladder. Deterministic throughout - same inputs,
//! same outputs - so every path here is unit-testable without a clock.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              pause                      billing fails                   │
//! │   ┌────────┐ ────► ┌────────┐   ┌────────┐ ────► ┌──────────┐          │
//! │   │ active │       │ paused │   │ active │       │ past_due │          │
//! │   └────────┘ ◄──── └────────┘   └────────┘ ◄──── └────┬─────┘          │
//! │              resume                retry succeeds      │ retries       │
//! │                                                        │ exhausted     │
//! │   any non-terminal ──(cancel)──► cancelled ◄───────────┘               │
//! │   active ──(expire)──► expired                                          │
//! │                                                                         │
//! │   Terminal: cancelled, expired                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Resume Semantics
//! Resuming recomputes `next_billing_date` from "today", never from the
//! original schedule. A subscription paused across three missed cycles bills
//! once on its new schedule, not three times retroactively.

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{Frequency, SubscriptionStatus};

// =============================================================================
// Billing Date Arithmetic
// =============================================================================

/// Maximum charge attempts per billing cycle before the subscription is
/// cancelled.
pub const MAX_BILLING_ATTEMPTS: i64 = 3;

/// Days until the next retry, indexed by how many attempts have failed so
/// far: first failure retries in 3 days, second in 5, third is the last.
const RETRY_LADDER_DAYS: [i64; 2] = [3, 5];

/// Computes the next billing date from a base date and frequency.
///
/// The base is the last billing date (or, for a new subscription, the start
/// date). Week-multiple frequencies are fixed-day offsets; `Monthly` adds a
/// calendar month with end-of-month clamping, so Jan 31 → Feb 28 (29 in a
/// leap year) → Mar 28, keeping the anchor day where the month allows it.
pub fn next_billing_date(base: NaiveDate, frequency: Frequency) -> NaiveDate {
    match frequency {
        Frequency::Weekly => base + Duration::days(7),
        Frequency::Biweekly => base + Duration::days(14),
        Frequency::FourWeeks => base + Duration::days(28),
        Frequency::SixWeeks => base + Duration::days(42),
        Frequency::EightWeeks => base + Duration::days(56),
        // checked_add_months only fails past year 262143
        Frequency::Monthly => base
            .checked_add_months(Months::new(1))
            .unwrap_or(base),
    }
}

/// Computes when a failed cycle should be retried.
///
/// ## Arguments
/// * `attempt_count` - failed attempts so far, **including** the one that
///   just failed (so the first failure passes 1)
/// * `now` - the failure timestamp
///
/// ## Returns
/// `Some(retry_at)` while attempts remain (3 days after the first failure,
/// 5 after the second), `None` once the ladder is exhausted.
pub fn next_retry_at(attempt_count: i64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if attempt_count < 1 || attempt_count >= MAX_BILLING_ATTEMPTS {
        return None;
    }
    let days = RETRY_LADDER_DAYS[(attempt_count - 1) as usize];
    Some(now + Duration::days(days))
}

/// Whether the retry ladder is exhausted at the given attempt count.
#[inline]
pub const fn retries_exhausted(attempt_count: i64) -> bool {
    attempt_count >= MAX_BILLING_ATTEMPTS
}

// =============================================================================
// State Machine
// =============================================================================

/// Events that drive subscription status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// Customer/admin pause request.
    Pause,
    /// Customer/admin resume request.
    Resume,
    /// A billing attempt failed.
    BillingFailed,
    /// A retry charge succeeded.
    RetrySucceeded,
    /// All retries for a cycle failed.
    RetriesExhausted,
    /// Explicit cancellation.
    Cancel,
    /// Subscription ran past its configured end.
    Expire,
}

impl SubscriptionEvent {
    fn name(self) -> &'static str {
        match self {
            SubscriptionEvent::Pause => "pause",
            SubscriptionEvent::Resume => "resume",
            SubscriptionEvent::BillingFailed => "mark past-due",
            SubscriptionEvent::RetrySucceeded => "reactivate",
            SubscriptionEvent::RetriesExhausted => "cancel (retries exhausted)",
            SubscriptionEvent::Cancel => "cancel",
            SubscriptionEvent::Expire => "expire",
        }
    }
}

/// Applies an event to a status, returning the new status.
///
/// ## Errors
/// `InvalidTransition` for anything the diagram above does not allow:
/// terminal states accept no events, resume only applies to `paused`, and
/// the billing events only apply to the statuses the Billing Run can
/// observe.
pub fn transition(
    status: SubscriptionStatus,
    event: SubscriptionEvent,
) -> CoreResult<SubscriptionStatus> {
    use SubscriptionEvent::*;
    use SubscriptionStatus::*;

    let next = match (status, event) {
        (Active, Pause) => Paused,
        (Paused, Resume) => Active,
        (Active, BillingFailed) => PastDue,
        (PastDue, BillingFailed) => PastDue,
        (PastDue, RetrySucceeded) => Active,
        (PastDue, RetriesExhausted) => Cancelled,
        (Active | Paused | PastDue, Cancel) => Cancelled,
        (Active, Expire) => Expired,
        (from, event) => {
            return Err(CoreError::InvalidTransition {
                from: from.to_string(),
                event: event.name().to_string(),
            })
        }
    };
    Ok(next)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fixed_day_frequencies() {
        let base = date(2026, 3, 10);
        assert_eq!(next_billing_date(base, Frequency::Weekly), date(2026, 3, 17));
        assert_eq!(next_billing_date(base, Frequency::Biweekly), date(2026, 3, 24));
        assert_eq!(next_billing_date(base, Frequency::FourWeeks), date(2026, 4, 7));
        assert_eq!(next_billing_date(base, Frequency::SixWeeks), date(2026, 4, 21));
        assert_eq!(next_billing_date(base, Frequency::EightWeeks), date(2026, 5, 5));
    }

    #[test]
    fn test_monthly_clamps_to_end_of_month() {
        assert_eq!(
            next_billing_date(date(2026, 1, 31), Frequency::Monthly),
            date(2026, 2, 28)
        );
        // Leap year
        assert_eq!(
            next_billing_date(date(2024, 1, 31), Frequency::Monthly),
            date(2024, 2, 29)
        );
        // Normal anchor day survives
        assert_eq!(
            next_billing_date(date(2026, 3, 15), Frequency::Monthly),
            date(2026, 4, 15)
        );
        // Year rollover
        assert_eq!(
            next_billing_date(date(2026, 12, 31), Frequency::Monthly),
            date(2027, 1, 31)
        );
    }

    #[test]
    fn test_billing_date_is_deterministic() {
        let base = date(2026, 7, 4);
        for freq in [
            Frequency::Weekly,
            Frequency::Biweekly,
            Frequency::Monthly,
            Frequency::FourWeeks,
            Frequency::SixWeeks,
            Frequency::EightWeeks,
        ] {
            let first = next_billing_date(base, freq);
            assert_eq!(first, next_billing_date(base, freq));
            // Always strictly forward
            assert!(first > base);
        }
    }

    #[test]
    fn test_retry_ladder() {
        let now = Utc::now();
        assert_eq!(next_retry_at(1, now), Some(now + Duration::days(3)));
        assert_eq!(next_retry_at(2, now), Some(now + Duration::days(5)));
        // Third failure exhausts the ladder
        assert_eq!(next_retry_at(3, now), None);
        assert_eq!(next_retry_at(0, now), None);

        assert!(!retries_exhausted(2));
        assert!(retries_exhausted(3));
    }

    #[test]
    fn test_happy_path_transitions() {
        use SubscriptionEvent::*;
        use SubscriptionStatus::*;

        assert_eq!(transition(Active, Pause).unwrap(), Paused);
        assert_eq!(transition(Paused, Resume).unwrap(), Active);
        assert_eq!(transition(Active, BillingFailed).unwrap(), PastDue);
        assert_eq!(transition(PastDue, RetrySucceeded).unwrap(), Active);
        assert_eq!(transition(PastDue, RetriesExhausted).unwrap(), Cancelled);
        assert_eq!(transition(PastDue, Cancel).unwrap(), Cancelled);
        assert_eq!(transition(Active, Expire).unwrap(), Expired);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        use SubscriptionEvent::*;
        use SubscriptionStatus::*;

        for status in [Cancelled, Expired] {
            for event in [Pause, Resume, BillingFailed, RetrySucceeded, Cancel] {
                assert!(transition(status, event).is_err());
            }
        }
    }

    #[test]
    fn test_invalid_transitions() {
        use SubscriptionEvent::*;
        use SubscriptionStatus::*;

        // Can't resume something that isn't paused
        let err = transition(Active, Resume).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        // Can't pause mid-dunning
        assert!(transition(PastDue, Pause).is_err());
        // Paused subscriptions aren't billed, so they can't fail billing
        assert!(transition(Paused, BillingFailed).is_err());
    }
}
