//! Recurrence expansion.
//!
//! Turns a [`RecurrenceSpec`] into the ordered list of candidate occurrences.
//! Expansion is pure: the same spec and duration always produce the same
//! dates, times and sequence numbers. Sequence numbers start at 1 and are the
//! canonical ordering used by previews, overrides and commit payloads.

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::debug;

use crate::error::{RecurringAppointmentError, Result};
use crate::models::{AppointmentInstance, RecurrenceSpec, MAX_SLOT_MINUTES};

/// End of a slot starting at `start`. Slots must have a positive length and
/// finish on the day they start.
pub fn slot_end(start: NaiveTime, duration_minutes: i64) -> Result<NaiveTime> {
    if duration_minutes <= 0 {
        return Err(RecurringAppointmentError::Validation(format!(
            "Appointment duration must be positive, got {} minutes",
            duration_minutes
        )));
    }

    if duration_minutes > MAX_SLOT_MINUTES {
        return Err(RecurringAppointmentError::Validation(format!(
            "Appointment duration of {} minutes exceeds one day",
            duration_minutes
        )));
    }

    let (end, overflow_secs) = start.overflowing_add_signed(Duration::minutes(duration_minutes));
    if overflow_secs != 0 {
        return Err(RecurringAppointmentError::Validation(format!(
            "A {} minute appointment starting at {} would run past midnight",
            duration_minutes,
            start.format("%H:%M")
        )));
    }

    Ok(end)
}

/// Expand `spec` into concrete occurrences of `duration_minutes` each.
///
/// Stops when `total_occurrences` instances exist or the next date would
/// pass `end_date`, whichever comes first, and never yields more than
/// [`crate::models::MAX_OCCURRENCES`] instances. Fails before producing
/// anything if the spec has neither bound.
pub fn expand(spec: &RecurrenceSpec, duration_minutes: i64) -> Result<Vec<AppointmentInstance>> {
    spec.ensure_bounded()?;
    let end_time = slot_end(spec.preferred_time, duration_minutes)?;

    let step = Duration::days(spec.step_days());
    let cap = spec.occurrence_cap();

    let mut instances = Vec::with_capacity(cap);
    let mut date = spec.start_date;

    while instances.len() < cap {
        if spec.end_date.is_some_and(|end| date > end) {
            break;
        }

        instances.push(AppointmentInstance {
            sequence_number: instances.len() as u32 + 1,
            date,
            start_time: spec.preferred_time,
            end_time,
            duration_minutes,
        });

        date = match date.checked_add_signed(step) {
            Some(next) => next,
            None => break,
        };
    }

    debug!(
        "Expanded {} recurrence from {} into {} instances (step {} days)",
        spec.frequency,
        spec.start_date,
        instances.len(),
        spec.step_days()
    );

    Ok(instances)
}

/// First and last date covered by `instances`, if any.
pub fn date_span(instances: &[AppointmentInstance]) -> Option<(NaiveDate, NaiveDate)> {
    let first = instances.iter().map(|i| i.date).min()?;
    let last = instances.iter().map(|i| i.date).max()?;
    Some((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, MAX_OCCURRENCES};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn base_spec(frequency: Frequency, interval: u32) -> RecurrenceSpec {
        RecurrenceSpec {
            frequency,
            interval_count: interval,
            start_date: date(2024, 1, 1),
            end_date: None,
            preferred_time: time(9, 0),
            preferred_day_of_week: None,
            total_occurrences: None,
        }
    }

    #[test]
    fn test_weekly_count_bounded() {
        let spec = RecurrenceSpec {
            total_occurrences: Some(3),
            ..base_spec(Frequency::Weekly, 1)
        };
        let instances = expand(&spec, 30).unwrap();

        let dates: Vec<_> = instances.iter().map(|i| i.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 15)]);
        for (idx, instance) in instances.iter().enumerate() {
            assert_eq!(instance.sequence_number, idx as u32 + 1);
            assert_eq!(instance.start_time, time(9, 0));
            assert_eq!(instance.end_time, time(9, 30));
            assert_eq!(instance.duration_minutes, 30);
        }
    }

    #[test]
    fn test_date_bounded_every_two_weeks() {
        let spec = RecurrenceSpec {
            end_date: Some(date(2024, 1, 20)),
            ..base_spec(Frequency::Weekly, 2)
        };
        let dates: Vec<_> = expand(&spec, 30).unwrap().into_iter().map(|i| i.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 15)]);
    }

    #[test]
    fn test_end_date_is_inclusive() {
        let spec = RecurrenceSpec {
            end_date: Some(date(2024, 1, 15)),
            ..base_spec(Frequency::Weekly, 1)
        };
        let instances = expand(&spec, 30).unwrap();
        assert_eq!(instances.last().unwrap().date, date(2024, 1, 15));
        assert_eq!(instances.len(), 3);
    }

    #[test]
    fn test_first_bound_reached_wins() {
        let spec = RecurrenceSpec {
            end_date: Some(date(2024, 12, 31)),
            total_occurrences: Some(2),
            ..base_spec(Frequency::Weekly, 1)
        };
        assert_eq!(expand(&spec, 30).unwrap().len(), 2);

        let spec = RecurrenceSpec {
            end_date: Some(date(2024, 1, 10)),
            total_occurrences: Some(10),
            ..base_spec(Frequency::Weekly, 1)
        };
        assert_eq!(expand(&spec, 30).unwrap().len(), 2);
    }

    #[test]
    fn test_monthly_and_quarterly_use_fixed_day_steps() {
        let monthly = RecurrenceSpec {
            total_occurrences: Some(3),
            ..base_spec(Frequency::Monthly, 1)
        };
        let dates: Vec<_> = expand(&monthly, 30).unwrap().into_iter().map(|i| i.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 31), date(2024, 3, 1)]);

        let quarterly = RecurrenceSpec {
            total_occurrences: Some(2),
            ..base_spec(Frequency::Quarterly, 2)
        };
        let dates: Vec<_> = expand(&quarterly, 30).unwrap().into_iter().map(|i| i.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 6, 29)]);
    }

    #[test]
    fn test_date_bound_alone_is_capped_silently() {
        let spec = RecurrenceSpec {
            end_date: Some(date(2030, 1, 1)),
            ..base_spec(Frequency::Weekly, 1)
        };
        let instances = expand(&spec, 30).unwrap();
        assert_eq!(instances.len(), MAX_OCCURRENCES as usize);
        assert_eq!(instances.last().unwrap().sequence_number, MAX_OCCURRENCES);
    }

    #[test]
    fn test_missing_bounds_fails_fast() {
        let err = expand(&base_spec(Frequency::Weekly, 1), 30).unwrap_err();
        assert!(matches!(err, RecurringAppointmentError::Validation(_)));
    }

    #[test]
    fn test_zero_interval_treated_as_one() {
        let spec = RecurrenceSpec {
            total_occurrences: Some(2),
            ..base_spec(Frequency::Weekly, 0)
        };
        let dates: Vec<_> = expand(&spec, 30).unwrap().into_iter().map(|i| i.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 8)]);
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let spec = RecurrenceSpec {
            end_date: Some(date(2024, 6, 1)),
            total_occurrences: Some(40),
            ..base_spec(Frequency::Weekly, 3)
        };
        assert_eq!(expand(&spec, 45).unwrap(), expand(&spec, 45).unwrap());
    }

    #[test]
    fn test_sequence_numbers_contiguous_and_bounds_respected() {
        for interval in 1..=4 {
            for frequency in [Frequency::Weekly, Frequency::Monthly, Frequency::Quarterly] {
                let spec = RecurrenceSpec {
                    end_date: Some(date(2026, 6, 30)),
                    total_occurrences: Some(25),
                    ..base_spec(frequency, interval)
                };
                let instances = expand(&spec, 30).unwrap();
                assert!(instances.len() <= 25);
                for (idx, instance) in instances.iter().enumerate() {
                    assert_eq!(instance.sequence_number, idx as u32 + 1);
                    assert!(instance.date <= date(2026, 6, 30));
                }
            }
        }
    }

    #[test]
    fn test_slot_end_rejects_midnight_crossing_and_non_positive() {
        assert!(slot_end(time(23, 45), 30).is_err());
        assert!(slot_end(time(9, 0), 0).is_err());
        assert!(slot_end(time(0, 0), i64::MAX).is_err());
        assert_eq!(slot_end(time(23, 0), 59).unwrap(), time(23, 59));
    }

    #[test]
    fn test_date_span() {
        let spec = RecurrenceSpec {
            total_occurrences: Some(3),
            ..base_spec(Frequency::Weekly, 1)
        };
        let instances = expand(&spec, 30).unwrap();
        assert_eq!(date_span(&instances), Some((date(2024, 1, 1), date(2024, 1, 15))));
        assert_eq!(date_span(&[]), None);
    }
}
