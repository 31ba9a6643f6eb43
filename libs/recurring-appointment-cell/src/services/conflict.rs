use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use shared_utils::time_format::format_time;

use crate::models::{
    AppointmentInstance, BufferWindow, ConflictInfo, ConflictingAppointment, ExistingBooking,
    MAX_SLOT_MINUTES,
};

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`.
/// Touching ranges (one ends exactly when the other starts) do not overlap.
pub fn ranges_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

/// Window a slot occupies once the appointment type's buffers are applied.
/// Buffers are clamped to one day.
pub fn occupied_window(
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    buffers: BufferWindow,
) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(start);
    let end = date.and_time(end);
    let before = Duration::minutes(buffers.before_minutes.clamp(0, MAX_SLOT_MINUTES));
    let after = Duration::minutes(buffers.after_minutes.clamp(0, MAX_SLOT_MINUTES));

    (
        start.checked_sub_signed(before).unwrap_or(start),
        end.checked_add_signed(after).unwrap_or(end),
    )
}

/// Check one candidate occurrence against a provider's bookings.
pub fn detect(
    instance: &AppointmentInstance,
    bookings: &[ExistingBooking],
    buffers: BufferWindow,
) -> ConflictInfo {
    detect_slot(instance.date, instance.start_time, instance.end_time, bookings, buffers)
}

/// Check an arbitrary slot against a provider's bookings.
///
/// Every active booking that overlaps the buffered window is reported, in
/// start-time order. Cancelled, completed and no-show bookings never block.
pub fn detect_slot(
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    bookings: &[ExistingBooking],
    buffers: BufferWindow,
) -> ConflictInfo {
    let (window_start, window_end) = occupied_window(date, start, end, buffers);

    let mut overlapping: Vec<&ExistingBooking> = bookings
        .iter()
        .filter(|booking| booking.status.is_active())
        .filter(|booking| {
            ranges_overlap(
                window_start,
                window_end,
                booking.date.and_time(booking.start_time),
                booking.date.and_time(booking.end_time),
            )
        })
        .collect();

    if overlapping.is_empty() {
        return ConflictInfo::none();
    }

    overlapping.sort_by(|a, b| {
        (a.date, a.start_time, &a.appointment_code).cmp(&(b.date, b.start_time, &b.appointment_code))
    });

    let buffer_only = overlapping.iter().all(|booking| {
        !ranges_overlap(
            date.and_time(start),
            date.and_time(end),
            booking.date.and_time(booking.start_time),
            booking.date.and_time(booking.end_time),
        )
    });

    let reason = conflict_reason(&overlapping, buffer_only);
    debug!("Slot {} {}-{} conflicts: {}", date, format_time(&start), format_time(&end), reason);

    ConflictInfo {
        has_conflict: true,
        conflict_reason: Some(reason),
        conflicting_appointments: overlapping
            .into_iter()
            .map(|booking| ConflictingAppointment {
                patient_name: booking.patient_name.clone(),
                appointment_code: booking.appointment_code.clone(),
                start_time: booking.start_time,
                end_time: booking.end_time,
            })
            .collect(),
    }
}

fn conflict_reason(overlapping: &[&ExistingBooking], buffer_only: bool) -> String {
    let mut reason = match overlapping {
        [single] => format!(
            "Overlaps existing appointment {} ({}) {}-{}",
            single.appointment_code,
            single.patient_name,
            format_time(&single.start_time),
            format_time(&single.end_time),
        ),
        many => {
            let first = many.iter().map(|b| b.start_time).min();
            let last = many.iter().map(|b| b.end_time).max();
            match (first, last) {
                (Some(first), Some(last)) => format!(
                    "Overlaps {} existing appointments between {} and {}",
                    many.len(),
                    format_time(&first),
                    format_time(&last),
                ),
                _ => "Overlaps existing appointments".to_string(),
            }
        }
    };

    if buffer_only {
        reason.push_str(" within the required buffer time");
    }

    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use uuid::Uuid;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn booking(day: u32, start: (u32, u32), end: (u32, u32), code: &str) -> ExistingBooking {
        ExistingBooking {
            id: Uuid::new_v4(),
            provider_id: Uuid::nil(),
            patient_name: format!("Patient {}", code),
            appointment_code: code.to_string(),
            date: date(day),
            start_time: time(start.0, start.1),
            end_time: time(end.0, end.1),
            status: BookingStatus::Scheduled,
        }
    }

    fn instance(day: u32, start: (u32, u32), end: (u32, u32)) -> AppointmentInstance {
        AppointmentInstance {
            sequence_number: 1,
            date: date(day),
            start_time: time(start.0, start.1),
            end_time: time(end.0, end.1),
            duration_minutes: 30,
        }
    }

    #[test]
    fn test_overlap_detected() {
        let bookings = vec![booking(8, (9, 0), (9, 30), "APT-1")];
        let info = detect(&instance(8, (9, 15), (9, 45)), &bookings, BufferWindow::default());

        assert!(info.has_conflict);
        assert_eq!(info.conflicting_appointments.len(), 1);
        assert_eq!(info.conflicting_appointments[0].appointment_code, "APT-1");
        assert_eq!(
            info.conflict_reason.as_deref(),
            Some("Overlaps existing appointment APT-1 (Patient APT-1) 09:00-09:30")
        );
    }

    #[test]
    fn test_touching_ranges_do_not_conflict_either_way() {
        let bookings = vec![booking(8, (9, 30), (10, 0), "APT-1")];
        assert!(!detect(&instance(8, (9, 0), (9, 30)), &bookings, BufferWindow::default()).has_conflict);

        let bookings = vec![booking(8, (8, 30), (9, 0), "APT-2")];
        assert!(!detect(&instance(8, (9, 0), (9, 30)), &bookings, BufferWindow::default()).has_conflict);
    }

    #[test]
    fn test_other_dates_ignored() {
        let bookings = vec![booking(9, (9, 0), (9, 30), "APT-1")];
        let info = detect(&instance(8, (9, 0), (9, 30)), &bookings, BufferWindow::default());
        assert_eq!(info, ConflictInfo::none());
    }

    #[test]
    fn test_all_overlaps_reported_in_start_order() {
        let bookings = vec![
            booking(8, (10, 0), (10, 30), "APT-3"),
            booking(8, (9, 0), (9, 30), "APT-1"),
            booking(8, (12, 0), (12, 30), "APT-9"),
        ];
        let info = detect(&instance(8, (9, 0), (11, 0)), &bookings, BufferWindow::default());

        let codes: Vec<_> = info.conflicting_appointments.iter().map(|c| c.appointment_code.as_str()).collect();
        assert_eq!(codes, vec!["APT-1", "APT-3"]);
        assert_eq!(
            info.conflict_reason.as_deref(),
            Some("Overlaps 2 existing appointments between 09:00 and 10:30")
        );
    }

    #[test]
    fn test_buffers_widen_the_window() {
        let bookings = vec![booking(8, (9, 30), (10, 0), "APT-1")];
        let buffers = BufferWindow { before_minutes: 0, after_minutes: 10 };
        let info = detect(&instance(8, (9, 0), (9, 30)), &bookings, buffers);

        assert!(info.has_conflict);
        assert!(info.conflict_reason.unwrap().ends_with("within the required buffer time"));

        let bookings = vec![booking(8, (8, 45), (8, 55), "APT-2")];
        let buffers = BufferWindow { before_minutes: 10, after_minutes: 0 };
        assert!(detect(&instance(8, (9, 0), (9, 30)), &bookings, buffers).has_conflict);
    }

    #[test]
    fn test_oversized_buffers_are_clamped() {
        let buffers = BufferWindow { before_minutes: i64::MAX, after_minutes: i64::MAX };
        let (start, end) = occupied_window(date(8), time(9, 0), time(9, 30), buffers);
        assert_eq!(start, date(7).and_time(time(9, 0)));
        assert_eq!(end, date(9).and_time(time(9, 30)));
    }

    #[test]
    fn test_inactive_bookings_never_conflict() {
        let mut cancelled = booking(8, (9, 0), (9, 30), "APT-1");
        cancelled.status = BookingStatus::Cancelled;
        let mut no_show = booking(8, (9, 0), (9, 30), "APT-2");
        no_show.status = BookingStatus::NoShow;

        let info = detect(&instance(8, (9, 0), (9, 30)), &[cancelled, no_show], BufferWindow::default());
        assert!(!info.has_conflict);
    }

    #[test]
    fn test_overlap_math_is_symmetric() {
        let a = (time(9, 0), time(9, 30));
        let b = (time(9, 29), time(10, 0));
        assert_eq!(ranges_overlap(a.0, a.1, b.0, b.1), ranges_overlap(b.0, b.1, a.0, a.1));
        assert!(ranges_overlap(a.0, a.1, b.0, b.1));
        assert!(!ranges_overlap(a.0, a.1, a.1, b.1));
        assert!(!ranges_overlap(a.1, b.1, a.0, a.1));
    }
}
