use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::cmp::{max, min};

use crate::domain::models::{booking::Booking, hold::Hold, resource::Resource};

const TOTAL_MINUTES: usize = 1440;

/// Half-open interval overlap: `[a_start, a_end)` vs `[b_start, b_end)`.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// A slot is free iff no confirmed booking and no active hold overlaps it.
/// Expired holds count as free here with no cleanup pass required: the
/// activity check is evaluated against `now` on every read.
pub fn is_interval_free(
    bookings: &[Booking],
    holds: &[Hold],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    let booked = bookings
        .iter()
        .any(|b| overlaps(start, end, b.start_time, b.end_time));
    let held = holds
        .iter()
        .any(|h| h.is_active(now) && overlaps(start, end, h.start_time, h.end_time));
    !booked && !held
}

/// Maximal free intervals of a resource for one club-local date, bounded
/// by the operating window. Purely a query over the rows the caller
/// fetched; no side effects.
pub fn free_intervals(
    resource: &Resource,
    tz: Tz,
    date: NaiveDate,
    bookings: &[Booking],
    holds: &[Hold],
    now: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let Some(day_start_tz) = tz
        .from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
        .single()
    else {
        return Vec::new();
    };
    let day_start_utc = day_start_tz.with_timezone(&Utc);
    let day_end_utc = day_start_utc + chrono::Duration::minutes(TOTAL_MINUTES as i64);

    let mut blocked = [false; TOTAL_MINUTES];

    let mut mark = |b_start: DateTime<Utc>, b_end: DateTime<Utc>| {
        let s = max(b_start, day_start_utc);
        let e = min(b_end, day_end_utc);
        if s >= e {
            return;
        }
        let s_idx = ((s.timestamp() - day_start_utc.timestamp()) / 60) as usize;
        let e_idx = ((e.timestamp() - day_start_utc.timestamp()) / 60) as usize;
        for slot in &mut blocked[s_idx..min(e_idx, TOTAL_MINUTES)] {
            *slot = true;
        }
    };

    for booking in bookings {
        mark(booking.start_time, booking.end_time);
    }
    for hold in holds {
        if hold.is_active(now) {
            mark(hold.start_time, hold.end_time);
        }
    }

    let open = max(resource.open_minute, 0) as usize;
    let close = min(resource.close_minute as usize, TOTAL_MINUTES);

    let mut free = Vec::new();
    let mut cursor = open;
    while cursor < close {
        if blocked[cursor] {
            cursor += 1;
            continue;
        }
        let run_start = cursor;
        while cursor < close && !blocked[cursor] {
            cursor += 1;
        }
        let start = day_start_utc + chrono::Duration::minutes(run_start as i64);
        let end = day_start_utc + chrono::Duration::minutes(cursor as i64);
        free.push((start, end));
    }

    free
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::hold::{hold_status, Hold, NewHoldParams};
    use crate::domain::models::resource::{NewResourceParams, Resource};
    use chrono::Duration;

    fn test_resource() -> Resource {
        Resource::new(NewResourceParams {
            club_id: "club-1".into(),
            resource_type: "COURT".into(),
            name: "Court 1".into(),
            open_minute: 8 * 60,
            close_minute: 22 * 60,
        })
    }

    fn test_hold(start: DateTime<Utc>, end: DateTime<Utc>, ttl_min: i64) -> Hold {
        Hold::new(NewHoldParams {
            club_id: "club-1".into(),
            resource_id: "res-1".into(),
            principal_id: "user-1".into(),
            start_time: start,
            end_time: end,
            amount_minor: 45000,
            currency: "EUR".into(),
            contact_email: None,
            ttl: Duration::minutes(ttl_min),
        })
    }

    #[test]
    fn test_overlap_is_half_open() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::hours(1);
        let t2 = t0 + Duration::hours(2);
        assert!(!overlaps(t0, t1, t1, t2), "touching intervals do not overlap");
        assert!(overlaps(t0, t2, t1, t2));
    }

    #[test]
    fn test_expired_hold_reads_as_free() {
        let now = Utc::now();
        let start = now + Duration::hours(2);
        let end = start + Duration::hours(1);

        let mut hold = test_hold(start, end, 10);
        assert!(!is_interval_free(&[], &[hold.clone()], start, end, now));

        // Lapse the TTL; no sweep has run, the status column is untouched.
        hold.expires_at = now - Duration::seconds(1);
        assert_eq!(hold.status, hold_status::AWAITING_PAYMENT);
        assert!(is_interval_free(&[], &[hold], start, end, now));
    }

    #[test]
    fn test_free_intervals_subtract_active_hold() {
        let resource = test_resource();
        let tz = chrono_tz::UTC;
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let day_start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let now = day_start - Duration::days(1);

        let hold = test_hold(
            day_start + Duration::minutes(10 * 60),
            day_start + Duration::minutes(11 * 60),
            10,
        );

        let free = free_intervals(&resource, tz, date, &[], &[hold], now);
        assert_eq!(free.len(), 2);
        assert_eq!(free[0].0, day_start + Duration::minutes(8 * 60));
        assert_eq!(free[0].1, day_start + Duration::minutes(10 * 60));
        assert_eq!(free[1].0, day_start + Duration::minutes(11 * 60));
        assert_eq!(free[1].1, day_start + Duration::minutes(22 * 60));
    }

    #[test]
    fn test_free_intervals_respect_operating_window() {
        let resource = test_resource();
        let tz = chrono_tz::UTC;
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let day_start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();

        let free = free_intervals(&resource, tz, date, &[], &[], Utc::now());
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].0, day_start + Duration::minutes(8 * 60));
        assert_eq!(free[0].1, day_start + Duration::minutes(22 * 60));
    }
}
