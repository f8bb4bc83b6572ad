//! Wall-clock scheduling for the daily sweep.

use time::{Duration, OffsetDateTime, Time};

/// Floor for any computed sleep, so a non-positive delay can never turn
/// the scheduler into a tight loop.
pub const MIN_SLEEP: std::time::Duration = std::time::Duration::from_secs(5);

/// The next instant at `hour:00:00` strictly after `now`, in `now`'s
/// offset: today if the hour is still ahead, otherwise tomorrow.
pub fn next_daily_run(now: OffsetDateTime, hour: u8) -> OffsetDateTime {
    let run_time = Time::from_hms(hour, 0, 0).unwrap_or(Time::MIDNIGHT);
    let today = now.replace_time(run_time);
    if today > now { today } else { today + Duration::days(1) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn before_the_hour_runs_today() {
        let now = datetime!(2025-05-20 06:30:00 +07:00);
        assert_eq!(next_daily_run(now, 8), datetime!(2025-05-20 08:00:00 +07:00));
    }

    #[test]
    fn after_the_hour_runs_tomorrow() {
        let now = datetime!(2025-05-20 09:00:01 +07:00);
        assert_eq!(next_daily_run(now, 8), datetime!(2025-05-21 08:00:00 +07:00));
    }

    #[test]
    fn exactly_at_the_hour_runs_tomorrow() {
        let now = datetime!(2025-05-20 08:00:00 +07:00);
        assert_eq!(next_daily_run(now, 8), datetime!(2025-05-21 08:00:00 +07:00));
    }

    #[test]
    fn month_boundary_rolls_over() {
        let now = datetime!(2025-05-31 23:59:59 +07:00);
        assert_eq!(next_daily_run(now, 8), datetime!(2025-06-01 08:00:00 +07:00));
    }

    #[test]
    fn offset_is_preserved() {
        let now = datetime!(2025-05-20 06:30:00 -03:00);
        let next = next_daily_run(now, 8);
        assert_eq!(next.offset(), now.offset());
    }

    #[test]
    fn invalid_hour_degrades_to_midnight() {
        let now = datetime!(2025-05-20 06:30:00 +07:00);
        assert_eq!(next_daily_run(now, 99), datetime!(2025-05-21 00:00:00 +07:00));
    }
}
