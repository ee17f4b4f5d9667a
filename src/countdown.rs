use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub is_past: bool,
}

impl Countdown {
    pub fn until(target: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining = target.signed_duration_since(now).num_seconds();
        if remaining <= 0 {
            return Countdown {
                is_past: true,
                ..Countdown::default()
            };
        }
        Countdown {
            days: remaining / 86_400,
            hours: remaining % 86_400 / 3_600,
            minutes: remaining % 3_600 / 60,
            seconds: remaining % 60,
            is_past: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn splits_remaining_time() {
        let now = Utc.ymd(2025, 1, 1).and_hms(0, 0, 0);
        let target = now + Duration::days(3) + Duration::hours(4) + Duration::seconds(65);
        assert_eq!(
            Countdown::until(target, now),
            Countdown {
                days: 3,
                hours: 4,
                minutes: 1,
                seconds: 5,
                is_past: false,
            }
        );
    }

    #[test]
    fn past_and_present_are_released() {
        let now = Utc.ymd(2025, 1, 1).and_hms(0, 0, 0);
        assert!(Countdown::until(now, now).is_past);
        let past = Countdown::until(now - Duration::days(2), now);
        assert!(past.is_past);
        assert_eq!(past.days, 0);
    }
}
