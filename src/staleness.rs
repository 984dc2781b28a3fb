use chrono::{DateTime, Duration, Utc};

/// True when the snapshot is older than `threshold`, or when its generation time
/// is unknown.
pub fn is_stale(generated_at: Option<DateTime<Utc>>, now: DateTime<Utc>, threshold: Duration) -> bool {
    match generated_at {
        Some(t) => now.signed_duration_since(t) > threshold,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STALE_THRESHOLD;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
    }

    #[test]
    fn boundary_around_one_day() {
        let t = t0();
        assert!(is_stale(Some(t), t + Duration::milliseconds(86_400_001), STALE_THRESHOLD));
        assert!(!is_stale(Some(t), t + Duration::milliseconds(86_399_999), STALE_THRESHOLD));
        assert!(!is_stale(Some(t), t + Duration::milliseconds(86_400_000), STALE_THRESHOLD));
    }

    #[test]
    fn unknown_generation_time_is_stale() {
        assert!(is_stale(None, t0(), STALE_THRESHOLD));
    }

    #[test]
    fn future_timestamps_are_fresh() {
        let t = t0();
        assert!(!is_stale(Some(t + Duration::hours(2)), t, STALE_THRESHOLD));
    }
}
