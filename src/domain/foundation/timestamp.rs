//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Whole days elapsed since `other`, truncated, floored at zero.
    ///
    /// Used for days-to-sell: a sale recorded before the receipt timestamp
    /// (clock skew, manual backfill) counts as zero days, not negative.
    pub fn whole_days_since(&self, other: &Timestamp) -> u32 {
        self.duration_since(other).num_days().max(0) as u32
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Creates a new timestamp by subtracting the specified number of days.
    pub fn minus_days(&self, days: i64) -> Self {
        Self(self.0 - Duration::days(days))
    }

    /// Creates a timestamp from Unix seconds, saturating at the maximum
    /// representable instant for out-of-range input.
    pub fn from_unix_secs(secs: u64) -> Self {
        use chrono::TimeZone;
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        match Utc.timestamp_opt(secs, 0) {
            chrono::LocalResult::Single(dt) => Self(dt),
            _ => Self(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> u64 {
        self.0.timestamp() as u64
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0 + Duration::seconds(secs as i64))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_days_since_truncates() {
        let received = Timestamp::from_unix_secs(1_700_000_000);
        // 3 days and 6 hours later
        let sold = received.add_days(3).plus_secs(6 * 3600);
        assert_eq!(sold.whole_days_since(&received), 3);
    }

    #[test]
    fn whole_days_since_floors_at_zero() {
        let received = Timestamp::from_unix_secs(1_700_000_000);
        let sold = received.minus_days(2);
        assert_eq!(sold.whole_days_since(&received), 0);
    }

    #[test]
    fn same_instant_is_zero_days() {
        let ts = Timestamp::from_unix_secs(1_700_000_000);
        assert_eq!(ts.whole_days_since(&ts), 0);
    }

    #[test]
    fn ordering_works() {
        let ts1 = Timestamp::from_unix_secs(1000);
        let ts2 = Timestamp::from_unix_secs(2000);
        assert!(ts1 < ts2);
        assert!(ts1.is_before(&ts2));
        assert!(ts2.is_after(&ts1));
    }

    #[test]
    fn unix_secs_roundtrips() {
        let ts = Timestamp::from_unix_secs(1_705_276_800);
        assert_eq!(ts.as_unix_secs(), 1_705_276_800);
    }

    #[test]
    fn out_of_range_seconds_saturate_instead_of_panicking() {
        let ts = Timestamp::from_unix_secs(u64::MAX);
        assert!(ts.is_after(&Timestamp::now()));
        assert_eq!(ts, Timestamp::from_unix_secs(i64::MAX as u64));
    }

    #[test]
    fn serializes_as_rfc3339() {
        let ts = Timestamp::from_unix_secs(1_705_276_800);
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("2024-01-15"));
    }

    #[test]
    fn deserializes_from_rfc3339() {
        let ts: Timestamp = serde_json::from_str("\"2024-01-15T10:30:00Z\"").unwrap();
        use chrono::Datelike;
        assert_eq!(ts.as_datetime().year(), 2024);
    }
}
