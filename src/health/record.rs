//! The persisted health record.
//!
//! Stored as a small JSON object:
//! ```text
//! {"timestamp": "...", "status": "unhealthy", "unhealthy_until": "..."}
//! {"timestamp": "...", "status": "healthy"}
//! ```
//! The expiry only exists inside the `Unhealthy` variant, so a record can't
//! carry one without the other.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Binary health verdict, also used for per-service statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn from_healthy(healthy: bool) -> Self {
        if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    pub fn is_healthy(self) -> bool {
        self == HealthStatus::Healthy
    }
}

/// Status portion of the record, tagged by the `status` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RecordState {
    Healthy,
    Unhealthy {
        #[serde(with = "iso8601")]
        unhealthy_until: DateTime<Utc>,
    },
}

/// The single health record kept in the status container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub state: RecordState,
}

impl HealthRecord {
    /// Build the record for a write at `now`. Zero seconds means healthy.
    ///
    /// `now` is cut to microseconds, the precision the record is stored at.
    pub fn new(now: DateTime<Utc>, unhealthy_seconds: u64) -> Self {
        let now = now.trunc_subsecs(6);
        let state = if unhealthy_seconds > 0 {
            let secs = i64::try_from(unhealthy_seconds).unwrap_or(i64::MAX);
            let until = Duration::try_seconds(secs)
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            RecordState::Unhealthy { unhealthy_until: until }
        } else {
            RecordState::Healthy
        };
        Self { timestamp: now, state }
    }

    pub fn status(&self) -> HealthStatus {
        match self.state {
            RecordState::Healthy => HealthStatus::Healthy,
            RecordState::Unhealthy { .. } => HealthStatus::Unhealthy,
        }
    }

    pub fn unhealthy_until(&self) -> Option<DateTime<Utc>> {
        match self.state {
            RecordState::Healthy => None,
            RecordState::Unhealthy { unhealthy_until } => Some(unhealthy_until),
        }
    }

    /// An unhealthy record whose window has strictly passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.unhealthy_until().is_some_and(|until| now > until)
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// ISO-8601 timestamps. Written as UTC with a `Z` suffix; read back either
/// offset-qualified or naive (taken as UTC).
pub mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
