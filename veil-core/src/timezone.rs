//! Temporal consistency layer.
//!
//! One zone name and one integer offset are resolved at installation time
//! and shared by every time surface: the offset accessor and the
//! locale-formatting resolver can never disagree.

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VeilError};

/// The single zone/offset pair a browsing context reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemporalOverride {
    zone: String,
    offset_minutes: i32,
}

impl TemporalOverride {
    /// Resolve a zone name against the IANA database at `at`.
    ///
    /// The offset uses the `getTimezoneOffset` convention: minutes to add
    /// to local time to reach UTC (positive west of Greenwich).
    pub fn resolve(zone: &str, at: DateTime<Utc>) -> Result<Self> {
        let tz: Tz = zone
            .trim()
            .parse()
            .map_err(|_| VeilError::UnknownTimeZone(zone.to_string()))?;
        let local_minus_utc = tz
            .offset_from_utc_datetime(&at.naive_utc())
            .fix()
            .local_minus_utc();
        Ok(Self {
            zone: tz.name().to_string(),
            offset_minutes: -(local_minus_utc / 60),
        })
    }

    /// Canonical zone name, e.g. `"America/New_York"`.
    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }

    /// Overwrite the zone field only; every other option stays as resolved.
    pub fn apply_to(&self, options: &mut ResolvedDateTimeOptions) {
        options.time_zone = self.zone.clone();
    }
}

/// Resolved options of a locale-aware date/time formatter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDateTimeOptions {
    pub locale: String,
    pub calendar: String,
    pub numbering_system: String,
    pub time_zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour_cycle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour12: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_offsets_follow_js_sign() {
        let winter = at("2026-01-15T12:00:00Z");
        assert_eq!(TemporalOverride::resolve("America/New_York", winter).unwrap().offset_minutes(), 300);
        assert_eq!(TemporalOverride::resolve("Europe/Berlin", winter).unwrap().offset_minutes(), -60);
        assert_eq!(TemporalOverride::resolve("Asia/Tokyo", winter).unwrap().offset_minutes(), -540);
        assert_eq!(TemporalOverride::resolve("Asia/Kolkata", winter).unwrap().offset_minutes(), -330);
        assert_eq!(TemporalOverride::resolve("Europe/London", winter).unwrap().offset_minutes(), 0);
    }

    #[test]
    fn test_daylight_saving_at_install_instant() {
        let summer = at("2026-07-15T12:00:00Z");
        assert_eq!(TemporalOverride::resolve("America/New_York", summer).unwrap().offset_minutes(), 240);
        assert_eq!(TemporalOverride::resolve("Australia/Sydney", summer).unwrap().offset_minutes(), -600);
    }

    #[test]
    fn test_unknown_zone() {
        let err = TemporalOverride::resolve("Mars/Olympus_Mons", at("2026-01-01T00:00:00Z")).unwrap_err();
        assert_eq!(err, VeilError::UnknownTimeZone("Mars/Olympus_Mons".into()));
    }

    #[test]
    fn test_apply_touches_zone_only() {
        let temporal = TemporalOverride::resolve("Europe/Paris", at("2026-03-01T00:00:00Z")).unwrap();
        let mut options = ResolvedDateTimeOptions {
            locale: "fr-FR".into(),
            calendar: "gregory".into(),
            numbering_system: "latn".into(),
            time_zone: "UTC".into(),
            hour_cycle: Some("h23".into()),
            hour12: Some(false),
        };
        let before = options.clone();
        temporal.apply_to(&mut options);
        assert_eq!(options.time_zone, "Europe/Paris");
        assert_eq!(options.locale, before.locale);
        assert_eq!(options.hour_cycle, before.hour_cycle);
        assert_eq!(options.numbering_system, before.numbering_system);
    }
}
