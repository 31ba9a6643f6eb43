//! Serde helpers for the `HH:mm` wall-clock format used on the wire.
//!
//! Parsing also accepts `HH:mm:ss`, which is what PostgREST returns for
//! `time` columns.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serializer};

pub const HHMM: &str = "%H:%M";

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, HHMM)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S%.f"))
        .ok()
}

pub fn format_time(time: &NaiveTime) -> String {
    time.format(HHMM).to_string()
}

pub mod hhmm {
    use super::*;

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_time(time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_time(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}', expected HH:mm", raw)))
    }
}

pub mod hhmm_option {
    use super::*;

    pub fn serialize<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => serializer.serialize_str(&format_time(t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse_time(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}', expected HH:mm", s))),
        }
    }
}
