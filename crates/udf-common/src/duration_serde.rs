//! Serde helpers for durations written as `"250ms"`, `"2s"` or `"1m"`.
//!
//! Use with `#[serde(with = "udf_common::duration_serde")]`, or
//! `udf_common::duration_serde::option` for `Option<Duration>` fields.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{}ms", duration.as_millis()))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

/// Parses a duration with an `ms`, `s` or `m` suffix.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // "ms" before "s" since "ms" ends with 's'
    if let Some(num) = s.strip_suffix("ms") {
        let millis: u64 = num.trim().parse().map_err(|_| format!("Invalid duration: {}", s))?;
        Ok(Duration::from_millis(millis))
    } else if let Some(num) = s.strip_suffix('s') {
        let secs: u64 = num.trim().parse().map_err(|_| format!("Invalid duration: {}", s))?;
        Ok(Duration::from_secs(secs))
    } else if let Some(num) = s.strip_suffix('m') {
        let mins: u64 = num.trim().parse().map_err(|_| format!("Invalid duration: {}", s))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| format!("Duration out of range: {}", s))?;
        Ok(Duration::from_secs(secs))
    } else {
        Err(format!("Duration must end with 'ms', 's', or 'm': {}", s))
    }
}

// Custom serialization for Option<Duration>
pub mod option {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => super::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            Some(s) => super::parse_duration(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Timing {
        #[serde(with = "crate::duration_serde")]
        timeout: Duration,
        #[serde(default, with = "crate::duration_serde::option")]
        delay: Option<Duration>,
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("50ms").unwrap(), Duration::from_millis(50));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert!(parse_duration("2h").is_err());
        assert!(parse_duration("fast").is_err());
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        let err = parse_duration("307445734561825861m").unwrap_err();
        assert!(err.contains("out of range"));

        let result: Result<Timing, _> = serde_json::from_str(r#"{"timeout":"307445734561825861m"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_fields() {
        let timing: Timing = serde_json::from_str(r#"{"timeout":"1500ms"}"#).unwrap();
        assert_eq!(timing.timeout, Duration::from_millis(1500));
        assert_eq!(timing.delay, None);

        let json = serde_json::to_string(&Timing {
            timeout: Duration::from_secs(2),
            delay: Some(Duration::from_millis(20)),
        })
        .unwrap();
        assert_eq!(json, r#"{"timeout":"2000ms","delay":"20ms"}"#);
    }
}
