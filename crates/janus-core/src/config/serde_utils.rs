//! Shared serialization/deserialization utilities for configuration

/// Helper module for optional Duration serialization as seconds
///
/// Serializes `Option<std::time::Duration>` as a u64 number of seconds, which
/// reads naturally in TOML. A missing field deserializes to `None`; pair it
/// with `#[serde(default)]`.
pub mod opt_duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize an optional Duration as seconds (u64)
    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional Duration from seconds (u64)
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestConfig {
        #[serde(default, with = "opt_duration_secs")]
        timeout: Option<Duration>,
    }

    #[test]
    fn test_opt_duration_secs_serialize() {
        let config = TestConfig {
            timeout: Some(Duration::from_secs(30)),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"timeout":30}"#);
    }

    #[test]
    fn test_opt_duration_secs_missing() {
        let config: TestConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.timeout, None);
    }
}
