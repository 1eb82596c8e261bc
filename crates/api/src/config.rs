//! Types for use when configuring rquery modules.

use crate::*;
use std::sync::Mutex;

/// helper transcode function
fn tc<S: serde::Serialize, D: serde::de::DeserializeOwned>(
    s: &S,
) -> RqResult<D> {
    serde_json::from_value(
        serde_json::to_value(s).map_err(|e| RqError::other_src("encode", e))?,
    )
    .map_err(|e| RqError::other_src("decode", e))
}

/// Denotes a type used to configure a specific rquery module.
///
/// A module config is a struct with a single top-level field named after
/// the module (e.g. `coreOrchestrator`), so that all module configs can
/// share one flat json object without clashing.
///
/// The serialization should be tolerant to missing properties, setting
/// sane defaults, since config may be loaded from a human-edited file.
pub trait ModConfig:
    'static
    + Sized
    + Default
    + std::fmt::Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
{
}

impl<T> ModConfig for T where
    T: 'static
        + Sized
        + Default
        + std::fmt::Debug
        + serde::Serialize
        + serde::de::DeserializeOwned
        + Send
        + Sync
{
}

/// rquery configuration.
#[derive(Debug, Default)]
pub struct Config(Mutex<serde_json::Map<String, serde_json::Value>>);

impl serde::Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.lock().unwrap().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let map: serde_json::Map<String, serde_json::Value> =
            serde::Deserialize::deserialize(deserializer)?;
        Ok(Self(Mutex::new(map)))
    }
}

impl Config {
    /// Merge the top-level properties of a module config into this config,
    /// replacing any previous values for those properties.
    ///
    /// Factories call this with their defaults from `default_config`,
    /// callers may call it afterwards to override them.
    pub fn set_module_config<M: ModConfig>(&self, m: &M) -> RqResult<()> {
        let value = serde_json::to_value(m)
            .map_err(|e| RqError::other_src("encode", e))?;
        let serde_json::Value::Object(map) = value else {
            return Err(RqError::other(
                "module config must serialize to an object",
            ));
        };
        let mut lock = self.0.lock().unwrap();
        for (k, v) in map {
            lock.insert(k, v);
        }
        Ok(())
    }

    /// Extract a module config. Properties this config does not carry
    /// fall back to the module's defaults, unknown properties are ignored.
    pub fn get_module_config<M: ModConfig>(&self) -> RqResult<M> {
        tc(&*self.0.lock().unwrap())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Default, serde::Serialize, serde::Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct RetryConfig {
        #[serde(default)]
        max_attempts: u32,
        #[serde(default)]
        label: String,
    }

    #[derive(Debug, Default, serde::Serialize, serde::Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct RetryModConfig {
        #[serde(default)]
        retry_mod: RetryConfig,
    }

    #[test]
    fn config_usage_example() {
        let config = Config::default();
        config
            .set_module_config(&RetryModConfig {
                retry_mod: RetryConfig {
                    max_attempts: 5,
                    label: "".into(),
                },
            })
            .unwrap();

        assert_eq!(
            serde_json::json!({"retryMod": {"maxAttempts": 5, "label": ""}}),
            serde_json::to_value(&config).unwrap()
        );

        // ensure we can load a weird config from disk
        let config: Config = serde_json::from_str(
            r#"{
          "modBAD": { "foo": "bar" },
          "retryMod": { "label": "test", "extra": "foo" }
        }"#,
        )
        .unwrap();

        assert_eq!(
            RetryModConfig {
                retry_mod: RetryConfig {
                    max_attempts: 0,
                    label: "test".into(),
                },
            },
            config.get_module_config::<RetryModConfig>().unwrap(),
        );
    }

    #[test]
    fn unset_mods_get_the_default() {
        let config = Config::default();
        assert_eq!(
            RetryModConfig::default(),
            config.get_module_config::<RetryModConfig>().unwrap(),
        );
    }

    #[test]
    fn non_object_mod_config_is_rejected() {
        let config = Config::default();
        assert!(config.set_module_config(&42_u32).is_err());
    }
}
