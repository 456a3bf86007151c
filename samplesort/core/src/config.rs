// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
//

//! Sort operator configuration

use std::collections::HashMap;
use std::fmt::Display;
use std::result;
use std::sync::LazyLock;

use crate::error::{Result, SortError};

/// Label used in log lines and in the operator's display string.
pub const SAMPLESORT_JOB_NAME: &str = "samplesort.job.name";
/// Tolerated bucket imbalance (epsilon) used to size the sample.
pub const SAMPLESORT_DESIRED_IMBALANCE: &str = "samplesort.desired_imbalance";
/// Seed for the sampler's random source. Unset means seed from the OS.
pub const SAMPLESORT_SAMPLE_SEED: &str = "samplesort.sample_seed";
/// Number of records a data channel writer batches into one block.
pub const SAMPLESORT_CHANNEL_BLOCK_SIZE: &str = "samplesort.channel.block_size";

const DEFAULT_DESIRED_IMBALANCE: f64 = 0.25;
const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Result of parsing a single configuration value.
pub type ParseResult<T> = result::Result<T, String>;

static CONFIG_ENTRIES: LazyLock<HashMap<String, ConfigEntry>> = LazyLock::new(|| {
    let entries = vec![
        ConfigEntry::new(SAMPLESORT_JOB_NAME.to_string(),
                         "Sets the job name that will appear in log output of the sort operator".to_string(),
                         ConfigDataType::Utf8, None),
        ConfigEntry::new(SAMPLESORT_DESIRED_IMBALANCE.to_string(),
                         "Tolerated relative bucket imbalance; the sample grows with 1 / imbalance^2".to_string(),
                         ConfigDataType::Float64,
                         Some(DEFAULT_DESIRED_IMBALANCE.to_string())),
        ConfigEntry::new(SAMPLESORT_SAMPLE_SEED.to_string(),
                         "Seed for the random sampler, combined with the worker rank".to_string(),
                         ConfigDataType::UInt64, None),
        ConfigEntry::new(SAMPLESORT_CHANNEL_BLOCK_SIZE.to_string(),
                         "Number of records batched into one block by in-memory channel writers".to_string(),
                         ConfigDataType::UInt64,
                         Some(DEFAULT_BLOCK_SIZE.to_string())),
    ];
    entries
        .into_iter()
        .map(|e| (e.name.clone(), e))
        .collect::<HashMap<_, _>>()
});

/// Value type of a configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigDataType {
    /// Unsigned integer
    UInt64,
    /// Floating point number
    Float64,
    /// Free-form string
    Utf8,
}

impl Display for ConfigDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigDataType::UInt64 => write!(f, "UInt64"),
            ConfigDataType::Float64 => write!(f, "Float64"),
            ConfigDataType::Utf8 => write!(f, "Utf8"),
        }
    }
}

/// Configuration option meta-data
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    name: String,
    description: String,
    data_type: ConfigDataType,
    default_value: Option<String>,
}

impl ConfigEntry {
    fn new(
        name: String,
        description: String,
        data_type: ConfigDataType,
        default_value: Option<String>,
    ) -> Self {
        Self {
            name,
            description,
            data_type,
            default_value,
        }
    }

    /// Name of the setting
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Value type of the setting
    pub fn data_type(&self) -> ConfigDataType {
        self.data_type
    }

    /// Default value, if the setting has one
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }
}

/// Sort operator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortConfig {
    /// Settings stored in map for easy serde
    settings: HashMap<String, String>,
}

impl Default for SortConfig {
    fn default() -> Self {
        // defaults are constants, so no validation is needed
        Self {
            settings: HashMap::new(),
        }
    }
}

impl SortConfig {
    /// Create a new configuration based on key-value pairs
    pub fn with_settings(settings: HashMap<String, String>) -> Result<Self> {
        if let Some(name) = settings
            .keys()
            .find(|k| !Self::valid_entries().contains_key(*k))
        {
            return Err(SortError::Configuration(format!(
                "configuration key `{name}` does not exist"
            )));
        }

        for (name, entry) in Self::valid_entries() {
            if let Some(v) = settings.get(name) {
                // validate that we can parse the user-supplied value
                Self::validate(name, v.as_str(), entry.data_type).map_err(|e| SortError::Configuration(format!("Failed to parse user-supplied value '{v}' for configuration setting '{name}': {e}")))?;
            } else if let Some(v) = entry.default_value.as_ref() {
                Self::validate(name, v.as_str(), entry.data_type).map_err(|e| SortError::Configuration(format!("Failed to parse default value '{v}' for configuration setting '{name}': {e}")))?;
            }
        }

        Ok(Self { settings })
    }

    /// Sets a single setting, validating the value first.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let entry = Self::valid_entries().get(key).ok_or_else(|| {
            SortError::Configuration(format!("configuration key `{key}` does not exist"))
        })?;
        Self::validate(key, value, entry.data_type).map_err(|e| {
            SortError::Configuration(format!(
                "Failed to parse value '{value}' for configuration setting '{key}': {e}"
            ))
        })?;
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Builder-style variant of [`SortConfig::set`].
    pub fn with_setting(mut self, key: &str, value: impl ToString) -> Result<Self> {
        self.set(key, &value.to_string())?;
        Ok(self)
    }

    /// Checks that `val` parses as `data_type`.
    pub fn parse_value(val: &str, data_type: ConfigDataType) -> ParseResult<()> {
        match data_type {
            ConfigDataType::UInt64 => {
                val.parse::<u64>().map_err(|e| format!("{e:?}"))?;
            }
            ConfigDataType::Float64 => {
                val.parse::<f64>().map_err(|e| format!("{e:?}"))?;
            }
            ConfigDataType::Utf8 => {}
        }

        Ok(())
    }

    fn validate(name: &str, val: &str, data_type: ConfigDataType) -> ParseResult<()> {
        Self::parse_value(val, data_type)?;
        match name {
            SAMPLESORT_DESIRED_IMBALANCE => {
                let v = val.parse::<f64>().map_err(|e| format!("{e:?}"))?;
                if !(v > 0.0 && v <= 1.0) {
                    return Err(format!("{v} is not in (0, 1]"));
                }
            }
            SAMPLESORT_CHANNEL_BLOCK_SIZE => {
                if val.parse::<u64>().map_err(|e| format!("{e:?}"))? == 0 {
                    return Err("block size must be at least 1".to_string());
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// All available configuration options
    pub fn valid_entries() -> &'static HashMap<String, ConfigEntry> {
        &CONFIG_ENTRIES
    }

    /// Settings explicitly supplied by the user
    pub fn settings(&self) -> &HashMap<String, String> {
        &self.settings
    }

    /// Job label, if one was configured
    pub fn job_name(&self) -> Option<&str> {
        self.settings.get(SAMPLESORT_JOB_NAME).map(String::as_str)
    }

    /// Tolerated bucket imbalance (epsilon)
    pub fn desired_imbalance(&self) -> f64 {
        self.get_setting(SAMPLESORT_DESIRED_IMBALANCE)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_DESIRED_IMBALANCE)
    }

    /// Seed for the sampler, if one was configured
    pub fn sample_seed(&self) -> Option<u64> {
        self.get_setting(SAMPLESORT_SAMPLE_SEED)
            .and_then(|v| v.parse().ok())
    }

    /// Records per in-memory channel block
    pub fn block_size(&self) -> usize {
        self.get_setting(SAMPLESORT_CHANNEL_BLOCK_SIZE)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_BLOCK_SIZE)
    }

    fn get_setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str).or_else(|| {
            Self::valid_entries()
                .get(key)
                .and_then(|entry| entry.default_value())
        })
    }
}

/// Log rolling policy of the binaries
#[derive(Clone, Copy, Debug, serde::Deserialize, Default)]
#[cfg_attr(feature = "build-binary", derive(clap::ValueEnum))]
pub enum LogRotationPolicy {
    /// Rotate every minute
    Minutely,
    /// Rotate every hour
    Hourly,
    /// Rotate every day
    Daily,
    /// Never rotate
    #[default]
    Never,
}

#[cfg(feature = "build-binary")]
impl std::str::FromStr for LogRotationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        clap::ValueEnum::from_str(s, true)
    }
}

#[cfg(feature = "build-binary")]
impl Display for LogRotationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogRotationPolicy::Minutely => write!(f, "minutely"),
            LogRotationPolicy::Hourly => write!(f, "hourly"),
            LogRotationPolicy::Daily => write!(f, "daily"),
            LogRotationPolicy::Never => write!(f, "never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() -> Result<()> {
        let config = SortConfig::default();
        assert!((config.desired_imbalance() - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.block_size(), 1024);
        assert_eq!(config.sample_seed(), None);
        assert_eq!(config.job_name(), None);
        Ok(())
    }

    #[test]
    fn user_settings_override_defaults() -> Result<()> {
        let config = SortConfig::default()
            .with_setting(SAMPLESORT_SAMPLE_SEED, 42)?
            .with_setting(SAMPLESORT_CHANNEL_BLOCK_SIZE, 7)?
            .with_setting(SAMPLESORT_JOB_NAME, "nightly")?;
        assert_eq!(config.sample_seed(), Some(42));
        assert_eq!(config.block_size(), 7);
        assert_eq!(config.job_name(), Some("nightly"));
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = SortConfig::default();
        assert!(config.set(SAMPLESORT_DESIRED_IMBALANCE, "0").is_err());
        assert!(config.set(SAMPLESORT_DESIRED_IMBALANCE, "abc").is_err());
        assert!(config.set(SAMPLESORT_CHANNEL_BLOCK_SIZE, "0").is_err());
        assert!(config.set("samplesort.unknown", "1").is_err());
        assert_eq!(config, SortConfig::default());
    }

    #[test]
    fn with_settings_validates_map() {
        let settings = HashMap::from([(
            SAMPLESORT_DESIRED_IMBALANCE.to_string(),
            "1.5".to_string(),
        )]);
        assert!(matches!(
            SortConfig::with_settings(settings),
            Err(SortError::Configuration(_))
        ));

        let settings = HashMap::from([(
            SAMPLESORT_DESIRED_IMBALANCE.to_string(),
            "0.1".to_string(),
        )]);
        let config = SortConfig::with_settings(settings).unwrap();
        assert!((config.desired_imbalance() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn registry_entries_are_typed() {
        let entries = SortConfig::valid_entries();
        let type_of = |key: &str| entries.get(key).map(ConfigEntry::data_type);
        assert_eq!(type_of(SAMPLESORT_JOB_NAME), Some(ConfigDataType::Utf8));
        assert_eq!(
            type_of(SAMPLESORT_DESIRED_IMBALANCE),
            Some(ConfigDataType::Float64)
        );
        assert_eq!(type_of(SAMPLESORT_SAMPLE_SEED), Some(ConfigDataType::UInt64));
        assert_eq!(
            type_of(SAMPLESORT_CHANNEL_BLOCK_SIZE),
            Some(ConfigDataType::UInt64)
        );
        assert_eq!(entries.len(), 4);

        for entry in entries.values() {
            if let Some(default) = entry.default_value() {
                assert!(SortConfig::parse_value(default, entry.data_type()).is_ok());
            }
        }
        assert!(SortConfig::parse_value("true", ConfigDataType::UInt64).is_err());
        assert_eq!(ConfigDataType::Float64.to_string(), "Float64");
    }
}
