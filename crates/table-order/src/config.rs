//! # Session Configuration
//!
//! Table and restaurant ids are supplied at process start and are opaque to the core.
//! Everything else has a default.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `TABLE_ORDER_RESTAURANT_ID` | Restaurant the table belongs to | required |
//! | `TABLE_ORDER_TABLE_ID` | Table this device sits at | required |
//! | `TABLE_ORDER_REQUEST_BUFFER` | Capacity of the core's request channel | `32` |
//! | `TABLE_ORDER_RESYNC` | Re-sync when the push channel drops (`true`/`false`) | `true` |

use crate::model::{RestaurantId, TableId};

pub const RESTAURANT_ID_VAR: &str = "TABLE_ORDER_RESTAURANT_ID";
pub const TABLE_ID_VAR: &str = "TABLE_ORDER_TABLE_ID";
pub const REQUEST_BUFFER_VAR: &str = "TABLE_ORDER_REQUEST_BUFFER";
pub const RESYNC_VAR: &str = "TABLE_ORDER_RESYNC";

pub const DEFAULT_TIP_PRESETS: [u32; 3] = [10, 15, 20];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub restaurant_id: RestaurantId,
    pub table_id: TableId,
    pub request_buffer: usize,
    /// Percentages offered on the tip step.
    pub tip_presets: Vec<u32>,
    pub resync_on_channel_loss: bool,
    /// Consecutive automatic re-syncs allowed without an update arriving in between.
    pub max_resync_attempts: u32,
}

impl SessionConfig {
    pub fn new(
        restaurant_id: impl Into<RestaurantId>,
        table_id: impl Into<TableId>,
    ) -> Result<Self, ConfigError> {
        let restaurant_id = restaurant_id.into();
        let table_id = table_id.into();
        if restaurant_id.as_str().trim().is_empty() {
            return Err(ConfigError::Empty(RESTAURANT_ID_VAR));
        }
        if table_id.as_str().trim().is_empty() {
            return Err(ConfigError::Empty(TABLE_ID_VAR));
        }
        Ok(Self {
            restaurant_id,
            table_id,
            request_buffer: 32,
            tip_presets: DEFAULT_TIP_PRESETS.to_vec(),
            resync_on_channel_loss: true,
            max_resync_attempts: 3,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let restaurant_id = lookup(RESTAURANT_ID_VAR).ok_or(ConfigError::Missing(RESTAURANT_ID_VAR))?;
        let table_id = lookup(TABLE_ID_VAR).ok_or(ConfigError::Missing(TABLE_ID_VAR))?;
        let mut config = Self::new(restaurant_id, table_id)?;

        if let Some(value) = lookup(REQUEST_BUFFER_VAR) {
            let buffer = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|buffer| *buffer > 0)
                .ok_or(ConfigError::Invalid {
                    key: REQUEST_BUFFER_VAR,
                    value: value.clone(),
                })?;
            config.request_buffer = buffer;
        }
        if let Some(value) = lookup(RESYNC_VAR) {
            config.resync_on_channel_loss = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: RESYNC_VAR,
                        value,
                    })
                }
            };
        }
        Ok(config)
    }

    pub fn with_request_buffer(mut self, request_buffer: usize) -> Self {
        self.request_buffer = request_buffer.max(1);
        self
    }

    pub fn with_tip_presets(mut self, tip_presets: Vec<u32>) -> Self {
        self.tip_presets = tip_presets;
        self
    }

    pub fn with_resync(mut self, resync_on_channel_loss: bool) -> Self {
        self.resync_on_channel_loss = resync_on_channel_loss;
        self
    }

    pub fn with_max_resync_attempts(mut self, max_resync_attempts: u32) -> Self {
        self.max_resync_attempts = max_resync_attempts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new("resto_1", "table_7").unwrap();
        assert_eq!(config.request_buffer, 32);
        assert_eq!(config.tip_presets, vec![10, 15, 20]);
        assert!(config.resync_on_channel_loss);
    }

    #[test]
    fn test_empty_ids_rejected() {
        assert_eq!(
            SessionConfig::new("resto_1", "  "),
            Err(ConfigError::Empty(TABLE_ID_VAR))
        );
        assert_eq!(
            SessionConfig::new("", "table_7"),
            Err(ConfigError::Empty(RESTAURANT_ID_VAR))
        );
    }

    #[test]
    fn test_from_lookup() {
        let config = SessionConfig::from_lookup(lookup(&[
            (RESTAURANT_ID_VAR, "resto_1"),
            (TABLE_ID_VAR, "table_7"),
            (REQUEST_BUFFER_VAR, "8"),
            (RESYNC_VAR, "off"),
        ]))
        .unwrap();
        assert_eq!(config.table_id.as_str(), "table_7");
        assert_eq!(config.request_buffer, 8);
        assert!(!config.resync_on_channel_loss);
    }

    #[test]
    fn test_from_lookup_errors() {
        assert_eq!(
            SessionConfig::from_lookup(lookup(&[(RESTAURANT_ID_VAR, "resto_1")])),
            Err(ConfigError::Missing(TABLE_ID_VAR))
        );

        let invalid = SessionConfig::from_lookup(lookup(&[
            (RESTAURANT_ID_VAR, "resto_1"),
            (TABLE_ID_VAR, "table_7"),
            (REQUEST_BUFFER_VAR, "0"),
        ]));
        assert!(matches!(
            invalid,
            Err(ConfigError::Invalid { key: REQUEST_BUFFER_VAR, .. })
        ));
    }
}
