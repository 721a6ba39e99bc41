//! Bridge configuration loaded from JSON or built from defaults.

use serde::{Deserialize, Serialize};

/// Session storage key launch parameters are persisted under between reloads.
pub const DEFAULT_SESSION_STORAGE_KEY: &str = "initParams";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Names of the launch parameters the bootstrap sequence reads.
pub struct LaunchParamKeys {
    /// URL-encoded launch data payload.
    pub data: String,
    /// JSON theme parameters.
    pub theme: String,
    /// Host platform identifier.
    pub platform: String,
    /// Host protocol version.
    pub version: String,
}

impl Default for LaunchParamKeys {
    fn default() -> Self {
        Self {
            data: "tgWebAppData".to_string(),
            theme: "tgWebAppThemeParams".to_string(),
            platform: "tgWebAppPlatform".to_string(),
            version: "tgWebAppVersion".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Runtime options for a bridge session.
pub struct BridgeConfig {
    /// Logs every inbound event and outbound post at debug level.
    pub debug: bool,
    /// Target origin used when posting envelopes to the parent frame.
    pub trusted_parent_origin: String,
    /// Launch parameter names.
    pub launch_param_keys: LaunchParamKeys,
    /// Session storage key for persisted launch parameters.
    pub session_storage_key: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            debug: false,
            trusted_parent_origin: "*".to_string(),
            launch_param_keys: LaunchParamKeys::default(),
            session_storage_key: DEFAULT_SESSION_STORAGE_KEY.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Parses a configuration document; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error message when `raw` is not a valid config object.
    pub fn from_json(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }

    /// Returns the config with debug logging toggled.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config = BridgeConfig::from_json(
            r#"{"debug": true, "launch_param_keys": {"platform": "platform"}}"#,
        )
        .expect("parse config");

        assert!(config.debug);
        assert_eq!(config.trusted_parent_origin, "*");
        assert_eq!(config.launch_param_keys.platform, "platform");
        assert_eq!(config.launch_param_keys.data, "tgWebAppData");
        assert_eq!(config.session_storage_key, DEFAULT_SESSION_STORAGE_KEY);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(BridgeConfig::from_json(r#"{"debug": "yes"}"#).is_err());
        assert!(BridgeConfig::from_json("not json").is_err());
    }
}
