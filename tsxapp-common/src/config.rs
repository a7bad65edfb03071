//! xApp configuration model.
//!
//! Every field has a default so a partial YAML file (or none at all) yields a
//! runnable configuration pointing at the usual SD-RAN service names.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::PlmnEncoding;

/// Host/port pair of a platform service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// DNS name or IP address
    pub address: String,
    /// TCP port
    pub port: u16,
}

impl EndpointConfig {
    /// Creates a new endpoint.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl std::fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// E2 service model the xApp subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceModelConfig {
    /// Service model name
    pub name: String,
    /// Service model version
    pub version: String,
}

impl Default for ServiceModelConfig {
    fn default() -> Self {
        Self {
            name: "oran-e2sm-mho".to_string(),
            version: "v2".to_string(),
        }
    }
}

/// Northbound A1 policy interface settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct A1Config {
    /// Listening port of the A1 termination
    pub port: u16,
    /// Supported policy type name
    pub policy_name: String,
    /// Supported policy type version
    pub policy_version: String,
    /// Human readable policy type description
    pub description: String,
    /// JSON schema the policy documents are validated against
    pub schema_path: String,
    /// Policy id answered with the NOT_ENFORCED status
    pub not_enforced_policy_id: String,
    /// How long a status message waits for its acknowledgement
    pub ack_timeout_ms: u64,
}

impl A1Config {
    /// Policy type identifier, `<name>_<version>`.
    pub fn policy_type_id(&self) -> String {
        format!("{}_{}", self.policy_name, self.policy_version)
    }

    /// Acknowledgement timeout as a duration.
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

impl Default for A1Config {
    fn default() -> Self {
        Self {
            port: 5150,
            policy_name: "ORAN_TrafficSteeringPreference".to_string(),
            policy_version: "2.0.0".to_string(),
            description: "O-RAN traffic steering".to_string(),
            schema_path: "/data/schemas/ORAN_TrafficSteeringPreference_v102.json".to_string(),
            not_enforced_policy_id: "2".to_string(),
            ack_timeout_ms: 5000,
        }
    }
}

/// Timing of the steering loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Period between steering passes
    pub interval_ms: u64,
    /// Delay before the first pass, letting measurements accumulate
    pub start_delay_ms: u64,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            start_delay_ms: 15000,
        }
    }
}

/// Slice every UE is assumed to belong to until slice reporting exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceConfig {
    /// Slice differentiator, hex
    pub sd: String,
    /// Slice/service type
    pub sst: i32,
    /// PLMN MCC
    pub mcc: String,
    /// PLMN MNC
    pub mnc: String,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            sd: "456DEF".to_string(),
            sst: 1,
            mcc: "138".to_string(),
            mnc: "426".to_string(),
        }
    }
}

/// Top-level xApp configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XappConfig {
    /// Application identifier used toward the platform
    pub app_id: String,
    /// E2 termination endpoint
    pub e2t: EndpointConfig,
    /// Topology service endpoint
    pub topo: EndpointConfig,
    /// Subscribed service model
    pub service_model: ServiceModelConfig,
    /// A1 interface
    pub a1: A1Config,
    /// Key cells by the topology-order CGI
    pub topo_ids_enabled: bool,
    /// MCC/MNC convention for CGI strings
    pub plmn_encoding: PlmnEncoding,
    /// Steering loop timing
    pub steering: SteeringConfig,
    /// Period of the state dump
    pub display_interval_ms: u64,
    /// Reporting period requested in periodic subscriptions
    pub reporting_period_ms: u64,
    /// Slice assumed for all UEs
    pub default_slice: SliceConfig,
}

impl Default for XappConfig {
    fn default() -> Self {
        Self {
            app_id: "rimedo-ts".to_string(),
            e2t: EndpointConfig::new("onos-e2t", 5150),
            topo: EndpointConfig::new("onos-topo", 5150),
            service_model: ServiceModelConfig::default(),
            a1: A1Config::default(),
            topo_ids_enabled: true,
            plmn_encoding: PlmnEncoding::default(),
            steering: SteeringConfig::default(),
            display_interval_ms: 15000,
            reporting_period_ms: 1000,
            default_slice: SliceConfig::default(),
        }
    }
}

impl XappConfig {
    /// Parses a configuration from a YAML string.
    ///
    /// ```
    /// use tsxapp_common::XappConfig;
    ///
    /// let yaml = r#"
    /// app_id: ts-test
    /// topo_ids_enabled: false
    /// plmn_encoding: direct
    /// steering:
    ///   interval_ms: 500
    /// "#;
    ///
    /// let config = XappConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.app_id, "ts-test");
    /// assert_eq!(config.steering.interval_ms, 500);
    /// assert_eq!(config.steering.start_delay_ms, 15000);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Serializes the configuration to YAML.
    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Steering period.
    pub fn steering_interval(&self) -> Duration {
        Duration::from_millis(self.steering.interval_ms)
    }

    /// Delay before the first steering pass.
    pub fn steering_start_delay(&self) -> Duration {
        Duration::from_millis(self.steering.start_delay_ms)
    }

    /// State dump period.
    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = XappConfig::default();
        assert_eq!(config.e2t.to_string(), "onos-e2t:5150");
        assert_eq!(config.service_model.name, "oran-e2sm-mho");
        assert_eq!(
            config.a1.policy_type_id(),
            "ORAN_TrafficSteeringPreference_2.0.0"
        );
        assert_eq!(config.a1.ack_timeout(), Duration::from_secs(5));
        assert!(config.topo_ids_enabled);
        assert_eq!(config.plmn_encoding, PlmnEncoding::Bcd);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = XappConfig::from_yaml("{}").unwrap();
        assert_eq!(config, XappConfig::default());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = XappConfig::default();
        config.a1.not_enforced_policy_id = "7".to_string();
        config.default_slice.sd = "000001".to_string();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(XappConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            XappConfig::from_yaml("steering: [1, 2"),
            Err(Error::YamlParse(_))
        ));
    }
}
