//! Configuration schema definitions.
//!
//! This module defines the failover document: groups of devices, the
//! addresses probed on each device, and the routing state rewritten when a
//! group changes health. Key spellings follow the deployed JSON documents
//! (`failover-mode`, `peer-group`, `route-tables`, ...).

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for one failover evaluation.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Configuration {
    /// Failover groups keyed by name.
    pub groups: BTreeMap<String, Group>,

    /// Probe timing settings.
    pub probe: ProbeSettings,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

impl Configuration {
    /// Look up a group by name.
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }
}

/// Aggregation rule applied to a device's addresses or a group's devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailoverMode {
    /// One failed child is enough.
    #[default]
    Any,
    /// Every child must fail.
    All,
}

impl FailoverMode {
    /// Decide whether the parent is down given `down` failed children out of `total`.
    ///
    /// A parent with no children is never down.
    pub fn is_down(self, down: usize, total: usize) -> bool {
        match self {
            FailoverMode::Any => down > 0,
            FailoverMode::All => total > 0 && down == total,
        }
    }
}

impl std::fmt::Display for FailoverMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailoverMode::Any => write!(f, "any"),
            FailoverMode::All => write!(f, "all"),
        }
    }
}

/// A named cluster of devices that fail over together.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Group {
    #[serde(default)]
    pub failover_mode: FailoverMode,

    /// Name of the group that takes over traffic when this one is sick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_group: Option<String>,

    /// Per-route failover: entries rewritten in place.
    #[serde(default)]
    pub route_tables: Vec<RouteTableSpec>,

    /// Whole-table failover: subnets reassociated to another table.
    #[serde(default)]
    pub subnets: Vec<SubnetSpec>,

    #[serde(default)]
    pub devices: Vec<Device>,
}

/// A device in a group. Serialized as a single-key mapping from the
/// device name to its body.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(
    try_from = "BTreeMap<String, DeviceSpec>",
    into = "BTreeMap<String, DeviceSpec>"
)]
pub struct Device {
    pub name: String,
    pub failover_mode: FailoverMode,
    pub addresses: Vec<Address>,
}

/// Body of a device entry as written in the document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceSpec {
    #[serde(default)]
    pub failover_mode: FailoverMode,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

impl TryFrom<BTreeMap<String, DeviceSpec>> for Device {
    type Error = String;

    fn try_from(map: BTreeMap<String, DeviceSpec>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "device entry must have exactly one name, found {}",
                map.len()
            ));
        }
        let (name, spec) = map
            .into_iter()
            .next()
            .ok_or_else(|| "device entry is empty".to_string())?;
        Ok(Device {
            name,
            failover_mode: spec.failover_mode,
            addresses: spec.addresses,
        })
    }
}

impl From<Device> for BTreeMap<String, DeviceSpec> {
    fn from(device: Device) -> Self {
        let mut map = BTreeMap::new();
        map.insert(
            device.name,
            DeviceSpec {
                failover_mode: device.failover_mode,
                addresses: device.addresses,
            },
        );
        map
    }
}

/// One probed address on a device.
///
/// `test` is kept as written; it is resolved into a check when the address
/// is evaluated so that an unknown test does not reject the whole document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Address {
    /// `tcp_ping`, `ssl_ping` or `http_ping`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Number of probe repetitions.
    #[serde(default = "default_count")]
    pub count: u32,

    /// Failures within `count` attempts needed to mark the address down.
    #[serde(default = "default_failure")]
    pub failure: u32,
}

impl Address {
    /// A `tcp_ping` address with default count and threshold.
    pub fn tcp(ip: impl Into<String>, port: u16) -> Self {
        Self::endpoint("tcp_ping", ip, port)
    }

    /// An `ssl_ping` address with default count and threshold.
    pub fn ssl(ip: impl Into<String>, port: u16) -> Self {
        Self::endpoint("ssl_ping", ip, port)
    }

    /// An `http_ping` address with default count and threshold.
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            test: Some("http_ping".to_string()),
            ip: None,
            port: None,
            url: Some(url.into()),
            count: default_count(),
            failure: default_failure(),
        }
    }

    /// Set repetition count and failure threshold.
    pub fn with_thresholds(mut self, count: u32, failure: u32) -> Self {
        self.count = count;
        self.failure = failure;
        self
    }

    fn endpoint(test: &str, ip: impl Into<String>, port: u16) -> Self {
        Self {
            test: Some(test.to_string()),
            ip: Some(ip.into()),
            port: Some(port),
            url: None,
            count: default_count(),
            failure: default_failure(),
        }
    }
}

fn default_count() -> u32 {
    1
}

fn default_failure() -> u32 {
    1
}

/// Ports appear both as numbers and as strings in deployed documents.
fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        Text(String),
    }

    match Option::<PortValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PortValue::Number(port)) => Ok(Some(port)),
        Some(PortValue::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid port '{}': {}", text, e))),
    }
}

/// A routing table whose entries are rewritten on failover.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RouteTableSpec {
    #[serde(rename = "route-table")]
    pub table_id: String,

    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

/// One destination and its two candidate next hops.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RouteEntry {
    /// Destination CIDR block.
    pub destination: String,
    pub healthy_target: String,
    pub sick_target: String,
}

/// A subnet whose table association is swapped on failover.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubnetSpec {
    pub subnet: String,
    #[serde(alias = "healthyRouteTable")]
    pub healthy_route_table: String,
    #[serde(alias = "sickRouteTable")]
    pub sick_route_table: String,
}

/// Probe timing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProbeSettings {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// Overall evaluation deadline in seconds. Attempts still running when
    /// it passes count as failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,

    /// Evaluate addresses, devices and groups concurrently.
    pub parallel: bool,
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 3,
            deadline_secs: None,
            parallel: true,
        }
    }
}

/// Diagnostic verbosity, replacing the numeric debug toggle of deployed
/// scripts (0 = errors, 1 = info, 10 = trace).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Error,
    Info,
    Trace,
}

impl std::str::FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" | "0" => Ok(Verbosity::Error),
            "info" | "1" => Ok(Verbosity::Info),
            "trace" | "10" => Ok(Verbosity::Trace),
            other => Err(format!("unknown verbosity '{}'", other)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ObservabilityConfig {
    pub verbosity: Verbosity,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,
}
