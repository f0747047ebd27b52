//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (peer groups reference existing groups)
//! - Validate thresholds (1 <= failure <= count) and CIDR blocks
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Configuration → Result<(), Vec<ValidationError>>
//! - Unknown probe kinds are not errors here; they are logged and skipped
//!   during evaluation

use std::collections::HashSet;
use std::net::IpAddr;

use thiserror::Error;

use crate::config::schema::{Configuration, Group};

/// A single semantic problem in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("group '{group}' device '{device}' address #{index}: count must be at least 1")]
    ZeroCount {
        group: String,
        device: String,
        index: usize,
    },

    #[error("group '{group}' device '{device}' address #{index}: failure must be at least 1")]
    ZeroFailure {
        group: String,
        device: String,
        index: usize,
    },

    #[error(
        "group '{group}' device '{device}' address #{index}: failure threshold {failure} exceeds count {count}"
    )]
    FailureExceedsCount {
        group: String,
        device: String,
        index: usize,
        failure: u32,
        count: u32,
    },

    #[error("group '{group}' references unknown peer group '{peer}'")]
    UnknownPeerGroup { group: String, peer: String },

    #[error("group '{group}' names itself as its peer group")]
    SelfPeer { group: String },

    #[error("group '{group}' lists device '{device}' more than once")]
    DuplicateDevice { group: String, device: String },

    #[error("group '{group}': {field} must not be empty")]
    EmptyField { group: String, field: String },

    #[error("group '{group}' route table '{table}': invalid destination '{destination}'")]
    InvalidDestination {
        group: String,
        table: String,
        destination: String,
    },

    #[error("probe timeout must be greater than zero")]
    ZeroProbeTimeout,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &Configuration) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.probe.timeout_secs == 0 {
        errors.push(ValidationError::ZeroProbeTimeout);
    }

    for (name, group) in &config.groups {
        validate_peer(config, name, group, &mut errors);
        validate_devices(name, group, &mut errors);
        validate_routes(name, group, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_peer(
    config: &Configuration,
    name: &str,
    group: &Group,
    errors: &mut Vec<ValidationError>,
) {
    let Some(peer) = group.peer_group.as_deref() else {
        return;
    };

    if peer == name {
        errors.push(ValidationError::SelfPeer {
            group: name.to_string(),
        });
    } else if !config.groups.contains_key(peer) {
        errors.push(ValidationError::UnknownPeerGroup {
            group: name.to_string(),
            peer: peer.to_string(),
        });
    }
}

fn validate_devices(name: &str, group: &Group, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();

    for device in &group.devices {
        if device.name.trim().is_empty() {
            errors.push(ValidationError::EmptyField {
                group: name.to_string(),
                field: "device name".to_string(),
            });
        }
        if !seen.insert(device.name.as_str()) {
            errors.push(ValidationError::DuplicateDevice {
                group: name.to_string(),
                device: device.name.clone(),
            });
        }

        for (index, address) in device.addresses.iter().enumerate() {
            let group = name.to_string();
            let device = device.name.clone();
            if address.count == 0 {
                errors.push(ValidationError::ZeroCount {
                    group: group.clone(),
                    device: device.clone(),
                    index,
                });
            }
            if address.failure == 0 {
                errors.push(ValidationError::ZeroFailure {
                    group,
                    device,
                    index,
                });
            } else if address.count > 0 && address.failure > address.count {
                errors.push(ValidationError::FailureExceedsCount {
                    group,
                    device,
                    index,
                    failure: address.failure,
                    count: address.count,
                });
            }
        }
    }
}

fn validate_routes(name: &str, group: &Group, errors: &mut Vec<ValidationError>) {
    let mut empty = |field: &str| {
        errors.push(ValidationError::EmptyField {
            group: name.to_string(),
            field: field.to_string(),
        })
    };

    for subnet in &group.subnets {
        if subnet.subnet.trim().is_empty() {
            empty("subnet");
        }
        if subnet.healthy_route_table.trim().is_empty() {
            empty("healthy-route-table");
        }
        if subnet.sick_route_table.trim().is_empty() {
            empty("sick-route-table");
        }
    }

    for table in &group.route_tables {
        if table.table_id.trim().is_empty() {
            empty("route-table");
        }
        for route in &table.routes {
            if route.healthy_target.trim().is_empty() {
                empty("healthy-target");
            }
            if route.sick_target.trim().is_empty() {
                empty("sick-target");
            }
        }
    }

    for table in &group.route_tables {
        for route in &table.routes {
            if !is_cidr(&route.destination) {
                errors.push(ValidationError::InvalidDestination {
                    group: name.to_string(),
                    table: table.table_id.clone(),
                    destination: route.destination.clone(),
                });
            }
        }
    }
}

/// Accepts `a.b.c.d/n` (n <= 32) and IPv6 `addr/n` (n <= 128).
fn is_cidr(value: &str) -> bool {
    let Some((addr, prefix)) = value.split_once('/') else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    match addr.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => prefix <= 32,
        Ok(IpAddr::V6(_)) => prefix <= 128,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Address, Device, FailoverMode, RouteEntry, RouteTableSpec};

    fn group_with(addresses: Vec<Address>) -> Group {
        Group {
            devices: vec![Device {
                name: "fw1".into(),
                failover_mode: FailoverMode::Any,
                addresses,
            }],
            ..Group::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        let mut config = Configuration::default();
        let mut east = group_with(vec![Address::tcp("10.0.0.1", 443).with_thresholds(3, 2)]);
        east.peer_group = Some("west".into());
        east.route_tables.push(RouteTableSpec {
            table_id: "rtb-1".into(),
            routes: vec![RouteEntry {
                destination: "10.1.0.0/16".into(),
                healthy_target: "eni-a".into(),
                sick_target: "eni-b".into(),
            }],
        });
        config.groups.insert("east".into(), east);
        config.groups.insert("west".into(), Group::default());

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_failure_above_count_rejected() {
        let mut config = Configuration::default();
        config.groups.insert(
            "east".into(),
            group_with(vec![Address::tcp("10.0.0.1", 443).with_thresholds(2, 3)]),
        );

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::FailureExceedsCount {
                group: "east".into(),
                device: "fw1".into(),
                index: 0,
                failure: 3,
                count: 2,
            }]
        );
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Configuration::default();
        config.probe.timeout_secs = 0;
        let mut east = group_with(vec![Address::tcp("10.0.0.1", 443).with_thresholds(0, 0)]);
        east.peer_group = Some("missing".into());
        east.devices.push(east.devices[0].clone());
        config.groups.insert("east".into(), east);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroProbeTimeout));
        assert!(errors.contains(&ValidationError::UnknownPeerGroup {
            group: "east".into(),
            peer: "missing".into(),
        }));
        assert!(errors.contains(&ValidationError::DuplicateDevice {
            group: "east".into(),
            device: "fw1".into(),
        }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::ZeroCount { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::ZeroFailure { .. })));
    }

    #[test]
    fn test_self_peer_rejected() {
        let mut config = Configuration::default();
        let mut east = Group::default();
        east.peer_group = Some("east".into());
        config.groups.insert("east".into(), east);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::SelfPeer { group: "east".into() }]);
    }

    #[test]
    fn test_unknown_test_kind_is_not_a_validation_error() {
        let mut config = Configuration::default();
        let mut address = Address::tcp("10.0.0.1", 443);
        address.test = Some("icmp_ping".into());
        config.groups.insert("east".into(), group_with(vec![address]));

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_cidr_parsing() {
        assert!(is_cidr("0.0.0.0/0"));
        assert!(is_cidr("10.0.0.0/8"));
        assert!(is_cidr("2001:db8::/32"));
        assert!(!is_cidr("10.0.0.0/33"));
        assert!(!is_cidr("10.0.0.0"));
        assert!(!is_cidr("example/24"));
    }
}
