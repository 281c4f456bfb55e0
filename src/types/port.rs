// ABOUTME: Port requirement specification: port number plus protocol.
// ABOUTME: Parses the "9200/tcp" notation used in catalog files.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParsePortSpecError {
    #[error("invalid port number: {0}")]
    InvalidPort(String),

    #[error("unknown protocol: {0} (expected tcp or udp)")]
    UnknownProtocol(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// A port a service must be able to bind, with its protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortSpec {
    pub port: u16,
    pub protocol: Protocol,
}

impl PortSpec {
    pub fn tcp(port: u16) -> Self {
        Self {
            port,
            protocol: Protocol::Tcp,
        }
    }

    pub fn udp(port: u16) -> Self {
        Self {
            port,
            protocol: Protocol::Udp,
        }
    }

    /// Parse "9200" or "9200/tcp" or "514/udp".
    pub fn parse(spec: &str) -> Result<Self, ParsePortSpecError> {
        let (port_part, proto_part) = match spec.split_once('/') {
            Some((p, proto)) => (p, Some(proto)),
            None => (spec, None),
        };

        let port: u16 = port_part
            .trim()
            .parse()
            .map_err(|_| ParsePortSpecError::InvalidPort(port_part.to_string()))?;

        let protocol = match proto_part.map(str::trim) {
            None | Some("tcp") => Protocol::Tcp,
            Some("udp") => Protocol::Udp,
            Some(other) => return Err(ParsePortSpecError::UnknownProtocol(other.to_string())),
        };

        Ok(Self { port, protocol })
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

impl Serialize for PortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PortSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        PortSpec::parse(&value).map_err(serde::de::Error::custom)
    }
}
