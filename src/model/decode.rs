//! Canonical decoding of key/value style inputs.
//!
//! Every accepted input shape is a variant below; each concrete type has a
//! single `TryFrom` conversion. Callers never sniff for field presence.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use super::keyed::{EnvVariable, ExposedPort, Label, Protocol, Volume};
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(String);

impl DecodeError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeError> for EngineError {
    fn from(err: DecodeError) -> Self {
        EngineError::Validation(err.0)
    }
}

/// Scalar accepted as a value; YAML users write `PORT: 80` as often as `PORT: "80"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Integer(n) => write!(f, "{n}"),
            Scalar::Float(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Accepted shapes for env vars and labels.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PairInput {
    /// `{key: A, value: 1}`
    Pair { key: String, value: Scalar },
    /// `"A=1"`
    Assignment(String),
    /// `{A: 1}`
    Mapping(BTreeMap<String, Scalar>),
}

/// Accepted shapes for exposed ports.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortInput {
    /// `80`
    Bare(i64),
    /// `"8080:80"`, `"80"`, `"53/udp"`
    Spec(String),
    /// `{container: 80, host: 8080, protocol: tcp}`
    Object {
        container: i64,
        host: Option<i64>,
        protocol: Option<String>,
    },
}

/// Accepted shapes for volumes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VolumeInput {
    /// `"/host/dir:/data"` or `"/data"`
    Spec(String),
    /// `{container: /data, host: /host/dir}`
    Object {
        container: String,
        host: Option<String>,
    },
}

fn decode_pair(input: PairInput) -> Result<(String, String), DecodeError> {
    let (key, value) = match input {
        PairInput::Pair { key, value } => (key, value.to_string()),
        PairInput::Assignment(s) => {
            let (key, value) = s
                .split_once('=')
                .ok_or_else(|| DecodeError::new(format!("expected KEY=VALUE, got '{s}'")))?;
            (key.to_string(), value.to_string())
        }
        PairInput::Mapping(map) => {
            let entries = map.len();
            let mut iter = map.into_iter();
            match (iter.next(), entries) {
                (Some((key, value)), 1) => (key, value.to_string()),
                _ => {
                    return Err(DecodeError::new(format!(
                        "expected a single KEY: VALUE entry, got {entries} entries"
                    )));
                }
            }
        }
    };

    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(DecodeError::new("key must be a non-empty string"));
    }
    Ok((key, value))
}

impl TryFrom<PairInput> for EnvVariable {
    type Error = DecodeError;

    fn try_from(input: PairInput) -> Result<Self, Self::Error> {
        let (key, value) = decode_pair(input)?;
        Ok(EnvVariable { key, value })
    }
}

impl TryFrom<PairInput> for Label {
    type Error = DecodeError;

    fn try_from(input: PairInput) -> Result<Self, Self::Error> {
        let (key, value) = decode_pair(input)?;
        Ok(Label { key, value })
    }
}

fn port_number(raw: i64, what: &str) -> Result<u16, DecodeError> {
    match u16::try_from(raw) {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(DecodeError::new(format!(
            "{what} port must be between 1 and 65535, got {raw}"
        ))),
    }
}

fn parse_port_number(raw: &str, what: &str) -> Result<u16, DecodeError> {
    let n: i64 = raw
        .trim()
        .parse()
        .map_err(|_| DecodeError::new(format!("{what} port is not a number: '{raw}'")))?;
    port_number(n, what)
}

fn parse_protocol(raw: &str) -> Result<Protocol, DecodeError> {
    Protocol::parse(raw).ok_or_else(|| DecodeError::new(format!("unknown protocol '{raw}'")))
}

impl TryFrom<PortInput> for ExposedPort {
    type Error = DecodeError;

    fn try_from(input: PortInput) -> Result<Self, Self::Error> {
        match input {
            PortInput::Bare(n) => Ok(ExposedPort::new(port_number(n, "container")?, None)),
            PortInput::Spec(s) => {
                let (ports, protocol) = match s.split_once('/') {
                    Some((ports, proto)) => (ports, parse_protocol(proto)?),
                    None => (s.as_str(), Protocol::Tcp),
                };
                let (host, container) = match ports.split_once(':') {
                    Some((host, container)) => {
                        (Some(parse_port_number(host, "host")?), container)
                    }
                    None => (None, ports),
                };
                Ok(ExposedPort {
                    container_port: parse_port_number(container, "container")?,
                    host_port: host,
                    protocol,
                })
            }
            PortInput::Object {
                container,
                host,
                protocol,
            } => Ok(ExposedPort {
                container_port: port_number(container, "container")?,
                host_port: host.map(|h| port_number(h, "host")).transpose()?,
                protocol: protocol
                    .as_deref()
                    .map(parse_protocol)
                    .transpose()?
                    .unwrap_or_default(),
            }),
        }
    }
}

fn check_container_path(path: &str) -> Result<(), DecodeError> {
    if path.is_empty() {
        return Err(DecodeError::new("volume container path must not be empty"));
    }
    if !path.starts_with('/') {
        return Err(DecodeError::new(format!(
            "volume container path must be absolute, got '{path}'"
        )));
    }
    Ok(())
}

impl TryFrom<VolumeInput> for Volume {
    type Error = DecodeError;

    fn try_from(input: VolumeInput) -> Result<Self, Self::Error> {
        let (container, host) = match input {
            VolumeInput::Spec(s) => match s.split_once(':') {
                Some((host, container)) => (container.to_string(), Some(host.to_string())),
                None => (s, None),
            },
            VolumeInput::Object { container, host } => (container, host),
        };

        check_container_path(&container)?;
        let host_path = match host {
            Some(h) if h.trim().is_empty() => {
                return Err(DecodeError::new("volume host path must not be blank"));
            }
            Some(h) => Some(PathBuf::from(h)),
            None => None,
        };
        Ok(Volume {
            container_path: container,
            host_path,
        })
    }
}

impl FromStr for EnvVariable {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(PairInput::Assignment(s.to_string()))
    }
}

impl FromStr for Label {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(PairInput::Assignment(s.to_string()))
    }
}

impl FromStr for ExposedPort {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(PortInput::Spec(s.to_string()))
    }
}

impl FromStr for Volume {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(VolumeInput::Spec(s.to_string()))
    }
}
