use std::net::TcpListener;

use rand::Rng;
use tracing::debug;

use crate::config::{Config, PortRange};
use crate::error::{EngineError, Resource, Result};

/// Answers whether a TCP port is currently bound on this host.
pub trait PortProbe {
    fn is_bound(&self, port: u16) -> bool;
}

/// Probes by trying to bind the port on all interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostPortProbe;

impl PortProbe for HostPortProbe {
    fn is_bound(&self, port: u16) -> bool {
        TcpListener::bind(("0.0.0.0", port)).is_err()
    }
}

/// Bounded random probing for a free host port.
///
/// Best effort only: another allocator may pick the same port before it is
/// used. The runtime's create call rejects an actual conflict.
pub struct PortAllocator<'a> {
    probe: &'a dyn PortProbe,
    range: PortRange,
    attempts: u32,
}

impl<'a> PortAllocator<'a> {
    pub fn new(probe: &'a dyn PortProbe, range: PortRange, attempts: u32) -> Self {
        Self {
            probe,
            range,
            attempts,
        }
    }

    pub fn from_config(probe: &'a dyn PortProbe, config: &Config) -> Self {
        Self::new(probe, config.port_range, config.port_attempts)
    }

    pub fn find_free_port(&self) -> Result<u16> {
        self.find_free_port_with(&mut rand::rng())
    }

    pub fn find_free_port_with<R: Rng>(&self, rng: &mut R) -> Result<u16> {
        if self.range.low == 0 || self.range.low > self.range.high {
            return Err(EngineError::validation(format!(
                "invalid port range {}..={}",
                self.range.low, self.range.high
            )));
        }
        for attempt in 1..=self.attempts {
            let candidate = rng.random_range(self.range.low..=self.range.high);
            if !self.probe.is_bound(candidate) {
                debug!(port = candidate, attempt, "allocated host port");
                return Ok(candidate);
            }
            debug!(port = candidate, attempt, "host port busy");
        }
        Err(EngineError::Exhausted {
            resource: Resource::Port,
            attempts: self.attempts,
        })
    }
}
