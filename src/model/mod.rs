// Plain data types and the override merge.

mod decode;
mod desired;
mod healthcheck;
mod keyed;
pub mod merge;
mod service;
mod template;

pub use decode::{DecodeError, PairInput, PortInput, VolumeInput};
pub use desired::ContainerSpec;
pub use healthcheck::Healthcheck;
pub use keyed::{EnvVariable, ExposedPort, KeyedValue, Label, Protocol, Volume};
pub use merge::merge;
pub use service::{NewService, Owner, Service, ServiceStatus};
pub use template::{ImageSource, Template};
