// Host resource allocation: free TCP ports and owner-scoped volume directories.

mod ports;
mod volumes;

pub use ports::{HostPortProbe, PortAllocator, PortProbe};
pub use volumes::{HostFs, VolumeAllocator, VolumeFs, in_owner_namespace, owner_root};
