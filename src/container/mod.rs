// Container lifecycle core: materialize a spec, detect drift, recreate.

pub mod drift;
mod materializer;
mod reconcile;

pub use drift::{Drift, DriftDetector, SetDiff, diff};
pub use materializer::{IDENTITY_ENV_KEYS, Materializer};
pub use reconcile::Reconciler;
