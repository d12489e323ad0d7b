//! Background sampling of host resources and database metrics.

pub mod probe;
pub mod sampler;

pub use probe::{HostProbe, SysinfoProbe};
pub use sampler::ResourceSampler;
