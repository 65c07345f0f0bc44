//! Generation pipeline: drives the diffusion frame chain, muxes frames into
//! video, and falls back through the configured capability providers when
//! the environment cannot run the real thing.

pub mod artifact;
pub mod chain;
pub mod config;
pub mod diffusion;
pub mod error;
pub mod muxer;
pub mod providers;
pub mod scratch;

#[cfg(test)]
pub(crate) mod test_support;

pub use artifact::VideoArtifact;
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use providers::{CapabilityProvider, Generated, GenerationJob, ProviderChain, ProviderError};
