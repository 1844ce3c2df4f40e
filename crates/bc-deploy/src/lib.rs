// SPDX-License-Identifier: MIT

//! Agent deployer: the 7-step SSH provisioning flow run once when a new
//! Server is created (`spec.md` §4.4).

mod config;
mod deployer;
mod error;
mod source_ip;
mod ssh;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{AgentConfig, CompressionConfig, PerformanceConfig, COMPRESSION_LEVEL};
pub use deployer::{DeployOutcome, DeployRequest, Deployer, RusshDeployer};
pub use error::DeployError;
pub use source_ip::detect_source_ip;
