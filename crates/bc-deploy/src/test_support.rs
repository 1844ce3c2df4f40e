// SPDX-License-Identifier: MIT

//! Test double for [`Deployer`], following the teacher's
//! `test-support`-feature-gated fake convention.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::deployer::{DeployOutcome, DeployRequest, Deployer};
use crate::error::DeployError;

/// Scripted outcome for the next `deploy()` call.
pub enum FakeOutcome {
    Succeed,
    Fail(DeployError),
}

pub struct FakeDeployer {
    outcome: Mutex<FakeOutcome>,
    requests: Mutex<Vec<DeployRequest>>,
}

impl FakeDeployer {
    pub fn succeeding() -> Self {
        Self { outcome: Mutex::new(FakeOutcome::Succeed), requests: Mutex::new(Vec::new()) }
    }

    pub fn failing_with(error: DeployError) -> Self {
        Self { outcome: Mutex::new(FakeOutcome::Fail(error)), requests: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<DeployRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Deployer for FakeDeployer {
    async fn deploy(&self, request: DeployRequest) -> Result<DeployOutcome, DeployError> {
        self.requests.lock().push(request);
        match &*self.outcome.lock() {
            FakeOutcome::Succeed => Ok(DeployOutcome),
            FakeOutcome::Fail(error) => Err(clone_error(error)),
        }
    }
}

fn clone_error(error: &DeployError) -> DeployError {
    match error {
        DeployError::Connect { hostname, port, source } => {
            DeployError::Connect { hostname: hostname.clone(), port: *port, source: source.clone() }
        }
        DeployError::Authenticate { hostname, ssh_user } => {
            DeployError::Authenticate { hostname: hostname.clone(), ssh_user: ssh_user.clone() }
        }
        DeployError::Upload(s) => DeployError::Upload(s.clone()),
        DeployError::Install(s) => DeployError::Install(s.clone()),
        DeployError::ConfigWrite(s) => DeployError::ConfigWrite(s.clone()),
        DeployError::ServiceInstall(s) => DeployError::ServiceInstall(s.clone()),
        DeployError::ServiceVerify { journal_tail } => {
            DeployError::ServiceVerify { journal_tail: journal_tail.clone() }
        }
        DeployError::Exec(s) => DeployError::Exec(s.clone()),
    }
}
