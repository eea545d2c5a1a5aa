//! In-memory container runtime shared by the integration tests.
//!
//! Mirrors Docker's observable behavior closely enough for the lifecycle
//! manager: duplicate names conflict, stopping a stopped sandbox reports
//! "not modified", unknown names are not found.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use mailbox_provisioner::sandbox::{LaunchSpec, RuntimeError, SandboxRuntime, SandboxSummary};

#[derive(Debug, Clone)]
pub struct FakeSandbox {
    pub spec: LaunchSpec,
    pub output: String,
    pub running: bool,
}

#[derive(Debug, Default)]
struct State {
    sandboxes: HashMap<String, FakeSandbox>,
    launches: Vec<LaunchSpec>,
    fail_create: Option<(RuntimeError, bool)>,
    fail_stop: Option<RuntimeError>,
    claim_next_name: Option<String>,
    delay: Option<Duration>,
    stop_delay: Option<Duration>,
    next_handle: u64,
}

/// Cloneable handle; clones share state so tests can steer a runtime that
/// was moved into a manager.
#[derive(Debug, Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<State>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake runtime state poisoned")
    }

    /// Every runtime call sleeps this long first.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state().delay = Some(delay);
        self
    }

    /// Makes the next create fail. With `leave_partial`, the sandbox is
    /// registered before the failure, like a container created but not started.
    pub fn fail_next_create(&self, error: RuntimeError, leave_partial: bool) {
        self.state().fail_create = Some((error, leave_partial));
    }

    /// Registers a running sandbox with `output` under the next name passed
    /// to create, as if another caller had taken that name first.
    pub fn claim_next_name(&self, output: &str) {
        self.state().claim_next_name = Some(output.to_string());
    }

    /// Stop takes this long on top of the common delay, like a workload
    /// using its whole grace period.
    pub fn with_stop_delay(self, delay: Duration) -> Self {
        self.state().stop_delay = Some(delay);
        self
    }

    /// Makes every stop fail.
    pub fn fail_stop(&self, error: RuntimeError) {
        self.state().fail_stop = Some(error);
    }

    /// Registers a sandbox directly, bypassing create.
    pub fn insert(&self, name: &str, output: &str, running: bool) {
        let spec = LaunchSpec {
            name: name.to_string(),
            image: "fake".to_string(),
            command: vec![],
            env: vec![],
            labels: HashMap::new(),
        };
        self.state().sandboxes.insert(
            name.to_string(),
            FakeSandbox {
                spec,
                output: output.to_string(),
                running,
            },
        );
    }

    pub fn append_output(&self, name: &str, text: &str) {
        if let Some(sandbox) = self.state().sandboxes.get_mut(name) {
            sandbox.output.push_str(text);
        }
    }

    pub fn set_running(&self, name: &str, running: bool) {
        if let Some(sandbox) = self.state().sandboxes.get_mut(name) {
            sandbox.running = running;
        }
    }

    pub fn get(&self, name: &str) -> Option<FakeSandbox> {
        self.state().sandboxes.get(name).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.state().sandboxes.contains_key(name)
    }

    /// Every launch request passed to create, in call order.
    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.state().launches.clone()
    }

    async fn pause(&self) {
        let delay = self.state().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl SandboxRuntime for FakeRuntime {
    async fn create_and_start(&self, spec: &LaunchSpec) -> Result<String, RuntimeError> {
        self.pause().await;
        let mut state = self.state();
        state.launches.push(spec.clone());

        if let Some(output) = state.claim_next_name.take() {
            state.sandboxes.insert(
                spec.name.clone(),
                FakeSandbox {
                    spec: spec.clone(),
                    output,
                    running: true,
                },
            );
        }

        if state.sandboxes.contains_key(&spec.name) {
            return Err(RuntimeError::Conflict(format!(
                "Conflict. The container name \"/{}\" is already in use",
                spec.name
            )));
        }

        let failure = state.fail_create.take();
        if let Some((_, true)) = &failure {
            state.sandboxes.insert(
                spec.name.clone(),
                FakeSandbox {
                    spec: spec.clone(),
                    output: String::new(),
                    running: false,
                },
            );
        }
        if let Some((error, _)) = failure {
            return Err(error);
        }

        state.sandboxes.insert(
            spec.name.clone(),
            FakeSandbox {
                spec: spec.clone(),
                output: String::new(),
                running: true,
            },
        );
        state.next_handle += 1;
        Ok(format!("fake-{:04}", state.next_handle))
    }

    async fn fetch_output(&self, name: &str) -> Result<String, RuntimeError> {
        self.pause().await;
        self.state()
            .sandboxes
            .get(name)
            .map(|s| s.output.clone())
            .ok_or(RuntimeError::NotFound)
    }

    async fn is_running(&self, name: &str) -> Result<bool, RuntimeError> {
        self.pause().await;
        Ok(self
            .state()
            .sandboxes
            .get(name)
            .is_some_and(|s| s.running))
    }

    async fn stop(&self, name: &str, _grace: Duration) -> Result<(), RuntimeError> {
        self.pause().await;
        let stop_delay = self.state().stop_delay;
        if let Some(delay) = stop_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state();
        if let Some(error) = state.fail_stop.clone() {
            return Err(error);
        }
        match state.sandboxes.get_mut(name) {
            None => Err(RuntimeError::NotFound),
            Some(s) if !s.running => Err(RuntimeError::NotModified),
            Some(s) => {
                s.running = false;
                Ok(())
            }
        }
    }

    async fn delete(&self, name: &str) -> Result<(), RuntimeError> {
        self.pause().await;
        self.state()
            .sandboxes
            .remove(name)
            .map(|_| ())
            .ok_or(RuntimeError::NotFound)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<SandboxSummary>, RuntimeError> {
        self.pause().await;
        let mut found: Vec<SandboxSummary> = self
            .state()
            .sandboxes
            .values()
            .filter(|s| s.running && s.spec.name.starts_with(prefix))
            .map(|s| SandboxSummary {
                name: s.spec.name.clone(),
                status: "Up".to_string(),
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}
