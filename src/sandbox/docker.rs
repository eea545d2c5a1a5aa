//! [`SandboxRuntime`] backed by the local Docker daemon.

use std::collections::HashMap;
use std::time::Duration;

use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use futures::StreamExt;
use tracing::{debug, info};

use super::runtime::{LaunchSpec, RuntimeError, SandboxRuntime, SandboxSummary};

/// Docker-backed sandbox runtime.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects using `DOCKER_HOST` or the platform's default socket.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Unavailable`] if no client can be configured.
    /// Reachability is not checked here; see [`crate::system::check_all`].
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults().map_err(unavailable)?;
        Ok(Self { docker })
    }

    /// The underlying client.
    #[must_use]
    pub fn client(&self) -> &Docker {
        &self.docker
    }

    /// Pulls `image` unless it is already present, as `docker run` would.
    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => return Ok(()),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => {}
            Err(e) => return Err(map_error(e)),
        }

        info!(image = %image, "Pulling sandbox image");
        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };
        let mut progress = std::pin::pin!(self.docker.create_image(Some(options), None, None));
        while let Some(step) = progress.next().await {
            let step = step.map_err(map_error)?;
            if let Some(status) = step.status {
                debug!(image = %image, status = %status, "Pull progress");
            }
        }
        Ok(())
    }
}

impl SandboxRuntime for DockerRuntime {
    async fn create_and_start(&self, spec: &LaunchSpec) -> Result<String, RuntimeError> {
        self.ensure_image(&spec.image).await?;

        let env: Vec<String> = spec.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            env: if env.is_empty() { None } else { Some(env) },
            labels: Some(spec.labels.clone()),
            tty: Some(false),
            host_config: Some(HostConfig {
                init: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(map_error)?;

        self.docker
            .start_container(&spec.name, None::<StartContainerOptions<String>>)
            .await
            .map_err(map_error)?;

        Ok(response.id)
    }

    async fn fetch_output(&self, name: &str) -> Result<String, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };

        let mut stream = std::pin::pin!(self.docker.logs(name, Some(options)));
        let mut output = String::new();
        while let Some(chunk) = stream.next().await {
            output.push_str(&chunk.map_err(map_error)?.to_string());
        }
        Ok(output)
    }

    async fn is_running(&self, name: &str) -> Result<bool, RuntimeError> {
        match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(info) => Ok(info
                .state
                .and_then(|state| state.running)
                .unwrap_or(false)),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(map_error(e)),
        }
    }

    async fn stop(&self, name: &str, grace: Duration) -> Result<(), RuntimeError> {
        let t = i64::try_from(grace.as_secs()).unwrap_or(i64::MAX);
        self.docker
            .stop_container(name, Some(StopContainerOptions { t }))
            .await
            .map_err(map_error)
    }

    async fn delete(&self, name: &str) -> Result<(), RuntimeError> {
        self.docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(map_error)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<SandboxSummary>, RuntimeError> {
        let filters = HashMap::from([("name".to_string(), vec![prefix.to_string()])]);
        let options = ListContainersOptions::<String> {
            all: false,
            filters,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(map_error)?;

        // The daemon's name filter is a substring match; keep prefix matches only.
        Ok(containers
            .into_iter()
            .filter_map(|c| {
                let name = c
                    .names?
                    .into_iter()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .find(|n| n.starts_with(prefix))?;
                Some(SandboxSummary {
                    name,
                    status: c.status.unwrap_or_default(),
                })
            })
            .collect())
    }
}

fn unavailable(e: DockerError) -> RuntimeError {
    RuntimeError::Unavailable(e.to_string())
}

/// Maps daemon responses onto the runtime error vocabulary.
fn map_error(e: DockerError) -> RuntimeError {
    match e {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => RuntimeError::NotFound,
        DockerError::DockerResponseServerError {
            status_code: 304, ..
        } => RuntimeError::NotModified,
        DockerError::DockerResponseServerError {
            status_code: 409,
            message,
        } => RuntimeError::Conflict(message),
        DockerError::DockerResponseServerError {
            status_code,
            message,
        } if (400..500).contains(&status_code) => RuntimeError::Rejected(message),
        DockerError::DockerResponseServerError {
            status_code,
            message,
        } => RuntimeError::Unavailable(format!("daemon returned {status_code}: {message}")),
        other => unavailable(other),
    }
}
