//! Container runtime requirements checking implementation.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use bollard::Docker;

use crate::error::{Result, RuntimeRequirementsError};

/// Minimum Docker Engine API version (major, minor). 1.41 is Docker 20.10.
pub const MIN_API_VERSION: (u32, u32) = (1, 41);

/// Results of all runtime requirements checks.
#[derive(Debug, Clone)]
pub struct RuntimeRequirements {
    /// Engine version string (e.g., "27.3.1")
    pub engine_version: String,
    /// API version string (e.g., "1.47")
    pub api_version: String,
    /// Parsed API major version
    pub api_major: u32,
    /// Parsed API minor version
    pub api_minor: u32,
    /// Daemon operating system
    pub os: String,
}

impl RuntimeRequirements {
    /// Check if all requirements are met.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        meets_minimum(self.api_major, self.api_minor) && self.os == "linux"
    }
}

/// Check all runtime requirements and return detailed results.
///
/// Each daemon call is bounded by `timeout`.
///
/// Returns `Ok(RuntimeRequirements)` with all check results, or
/// `Err` with the first failing requirement.
///
/// # Errors
///
/// Returns error if the daemon is unreachable, too slow, or its API is too old.
pub async fn check_all(docker: &Docker, timeout: Duration) -> Result<RuntimeRequirements> {
    check_reachable(docker, timeout).await?;

    let version = within("version", timeout, docker.version()).await?;

    let api_version = version
        .api_version
        .ok_or_else(|| RuntimeRequirementsError::ReadFailed {
            context: "daemon did not report an API version".to_string(),
        })?;
    let (api_major, api_minor) = check_api_version(&api_version)?;

    Ok(RuntimeRequirements {
        engine_version: version.version.unwrap_or_else(|| "unknown".to_string()),
        api_version,
        api_major,
        api_minor,
        os: version.os.unwrap_or_else(|| "unknown".to_string()),
    })
}

/// Check the daemon answers a ping within `timeout`.
///
/// # Errors
///
/// Returns error if the daemon cannot be reached in time.
pub async fn check_reachable(docker: &Docker, timeout: Duration) -> Result<()> {
    within("ping", timeout, docker.ping()).await?;
    Ok(())
}

/// Runs one daemon call under `timeout`.
async fn within<T, E: Display>(
    operation: &'static str,
    timeout: Duration,
    call: impl Future<Output = std::result::Result<T, E>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(RuntimeRequirementsError::Unreachable {
            reason: e.to_string(),
        }
        .into()),
        Err(_) => Err(RuntimeRequirementsError::Timeout { operation, timeout }.into()),
    }
}

/// Check an API version string is at least [`MIN_API_VERSION`].
///
/// # Returns
///
/// Tuple of (major, minor) on success.
///
/// # Errors
///
/// Returns error if the version cannot be parsed or is below minimum.
pub fn check_api_version(version: &str) -> Result<(u32, u32)> {
    let (major, minor) = parse_api_version(version)?;

    if !meets_minimum(major, minor) {
        return Err(RuntimeRequirementsError::ApiTooOld {
            found: version.to_string(),
            required: format!("{}.{}", MIN_API_VERSION.0, MIN_API_VERSION.1),
        }
        .into());
    }

    Ok((major, minor))
}

fn meets_minimum(major: u32, minor: u32) -> bool {
    major > MIN_API_VERSION.0 || (major == MIN_API_VERSION.0 && minor >= MIN_API_VERSION.1)
}

/// Parse an API version string into (major, minor).
fn parse_api_version(version: &str) -> Result<(u32, u32)> {
    let read_failed = |what: &str| RuntimeRequirementsError::ReadFailed {
        context: format!("Failed to parse API {what} version: {version}"),
    };

    let (major, minor) = version
        .trim()
        .split_once('.')
        .ok_or_else(|| read_failed("format"))?;

    let major = major.parse::<u32>().map_err(|_| read_failed("major"))?;

    // Tolerate suffixes such as "41-rc1"
    let minor = minor
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap_or_default()
        .parse::<u32>()
        .map_err(|_| read_failed("minor"))?;

    Ok((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_parse_api_version_standard() {
        let (major, minor) = parse_api_version("1.47").expect("should parse");
        assert_eq!(major, 1);
        assert_eq!(minor, 47);
    }

    #[test]
    fn test_parse_api_version_with_suffix() {
        let (major, minor) = parse_api_version("1.41-rc1").expect("should parse");
        assert_eq!(major, 1);
        assert_eq!(minor, 41);
    }

    #[test]
    fn test_parse_api_version_garbage() {
        assert!(parse_api_version("latest").is_err());
        assert!(parse_api_version("1.").is_err());
        assert!(parse_api_version("x.41").is_err());
    }

    #[test]
    fn test_check_api_version_too_old() {
        let result = check_api_version("1.40");
        assert!(
            matches!(
                result,
                Err(Error::RuntimeRequirements(
                    RuntimeRequirementsError::ApiTooOld { .. }
                ))
            ),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn test_check_api_version_accepts_minimum_and_newer() {
        assert_eq!(check_api_version("1.41").expect("minimum accepted"), (1, 41));
        assert_eq!(check_api_version("2.0").expect("newer major accepted"), (2, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_daemon_times_out() {
        let stalled = std::future::pending::<std::result::Result<(), String>>();
        let result = within("ping", Duration::from_secs(5), stalled).await;
        assert!(
            matches!(
                result,
                Err(Error::RuntimeRequirements(RuntimeRequirementsError::Timeout {
                    operation: "ping",
                    ..
                }))
            ),
            "unexpected result: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_daemon_failure_is_unreachable() {
        let refused = async { Err::<(), _>("connection refused") };
        let result = within("version", Duration::from_secs(5), refused).await;
        assert!(
            matches!(
                result,
                Err(Error::RuntimeRequirements(RuntimeRequirementsError::Unreachable { ref reason }))
                    if reason == "connection refused"
            ),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn test_is_satisfied() {
        let reqs = RuntimeRequirements {
            engine_version: "27.3.1".to_string(),
            api_version: "1.47".to_string(),
            api_major: 1,
            api_minor: 47,
            os: "linux".to_string(),
        };
        assert!(reqs.is_satisfied());

        let windows = RuntimeRequirements {
            os: "windows".to_string(),
            ..reqs
        };
        assert!(!windows.is_satisfied());
    }
}
