//! Container runtime requirements validation.
//!
//! This module provides functions to check that the container runtime can
//! host sandboxes before the server starts accepting requests.

mod requirements;

pub use requirements::{
    MIN_API_VERSION, RuntimeRequirements, check_all, check_api_version, check_reachable,
};
