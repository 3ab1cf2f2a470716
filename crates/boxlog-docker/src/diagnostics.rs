//! Mapping docker CLI diagnostics onto the error taxonomy.

use boxlog_core::error::EnvironmentCreateError;

const DAEMON_UNREACHABLE: &[&str] = &[
    "Cannot connect to the Docker daemon",
    "error during connect",
    "permission denied while trying to connect to the Docker daemon",
];

const IMAGE_MISSING: &[&str] = &[
    "pull access denied",
    "manifest unknown",
    "repository does not exist",
    "invalid reference format",
];

/// Classify the stderr of a failed `docker run`.
#[must_use]
pub fn classify_run_failure(image: &str, stderr: &str) -> EnvironmentCreateError {
    let detail = stderr.trim().to_string();
    if DAEMON_UNREACHABLE.iter().any(|p| stderr.contains(p)) {
        return EnvironmentCreateError::RuntimeUnavailable(detail);
    }
    if IMAGE_MISSING.iter().any(|p| stderr.contains(p))
        || (stderr.contains("Unable to find image") && stderr.contains("not found"))
    {
        return EnvironmentCreateError::ImageNotFound {
            image: image.to_string(),
            detail,
        };
    }
    EnvironmentCreateError::Rejected(detail)
}

/// Whether a teardown failure only says the container is already gone.
#[must_use]
pub fn is_missing_container(stderr: &str) -> bool {
    stderr.contains("No such container")
}

/// The container id printed by `docker run --detach`.
///
/// Pull progress goes to stderr, so the id is the last non-empty stdout line.
#[must_use]
pub fn parse_container_id(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| !l.is_empty())
        .filter(|l| l.chars().all(|c| c.is_ascii_hexdigit()))
}
