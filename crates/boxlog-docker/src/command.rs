//! Argument building for docker CLI invocations.

use std::time::Duration;

/// Label attached to every container this crate starts.
pub const MANAGED_LABEL: &str = "io.boxlog.managed=true";

/// Builder for the `docker run` invocation that creates an environment.
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Image reference.
    pub image: String,
    /// Workload argv, already split.
    pub argv: Vec<String>,
}

impl RunArgs {
    /// Create a run invocation for an image and argv.
    #[must_use]
    pub fn new<S: Into<String>>(image: S, argv: Vec<String>) -> Self {
        Self {
            image: image.into(),
            argv,
        }
    }

    /// Build the argument list.
    ///
    /// The container is detached and kept after exit so its logs remain
    /// readable until it is explicitly removed.
    #[must_use]
    pub fn build(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--detach".to_string(),
            "--label".to_string(),
            MANAGED_LABEL.to_string(),
        ];
        // Flag parsing stops at the image; the rest belongs to the workload.
        args.push(self.image.clone());
        args.extend(self.argv.iter().cloned());
        args
    }
}

/// `docker logs --follow <id>`.
#[must_use]
pub fn logs_args(id: &str) -> Vec<String> {
    vec!["logs".into(), "--follow".into(), id.into()]
}

/// `docker stop --time <grace> <id>`.
#[must_use]
pub fn stop_args(id: &str, grace: Duration) -> Vec<String> {
    vec![
        "stop".into(),
        "--time".into(),
        grace.as_secs().to_string(),
        id.into(),
    ]
}

/// `docker rm --force <id>`.
#[must_use]
pub fn remove_args(id: &str) -> Vec<String> {
    vec!["rm".into(), "--force".into(), id.into()]
}
