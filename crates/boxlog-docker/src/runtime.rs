//! Docker-backed environment runtime.

use std::{
    collections::HashSet,
    path::PathBuf,
    process::{Output, Stdio},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use boxlog_core::{
    EnvironmentHandle, EnvironmentRuntime, ExecutionRequest, OutputStream,
    error::{EnvironmentCreateError, EnvironmentStopError, OutputReadError},
};
use command_group::AsyncCommandGroup;
use futures::{StreamExt, stream};
use tokio::{process::Command, sync::OnceCell};

use crate::{
    command::{RunArgs, remove_args, stop_args},
    diagnostics::{classify_run_failure, is_missing_container, parse_container_id},
    follower,
    resolve::resolve_executable_path,
};

/// Docker runtime configuration.
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Docker executable, by name or path.
    pub program: String,
    /// Grace period between SIGTERM and SIGKILL on stop.
    pub stop_timeout: Duration,
    /// Output chunks buffered between the follower and the relay.
    pub output_buffer: usize,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            stop_timeout: Duration::from_secs(10),
            output_buffer: 64,
        }
    }
}

impl DockerConfig {
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub const fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }
}

/// Environment runtime driving the `docker` CLI.
pub struct DockerRuntime {
    config: DockerConfig,
    program: OnceCell<PathBuf>,
    consumed: Mutex<HashSet<String>>,
}

impl DockerRuntime {
    /// Create a new runtime. The executable is resolved on first use.
    #[must_use]
    pub fn new(config: DockerConfig) -> Self {
        Self {
            config,
            program: OnceCell::new(),
            consumed: Mutex::new(HashSet::new()),
        }
    }

    async fn resolved_program(&self) -> Option<&PathBuf> {
        self.program
            .get_or_try_init(|| async {
                resolve_executable_path(&self.config.program).await.ok_or(())
            })
            .await
            .ok()
    }

    /// Resolved executable, or the configured name if resolution never ran.
    fn program_path(&self) -> PathBuf {
        self.program
            .get()
            .cloned()
            .unwrap_or_else(|| PathBuf::from(&self.config.program))
    }

    /// Run one docker CLI step to completion.
    ///
    /// The step gets its own process group, so a terminal Ctrl-C is seen by
    /// boxlog and not by a `docker run` still creating the container.
    async fn run(&self, args: &[String]) -> std::io::Result<Output> {
        let mut cmd = Command::new(self.program_path());
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.group_spawn()?.wait_with_output().await
    }

    /// Run a teardown step; a container that is already gone is success.
    async fn teardown_step(&self, id: &str, args: &[String]) -> Result<(), String> {
        let output = self.run(args).await.map_err(|e| e.to_string())?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_missing_container(&stderr) {
            tracing::debug!(container = %id, step = %args[0], "Container already gone");
            return Ok(());
        }
        Err(stderr.trim().to_string())
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new(DockerConfig::default())
    }
}

#[async_trait]
impl EnvironmentRuntime for DockerRuntime {
    async fn create(
        &self,
        request: &ExecutionRequest,
    ) -> Result<EnvironmentHandle, EnvironmentCreateError> {
        let argv = request.argv()?;

        if self.resolved_program().await.is_none() {
            return Err(EnvironmentCreateError::RuntimeUnavailable(format!(
                "executable not found: {}",
                self.config.program
            )));
        }

        let args = RunArgs::new(request.image(), argv).build();
        tracing::debug!(?args, "Starting container");

        let output = self
            .run(&args)
            .await
            .map_err(|e| EnvironmentCreateError::RuntimeUnavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_run_failure(request.image(), &stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let id = parse_container_id(&stdout).ok_or_else(|| {
            EnvironmentCreateError::Rejected(format!(
                "unexpected output from docker run: {}",
                stdout.trim()
            ))
        })?;

        Ok(EnvironmentHandle::new(id))
    }

    fn read_output(&self, handle: &EnvironmentHandle) -> OutputStream {
        let first_read = match self.consumed.lock() {
            Ok(mut consumed) => consumed.insert(handle.id().to_string()),
            Err(e) => {
                let err = OutputReadError::Attach(e.to_string());
                return stream::once(async move { Err(err) }).boxed();
            }
        };
        if !first_read {
            let err = OutputReadError::AlreadyConsumed(handle.id().to_string());
            return stream::once(async move { Err(err) }).boxed();
        }

        follower::follow(
            self.program_path(),
            handle.id().to_string(),
            self.config.output_buffer,
        )
    }

    async fn stop(&self, handle: &EnvironmentHandle) -> Result<(), EnvironmentStopError> {
        let id = handle.id();

        // Removal runs even if stop failed; `rm --force` kills as well.
        let stopped = self
            .teardown_step(id, &stop_args(id, self.config.stop_timeout))
            .await;
        let removed = self.teardown_step(id, &remove_args(id)).await;

        stopped.and(removed).map_err(|detail| EnvironmentStopError {
            id: id.to_string(),
            detail,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runtime_with(program: &str) -> DockerRuntime {
        DockerRuntime::new(DockerConfig::default().with_program(program))
    }

    #[tokio::test]
    async fn test_missing_executable_is_runtime_unavailable() {
        let runtime = runtime_with("/definitely/not/docker");
        let err = runtime
            .create(&ExecutionRequest::new("alpine", "echo hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, EnvironmentCreateError::RuntimeUnavailable(_)));
    }

    #[tokio::test]
    async fn test_invalid_request_fails_before_runtime() {
        let runtime = runtime_with("/definitely/not/docker");
        let err = runtime
            .create(&ExecutionRequest::new("alpine", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, EnvironmentCreateError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_output_is_single_pass() {
        // `true logs --follow abc` exits 0 with no output.
        let runtime = runtime_with("true");
        let handle = EnvironmentHandle::new("abc");

        let first: Vec<_> = runtime.read_output(&handle).collect().await;
        assert!(first.is_empty());

        let second: Vec<_> = runtime.read_output(&handle).collect().await;
        assert!(matches!(
            second.as_slice(),
            [Err(OutputReadError::AlreadyConsumed(id))] if id == "abc"
        ));
    }

    #[tokio::test]
    async fn test_stop_succeeds_when_teardown_commands_succeed() {
        let runtime = runtime_with("true");
        tokio_test::assert_ok!(runtime.stop(&EnvironmentHandle::new("abc")).await);
    }

    #[tokio::test]
    async fn test_stop_failure_is_reported() {
        let runtime = runtime_with("false");
        let err = runtime.stop(&EnvironmentHandle::new("abc")).await.unwrap_err();
        assert_eq!(err.id, "abc");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_cli_steps_run_in_their_own_process_group() {
        use std::{fs, os::unix::fs::PermissionsExt};

        fn process_group(stat: &str) -> &str {
            // pid (comm) state ppid pgrp ...
            stat.rsplit(')').next().unwrap().split_whitespace().nth(2).unwrap()
        }

        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("docker");
        fs::write(&program, "#!/bin/sh\necho $$; cat /proc/$$/stat\n").unwrap();
        fs::set_permissions(&program, fs::Permissions::from_mode(0o755)).unwrap();

        let runtime = runtime_with(program.to_str().unwrap());
        let output = runtime.run(&["run".to_string()]).await.unwrap();
        let stdout = String::from_utf8(output.stdout).unwrap();
        let (pid, stat) = stdout.split_once('\n').unwrap();

        let own = fs::read_to_string("/proc/self/stat").unwrap();
        assert_eq!(process_group(stat), pid.trim());
        assert_ne!(process_group(stat), process_group(&own));
    }

    #[test]
    fn test_default_config() {
        let config = DockerConfig::default().with_stop_timeout(Duration::from_secs(3));
        assert_eq!(config.program, "docker");
        assert_eq!(config.stop_timeout, Duration::from_secs(3));
    }
}
