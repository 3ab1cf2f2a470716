//! Command-line and environment configuration.

use std::time::Duration;

use boxlog_cloudwatch::SinkOptions;
use boxlog_core::{Credentials, ExecutionRequest, LogDestination};
use boxlog_docker::DockerConfig;
use boxlog_session::SessionConfig;
use clap::Parser;

/// Run a Docker container and relay its output to CloudWatch Logs.
#[derive(Debug, Parser)]
#[command(name = "boxlog", version, about)]
pub struct Args {
    /// Name of the Docker image.
    #[arg(long, env = "BOXLOG_DOCKER_IMAGE")]
    pub docker_image: String,

    /// Command to run inside the container.
    #[arg(long, env = "BOXLOG_BASH_COMMAND")]
    pub bash_command: String,

    /// CloudWatch log group name.
    #[arg(long, env = "BOXLOG_CLOUDWATCH_GROUP")]
    pub aws_cloudwatch_group: String,

    /// CloudWatch log stream name.
    #[arg(long, env = "BOXLOG_CLOUDWATCH_STREAM")]
    pub aws_cloudwatch_stream: String,

    /// AWS access key ID.
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub aws_access_key_id: String,

    /// AWS secret access key.
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: String,

    /// AWS region.
    #[arg(long, env = "AWS_REGION")]
    pub aws_region: String,

    /// Custom CloudWatch Logs endpoint.
    #[arg(long, env = "BOXLOG_AWS_ENDPOINT_URL")]
    pub aws_endpoint_url: Option<String>,

    /// Do not create the log group and stream if they are missing.
    #[arg(long)]
    pub no_create_destination: bool,

    /// Docker executable.
    #[arg(long, env = "BOXLOG_DOCKER_BIN", default_value = "docker")]
    pub docker_bin: String,

    /// Seconds to wait for the workload to exit on stop before killing it.
    #[arg(long, default_value_t = 10)]
    pub stop_timeout: u64,

    /// Also send status lines to the log stream.
    #[arg(long)]
    pub mirror_status: bool,

    /// Print a JSON summary of the session on stdout.
    #[arg(long)]
    pub summary_json: bool,
}

impl Args {
    #[must_use]
    pub fn request(&self) -> ExecutionRequest {
        ExecutionRequest::new(&self.docker_image, &self.bash_command)
    }

    #[must_use]
    pub fn destination(&self) -> LogDestination {
        let destination = LogDestination::new(
            &self.aws_cloudwatch_group,
            &self.aws_cloudwatch_stream,
            &self.aws_region,
            Credentials::new(&self.aws_access_key_id, &self.aws_secret_access_key),
        );
        match &self.aws_endpoint_url {
            Some(url) => destination.with_endpoint_url(url),
            None => destination,
        }
    }

    #[must_use]
    pub const fn sink_options(&self) -> SinkOptions {
        SinkOptions {
            create_destination: !self.no_create_destination,
        }
    }

    #[must_use]
    pub fn docker_config(&self) -> DockerConfig {
        DockerConfig::default()
            .with_program(&self.docker_bin)
            .with_stop_timeout(Duration::from_secs(self.stop_timeout))
    }

    #[must_use]
    pub const fn session_config(&self) -> SessionConfig {
        SessionConfig {
            mirror_status: self.mirror_status,
        }
    }
}
