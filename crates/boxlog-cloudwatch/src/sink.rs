//! CloudWatch Logs sink.

use std::{
    sync::atomic::{AtomicI64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::{
    Client, Config,
    config::{BehaviorVersion, Credentials as AwsCredentials, Region},
    types::InputLogEvent,
};
use boxlog_core::{
    LogDestination, LogRecord, LogSink,
    error::{SinkAuthError, SinkWriteError},
};

use crate::errors::{ACCESS_DENIED, ALREADY_EXISTS, Failure};

/// Largest message CloudWatch accepts for one event (256 KiB minus overhead).
pub const MAX_MESSAGE_BYTES: usize = 262_144 - 26;

/// Connection options.
#[derive(Debug, Clone)]
pub struct SinkOptions {
    /// Create the log group and stream if they do not exist.
    pub create_destination: bool,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            create_destination: true,
        }
    }
}

/// Log sink that writes one `PutLogEvents` call per record.
pub struct CloudWatchSink {
    client: Client,
    group: String,
    stream: String,
    last_timestamp: AtomicI64,
}

impl CloudWatchSink {
    /// Build a client for `destination` and prepare the group and stream.
    ///
    /// # Errors
    /// Returns `SinkAuthError` if the endpoint refuses the credentials or
    /// cannot be reached.
    pub async fn connect(
        destination: &LogDestination,
        options: SinkOptions,
    ) -> Result<Self, SinkAuthError> {
        let sink = Self::from_client(
            Client::from_conf(client_config(destination)),
            &destination.group,
            &destination.stream,
        );

        if options.create_destination {
            sink.ensure_group().await?;
            sink.ensure_stream().await?;
        }

        tracing::debug!(%destination, "Log destination ready");
        Ok(sink)
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn from_client(client: Client, group: &str, stream: &str) -> Self {
        Self {
            client,
            group: group.to_string(),
            stream: stream.to_string(),
            last_timestamp: AtomicI64::new(0),
        }
    }

    async fn ensure_group(&self) -> Result<(), SinkAuthError> {
        let result = self
            .client
            .create_log_group()
            .log_group_name(&self.group)
            .send()
            .await;
        match result {
            Ok(_) => {
                tracing::info!(group = %self.group, "Created log group");
                Ok(())
            }
            Err(e) => tolerate_setup_failure(&Failure::from_sdk(&e), "log group", &self.group),
        }
    }

    async fn ensure_stream(&self) -> Result<(), SinkAuthError> {
        let result = self
            .client
            .create_log_stream()
            .log_group_name(&self.group)
            .log_stream_name(&self.stream)
            .send()
            .await;
        match result {
            Ok(_) => {
                tracing::info!(stream = %self.stream, "Created log stream");
                Ok(())
            }
            Err(e) => tolerate_setup_failure(&Failure::from_sdk(&e), "log stream", &self.stream),
        }
    }

    /// Milliseconds since the epoch, never earlier than the previous event.
    fn next_timestamp(&self) -> i64 {
        let now = now_millis();
        let previous = self.last_timestamp.fetch_max(now, Ordering::SeqCst);
        now.max(previous)
    }
}

#[async_trait]
impl LogSink for CloudWatchSink {
    async fn append(&self, record: &LogRecord) -> Result<(), SinkWriteError> {
        let text = record.text();
        let message = truncate_message(&text);
        if message.len() < text.len() {
            tracing::warn!(
                sequence = record.sequence,
                original = text.len(),
                kept = message.len(),
                "Record truncated to the CloudWatch event limit"
            );
        }

        let event = InputLogEvent::builder()
            .timestamp(self.next_timestamp())
            .message(message)
            .build()
            .map_err(|e| SinkWriteError::Rejected {
                sequence: record.sequence,
                reason: e.to_string(),
            })?;

        let output = self
            .client
            .put_log_events()
            .log_group_name(&self.group)
            .log_stream_name(&self.stream)
            .log_events(event)
            .send()
            .await
            .map_err(|e| match Failure::from_sdk(&e) {
                Failure::Transport(reason) => SinkWriteError::Transport {
                    sequence: record.sequence,
                    reason,
                },
                service => SinkWriteError::Rejected {
                    sequence: record.sequence,
                    reason: service.to_string(),
                },
            })?;

        if let Some(rejected) = output.rejected_log_events_info() {
            return Err(SinkWriteError::Rejected {
                sequence: record.sequence,
                reason: format!("{rejected:?}"),
            });
        }
        Ok(())
    }
}

fn client_config(destination: &LogDestination) -> Config {
    let credentials = AwsCredentials::new(
        &destination.credentials.access_key_id,
        &destination.credentials.secret_access_key,
        None,
        None,
        "boxlog",
    );
    let mut builder = Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(destination.region.clone()))
        .credentials_provider(credentials);
    if let Some(url) = &destination.endpoint_url {
        builder = builder.endpoint_url(url);
    }
    builder.build()
}

/// Decide whether a failed create call still leaves a usable destination.
fn tolerate_setup_failure(
    failure: &Failure,
    kind: &str,
    name: &str,
) -> Result<(), SinkAuthError> {
    match failure {
        Failure::Service { code, .. } if code == ALREADY_EXISTS => Ok(()),
        Failure::Service { code, .. } if code == ACCESS_DENIED => {
            // Valid credentials without create permission; the target may exist.
            tracing::warn!(%kind, %name, "Not allowed to create {kind}, assuming it exists");
            Ok(())
        }
        Failure::Service { code, message } if failure.is_auth() => Err(SinkAuthError::Rejected {
            code: code.clone(),
            message: message.clone(),
        }),
        Failure::Service { code, message } => Err(SinkAuthError::Setup {
            code: code.clone(),
            message: message.clone(),
        }),
        Failure::Transport(reason) => Err(SinkAuthError::Unreachable(reason.clone())),
    }
}

/// Cut a message to `MAX_MESSAGE_BYTES` on a char boundary.
#[must_use]
pub fn truncate_message(text: &str) -> &str {
    if text.len() <= MAX_MESSAGE_BYTES {
        return text;
    }
    let mut end = MAX_MESSAGE_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use boxlog_core::Credentials;
    use bytes::Bytes;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        task::JoinHandle,
    };

    use super::*;

    fn destination() -> LogDestination {
        LogDestination::new(
            "group",
            "stream",
            "us-east-1",
            Credentials::new("AKIDEXAMPLE", "secret"),
        )
    }

    async fn sink_at(endpoint: &str) -> CloudWatchSink {
        CloudWatchSink::connect(
            &destination().with_endpoint_url(endpoint),
            SinkOptions {
                create_destination: false,
            },
        )
        .await
        .unwrap()
    }

    /// Answer one request with a canned response; resolves to the request body.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/x-amz-json-1.1\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });
        (endpoint, server)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending a full request");
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let length = text[..head_end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + length {
                return String::from_utf8_lossy(&buf[head_end + 4..]).into_owned();
            }
        }
    }

    fn record(sequence: u64, text: &str) -> LogRecord {
        LogRecord::new(sequence, Bytes::from(text.to_string()))
    }

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(truncate_message("hello"), "hello");
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        // Three-byte chars never line up with the limit.
        let text = "€".repeat(MAX_MESSAGE_BYTES);
        let cut = truncate_message(&text);
        assert!(cut.len() <= MAX_MESSAGE_BYTES);
        assert!(cut.len() > MAX_MESSAGE_BYTES - 3);
        assert!(cut.chars().all(|c| c == '€'));
    }

    #[test]
    fn test_setup_failure_policy() {
        let exists = Failure::Service {
            code: ALREADY_EXISTS.into(),
            message: String::new(),
        };
        assert!(tolerate_setup_failure(&exists, "log group", "g").is_ok());

        let denied = Failure::Service {
            code: ACCESS_DENIED.into(),
            message: String::new(),
        };
        assert!(tolerate_setup_failure(&denied, "log group", "g").is_ok());

        let bad_key = Failure::Service {
            code: "UnrecognizedClientException".into(),
            message: "The security token included in the request is invalid.".into(),
        };
        assert!(matches!(
            tolerate_setup_failure(&bad_key, "log group", "g"),
            Err(SinkAuthError::Rejected { code, .. }) if code == "UnrecognizedClientException"
        ));

        let throttled = Failure::Service {
            code: "ThrottlingException".into(),
            message: "Rate exceeded".into(),
        };
        assert!(matches!(
            tolerate_setup_failure(&throttled, "log stream", "s"),
            Err(SinkAuthError::Setup { code, .. }) if code == "ThrottlingException"
        ));

        assert!(matches!(
            tolerate_setup_failure(&Failure::Transport("dns".into()), "log stream", "s"),
            Err(SinkAuthError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_timestamps_never_go_backwards() {
        let config = client_config(&destination());
        let sink = CloudWatchSink::from_client(Client::from_conf(config), "group", "stream");
        sink.last_timestamp.store(i64::MAX - 1, Ordering::SeqCst);
        assert_eq!(sink.next_timestamp(), i64::MAX - 1);
        assert!(sink.next_timestamp() >= i64::MAX - 1);
    }

    #[tokio::test]
    async fn test_append_to_unreachable_endpoint_is_transport_error() {
        let sink = sink_at("http://127.0.0.1:9").await;
        let err = sink.append(&record(7, "hello")).await.unwrap_err();
        assert!(matches!(err, SinkWriteError::Transport { sequence: 7, .. }));
    }

    #[tokio::test]
    async fn test_append_sends_one_event() {
        let (endpoint, server) = serve_once("200 OK", "{}").await;
        let sink = sink_at(&endpoint).await;

        sink.append(&record(0, "hello")).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.contains(r#""logGroupName":"group""#));
        assert!(request.contains(r#""logStreamName":"stream""#));
        assert!(request.contains(r#""message":"hello""#));
    }

    #[tokio::test]
    async fn test_service_error_rejects_record() {
        let (endpoint, server) = serve_once(
            "400 Bad Request",
            r#"{"__type":"ResourceNotFoundException","message":"The specified log stream does not exist."}"#,
        )
        .await;
        let sink = sink_at(&endpoint).await;

        let err = sink.append(&record(3, "hello")).await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(
            err,
            SinkWriteError::Rejected { sequence: 3, ref reason }
                if reason.contains("ResourceNotFoundException")
        ));
    }

    #[tokio::test]
    async fn test_rejected_event_info_rejects_record() {
        let (endpoint, server) =
            serve_once("200 OK", r#"{"rejectedLogEventsInfo":{"tooOldLogEventEndIndex":1}}"#)
                .await;
        let sink = sink_at(&endpoint).await;

        let err = sink.append(&record(5, "hello")).await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, SinkWriteError::Rejected { sequence: 5, .. }));
    }

    #[tokio::test]
    async fn test_oversized_record_is_truncated_before_send() {
        let (endpoint, server) = serve_once("200 OK", "{}").await;
        let sink = sink_at(&endpoint).await;
        let text = "x".repeat(MAX_MESSAGE_BYTES + 100);

        sink.append(&record(0, &text)).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.contains(&"x".repeat(MAX_MESSAGE_BYTES)));
        assert!(!request.contains(&"x".repeat(MAX_MESSAGE_BYTES + 1)));
    }

    #[tokio::test]
    async fn test_connect_without_creation_is_lazy() {
        let sink = CloudWatchSink::connect(
            &destination().with_endpoint_url("http://127.0.0.1:9"),
            SinkOptions {
                create_destination: false,
            },
        )
        .await;
        assert!(sink.is_ok());
    }
}
