//! Following a container's output with `docker logs --follow`.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use boxlog_core::{OutputChunk, OutputStream, Pipe, error::OutputReadError};
use bytes::Bytes;
use command_group::{AsyncCommandGroup, AsyncGroupChild};
use futures::StreamExt;
use tokio::{io::AsyncReadExt, process::Command, sync::mpsc};
use tokio_stream::wrappers::ReceiverStream;

use crate::command::logs_args;

const READ_BUF: usize = 8 * 1024;

/// Spawn a follower for `id` and expose its output as an ordered stream.
///
/// Chunks are forwarded in arrival order, tagged with the pipe they came
/// from. Dropping the stream kills the follower's process group.
pub fn follow(program: PathBuf, id: String, capacity: usize) -> OutputStream {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        if let Err(e) = pump(&program, &id, &tx).await {
            tracing::debug!(container = %id, error = %e, "Log follower failed");
            let _ = tx.send(Err(e)).await;
        }
    });

    ReceiverStream::new(rx).boxed()
}

async fn pump(
    program: &Path,
    id: &str,
    tx: &mpsc::Sender<Result<OutputChunk, OutputReadError>>,
) -> Result<(), OutputReadError> {
    let mut cmd = Command::new(program);
    cmd.args(logs_args(id))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let child = cmd
        .group_spawn()
        .map_err(|e| OutputReadError::Attach(format!("{}: {e}", program.display())))?;
    let mut child = KillOnDrop(child);

    let mut stdout = child
        .0
        .inner()
        .stdout
        .take()
        .ok_or_else(|| OutputReadError::Attach("stdout not captured".into()))?;
    let mut stderr = child
        .0
        .inner()
        .stderr
        .take()
        .ok_or_else(|| OutputReadError::Attach("stderr not captured".into()))?;

    let mut out_buf = vec![0u8; READ_BUF];
    let mut err_buf = vec![0u8; READ_BUF];
    let (mut out_open, mut err_open) = (true, true);

    while out_open || err_open {
        let chunk = tokio::select! {
            read = stdout.read(&mut out_buf), if out_open => match read {
                Ok(0) => {
                    out_open = false;
                    continue;
                }
                Ok(n) => OutputChunk::stdout(Bytes::copy_from_slice(&out_buf[..n])),
                Err(e) => return Err(OutputReadError::Stream(e.to_string())),
            },
            read = stderr.read(&mut err_buf), if err_open => match read {
                Ok(0) => {
                    err_open = false;
                    continue;
                }
                Ok(n) => OutputChunk::stderr(Bytes::copy_from_slice(&err_buf[..n])),
                Err(e) => return Err(OutputReadError::Stream(e.to_string())),
            },
        };

        if tx.send(Ok(chunk)).await.is_err() {
            // Consumer went away; KillOnDrop reaps the follower.
            return Ok(());
        }
    }

    let status = child
        .0
        .wait()
        .await
        .map_err(|e| OutputReadError::Stream(e.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        Err(OutputReadError::Stream(format!(
            "log follower for {id} exited with {status}"
        )))
    }
}

struct KillOnDrop(AsyncGroupChild);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        // Already-exited followers report an error here; nothing to do.
        let _ = self.0.start_kill();
    }
}
