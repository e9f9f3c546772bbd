//! Subprocess execution with live output relay and timeout support

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

/// Result of a subprocess execution
#[derive(Debug)]
pub struct CommandResult {
    /// Process exit status
    pub status: ExitStatus,

    /// Execution duration
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Relay each line of `reader` to `sink` as soon as it is read
///
/// Lines are split on `\n` with any trailing `\r` removed and decoded
/// lossily; output is not required to be UTF-8. Returns the number of lines
/// relayed. A read error is reported as a single `Scan error` line, after
/// which the rest of the stream is discarded so the writer never sees a
/// closed pipe.
pub async fn stream_lines<R, F>(reader: R, mut sink: F) -> usize
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                sink(&String::from_utf8_lossy(trim_line_ending(&buf)));
                count += 1;
            }
            Err(e) => {
                sink(&format!("Scan error: {}", e));
                let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                break;
            }
        }
    }
    count
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Run `cmd` to completion, logging its stdout and stderr line by line
///
/// The child is killed if this future is dropped before it finishes, which
/// is how a cancelled worker tears down its test process.
pub async fn run_streamed(
    mut cmd: Command,
    label: &str,
    timeout: Option<Duration>,
) -> Result<CommandResult> {
    let start = Instant::now();

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().context("Failed to start process")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("Unable to get process stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("Unable to get process stderr"))?;

    let out_label = label.to_string();
    let stdout_relay = tokio::spawn(async move {
        stream_lines(stdout, |line| info!(package = %out_label, "{}", line)).await
    });
    let err_label = label.to_string();
    let stderr_relay = tokio::spawn(async move {
        stream_lines(stderr, |line| info!(package = %err_label, "{}", line)).await
    });

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status.context("Failed to wait for process")?,
            Err(_) => {
                warn!(package = %label, timeout_secs = limit.as_secs(), "process timed out, killing");
                child.kill().await.context("Failed to kill timed out process")?;
                stdout_relay.abort();
                stderr_relay.abort();
                bail!("timed out after {}s", limit.as_secs());
            }
        },
        None => child.wait().await.context("Failed to wait for process")?,
    };

    // The pipes close when the child exits, so both relays finish here
    stdout_relay.await.context("stdout relay panicked")?;
    stderr_relay.await.context("stderr relay panicked")?;

    Ok(CommandResult {
        status,
        duration: start.elapsed(),
    })
}
