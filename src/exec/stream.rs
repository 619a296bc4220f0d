//! Line-streaming executor.
//!
//! Runs an external process, merges its stdout and stderr, and hands every
//! output line to a caller-supplied sink as soon as it is read. The call only
//! returns once both streams are drained to end-of-stream and the process has
//! been reaped.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ExecError;

use super::cancel::{CancellationReason, CancellationToken};
use super::command::Invocation;

/// Lines buffered between the pipe readers and the sink.
const LINE_CHANNEL_CAPACITY: usize = 64;

/// Executor delivering combined process output line by line.
#[derive(Debug, Clone, Default)]
pub struct LineExecutor {
    /// Optional deadline for each run.
    timeout: Option<Duration>,
    /// Token that aborts in-flight runs.
    cancellation: CancellationToken,
}

/// How a run ended before exit-status inspection.
enum Outcome {
    Finished(Result<ExitStatus, ExecError>),
    Cancelled(CancellationReason),
    TimedOut,
}

impl LineExecutor {
    /// Creates an executor with no deadline and no cancellation.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: None,
            cancellation: CancellationToken::none(),
        }
    }

    /// Sets a deadline applied to every run.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Binds runs to a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Runs `invocation`, calling `sink` once per output line, in order.
    ///
    /// # Errors
    ///
    /// - [`ExecError::Launch`] if the process cannot be started; no line is delivered.
    /// - [`ExecError::Execution`] if it exits unsuccessfully, after every line was delivered.
    /// - [`ExecError::Cancelled`] / [`ExecError::TimedOut`] if aborted; the process is killed.
    /// - [`ExecError::Io`] if reading output or waiting fails.
    pub async fn run<F>(&self, invocation: &Invocation, mut sink: F) -> Result<(), ExecError>
    where
        F: FnMut(&str),
    {
        let command_line = invocation.to_string();
        debug!("running {command_line}");

        let mut command = invocation.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ExecError::Launch {
            command: command_line.clone(),
            source,
        })?;

        let (tx, mut rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, tx.clone());
        }
        drop(tx);

        // The channel closes once both readers hit end-of-stream.
        let drain = async {
            let mut count = 0usize;
            while let Some(line) = rx.recv().await {
                let line = line.map_err(|source| ExecError::Io {
                    command: command_line.clone(),
                    source,
                })?;
                count += 1;
                debug!("cmd: {command_line}, line {count}: output: {line}");
                sink(&line);
            }
            child.wait().await.map_err(|source| ExecError::Io {
                command: command_line.clone(),
                source,
            })
        };

        let outcome = tokio::select! {
            result = drain => Outcome::Finished(result),
            reason = self.cancellation.cancelled() => Outcome::Cancelled(reason),
            () = sleep_or_forever(self.timeout) => Outcome::TimedOut,
        };

        match outcome {
            Outcome::Finished(Ok(status)) if status.success() => {
                debug!("{command_line} finished successfully");
                Ok(())
            }
            Outcome::Finished(Ok(status)) => Err(ExecError::Execution {
                command: command_line,
                code: status.code(),
            }),
            Outcome::Finished(Err(e)) => {
                terminate(&mut child, &command_line).await;
                Err(e)
            }
            Outcome::Cancelled(reason) => {
                warn!("cancelling {command_line}: {reason:?}");
                terminate(&mut child, &command_line).await;
                Err(ExecError::Cancelled {
                    command: command_line,
                })
            }
            Outcome::TimedOut => {
                warn!("{command_line} exceeded its deadline");
                terminate(&mut child, &command_line).await;
                Err(ExecError::TimedOut {
                    command: command_line,
                    timeout_secs: self.timeout.map_or(0, |d| d.as_secs()),
                })
            }
        }
    }

    /// Runs `invocation` and returns its combined output, one `\n`-terminated line per output line.
    ///
    /// # Errors
    ///
    /// Same as [`LineExecutor::run`].
    pub async fn run_collect(&self, invocation: &Invocation) -> Result<String, ExecError> {
        let mut output = String::new();
        self.run(invocation, |line| {
            output.push_str(line);
            output.push('\n');
        })
        .await?;
        Ok(output)
    }
}

/// Forwards lines from one pipe into the shared channel until end-of-stream.
fn spawn_reader<R>(reader: R, tx: mpsc::Sender<io::Result<String>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(decode_line(&buf))).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    break;
                }
            }
        }
    });
}

/// Strips the line terminator and decodes lossily.
fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

async fn sleep_or_forever(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

async fn terminate(child: &mut Child, command_line: &str) {
    if let Err(e) = child.kill().await {
        debug!("failed to kill {command_line}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CancellationSource;
    use std::time::Instant;

    fn sh(script: &str) -> Invocation {
        Invocation::new("sh").args(["-c", script])
    }

    #[tokio::test]
    async fn test_delivers_every_line_in_order() {
        let executor = LineExecutor::new();
        let mut lines = Vec::new();

        executor
            .run(&sh("for i in 1 2 3 4 5; do echo line-$i; done"), |line| {
                lines.push(line.to_string());
            })
            .await
            .unwrap();

        assert_eq!(lines, ["line-1", "line-2", "line-3", "line-4", "line-5"]);
    }

    #[tokio::test]
    async fn test_failure_after_output_is_execution_error() {
        let executor = LineExecutor::new();
        let mut lines = Vec::new();

        let result = executor
            .run(&sh("echo one; echo two; echo three; exit 1"), |line| {
                lines.push(line.to_string());
            })
            .await;

        assert_eq!(lines, ["one", "two", "three"]);
        match result {
            Err(ExecError::Execution { code, .. }) => assert_eq!(code, Some(1)),
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stderr_is_merged() {
        let executor = LineExecutor::new();
        let mut lines = Vec::new();

        executor
            .run(&sh("echo out; echo err >&2"), |line| lines.push(line.to_string()))
            .await
            .unwrap();

        lines.sort();
        assert_eq!(lines, ["err", "out"]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let executor = LineExecutor::new();
        let mut calls = 0;

        let result = executor
            .run(&Invocation::new("manifest-diff-no-such-binary"), |_| calls += 1)
            .await;

        assert!(matches!(result, Err(ExecError::Launch { .. })));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_unterminated_and_crlf_lines() {
        let executor = LineExecutor::new();
        let mut lines = Vec::new();

        executor
            .run(&sh("printf 'a\\r\\nb\\n\\nlast'"), |line| lines.push(line.to_string()))
            .await
            .unwrap();

        assert_eq!(lines, ["a", "b", "", "last"]);
    }

    #[tokio::test]
    async fn test_lines_arrive_before_exit() {
        let executor = LineExecutor::new();
        let start = Instant::now();
        let mut first_seen = None;

        executor
            .run(&sh("echo first; sleep 1; echo second"), |_| {
                if first_seen.is_none() {
                    first_seen = Some(start.elapsed());
                }
            })
            .await
            .unwrap();

        let total = start.elapsed();
        let first = first_seen.unwrap();
        assert!(total >= Duration::from_secs(1));
        assert!(first + Duration::from_millis(500) < total);
    }

    #[tokio::test]
    async fn test_deadline_kills_process() {
        let executor = LineExecutor::new().with_timeout(Some(Duration::from_millis(200)));
        let start = Instant::now();

        let result = executor.run(&sh("sleep 10"), |_| {}).await;

        assert!(matches!(result, Err(ExecError::TimedOut { .. })));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancellation_kills_process() {
        let source = CancellationSource::new();
        let executor = LineExecutor::new().with_cancellation(source.token());
        source.cancel(CancellationReason::UserCancel);

        let result = executor.run(&sh("sleep 10"), |_| {}).await;

        assert!(matches!(result, Err(ExecError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_run_collect_joins_lines() {
        let executor = LineExecutor::new();
        let output = executor.run_collect(&sh("echo a; echo b")).await.unwrap();
        assert_eq!(output, "a\nb\n");
    }
}
