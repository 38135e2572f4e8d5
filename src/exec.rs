//! Invocation of the external controller utilities.
//!
//! Each command is a blocking call bounded by a timeout. Stdout is drained on
//! a background thread so the child can never stall on a full pipe, and the
//! bytes are decoded permissively: vendor tools are not reliable about their
//! output encoding.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Default bound on one external command invocation.
pub const CMD_TIMEOUT: Duration = Duration::from_secs(30);

/// A failed invocation of an external command. All variants are fatal to the
/// run; no command is ever retried.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("can't invoke '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("command '{command}' failed with {status}:\n{output}")]
    NonZeroExit {
        command: String,
        status: ExitStatus,
        output: String,
    },
    #[error("command '{command}' timed out:\n{output}")]
    Timeout { command: String, output: String },
    #[error("command '{command}' i/o failure: {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },
}

/// Runs `program` with `args`, capturing its stdout, bounded by `timeout`.
/// On timeout the child is killed and whatever partial output it produced is
/// attached to the error, as it is for a non-zero exit.
pub fn run_command(program: &str, args: &[&str], timeout: Duration) -> Result<String, ExecError> {
    let command = if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    };
    debug!(command = %command, "running external command");
    let started = Instant::now();

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ExecError::Spawn {
            command: command.clone(),
            source,
        })?;

    // Drain stdout concurrently so the child can't block on a full pipe
    // buffer before it exits.
    let reader = child.stdout.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let result = pipe.read_to_end(&mut buf);
            (buf, result)
        })
    });

    let status = wait_with_timeout(&mut child, timeout).map_err(|source| ExecError::Io {
        command: command.clone(),
        source,
    })?;

    let Some(status) = status else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(ExecError::Timeout {
            command,
            output: collect_output(reader),
        });
    };

    let output = collect_output(reader);
    debug!(
        command = %command,
        elapsed_ms = started.elapsed().as_millis() as u64,
        bytes = output.len(),
        "command finished"
    );

    if !status.success() {
        return Err(ExecError::NonZeroExit {
            command,
            status,
            output,
        });
    }
    Ok(output)
}

/// Polls the child until it exits or `timeout` elapses. `None` means the
/// deadline passed with the child still running.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Joins the drain thread and lossily decodes whatever it read.
fn collect_output(reader: Option<JoinHandle<(Vec<u8>, std::io::Result<usize>)>>) -> String {
    let buf = reader
        .and_then(|handle| handle.join().ok())
        .map(|(buf, _)| buf)
        .unwrap_or_default();
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let out = run_command("echo", &["hello"], CMD_TIMEOUT).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_runs_program_without_arguments() {
        let out = run_command("true", &[], CMD_TIMEOUT).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let err = run_command("definitely-not-a-real-binary-0xCAFE", &[], CMD_TIMEOUT).unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn test_non_zero_exit_is_error_with_output() {
        let err = run_command("sh", &["-c", "echo partial; exit 3"], CMD_TIMEOUT).unwrap_err();
        match err {
            ExecError::NonZeroExit { output, .. } => assert_eq!(output.trim(), "partial"),
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout_kills_child() {
        let started = Instant::now();
        let err = run_command("sleep", &["10"], Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
