//! Bounded execution of external commands.
//!
//! Every external program we call (the status bar CLI, `osascript`,
//! `killall`) is fire-and-forget from our side, but none of them may hold up
//! the caller for long. Output is discarded.

use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{BridgeError, Result};

const POLL_INTERVAL_MS: u64 = 20;

/// Runs `program args..`, killing it if it outlives `timeout`.
///
/// Returns the exit status when the program finishes in time. A non-zero
/// status is not an error here; callers decide what it means.
pub fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Result<ExitStatus> {
    let describe = || {
        std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| BridgeError::CommandFailed {
            command: describe(),
            details: err.to_string(),
        })?;

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BridgeError::CommandTimedOut {
                        command: describe(),
                        timeout,
                    });
                }
                thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
            }
            Err(err) => {
                return Err(BridgeError::CommandFailed {
                    command: describe(),
                    details: err.to_string(),
                })
            }
        }
    }
}
