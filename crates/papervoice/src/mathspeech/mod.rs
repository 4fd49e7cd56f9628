//! Math-to-speech conversion via an out-of-process engine.
//!
//! The engine is a scripting runtime, not a library, so each fragment
//! is one bounded sidecar invocation. Conversion failures never fail a
//! job — the assembler substitutes [`MATH_PLACEHOLDER`] instead.

use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::MathSpeechError;

/// Substituted for a fragment whose conversion failed or timed out.
pub const MATH_PLACEHOLDER: &str = "[Mathematical expression]";

/// Default per-fragment conversion timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub trait MathSpeech: Send + Sync {
    /// Converts one math markup fragment to a spoken-language string.
    fn convert(&self, fragment: &str) -> Result<String, MathSpeechError>;
}

/// Runs the configured sidecar command once per fragment, passing the
/// markup on stdin and reading the spoken form from stdout.
pub struct SidecarMathSpeech {
    command: Vec<String>,
    timeout: Duration,
}

impl SidecarMathSpeech {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

impl MathSpeech for SidecarMathSpeech {
    fn convert(&self, fragment: &str) -> Result<String, MathSpeechError> {
        let program = self.command.first().ok_or_else(|| MathSpeechError::Engine {
            detail: "empty engine command".to_string(),
        })?;

        let mut child = Command::new(program)
            .args(&self.command[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MathSpeechError::Spawn {
                command: program.clone(),
                source: e,
            })?;

        // A fragment larger than the pipe buffer blocks the writer until
        // the engine drains it; writing from a helper thread keeps the
        // deadline in charge of the whole invocation.
        let writer = child.stdin.take().map(|mut stdin| {
            let fragment = fragment.to_owned();
            thread::spawn(move || -> std::io::Result<()> {
                stdin.write_all(fragment.as_bytes())
                // Dropping stdin closes the pipe so the engine sees EOF.
            })
        });

        let status = wait_with_deadline(&mut child, self.timeout);

        // The child has exited (or been killed), so the pipe is closed
        // and the writer finishes promptly.
        let write_result = writer.map(|handle| {
            handle
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")))
        });

        let status = status?;
        match write_result {
            // The engine may legitimately exit without draining stdin.
            Some(Err(e)) if e.kind() != ErrorKind::BrokenPipe => return Err(e.into()),
            _ => {}
        }

        // Spoken output is one short sentence; reading after exit cannot
        // back up the pipe.
        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout)?;
        }

        if status.success() {
            Ok(stdout.trim().to_string())
        } else {
            let mut stderr = String::new();
            if let Some(mut err) = child.stderr.take() {
                let _ = err.read_to_string(&mut stderr);
            }
            let detail = if stderr.trim().is_empty() {
                format!("exit status {}", status)
            } else {
                stderr.trim().to_string()
            };
            Err(MathSpeechError::Engine { detail })
        }
    }
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<ExitStatus, MathSpeechError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(MathSpeechError::Timeout {
                secs: timeout.as_secs(),
            });
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}
