use std::ffi::OsString;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::codec::CombinationPlan;
use crate::contract::{Invocation, SweepError};

#[cfg(target_os = "macos")]
const LIBRARY_PATH_VAR: &str = "DYLD_LIBRARY_PATH";
#[cfg(not(target_os = "macos"))]
const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ToolOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    #[must_use]
    pub fn status_text(&self) -> String {
        match self.status {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }

    /// Tools disagree about which stream carries their report; parsers see both.
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        text.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.stderr);
        text
    }
}

/// The only way the sweep touches external processes.
pub trait ToolRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<ToolOutput>;
}

impl<R: ToolRunner + ?Sized> ToolRunner for &R {
    fn run(&self, invocation: &Invocation) -> std::io::Result<ToolOutput> {
        (**self).run(invocation)
    }
}

/// Runs invocations as child processes and blocks until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    fn library_path(prefix: &std::path::Path) -> std::io::Result<OsString> {
        let mut dirs = vec![prefix.to_path_buf()];
        if let Some(current) = std::env::var_os(LIBRARY_PATH_VAR) {
            dirs.extend(std::env::split_paths(&current));
        }
        std::env::join_paths(dirs)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<ToolOutput> {
        debug!("running $ {}", invocation.command_line());

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.library_path {
            command.env(LIBRARY_PATH_VAR, Self::library_path(dir)?);
        }

        let start = Instant::now();
        let output = command.output()?;
        let result = ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed: start.elapsed(),
        };
        trace!(
            "{} finished with {} in {:.3}s\nstdout:\n{}\nstderr:\n{}",
            invocation.program.display(),
            result.status_text(),
            result.elapsed.as_secs_f64(),
            result.stdout,
            result.stderr
        );
        Ok(result)
    }
}

/// Wall-clock time of both halves of one combination.
#[derive(Debug, Clone, Copy)]
pub struct RoundTrip {
    pub encode_elapsed: Duration,
    pub decode_elapsed: Duration,
}

/// Encodes the reference and decodes the bitstream back to raw. Decode is
/// not attempted when encode fails.
pub fn encode_and_decode<R: ToolRunner>(
    runner: &R,
    plan: &CombinationPlan,
) -> Result<RoundTrip, SweepError> {
    debug!("[{}] encoding -> {}", plan.codec, plan.encode.output.display());
    let encode = plan.encode.invocation();
    let encoded = run_step(runner, &encode).map_err(|status| SweepError::EncodeFailed {
        command: encode.command_line(),
        status,
    })?;
    debug!("[{}] decoding -> {}", plan.codec, plan.decode.output.display());
    let decode = plan.decode.invocation();
    let decoded = run_step(runner, &decode).map_err(|status| SweepError::DecodeFailed {
        command: decode.command_line(),
        status,
    })?;

    Ok(RoundTrip {
        encode_elapsed: encoded.elapsed,
        decode_elapsed: decoded.elapsed,
    })
}

fn run_step<R: ToolRunner>(runner: &R, invocation: &Invocation) -> Result<ToolOutput, String> {
    match runner.run(invocation) {
        Ok(output) if output.success() => Ok(output),
        Ok(output) => {
            debug!("{}: {}", invocation.program.display(), last_lines(&output.stderr, 5));
            Err(output.status_text())
        }
        Err(err) => Err(format!("spawn error: {err}")),
    }
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(count)..].join(" | ")
}
