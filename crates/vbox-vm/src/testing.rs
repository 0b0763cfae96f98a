//! In-memory command runners for tests.
//!
//! Enabled for this crate's own tests and, through the `test-util` feature,
//! for downstream crates that want to exercise lifecycle logic without a
//! VirtualBox installation.

use crate::error::{Result, VmError};
use crate::executor::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
enum Scripted {
    Output(CommandOutput),
    Failure(String),
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runner with canned responses keyed by subcommand (`showvminfo`, `list`, ...).
///
/// Responses for a subcommand are served in order; the last one repeats once
/// the queue is drained. Subcommands with no script succeed with empty output.
/// Every invocation is recorded.
#[derive(Debug, Default)]
pub struct MockRunner {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MockRunner {
    /// Create a runner with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response for `subcommand`.
    pub fn with_output(self, subcommand: &str, stdout: impl Into<String>) -> Self {
        self.push(subcommand, Scripted::Output(CommandOutput::stdout(stdout)));
        self
    }

    /// Queue a failing response for `subcommand` with the given stderr.
    pub fn with_failure(self, subcommand: &str, stderr: impl Into<String>) -> Self {
        self.push(subcommand, Scripted::Failure(stderr.into()));
        self
    }

    fn push(&self, subcommand: &str, response: Scripted) {
        lock(&self.scripts)
            .entry(subcommand.to_string())
            .or_default()
            .push_back(response);
    }

    /// Every recorded invocation, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        lock(&self.calls).clone()
    }

    /// Number of invocations of `subcommand`.
    pub fn call_count(&self, subcommand: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.first().map(String::as_str) == Some(subcommand))
            .count()
    }

    /// Number of invocations whose arguments equal `args` exactly.
    pub fn count_exact(&self, args: &[&str]) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.iter().map(String::as_str).eq(args.iter().copied()))
            .count()
    }

    /// Check if no invocation was made at all.
    pub fn is_untouched(&self) -> bool {
        lock(&self.calls).is_empty()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, args: &[String]) -> Result<CommandOutput> {
        lock(&self.calls).push(args.to_vec());

        let subcommand = args.first().map(String::as_str).unwrap_or_default();
        let response = {
            let mut scripts = lock(&self.scripts);
            match scripts.get_mut(subcommand) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match response {
            Some(Scripted::Output(out)) => Ok(out),
            Some(Scripted::Failure(stderr)) => Err(VmError::Command {
                command: args.join(" "),
                code: Some(1),
                stderr,
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}

/// Runner that fails every invocation with the same stderr.
#[derive(Debug)]
pub struct FailingRunner {
    stderr: String,
    calls: AtomicUsize,
}

impl FailingRunner {
    /// Create a runner failing with `stderr`.
    pub fn new(stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of invocations attempted.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for FailingRunner {
    async fn run(&self, args: &[String]) -> Result<CommandOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(VmError::Command {
            command: args.join(" "),
            code: Some(1),
            stderr: self.stderr.clone(),
        })
    }
}
