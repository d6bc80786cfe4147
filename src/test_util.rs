//! Shared test double for the `gh` process boundary.

use std::cell::RefCell;

use crate::error::Result;
use crate::gh::{GhClient, GhOutput};

/// One recorded `gh` invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Space-joined argument list.
    pub args: String,
    /// Payload passed on standard input, if any.
    pub input: Option<String>,
}

/// Scripted, recording [`GhClient`] fake.
///
/// Responses are matched by substring against the joined argument list; the
/// first matching rule wins. Unmatched invocations succeed with empty
/// output, which keeps tests focused on the calls they care about.
#[derive(Default)]
pub struct MockGh {
    rules: Vec<(String, GhOutput)>,
    calls: RefCell<Vec<RecordedCall>>,
}

impl MockGh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful response for invocations matching `pattern`.
    pub fn ok(mut self, pattern: &str, stdout: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            GhOutput {
                status: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        ));
        self
    }

    /// Script a failing response for invocations matching `pattern`.
    pub fn fail(mut self, pattern: &str, stderr: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            GhOutput {
                status: 1,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        ));
        self
    }

    /// All invocations recorded so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    /// Joined argument lists of all recorded invocations.
    pub fn call_args(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.args.clone()).collect()
    }

    /// Recorded invocations that would mutate remote state.
    pub fn mutating_calls(&self) -> Vec<String> {
        self.call_args()
            .into_iter()
            .filter(|args| args.contains("-X ") || args.starts_with("repo create"))
            .collect()
    }
}

impl GhClient for MockGh {
    fn try_run(&self, args: &[&str], input: Option<&str>) -> Result<GhOutput> {
        let joined = args.join(" ");
        self.calls.borrow_mut().push(RecordedCall {
            args: joined.clone(),
            input: input.map(str::to_string),
        });
        for (pattern, output) in &self.rules {
            if joined.contains(pattern.as_str()) {
                return Ok(output.clone());
            }
        }
        Ok(GhOutput {
            status: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}
