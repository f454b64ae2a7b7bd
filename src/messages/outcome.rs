//! Outcome of a store operation run in the background

/// Result of one user-triggered store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpOutcome {
    pub label: &'static str,
    pub result: Result<(), String>,
}

impl OpOutcome {
    pub fn ok(label: &'static str) -> Self {
        OpOutcome {
            label,
            result: Ok(()),
        }
    }

    pub fn failed(label: &'static str, message: impl Into<String>) -> Self {
        OpOutcome {
            label,
            result: Err(message.into()),
        }
    }

    /// One-line description for the status bar
    pub fn describe(&self) -> String {
        match &self.result {
            Ok(()) => format!("{}: done", self.label),
            Err(message) => format!("{} failed: {}", self.label, message),
        }
    }
}
