use std::fmt;

/// The kind of documentation build to run for a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildDecision {
    /// No build at all.
    Skip,
    /// Build the HTML docs without executing example scripts.
    Quick,
    /// Build the HTML docs and render examples, optionally restricted to
    /// those matching `pattern`.
    Full { pattern: Option<String> },
}

impl BuildDecision {
    pub fn full() -> Self {
        Self::Full { pattern: None }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Skip => "SKIP",
            Self::Quick => "QUICK BUILD",
            Self::Full { .. } => "BUILD",
        }
    }
}

/// Marks a build triggered by a pull request rather than a branch push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestContext {
    pub reference: String,
}

impl PullRequestContext {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

/// A decision together with the reason it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub decision: BuildDecision,
    pub reason: String,
}

impl Resolution {
    pub fn new(decision: BuildDecision, reason: impl Into<String>) -> Self {
        Self {
            decision,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.decision.label(), self.reason)
    }
}
