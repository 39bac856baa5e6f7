mod progress;
mod styling;

pub use progress::PhaseProgress;

use std::path::Path;

use crate::decision::{BuildDecision, Resolution};
use styling::{bright_green, bright_red, cyan, decision_label, dim, magenta_bold};

/// Prints the docgate banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📚 docgate"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Documentation build gate")
    );
}

/// Prints the decision line to stdout.
///
/// This is the first thing a CI log shows, before any provisioning starts.
pub fn print_decision(resolution: &Resolution) {
    println!(
        "{}: {}",
        decision_label(&resolution.decision),
        resolution.reason
    );
}

/// Prints how the run ended to stderr.
pub fn print_outcome(decision: &BuildDecision, code: i32, log_file: &Path) {
    eprintln!("{}", render_outcome(decision, code, log_file));
}

fn render_outcome(decision: &BuildDecision, code: i32, log_file: &Path) -> String {
    match (decision, code) {
        (BuildDecision::Skip, _) => format!("{} documentation build skipped", cyan("•")),
        (_, 0) => format!(
            "{} documentation built {}",
            bright_green("✓"),
            dim(format!("(log: {})", log_file.display()))
        ),
        (_, code) => format!(
            "{} documentation build failed with exit status {code} {}",
            bright_red("✗"),
            dim(format!("(log: {})", log_file.display()))
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_outcome_skip() {
        let output = render_outcome(&BuildDecision::Skip, 0, Path::new("/tmp/log.txt"));
        assert!(output.contains("skipped"));
        assert!(!output.contains("log.txt"));
    }

    #[test]
    fn test_render_outcome_success_mentions_log() {
        let output = render_outcome(&BuildDecision::Quick, 0, Path::new("/tmp/log.txt"));
        assert!(output.contains("documentation built"));
        assert!(output.contains("/tmp/log.txt"));
    }

    #[test]
    fn test_render_outcome_failure_mentions_status() {
        let output = render_outcome(&BuildDecision::full(), 2, Path::new("/tmp/log.txt"));
        assert!(output.contains("failed with exit status 2"));
        assert!(output.contains("/tmp/log.txt"));
    }
}
