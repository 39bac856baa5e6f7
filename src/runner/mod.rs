mod conda;
mod installer;
mod tee;

pub use conda::CondaToolchain;

use log::info;

use crate::decision::BuildDecision;
use crate::error::Result;

/// Which example scripts the gallery renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExampleSelection {
    /// Gallery is not executed.
    Disabled,
    /// Every example is executed.
    All,
    /// Only examples whose path matches the pattern are executed.
    Matching(String),
}

/// One invocation of the documentation generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocInvocation {
    pub target: String,
    pub examples: ExampleSelection,
}

impl DocInvocation {
    /// The invocation a decision calls for, `None` when nothing is built.
    pub fn for_decision(decision: &BuildDecision, target: &str) -> Option<Self> {
        let examples = match decision {
            BuildDecision::Skip => return None,
            BuildDecision::Quick => ExampleSelection::Disabled,
            BuildDecision::Full { pattern: None } => ExampleSelection::All,
            BuildDecision::Full {
                pattern: Some(pattern),
            } => ExampleSelection::Matching(pattern.clone()),
        };

        Some(Self {
            target: target.to_string(),
            examples,
        })
    }

    /// Arguments passed to `make`.
    pub fn make_args(&self) -> Vec<String> {
        // -T prints full tracebacks when sphinx raises
        let sphinx_opts = match self.examples {
            ExampleSelection::Disabled => "SPHINXOPTS=-T -D plot_gallery=0",
            _ => "SPHINXOPTS=-T",
        };

        let mut args = vec![sphinx_opts.to_string(), self.target.clone()];
        if let ExampleSelection::Matching(pattern) = &self.examples {
            args.push(format!("EXAMPLES_PATTERN={pattern}"));
        }
        args
    }
}

/// Provisions the build environment and drives the documentation generator.
pub(crate) trait DocToolchain {
    /// Prepare an isolated environment with the project installed.
    async fn provision(&self) -> Result<()>;

    /// Run the generator and return its exit status.
    async fn run_doc_build(&self, invocation: &DocInvocation) -> Result<i32>;
}

/// Executes a resolved [`BuildDecision`].
pub(crate) struct BuildRunner<'a, T> {
    toolchain: &'a T,
    target: String,
}

impl<'a, T: DocToolchain> BuildRunner<'a, T> {
    pub fn new(toolchain: &'a T, target: impl Into<String>) -> Self {
        Self {
            toolchain,
            target: target.into(),
        }
    }

    /// Run the build for `decision` and return the exit status.
    ///
    /// Nothing is provisioned for [`BuildDecision::Skip`]. Provisioning
    /// errors are returned as errors; a failing generator is reported
    /// through its non-zero status.
    pub async fn run(&self, decision: &BuildDecision) -> Result<i32> {
        let Some(invocation) = DocInvocation::for_decision(decision, &self.target) else {
            info!("Skipping documentation build");
            return Ok(0);
        };

        self.toolchain.provision().await?;

        info!("Building documentation: make {}", invocation.make_args().join(" "));
        self.toolchain.run_doc_build(&invocation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocGateError;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingToolchain {
        calls: RefCell<Vec<String>>,
        fail_provision: bool,
        exit_code: i32,
    }

    impl DocToolchain for RecordingToolchain {
        async fn provision(&self) -> Result<()> {
            self.calls.borrow_mut().push("provision".to_string());
            if self.fail_provision {
                return Err(DocGateError::CommandFailed {
                    program: "conda".to_string(),
                    code: 1,
                    stderr: "PackagesNotFoundError".to_string(),
                });
            }
            Ok(())
        }

        async fn run_doc_build(&self, invocation: &DocInvocation) -> Result<i32> {
            self.calls
                .borrow_mut()
                .push(format!("make {}", invocation.make_args().join(" ")));
            Ok(self.exit_code)
        }
    }

    #[tokio::test]
    async fn test_skip_touches_nothing() {
        let toolchain = RecordingToolchain::default();
        let runner = BuildRunner::new(&toolchain, "html");

        let code = runner.run(&BuildDecision::Skip).await.unwrap();

        assert_eq!(code, 0);
        assert!(toolchain.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_quick_build_disables_gallery() {
        let toolchain = RecordingToolchain::default();
        let runner = BuildRunner::new(&toolchain, "html");

        runner.run(&BuildDecision::Quick).await.unwrap();

        assert_eq!(
            *toolchain.calls.borrow(),
            vec![
                "provision".to_string(),
                "make SPHINXOPTS=-T -D plot_gallery=0 html".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_full_build_runs_all_examples() {
        let toolchain = RecordingToolchain::default();
        let runner = BuildRunner::new(&toolchain, "html");

        runner.run(&BuildDecision::full()).await.unwrap();

        assert_eq!(toolchain.calls.borrow()[1], "make SPHINXOPTS=-T html");
    }

    #[tokio::test]
    async fn test_pattern_build_restricts_examples() {
        let toolchain = RecordingToolchain::default();
        let runner = BuildRunner::new(&toolchain, "html");
        let decision = BuildDecision::Full {
            pattern: Some("examples/plot_a.py|examples/plot_b.py".to_string()),
        };

        runner.run(&decision).await.unwrap();

        assert_eq!(
            toolchain.calls.borrow()[1],
            "make SPHINXOPTS=-T html EXAMPLES_PATTERN=examples/plot_a.py|examples/plot_b.py"
        );
    }

    #[tokio::test]
    async fn test_generator_status_is_propagated() {
        let toolchain = RecordingToolchain {
            exit_code: 2,
            ..RecordingToolchain::default()
        };
        let runner = BuildRunner::new(&toolchain, "html");

        assert_eq!(runner.run(&BuildDecision::Quick).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_provisioning_failure_stops_before_build() {
        let toolchain = RecordingToolchain {
            fail_provision: true,
            ..RecordingToolchain::default()
        };
        let runner = BuildRunner::new(&toolchain, "html");

        let err = runner.run(&BuildDecision::full()).await.unwrap_err();

        assert!(matches!(err, DocGateError::CommandFailed { .. }));
        assert_eq!(*toolchain.calls.borrow(), vec!["provision".to_string()]);
    }

    #[test]
    fn test_invocation_for_skip_is_none() {
        assert!(DocInvocation::for_decision(&BuildDecision::Skip, "html").is_none());
    }

    #[test]
    fn test_invocation_uses_configured_target() {
        let invocation = DocInvocation::for_decision(&BuildDecision::full(), "dirhtml").unwrap();
        assert_eq!(invocation.examples, ExampleSelection::All);
        assert_eq!(invocation.make_args(), vec!["SPHINXOPTS=-T", "dirhtml"]);
    }
}
