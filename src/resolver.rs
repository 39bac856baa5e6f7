use log::{debug, info, warn};
use regex::Regex;

use crate::config::DocsConfig;
use crate::decision::{BuildDecision, PullRequestContext, Resolution};
use crate::error::{DocGateError, Result};
use crate::vcs::Repository;

const SKIP_MARKER: &str = "[doc skip]";
const QUICK_MARKER: &str = "[doc quick]";
const BUILD_MARKER: &str = "[doc build]";

/// Decides which kind of documentation build a commit needs.
///
/// Checks run in a fixed order and the first one that matches wins:
/// commit identity, commit message markers, pull request context and
/// finally the set of example scripts touched by the pull request.
/// Inspection failures never abort the run, they fall back to a quick build.
pub(crate) struct BuildTypeResolver<'a, R> {
    repository: &'a R,
    examples_dir: String,
    example_filter: Result<Regex>,
}

impl<'a, R: Repository> BuildTypeResolver<'a, R> {
    /// A misconfigured example layout is only reported once a pull request
    /// diff has to be filtered, so it cannot turn an earlier decision into
    /// a failed run.
    pub fn new(repository: &'a R, docs: &DocsConfig) -> Self {
        let examples_dir = docs.examples_dir.trim_end_matches('/').to_string();
        let example_filter = example_filter(&examples_dir, &docs.example_prefix);

        Self {
            repository,
            examples_dir,
            example_filter,
        }
    }

    pub async fn resolve(
        &self,
        commit: Option<&str>,
        base_ref: &str,
        pull_request: Option<&PullRequestContext>,
    ) -> Resolution {
        let resolution = self.evaluate(commit, base_ref, pull_request).await;
        info!("Resolved build type: {resolution}");
        resolution
    }

    async fn evaluate(
        &self,
        commit: Option<&str>,
        base_ref: &str,
        pull_request: Option<&PullRequestContext>,
    ) -> Resolution {
        let Some(commit) = commit.map(str::trim).filter(|c| !c.is_empty()) else {
            return Resolution::new(BuildDecision::Skip, "undefined commit");
        };

        let message = match self.repository.commit_message(commit).await {
            Ok(message) if !message.trim().is_empty() => message,
            Ok(_) => {
                return Resolution::new(
                    BuildDecision::Quick,
                    format!("empty commit message for {commit}"),
                );
            }
            Err(e) => {
                warn!("Failed to inspect commit {commit}: {e}");
                return Resolution::new(
                    BuildDecision::Quick,
                    format!("failed to inspect commit {commit}"),
                );
            }
        };

        if let Some(resolution) = check_markers(&message) {
            return resolution;
        }

        let Some(pull_request) = pull_request else {
            return Resolution::new(BuildDecision::full(), "not a pull request");
        };
        debug!("Inspecting pull request {}", pull_request.reference);

        self.check_changed_examples(base_ref, commit).await
    }

    async fn check_changed_examples(&self, base_ref: &str, commit: &str) -> Resolution {
        let range = format!("{base_ref}...{commit}");

        let paths = match self.repository.diff_paths(base_ref, commit).await {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Failed to get changed filenames for {range}: {e}");
                return Resolution::new(
                    BuildDecision::Quick,
                    format!("failed to get changed filenames for {range}"),
                );
            }
        };

        if paths.is_empty() {
            return Resolution::new(
                BuildDecision::Quick,
                format!("no changed filenames for {range}"),
            );
        }

        let filter = match &self.example_filter {
            Ok(filter) => filter,
            Err(e) => {
                warn!("Cannot filter changed examples: {e}");
                return Resolution::new(
                    BuildDecision::Quick,
                    format!("no usable example filter for {range}"),
                );
            }
        };

        let examples = changed_examples(filter, &paths);
        if examples.is_empty() {
            debug!("Changed files in {range}: {}", paths.join(" "));
            return Resolution::new(
                BuildDecision::Quick,
                format!("no {}/ filename modified in {range}", self.examples_dir),
            );
        }

        Resolution::new(
            BuildDecision::Full {
                pattern: Some(examples.join("|")),
            },
            format!(
                "detected {}/ filename modified in {range}: {}",
                self.examples_dir,
                examples.join(" ")
            ),
        )
    }
}

fn example_filter(examples_dir: &str, prefix: &str) -> Result<Regex> {
    if examples_dir.is_empty() || prefix.is_empty() {
        return Err(DocGateError::Config(
            "examples directory and example prefix must not be empty".to_string(),
        ));
    }

    // Any depth below the examples directory, but the file name itself
    // has to carry the prefix.
    let pattern = format!(
        "^{}/(?:[^/]+/)*{}[^/]*$",
        regex::escape(examples_dir),
        regex::escape(prefix)
    );
    Regex::new(&pattern)
        .map_err(|e| DocGateError::Config(format!("Invalid example filter: {e}")))
}

fn changed_examples<'p>(filter: &Regex, paths: &'p [String]) -> Vec<&'p str> {
    paths
        .iter()
        .map(String::as_str)
        .filter(|path| filter.is_match(path))
        .collect()
}

fn check_markers(message: &str) -> Option<Resolution> {
    let markers = [
        (SKIP_MARKER, BuildDecision::Skip),
        (QUICK_MARKER, BuildDecision::Quick),
        (BUILD_MARKER, BuildDecision::full()),
    ];

    markers
        .into_iter()
        .find(|(marker, _)| message.contains(marker))
        .map(|(marker, decision)| Resolution::new(decision, format!("{marker} marker found")))
}
