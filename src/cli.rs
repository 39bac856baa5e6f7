use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::config::Config;
use crate::decision::BuildDecision;
use crate::output;
use crate::resolver::BuildTypeResolver;
use crate::runner::{BuildRunner, CondaToolchain};
use crate::vcs::GitCli;

/// Decides how much documentation to build for a CI commit and builds it.
///
/// Normally run without arguments; every option falls back to the CI
/// environment variable named next to it.
#[derive(Parser)]
#[command(name = "docgate")]
#[command(author, version, about = "Documentation build gate for CI", long_about = None)]
pub struct Cli {
    /// Config file, defaults to ./docgate.{toml,json,yaml,yml} when present
    #[arg(long, env = "DOCGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Commit under test
    #[arg(long, env = "CIRCLE_SHA1")]
    commit: Option<String>,

    /// Pull request reference, unset for branch pushes
    #[arg(long, env = "CI_PULL_REQUEST")]
    pull_request: Option<String>,

    /// Reference pull requests are diffed against
    #[arg(long, env = "DOCGATE_BASE_REF")]
    base_ref: Option<String>,

    /// Miniconda install prefix
    #[arg(long, env = "MINICONDA_PATH")]
    miniconda_path: Option<PathBuf>,

    /// Conda environment name
    #[arg(long, env = "CONDA_ENV_NAME")]
    env_name: Option<String>,

    /// Python version for the environment
    #[arg(long, env = "PYTHON_VERSION")]
    python_version: Option<String>,

    /// Build log location
    #[arg(long, env = "DOCGATE_LOG_FILE")]
    log_file: Option<PathBuf>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Cli {
    /// Build the run configuration: config file first, then overrides.
    ///
    /// `lookup` resolves package pin variables such as `NUMPY_VERSION`.
    pub fn config(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(commit) = non_empty(&self.commit) {
            config.ci.commit = Some(commit);
        }
        if let Some(pull_request) = non_empty(&self.pull_request) {
            config.ci.pull_request = Some(pull_request);
        }
        if let Some(base_ref) = non_empty(&self.base_ref) {
            config.ci.base_ref = base_ref;
        }
        if let Some(path) = &self.miniconda_path {
            config.environment.miniconda_path = path.clone();
        }
        if let Some(env_name) = non_empty(&self.env_name) {
            config.environment.env_name = env_name;
        }
        if let Some(python_version) = non_empty(&self.python_version) {
            config.environment.python_version = Some(python_version);
        }
        if let Some(log_file) = &self.log_file {
            config.docs.log_file = log_file.clone();
        }

        config.apply_version_pins(lookup);
        Ok(config)
    }

    /// Resolve the build type, then run the build. Returns the exit status.
    pub async fn execute(&self) -> Result<i32> {
        let config = self.config(|key| std::env::var(key).ok())?;

        let repository = GitCli::new(config.docs.project_dir.clone(), config.ci.remote.clone());
        let resolver = BuildTypeResolver::new(&repository, &config.docs);
        let pull_request = config.ci.pull_request();

        let resolution = resolver
            .resolve(
                config.ci.commit.as_deref(),
                &config.ci.base_ref,
                pull_request.as_ref(),
            )
            .await;
        output::print_decision(&resolution);

        // Skip exits before any provisioning setting is touched
        if resolution.decision == BuildDecision::Skip {
            output::print_outcome(&resolution.decision, 0, &config.docs.log_file);
            return Ok(0);
        }

        let installer_url = config.environment.installer_url()?;
        let toolchain = CondaToolchain::new(
            installer_url,
            config.environment.clone(),
            config.docs.clone(),
        )?;
        let runner = BuildRunner::new(&toolchain, config.docs.target.clone());

        let code = runner.run(&resolution.decision).await?;
        info!("docgate finished with exit status {code}");
        output::print_outcome(&resolution.decision, code, &config.docs.log_file);

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "docgate",
            "--commit",
            "abc123",
            "--pull-request",
            "https://github.com/org/repo/pull/3",
            "--base-ref",
            "origin/master",
            "--miniconda-path",
            "/opt/conda",
            "--env-name",
            "docs",
            "--python-version",
            "3.12",
            "--log-file",
            "/tmp/docs.log",
        ])
        .unwrap();

        let config = cli.config(no_env).unwrap();
        assert_eq!(config.ci.commit.as_deref(), Some("abc123"));
        assert!(config.ci.pull_request().is_some());
        assert_eq!(config.ci.base_ref, "origin/master");
        assert_eq!(config.environment.miniconda_path, PathBuf::from("/opt/conda"));
        assert_eq!(config.environment.env_name, "docs");
        assert_eq!(config.environment.python_version.as_deref(), Some("3.12"));
        assert_eq!(config.docs.log_file, PathBuf::from("/tmp/docs.log"));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let cli = Cli::try_parse_from(["docgate", "--commit", "", "--pull-request", " "]).unwrap();

        let config = cli.config(no_env).unwrap();
        assert!(config.ci.commit.is_none());
        assert!(config.ci.pull_request().is_none());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            file,
            "[ci]\nbase-ref = \"origin/develop\"\n\n[environment]\nenv-name = \"fromfile\"\n"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli =
            Cli::try_parse_from(["docgate", "--config", path.as_str(), "--env-name", "flag"])
                .unwrap();

        let config = cli.config(no_env).unwrap();
        assert_eq!(config.ci.base_ref, "origin/develop");
        assert_eq!(config.environment.env_name, "flag");
    }

    #[test]
    fn test_version_pins_come_from_lookup() {
        let cli = Cli::try_parse_from(["docgate", "--commit", "abc123"]).unwrap();

        let config = cli
            .config(|key| (key == "SEABORN_VERSION").then(|| "0.13".to_string()))
            .unwrap();
        let seaborn = config
            .environment
            .conda_packages
            .iter()
            .find(|p| p.name == "seaborn")
            .unwrap();
        assert_eq!(seaborn.version.as_deref(), Some("0.13"));
    }

    #[tokio::test]
    async fn test_skip_ignores_provisioning_settings() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("docgate.toml");
        let log_file = dir.path().join("log.txt");
        std::fs::write(
            &config_path,
            "[environment]\ninstaller-url = \"not a url\"\n\n[docs]\nexamples-dir = \"\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "docgate",
            "--config",
            config_path.to_str().unwrap(),
            "--commit",
            "",
            "--log-file",
            log_file.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(cli.execute().await.unwrap(), 0);
        assert!(!log_file.exists());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
