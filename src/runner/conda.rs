use log::{debug, info};
use reqwest::Client;
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

use crate::config::{DocsConfig, EnvironmentConfig};
use crate::error::{DocGateError, Result};
use crate::output::PhaseProgress;

use super::installer::download_installer;
use super::tee::run_teed;
use super::{DocInvocation, DocToolchain};

const PHASES: usize = 4;
const STDERR_TAIL_LINES: usize = 20;

/// [`DocToolchain`] that builds inside a fresh Miniconda environment.
pub struct CondaToolchain {
    client: Client,
    installer_url: Url,
    environment: EnvironmentConfig,
    docs: DocsConfig,
}

impl CondaToolchain {
    pub fn new(installer_url: Url, environment: EnvironmentConfig, docs: DocsConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("docgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DocGateError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            installer_url,
            environment,
            docs,
        })
    }

    fn env_bin(&self) -> PathBuf {
        self.environment.env_prefix().join("bin")
    }

    /// `PATH` with the conda environment activated.
    fn activated_path(&self) -> Result<OsString> {
        let mut entries = vec![
            self.env_bin(),
            self.environment.miniconda_path.join("bin"),
        ];
        if let Some(current) = std::env::var_os("PATH") {
            entries.extend(std::env::split_paths(&current));
        }
        std::env::join_paths(entries)
            .map_err(|e| DocGateError::Config(format!("Cannot build PATH: {e}")))
    }

    fn conda_create_args(&self) -> Vec<String> {
        let env = &self.environment;
        let python = match env.python_version.as_deref() {
            Some(version) => format!("python={version}"),
            None => "python=*".to_string(),
        };

        let mut args = vec![
            "create".to_string(),
            "-n".to_string(),
            env.env_name.clone(),
            "--yes".to_string(),
            "--quiet".to_string(),
            python,
        ];
        args.extend(env.conda_packages.iter().map(|p| p.conda_spec()));
        args
    }

    fn pip_install_args(&self) -> Vec<String> {
        let mut args = vec!["-m", "pip", "install", "--quiet"]
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        args.extend(self.environment.pip_packages.iter().map(|p| p.pip_spec()));
        args
    }

    async fn bootstrap_miniconda(&self) -> Result<()> {
        let prefix = &self.environment.miniconda_path;
        if self.environment.conda_executable().exists() {
            info!("Reusing Miniconda at {}", prefix.display());
            return Ok(());
        }

        let installer = std::env::temp_dir().join("docgate-miniconda.sh");
        download_installer(&self.client, &self.installer_url, &installer).await?;

        let mut command = Command::new("bash");
        command.arg(&installer).arg("-b").arg("-p").arg(prefix);
        run_checked(command, "miniconda installer").await
    }

    async fn create_environment(&self) -> Result<()> {
        let mut command = Command::new(self.environment.conda_executable());
        command.args(self.conda_create_args());
        run_checked(command, "conda create").await?;

        if self.environment.pip_packages.is_empty() {
            return Ok(());
        }

        let mut command = Command::new(self.env_bin().join("python"));
        command
            .args(self.pip_install_args())
            .env("PATH", self.activated_path()?);
        run_checked(command, "pip install").await
    }

    async fn install_project(&self) -> Result<()> {
        let mut command = Command::new(self.env_bin().join("python"));
        command
            .args(["-m", "pip", "install", "--quiet", "-e", "."])
            .current_dir(&self.docs.project_dir)
            .env("PATH", self.activated_path()?);
        run_checked(command, "pip install -e").await
    }
}

impl DocToolchain for CondaToolchain {
    async fn provision(&self) -> Result<()> {
        phase(1, "Bootstrapping Miniconda", self.bootstrap_miniconda()).await?;
        phase(2, "Creating conda environment", self.create_environment()).await?;
        phase(3, "Installing project in development mode", self.install_project()).await
    }

    async fn run_doc_build(&self, invocation: &DocInvocation) -> Result<i32> {
        PhaseProgress::announce(PHASES, PHASES, "Building documentation");

        let mut command = Command::new("make");
        command
            .args(invocation.make_args())
            .current_dir(self.docs.doc_path())
            .env("PATH", self.activated_path()?);

        let code = run_teed(command, &self.docs.log_file).await?;
        info!(
            "Documentation build exited with {code}, log at {}",
            self.docs.log_file.display()
        );
        Ok(code)
    }
}

async fn phase<F>(index: usize, label: &str, step: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let progress = PhaseProgress::start(index, PHASES, label);
    match step.await {
        Ok(()) => {
            progress.finish();
            Ok(())
        }
        Err(e) => {
            progress.fail();
            Err(e)
        }
    }
}

/// Run `command` to completion, failing on a non-zero status.
async fn run_checked(mut command: Command, program: &str) -> Result<()> {
    debug!("Running {program}: {:?}", command.as_std());

    let output = command.stdin(Stdio::null()).output().await?;
    if output.status.success() {
        return Ok(());
    }

    Err(DocGateError::CommandFailed {
        program: program.to_string(),
        code: output.status.code().unwrap_or(1),
        stderr: stderr_tail(&output.stderr),
    })
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
