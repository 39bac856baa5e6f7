use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::decision::PullRequestContext;

/// Configuration for a docgate run.
///
/// Built once at startup from an optional config file, then overridden by
/// the CI environment through the CLI layer. Nothing downstream reads the
/// environment directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// What is being built and against which base
    #[serde(default)]
    pub ci: CiConfig,

    /// Isolated environment provisioning
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Documentation tree and build invocation
    #[serde(default)]
    pub docs: DocsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CiConfig {
    /// Commit under test
    pub commit: Option<String>,

    /// Pull request reference, unset for branch pushes
    pub pull_request: Option<String>,

    /// Reference the pull request is diffed against
    #[serde(default = "default_base_ref")]
    pub base_ref: String,

    /// Remote that `base-ref` is fetched from
    #[serde(default = "default_remote")]
    pub remote: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnvironmentConfig {
    /// Miniconda install prefix
    #[serde(default = "default_miniconda_path")]
    pub miniconda_path: PathBuf,

    /// Name of the conda environment to create
    #[serde(default = "default_env_name")]
    pub env_name: String,

    /// Miniconda installer download location
    #[serde(default = "default_installer_url")]
    pub installer_url: String,

    /// Interpreter version, latest when unset
    pub python_version: Option<String>,

    /// Packages installed with conda when the environment is created
    #[serde(default = "default_conda_packages")]
    pub conda_packages: Vec<PackageSpec>,

    /// Packages installed with pip afterwards
    #[serde(default = "default_pip_packages")]
    pub pip_packages: Vec<PackageSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DocsConfig {
    /// Root of the project installed in development mode
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,

    /// Directory holding the documentation Makefile, relative to `project-dir`
    #[serde(default = "default_doc_dir")]
    pub doc_dir: PathBuf,

    /// Build log written by the documentation generator
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Make target
    #[serde(default = "default_target")]
    pub target: String,

    /// Top-level directory of runnable examples
    #[serde(default = "default_examples_dir")]
    pub examples_dir: String,

    /// Filename prefix of examples rendered into the gallery
    #[serde(default = "default_example_prefix")]
    pub example_prefix: String,
}

/// A named package with an optional version requirement.
///
/// `version` is either a bare version (`"1.2"`, pinned exactly) or a
/// requirement starting with a comparison operator (`">=1.0"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl PackageSpec {
    pub fn new(name: &str, version: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            version: version.map(str::to_string),
        }
    }

    /// Environment variable pinning this package, e.g. `SCIKIT_LEARN_VERSION`.
    pub fn pin_variable(&self) -> String {
        format!("{}_VERSION", self.name.to_uppercase().replace(['-', '.'], "_"))
    }

    pub fn conda_spec(&self) -> String {
        match self.version.as_deref() {
            None => format!("{}=*", self.name),
            Some(v) if starts_with_operator(v) => format!("{}{}", self.name, v),
            Some(v) => format!("{}={}", self.name, v),
        }
    }

    pub fn pip_spec(&self) -> String {
        match self.version.as_deref() {
            None => self.name.clone(),
            Some(v) if starts_with_operator(v) => format!("{}{}", self.name, v),
            Some(v) => format!("{}=={}", self.name, v),
        }
    }
}

fn starts_with_operator(version: &str) -> bool {
    version.starts_with(['<', '>', '=', '!', '~'])
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            commit: None,
            pull_request: None,
            base_ref: default_base_ref(),
            remote: default_remote(),
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            miniconda_path: default_miniconda_path(),
            env_name: default_env_name(),
            installer_url: default_installer_url(),
            python_version: None,
            conda_packages: default_conda_packages(),
            pip_packages: default_pip_packages(),
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            project_dir: default_project_dir(),
            doc_dir: default_doc_dir(),
            log_file: default_log_file(),
            target: default_target(),
            examples_dir: default_examples_dir(),
            example_prefix: default_example_prefix(),
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_base_ref() -> String {
    "origin/main".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_miniconda_path() -> PathBuf {
    home_dir().join("miniconda3")
}

fn default_env_name() -> String {
    "testenv".to_string()
}

fn default_installer_url() -> String {
    "https://repo.anaconda.com/miniconda/Miniconda3-latest-Linux-x86_64.sh".to_string()
}

fn default_conda_packages() -> Vec<PackageSpec> {
    vec![
        PackageSpec::new("numpy", None),
        PackageSpec::new("scipy", None),
        PackageSpec::new("scikit-learn", Some(">=1.0")),
        PackageSpec::new("pandas", None),
        PackageSpec::new("matplotlib", Some(">=3.4")),
        PackageSpec::new("seaborn", None),
        PackageSpec::new("sphinx", None),
        PackageSpec::new("pillow", None),
    ]
}

fn default_pip_packages() -> Vec<PackageSpec> {
    vec![
        PackageSpec::new("sphinx-gallery", None),
        PackageSpec::new("numpydoc", None),
    ]
}

fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_doc_dir() -> PathBuf {
    PathBuf::from("doc")
}

fn default_log_file() -> PathBuf {
    home_dir().join("log.txt")
}

fn default_target() -> String {
    "html".to_string()
}

fn default_examples_dir() -> String {
    "examples".to_string()
}

fn default_example_prefix() -> String {
    "plot_".to_string()
}

impl CiConfig {
    pub fn pull_request(&self) -> Option<PullRequestContext> {
        self.pull_request
            .as_deref()
            .map(str::trim)
            .filter(|reference| !reference.is_empty())
            .map(PullRequestContext::new)
    }
}

impl EnvironmentConfig {
    /// Prefix of the conda environment the docs are built in.
    pub fn env_prefix(&self) -> PathBuf {
        self.miniconda_path.join("envs").join(&self.env_name)
    }

    pub fn conda_executable(&self) -> PathBuf {
        self.miniconda_path.join("bin").join("conda")
    }

    pub fn installer_url(&self) -> Result<Url> {
        Url::parse(&self.installer_url)
            .with_context(|| format!("Invalid installer URL: {}", self.installer_url))
    }
}

impl DocsConfig {
    pub fn doc_path(&self) -> PathBuf {
        self.project_dir.join(&self.doc_dir)
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./docgate.toml
    /// 3. ./docgate.json
    /// 4. ./docgate.yaml
    /// 5. ./docgate.yml
    ///
    /// Returns default configuration if no file is found. A path that was
    /// given explicitly must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["docgate.toml", "docgate.json", "docgate.yaml", "docgate.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Apply `<NAME>_VERSION` pins to every configured package.
    ///
    /// `lookup` is the environment at startup; empty values leave the
    /// package unpinned.
    pub fn apply_version_pins(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let env = &mut self.environment;
        for package in env.conda_packages.iter_mut().chain(env.pip_packages.iter_mut()) {
            let pin = lookup(package.pin_variable().as_str());
            if let Some(version) = pin.filter(|v| !v.trim().is_empty()) {
                package.version = Some(version.trim().to_string());
            }
        }
    }
}
