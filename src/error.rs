use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocGateError {
    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Installer download from {url} failed with status {status}")]
    Download { url: String, status: u16 },

    #[error("`{program}` exited with status {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DocGateError>;
