use log::warn;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Run `command`, copying its stdout and stderr line by line to both the
/// console and `log_path`.
///
/// Returns the command's own exit status; a process killed by a signal
/// reports 1. The log is flushed before returning, even when the command
/// fails.
pub(super) async fn run_teed(command: Command, log_path: &Path) -> io::Result<i32> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut log = BufWriter::new(tokio::fs::File::create(log_path).await?);
    let mut console = tokio::io::stdout();

    tee_into(command, &mut log, &mut console).await
}

/// Like [`run_teed`] over arbitrary writers. If copying fails the child is
/// killed and reaped before the error is returned.
async fn tee_into<L, C>(mut command: Command, log: &mut L, console: &mut C) -> io::Result<i32>
where
    L: AsyncWrite + Unpin,
    C: AsyncWrite + Unpin,
{
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr not captured"))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let stdout_task = tokio::spawn(forward_lines(stdout, tx.clone()));
    let stderr_task = tokio::spawn(forward_lines(stderr, tx));

    if let Err(e) = copy_lines(&mut rx, log, console).await {
        stdout_task.abort();
        stderr_task.abort();
        if let Err(kill_err) = child.kill().await {
            warn!("Failed to stop documentation build: {kill_err}");
        }
        return Err(e);
    }

    stdout_task.await.map_err(io::Error::other)??;
    stderr_task.await.map_err(io::Error::other)??;

    let status = child.wait().await?;
    Ok(status.code().unwrap_or(1))
}

// Single writer for both streams
async fn copy_lines<L, C>(
    rx: &mut mpsc::UnboundedReceiver<Vec<u8>>,
    log: &mut L,
    console: &mut C,
) -> io::Result<()>
where
    L: AsyncWrite + Unpin,
    C: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        log.write_all(&line).await?;
        if let Err(e) = console.write_all(&line).await {
            // Keep what was logged so far
            let _ = log.flush().await;
            return Err(e);
        }
    }
    log.flush().await?;
    console.flush().await
}

async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<Vec<u8>>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let mut line = Vec::new();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        if tx.send(line).is_err() {
            return Ok(());
        }
    }
}
