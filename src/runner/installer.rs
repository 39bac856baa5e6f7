use log::{debug, info};
use reqwest::Client;
use std::path::Path;
use url::Url;

use crate::error::{DocGateError, Result};

/// Download the Miniconda installer script from `url` into `dest`.
pub(super) async fn download_installer(client: &Client, url: &Url, dest: &Path) -> Result<()> {
    info!("Downloading Miniconda installer from {url}");

    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DocGateError::Download {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await?;
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, &bytes).await?;

    debug!("Wrote {} bytes to {}", bytes.len(), dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_download_installer_writes_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/miniconda/Miniconda3-latest-Linux-x86_64.sh")
            .with_status(200)
            .with_body("#!/bin/sh\necho installing\n")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("cache").join("miniconda.sh");
        let url = Url::parse(&format!(
            "{}/miniconda/Miniconda3-latest-Linux-x86_64.sh",
            server.url()
        ))
        .unwrap();

        download_installer(&Client::new(), &url, &dest).await.unwrap();

        mock.assert_async().await;
        let contents = std::fs::read_to_string(&dest).unwrap();
        assert!(contents.contains("echo installing"));
    }

    #[tokio::test]
    async fn test_download_installer_reports_http_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.sh")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("miniconda.sh");
        let url = Url::parse(&format!("{}/missing.sh", server.url())).unwrap();

        let err = download_installer(&Client::new(), &url, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, DocGateError::Download { status: 404, .. }));
        assert!(!dest.exists());
    }
}
