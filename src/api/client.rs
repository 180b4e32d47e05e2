use std::path::{Path, PathBuf};

use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::Client;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use super::models::FetchConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Server rejected download: {0}")]
    Status(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Clone)]
pub struct FetchClient {
    client: Client,
}

impl FetchClient {
    pub fn new(config: FetchConfig) -> Self {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Start a download and return (total_size, body stream)
    pub async fn download_file_stream(
        &self,
        download_url: &str,
    ) -> Result<(Option<u64>, impl Stream<Item = Result<bytes::Bytes>>)> {
        let response = self
            .client
            .get(download_url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| FetchError::Status(e.to_string()))?;

        let total_size = response.content_length();
        let stream = response.bytes_stream().map_err(FetchError::RequestError);

        Ok((total_size, stream))
    }

    /// Stream `download_url` into `path`, returning the bytes written.
    ///
    /// The body lands in a sibling `.part` file that is renamed into place once
    /// complete, so a failed transfer never leaves a truncated image behind.
    pub async fn fetch_to_file(&self, download_url: &str, path: &Path) -> Result<u64> {
        let (total, stream) = self.download_file_stream(download_url).await?;
        let partial = partial_path(path);

        let result: Result<u64> = async {
            let downloaded = write_stream(stream, &partial).await?;
            tokio::fs::rename(&partial, path).await?;
            Ok(downloaded)
        }
        .await;

        match result {
            Ok(downloaded) => {
                tracing::debug!(
                    "Fetched {} bytes (expected {:?}) into {}",
                    downloaded,
                    total,
                    path.display()
                );
                Ok(downloaded)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            "Could not remove partial download {}: {}",
                            partial.display(),
                            cleanup
                        );
                    }
                }
                Err(e)
            }
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn write_stream(
    stream: impl Stream<Item = Result<bytes::Bytes>>,
    path: &Path,
) -> Result<u64> {
    let mut stream = Box::pin(stream);
    let mut file = tokio::fs::File::create(path).await?;
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }
    file.sync_all().await?;
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetches_body_into_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/cat.png")
            .with_status(200)
            .with_body("not really a png")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        let client = FetchClient::new(FetchConfig::default());
        let written = client
            .fetch_to_file(&format!("{}/cat.png", server.url()), &path)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(written, 16);
        assert_eq!(std::fs::read(&path).unwrap(), b"not really a png");
    }

    #[tokio::test]
    async fn reports_http_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.png")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = FetchClient::new(FetchConfig::default());
        let err = client
            .fetch_to_file(
                &format!("{}/missing.png", server.url()),
                &dir.path().join("missing.png"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(_)));
        assert!(!dir.path().join("missing.png").exists());
    }

    #[tokio::test]
    async fn failed_transfer_leaves_no_file_behind() {
        use std::io::Write;

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/cut.png")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(b"first half")?;
                Err(std::io::Error::other("connection dropped"))
            })
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.png");
        let client = FetchClient::new(FetchConfig::default());
        let result = client
            .fetch_to_file(&format!("{}/cut.png", server.url()), &path)
            .await;

        assert!(result.is_err());
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[tokio::test]
    async fn failed_rename_removes_partial_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/busy.png")
            .with_body("bytes")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        // A directory already sits where the image should land
        let path = dir.path().join("busy.png");
        std::fs::create_dir(&path).unwrap();
        let client = FetchClient::new(FetchConfig::default());
        let err = client
            .fetch_to_file(&format!("{}/busy.png", server.url()), &path)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Io(_)));
        assert!(path.is_dir());
        assert!(!partial_path(&path).exists());
    }
}
