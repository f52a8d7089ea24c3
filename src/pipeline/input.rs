//! Upload sources: read an image from a local path or download it from a URL.
//!
//! The image store only ever sees `(filename, bytes)`. This module produces
//! that pair for the two kinds of source a user can hand the CLI. Only the
//! size limit is enforced here, before anything is read into memory;
//! extension and content checks belong to [`crate::storage::ImageStore::store`].

use crate::error::LabelSheetError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An image ready to be handed to the store.
#[derive(Debug, Clone)]
pub struct UploadSource {
    /// Name as supplied by the source, before sanitising.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL into file name and bytes.
///
/// Sources larger than `max_size` bytes are rejected with
/// [`LabelSheetError::FileTooLarge`] before their body is read.
pub async fn resolve_upload(
    input: &str,
    timeout_secs: u64,
    max_size: usize,
) -> Result<UploadSource, LabelSheetError> {
    if is_url(input) {
        download_url(input, timeout_secs, max_size).await
    } else {
        read_local(Path::new(input), max_size).await
    }
}

fn check_size(size: u64, max: usize) -> Result<(), LabelSheetError> {
    if size > max as u64 {
        return Err(LabelSheetError::FileTooLarge {
            size: usize::try_from(size).unwrap_or(usize::MAX),
            max,
        });
    }
    Ok(())
}

async fn read_local(path: &Path, max_size: usize) -> Result<UploadSource, LabelSheetError> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| LabelSheetError::InvalidFilename {
            filename: path.display().to_string(),
        })?;

    let read_err = |e| LabelSheetError::io(format!("Failed to read '{}'", display_name(path)), e);
    let meta = tokio::fs::metadata(path).await.map_err(read_err)?;
    check_size(meta.len(), max_size)?;
    let bytes = tokio::fs::read(path).await.map_err(read_err)?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(UploadSource { filename, bytes })
}

/// Download a URL and name the result after its last path segment.
async fn download_url(url: &str, timeout_secs: u64, max_size: usize) -> Result<UploadSource, LabelSheetError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LabelSheetError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            LabelSheetError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            LabelSheetError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(LabelSheetError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url).ok_or_else(|| LabelSheetError::InvalidFilename {
        filename: url.to_string(),
    })?;

    // A declared length over the limit is refused without reading the body;
    // the store re-checks the actual size.
    if let Some(len) = response.content_length() {
        check_size(len, max_size)?;
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| LabelSheetError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    info!("Downloaded {} ({} bytes)", filename, bytes.len());
    Ok(UploadSource { filename, bytes })
}

/// Last non-empty path segment of a URL that looks like a file name.
fn extract_filename(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    (!last.is_empty() && last.contains('.')).then(|| last.to_string())
}

/// File name only, so error messages never carry a caller's directory layout.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/a.png"));
        assert!(is_url("http://example.com/a.png"));
        assert!(!is_url("/tmp/a.png"));
        assert!(!is_url("a.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url() {
        assert_eq!(
            extract_filename("https://example.com/img/logo.png?x=1").as_deref(),
            Some("logo.png")
        );
        assert_eq!(extract_filename("https://example.com/"), None);
        assert_eq!(extract_filename("https://example.com/download"), None);
    }

    #[tokio::test]
    async fn reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"bytes").unwrap();

        let upload = resolve_upload(path.to_str().unwrap(), 5, 1024).await.unwrap();
        assert_eq!(upload.filename, "a.png");
        assert_eq!(upload.bytes, b"bytes");
    }

    #[tokio::test]
    async fn missing_local_file_hides_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.png");
        let err = resolve_upload(path.to_str().unwrap(), 5, 1024).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nope.png"), "got: {msg}");
        assert!(!msg.contains(dir.path().to_str().unwrap()), "got: {msg}");
    }

    #[tokio::test]
    async fn oversized_local_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let err = resolve_upload(path.to_str().unwrap(), 5, 1024).await.unwrap_err();
        assert!(
            matches!(err, LabelSheetError::FileTooLarge { size: 2048, max: 1024 }),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn oversized_download_is_refused_from_its_headers() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Announces 10 MiB but never sends a body: only an early refusal
        // returns before the client timeout.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 10485760\r\n\r\n")
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        });

        let url = format!("http://{addr}/big.png");
        let err = resolve_upload(&url, 5, 1024 * 1024).await.unwrap_err();
        assert!(
            matches!(err, LabelSheetError::FileTooLarge { size: 10_485_760, .. }),
            "got: {err:?}"
        );
        server.abort();
    }
}
