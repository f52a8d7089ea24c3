//! On-disk image store.
//!
//! [`ImageStore`] owns one upload directory. Build it once at startup from a
//! [`StorageConfig`], call [`ImageStore::reset_to_defaults`] if the process
//! should start from the bundled sample images, and share it (`&ImageStore`
//! or `Arc<ImageStore>`) with every compile.
//!
//! Uploads are checked here, at the boundary: the name is sanitised, the
//! extension must be png/jpg/jpeg, the size must fit the configured maximum
//! and the bytes must actually decode as PNG or JPEG. The compiler only reads.

use crate::config::{StorageConfig, ALLOWED_EXTENSIONS};
use crate::error::LabelSheetError;
use crate::pipeline::input::resolve_upload;
use crate::placement::is_safe_filename;
use image::ImageFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Image directory service.
#[derive(Debug, Clone)]
pub struct ImageStore {
    config: StorageConfig,
}

impl ImageStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn images_dir(&self) -> &Path {
        &self.config.images_dir
    }

    /// Wipe the upload directory and repopulate it from the defaults directory.
    ///
    /// Returns the names copied, sorted. A missing defaults directory is not
    /// an error: the store is left empty and a warning is logged.
    pub async fn reset_to_defaults(&self) -> Result<Vec<String>, LabelSheetError> {
        let images_dir = &self.config.images_dir;
        match tokio::fs::remove_dir_all(images_dir).await {
            Ok(()) => debug!("Cleared {}", images_dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(LabelSheetError::io("Failed to clear images folder", e)),
        }
        tokio::fs::create_dir_all(images_dir)
            .await
            .map_err(|e| LabelSheetError::io("Failed to create images folder", e))?;

        let defaults_dir = &self.config.defaults_dir;
        let names = match list_allowed(defaults_dir).await {
            Ok(names) => names,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Default images folder does not exist: {}", defaults_dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(LabelSheetError::io("Failed to read default images folder", e)),
        };

        for name in &names {
            tokio::fs::copy(defaults_dir.join(name), images_dir.join(name))
                .await
                .map_err(|e| LabelSheetError::io(format!("Failed to copy default image '{name}'"), e))?;
            info!("Copied default image: {}", name);
        }
        Ok(names)
    }

    /// Validate and save an upload. Returns the sanitised name it was stored
    /// under; an existing file with that name is replaced.
    pub async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String, LabelSheetError> {
        let name = secure_filename(filename);
        if name.is_empty() || !is_safe_filename(&name) {
            return Err(LabelSheetError::InvalidFilename {
                filename: filename.to_string(),
            });
        }
        if !has_allowed_extension(&name) {
            return Err(LabelSheetError::UnsupportedExtension { filename: name });
        }
        if bytes.len() > self.config.max_file_size {
            return Err(LabelSheetError::FileTooLarge {
                size: bytes.len(),
                max: self.config.max_file_size,
            });
        }
        match image::guess_format(bytes) {
            Ok(ImageFormat::Png) | Ok(ImageFormat::Jpeg) => {}
            _ => return Err(LabelSheetError::NotAnImage { filename: name }),
        }

        tokio::fs::create_dir_all(&self.config.images_dir)
            .await
            .map_err(|e| LabelSheetError::io("Failed to create images folder", e))?;
        tokio::fs::write(self.config.images_dir.join(&name), bytes)
            .await
            .map_err(|e| LabelSheetError::io(format!("Failed to save '{name}'"), e))?;

        info!("File uploaded successfully: {}", name);
        Ok(name)
    }

    /// Upload from a local path or an HTTP(S) URL.
    pub async fn import(&self, source: &str) -> Result<String, LabelSheetError> {
        let upload = resolve_upload(
            source,
            self.config.download_timeout_secs,
            self.config.max_file_size,
        )
        .await?;
        self.store(&upload.filename, &upload.bytes).await
    }

    /// Bytes of a stored image.
    pub async fn retrieve(&self, filename: &str) -> Result<Vec<u8>, LabelSheetError> {
        let missing = || LabelSheetError::MissingAsset {
            filename: filename.to_string(),
        };
        if !is_safe_filename(filename) {
            return Err(missing());
        }
        match tokio::fs::read(self.path_of(filename)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(missing()),
            Err(e) => Err(LabelSheetError::io(format!("Failed to read image '{filename}'"), e)),
        }
    }

    /// Stored images with an allowed extension, sorted by name. A store whose
    /// directory does not exist yet is empty.
    pub async fn list(&self) -> Result<Vec<String>, LabelSheetError> {
        match list_allowed(&self.config.images_dir).await {
            Ok(names) => Ok(names),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(LabelSheetError::io("Failed to list images folder", e)),
        }
    }

    fn path_of(&self, filename: &str) -> PathBuf {
        self.config.images_dir.join(filename)
    }
}

async fn list_allowed(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if has_allowed_extension(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Case-insensitive check against png/jpg/jpeg.
pub fn has_allowed_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

static RE_UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

/// Reduce an uploaded name to a plain, portable file name.
///
/// Keeps the final path component, drops non-ASCII, turns whitespace into
/// `_`, removes everything outside `[A-Za-z0-9._-]` and strips leading dots
/// and underscores. `../../etc/passwd` → `passwd`, `My Photo.PNG` →
/// `My_Photo.PNG`.
pub fn secure_filename(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let ascii: String = last
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
        .collect();
    let cleaned = RE_UNSAFE_CHARS.replace_all(&ascii, "");
    cleaned.trim_start_matches(['.', '_']).to_string()
}
