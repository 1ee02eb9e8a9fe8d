use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub const IMAGE_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const VIDEO_MAX_BYTES: usize = 50 * 1024 * 1024;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "webm", "mov", "ogg"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid file type. Allowed: {0}")]
    UnsupportedType(String),

    #[error("File is too large. Maximum size is {0}MB")]
    TooLarge(usize),

    #[error("Uploaded file is empty")]
    Empty,

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed upload: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            MediaKind::Image => IMAGE_MAX_BYTES,
            MediaKind::Video => VIDEO_MAX_BYTES,
        }
    }

    fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &IMAGE_EXTENSIONS,
            MediaKind::Video => &VIDEO_EXTENSIONS,
        }
    }
}

/// Type-specific subfolders of the upload tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFolder {
    Posts,
    ProfilePicture,
    Recipes,
}

impl UploadFolder {
    pub fn dir_name(&self) -> &'static str {
        match self {
            UploadFolder::Posts => "posts",
            UploadFolder::ProfilePicture => "profile_picture",
            UploadFolder::Recipes => "recipes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub kind: MediaKind,
    /// Path relative to the upload root, e.g. `posts/post_<token>.jpg`
    pub relative_path: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate name, type and size, then write the bytes under a collision-free name
    pub async fn save(
        &self,
        folder: UploadFolder,
        prefix: &str,
        original_name: &str,
        bytes: &[u8],
        allowed: &[MediaKind],
    ) -> Result<StoredFile, UploadError> {
        let (kind, ext) = classify(original_name, allowed)?;

        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > kind.max_bytes() {
            return Err(UploadError::TooLarge(kind.max_bytes() / (1024 * 1024)));
        }

        let dir = self.root.join(folder.dir_name());
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = unique_file_name(prefix, &ext);
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        let relative_path = format!("{}/{}", folder.dir_name(), file_name);
        info!("Stored upload {} ({} bytes)", relative_path, bytes.len());

        Ok(StoredFile {
            kind,
            relative_path,
        })
    }

    /// Whether a stored relative path still points at a file
    pub fn exists(&self, relative_path: &str) -> bool {
        match self.resolve(relative_path) {
            Some(path) => path.is_file(),
            None => false,
        }
    }

    pub async fn remove(&self, relative_path: &str) {
        if let Some(path) = self.resolve(relative_path) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove upload {}: {}", relative_path, e);
            }
        }
    }

    fn resolve(&self, relative_path: &str) -> Option<PathBuf> {
        let rel = Path::new(relative_path);
        let safe = !relative_path.is_empty()
            && rel
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        safe.then(|| self.root.join(rel))
    }
}

/// File part of a multipart form, still in memory
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Text fields of a multipart form plus the one file part it may carry
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }
}

/// Drain a multipart body. A file input left empty by the browser arrives as
/// a part with no file name and is treated as absent.
pub async fn read_multipart(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<MultipartForm, UploadError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Malformed(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| UploadError::Malformed(e.to_string()))?;
            if !file_name.is_empty() {
                form.file = Some(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| UploadError::Malformed(e.to_string()))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// URL the static file service exposes a stored path under
pub fn public_url(relative_path: &str) -> String {
    format!("/uploads/{}", relative_path.trim_start_matches('/'))
}

pub fn unique_file_name(prefix: &str, ext: &str) -> String {
    format!("{}_{}.{}", prefix, Uuid::new_v4().simple(), ext)
}

/// Map a client-supplied file name to an allowed media kind and normalized extension
pub fn classify(file_name: &str, allowed: &[MediaKind]) -> Result<(MediaKind, String), UploadError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    allowed
        .iter()
        .find(|kind| kind.extensions().contains(&ext.as_str()))
        .map(|kind| (*kind, ext.clone()))
        .ok_or_else(|| {
            let names: Vec<&str> = allowed
                .iter()
                .flat_map(|kind| kind.extensions().iter().copied())
                .collect();
            UploadError::UnsupportedType(names.join(", "))
        })
}
