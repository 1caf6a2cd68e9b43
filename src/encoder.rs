use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is empty")]
    Empty { path: PathBuf },
    #[error("base64 decode: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A file offered by the picker, with the type it claims to be.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub declared_type: String,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>, declared_type: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            declared_type: declared_type.into(),
        }
    }

    /// Declares the type from the extension, falling back to sniffing the
    /// leading bytes when there is none.
    pub async fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let declared = match mime_from_extension(&path) {
            Some(m) => m.to_string(),
            None if path.extension().is_none() => sniff_file(&path)
                .await
                .unwrap_or("application/octet-stream")
                .to_string(),
            None => "application/octet-stream".to_string(),
        };
        Self::new(path, declared)
    }

    pub fn is_image(&self) -> bool {
        accepts(&self.declared_type)
    }
}

pub fn accepts(declared_type: &str) -> bool {
    declared_type.starts_with("image/")
}

pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    // PNG
    if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Some("image/png");
    }
    // JPEG
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        return Some("image/jpeg");
    }
    // WEBP (RIFF....WEBP)
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.len() >= 6 && (&bytes[0..6] == b"GIF87a" || &bytes[0..6] == b"GIF89a") {
        return Some("image/gif");
    }
    None
}

const SNIFF_LEN: u64 = 16;

async fn sniff_file(path: &Path) -> Option<&'static str> {
    let file = tokio::fs::File::open(path).await.ok()?;
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN).read_to_end(&mut head).await.ok()?;
    sniff_image_mime(&head)
}

pub fn strip_data_url_prefix(s: &str) -> &str {
    match s.find(',') {
        Some(idx) => &s[(idx + 1)..],
        None => s,
    }
}

pub fn decode_base64_image(s: &str) -> Result<Vec<u8>, EncodeError> {
    Ok(B64.decode(strip_data_url_prefix(s))?)
}

/// Handle to a registered preview, shaped like a blob URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewRef(String);

impl PreviewRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
pub struct PreviewRegistry {
    live: HashMap<PreviewRef, Arc<[u8]>>,
}

impl PreviewRegistry {
    pub fn create(&mut self, bytes: Arc<[u8]>) -> PreviewRef {
        let r = PreviewRef(format!("preview:{}", Uuid::new_v4()));
        self.live.insert(r.clone(), bytes);
        r
    }

    pub fn get(&self, r: &PreviewRef) -> Option<Arc<[u8]>> {
        self.live.get(r).cloned()
    }

    pub fn revoke(&mut self, r: &PreviewRef) -> bool {
        self.live.remove(r).is_some()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Arc<[u8]>,
    pub base64: String,
}

pub async fn encode_file(file: &SelectedFile) -> Result<EncodedImage, EncodeError> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| EncodeError::Read {
            path: file.path.clone(),
            source,
        })?;
    if bytes.is_empty() {
        return Err(EncodeError::Empty {
            path: file.path.clone(),
        });
    }
    debug!(name = %file.name, size = bytes.len(), "encoded selected image");
    Ok(EncodedImage {
        base64: B64.encode(&bytes),
        bytes: bytes.into(),
    })
}
