//! Asset I/O
//!
//! Readers that turn an [`AssetSource`] (and the relative resources it
//! references) into bytes: local files, HTTP(S) and in-memory payloads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;

use crate::errors::LoadError;

// ============================================================================
// AssetSource
// ============================================================================

/// Where an asset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Remote `http://` or `https://` URL.
    Url(String),
    /// Local file path.
    Path(PathBuf),
    /// Bytes the host already holds (e.g. a file the user picked), with a
    /// display name used for type detection.
    Bytes { name: String, data: Arc<[u8]> },
}

impl AssetSource {
    #[must_use]
    pub fn bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Display name: URL, path or the in-memory name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Path(path) => path.to_str().unwrap_or("<non-utf8 path>"),
            Self::Bytes { name, .. } => name,
        }
    }

    /// Last path component, without query or fragment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                path.rsplit('/').next().unwrap_or(path)
            }
            Self::Path(path) => path.file_name().and_then(|s| s.to_str()).unwrap_or(""),
            Self::Bytes { name, .. } => name.rsplit(['/', '\\']).next().unwrap_or(name),
        }
    }

    /// Lower-cased file extension, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let file_name = self.file_name();
        let (stem, ext) = file_name.rsplit_once('.')?;
        (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }
}

impl From<&str> for AssetSource {
    fn from(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            Self::Url(s.to_string())
        } else {
            Self::Path(PathBuf::from(s))
        }
    }
}

impl From<String> for AssetSource {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<PathBuf> for AssetSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for AssetSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Bytes of the top-level document plus what the transport said about them.
#[derive(Debug, Clone)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

// ============================================================================
// Readers
// ============================================================================

/// Asynchronous byte reader for a resource and its siblings.
pub trait AssetReader: Send + Sync {
    /// Reads a resource relative to the reader's root.
    fn read_bytes(
        &self,
        uri: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, LoadError>> + Send;
}

/// Local file reader.
#[derive(Debug, Clone)]
pub struct FileAssetReader {
    root_path: PathBuf,
}

impl FileAssetReader {
    /// `path` may be the document itself or its directory.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_dir() {
            path.to_path_buf()
        } else {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        };
        Self { root_path }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    async fn read_path(path: &Path) -> Result<Vec<u8>, LoadError> {
        #[cfg(not(target_arch = "wasm32"))]
        {
            if tokio::runtime::Handle::try_current().is_ok() {
                return Ok(tokio::fs::read(path).await?);
            }
            Ok(std::fs::read(path)?)
        }
        #[cfg(target_arch = "wasm32")]
        {
            Err(LoadError::UnsupportedSource(format!(
                "local file access is not available on the web: {}",
                path.display()
            )))
        }
    }
}

impl AssetReader for FileAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.root_path.join(percent_decode(uri));
        Self::read_path(&path).await
    }
}

/// HTTP(S) reader.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpAssetReader {
    root_url: url::Url,
}

#[cfg(feature = "http")]
impl HttpAssetReader {
    pub fn new(url_str: &str) -> Result<Self, LoadError> {
        let url = url::Url::parse(url_str)?;
        let root_url = if url.path().ends_with('/') {
            url
        } else {
            let mut u = url.clone();
            if let Ok(mut segments) = u.path_segments_mut() {
                segments.pop();
                segments.push("");
            }
            u.set_query(None);
            u.set_fragment(None);
            u
        };

        Ok(Self { root_url })
    }

    #[inline]
    #[must_use]
    pub fn root_url(&self) -> &url::Url {
        &self.root_url
    }

    /// Fetches an absolute URL, keeping the declared content type.
    pub async fn fetch(url: &str) -> Result<Payload, LoadError> {
        let request = ehttp::Request::get(url);
        let response = ehttp::fetch_async(request).await.map_err(LoadError::Fetch)?;

        if !response.ok {
            return Err(LoadError::HttpStatus {
                status: response.status,
            });
        }

        let content_type = response.content_type().map(str::to_string);
        Ok(Payload {
            bytes: response.bytes,
            content_type,
        })
    }
}

#[cfg(feature = "http")]
impl AssetReader for HttpAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>, LoadError> {
        let url = self.root_url.join(uri)?;
        Ok(Self::fetch(url.as_str()).await?.bytes)
    }
}

/// Reader for a document the host already holds in memory.
///
/// Such a document has no base location, so it can only reference embedded
/// or `data:` resources.
#[derive(Debug, Clone)]
pub struct MemoryAssetReader {
    name: String,
}

impl MemoryAssetReader {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl AssetReader for MemoryAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>, LoadError> {
        Err(LoadError::UnsupportedSource(format!(
            "'{}' references external resource '{uri}' but has no base location",
            self.name
        )))
    }
}

/// Reader chosen per source, dispatched statically.
#[derive(Debug, Clone)]
pub enum AssetReaderVariant {
    File(Arc<FileAssetReader>),
    #[cfg(feature = "http")]
    Http(Arc<HttpAssetReader>),
    Memory(Arc<MemoryAssetReader>),
}

impl AssetReaderVariant {
    pub fn from_source(source: &AssetSource) -> Result<Self, LoadError> {
        match source {
            AssetSource::Url(url) => {
                #[cfg(feature = "http")]
                {
                    Ok(Self::Http(Arc::new(HttpAssetReader::new(url)?)))
                }
                #[cfg(not(feature = "http"))]
                {
                    Err(LoadError::UnsupportedSource(format!(
                        "HTTP support is not enabled, cannot load {url}"
                    )))
                }
            }
            AssetSource::Path(path) => Ok(Self::File(Arc::new(FileAssetReader::new(path)))),
            AssetSource::Bytes { name, .. } => {
                Ok(Self::Memory(Arc::new(MemoryAssetReader::new(name.clone()))))
            }
        }
    }

    /// Reads the top-level document.
    pub async fn read_source(&self, source: &AssetSource) -> Result<Payload, LoadError> {
        match (self, source) {
            (Self::File(_), AssetSource::Path(path)) => Ok(Payload {
                bytes: FileAssetReader::read_path(path).await?,
                content_type: None,
            }),
            #[cfg(feature = "http")]
            (Self::Http(_), AssetSource::Url(url)) => HttpAssetReader::fetch(url).await,
            (Self::Memory(_), AssetSource::Bytes { data, .. }) => Ok(Payload {
                bytes: data.to_vec(),
                content_type: None,
            }),
            _ => Err(LoadError::UnsupportedSource(format!(
                "reader does not match source {}",
                source.name()
            ))),
        }
    }

    /// Reads a resource referenced by the document: `data:` URIs are decoded
    /// in place, anything else resolves against the document location.
    pub async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>, LoadError> {
        if uri.starts_with("data:") {
            return decode_data_uri(uri);
        }
        match self {
            Self::File(r) => r.read_bytes(uri).await,
            #[cfg(feature = "http")]
            Self::Http(r) => r.read_bytes(uri).await,
            Self::Memory(r) => r.read_bytes(uri).await,
        }
    }
}

// ============================================================================
// URI helpers
// ============================================================================

/// Decodes a `data:[<mediatype>][;base64],<data>` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, LoadError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| LoadError::DataUri("missing 'data:' prefix".to_string()))?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| LoadError::DataUri("missing ',' separator".to_string()))?;

    if header.ends_with(";base64") {
        Ok(base64::engine::general_purpose::STANDARD.decode(data.trim())?)
    } else {
        Ok(percent_decode(data).into_bytes())
    }
}

/// Minimal `%XX` decoding for relative resource paths.
fn percent_decode(s: &str) -> String {
    if !s.contains('%') {
        return s.to_string();
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let Some(v) = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok())
        {
            out.push(v);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
