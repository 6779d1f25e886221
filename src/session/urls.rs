//! Path / URL resolution
//!
//! The remote loader and store operations only accept URLs. Local paths are
//! validated and converted here, before any remote call is attempted.

use std::path::{Path, PathBuf};

/// URL resolution errors
#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    /// The input is neither an openable local file nor a valid URL
    #[error("not an openable file or URL: {0}")]
    NotOpenable(String),

    /// A local path could not be converted to a file URL
    #[error("cannot convert path to URL: {0}")]
    Conversion(String),
}

/// Whether the input already looks like a URL rather than a local path
pub fn is_url(input: &str) -> bool {
    input.starts_with("file://")
        || input.starts_with("private:")
        || input.starts_with("vnd.sun.star.")
        || input
            .split_once("://")
            .is_some_and(|(scheme, rest)| {
                !scheme.is_empty()
                    && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
                    && !rest.is_empty()
            })
}

/// Convert a local path to a `file://` URL, absolutizing relative paths
pub fn path_to_file_url(path: &Path) -> Result<String, UrlError> {
    let absolute: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| UrlError::Conversion(e.to_string()))?
            .join(path)
    };

    let mut encoded = String::from("file://");
    if cfg!(target_os = "windows") {
        // file:///C:/... with forward slashes
        encoded.push('/');
        encoded.push_str(&encode_url_path(
            &absolute.to_string_lossy().replace('\\', "/"),
        ));
    } else {
        encoded.push_str(&encode_url_path(&absolute.to_string_lossy()));
    }
    Ok(encoded)
}

/// Resolve an input for opening: an existing local file is converted to a
/// `file://` URL, an input that is already a URL passes through, anything
/// else fails here - before any remote call
pub fn resolve_openable_url(input: &str) -> Result<String, UrlError> {
    if is_url(input) {
        return Ok(input.to_string());
    }

    let path = Path::new(input);
    if path.is_file() {
        return path_to_file_url(path);
    }

    Err(UrlError::NotOpenable(input.to_string()))
}

/// Resolve an input as a save target: the file need not exist yet
pub fn resolve_target_url(input: &str) -> Result<String, UrlError> {
    if is_url(input) {
        return Ok(input.to_string());
    }
    path_to_file_url(Path::new(input))
}

/// Extract the lowercase extension of a path or URL target
pub fn target_extension(input: &str) -> Option<String> {
    let tail = input.rsplit(['/', '\\']).next()?;
    let (_, ext) = tail.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Minimal percent-encoding of path segments for `file://` URLs
///
/// Non-ASCII bytes are UTF-8 percent-encoded, as the remote side expects.
fn encode_url_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'%' => out.push_str("%25"),
            b' ' => out.push_str("%20"),
            b'#' => out.push_str("%23"),
            b'?' => out.push_str("%3F"),
            0x80.. => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
            _ => out.push(byte as char),
        }
    }
    out
}
