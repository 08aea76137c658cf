use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file not found: {0}")]
    MissingFile(PathBuf),
    #[error("model {name} is not cached and no download URL is configured")]
    NotFound { name: String },
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where a model may come from, in resolution order.
#[derive(Clone, Debug, Default)]
pub struct ModelSource {
    /// Explicit file; when set, nothing else is consulted.
    pub path: Option<PathBuf>,
    /// File name looked up in the cache and bundled directories.
    pub name: String,
    pub bundled_dir: Option<PathBuf>,
    pub url: Option<String>,
}

/// Resolve a model file, checking explicit and cached locations before
/// downloading.
///
/// Resolution order:
/// 1. Explicit path
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory
/// 4. Download from URL to cache
pub fn resolve(
    source: &ModelSource,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = &source.path {
        return if path.exists() {
            Ok(path.clone())
        } else {
            Err(ModelResolveError::MissingFile(path.clone()))
        };
    }

    let cache_dir = model_cache_dir()?;
    resolve_in(source, &cache_dir, progress)
}

fn resolve_in(
    source: &ModelSource,
    cache_dir: &Path,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(&source.name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(dir) = &source.bundled_dir {
        let bundled_path = dir.join(&source.name);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    let Some(url) = &source.url else {
        return Err(ModelResolveError::NotFound {
            name: source.name.clone(),
        });
    };
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/MaskWatch/models/`
/// - Linux: `$XDG_CACHE_HOME/MaskWatch/models/` or `~/.cache/MaskWatch/models/`
/// - Windows: `%LOCALAPPDATA%/MaskWatch/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ModelResolveError::Write { path, source }
    };

    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;

    // Streamed in chunks so progress tracks the actual transfer.
    let mut buf = vec![0u8; 256 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(temp_path))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(name: &str) -> ModelSource {
        ModelSource {
            name: name.to_string(),
            ..ModelSource::default()
        }
    }

    #[test]
    fn test_explicit_path_wins() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.onnx");
        fs::write(&path, b"model").unwrap();

        let src = ModelSource {
            path: Some(path.clone()),
            ..source("mask_detector.onnx")
        };
        assert_eq!(resolve(&src, None).unwrap(), path);
    }

    #[test]
    fn test_explicit_missing_path_errors() {
        let src = ModelSource {
            path: Some(PathBuf::from("/nonexistent/model.onnx")),
            ..source("mask_detector.onnx")
        };
        assert!(matches!(
            resolve(&src, None),
            Err(ModelResolveError::MissingFile(_))
        ));
    }

    #[test]
    fn test_cached_file_is_found() {
        let cache = TempDir::new().unwrap();
        let cached = cache.path().join("m.onnx");
        fs::write(&cached, b"cached").unwrap();

        let found = resolve_in(&source("m.onnx"), cache.path(), None).unwrap();
        assert_eq!(found, cached);
    }

    #[test]
    fn test_bundled_file_is_found_when_not_cached() {
        let cache = TempDir::new().unwrap();
        let bundled = TempDir::new().unwrap();
        let bundled_path = bundled.path().join("m.onnx");
        fs::write(&bundled_path, b"bundled").unwrap();

        let src = ModelSource {
            bundled_dir: Some(bundled.path().to_path_buf()),
            ..source("m.onnx")
        };
        assert_eq!(resolve_in(&src, cache.path(), None).unwrap(), bundled_path);
    }

    #[test]
    fn test_missing_without_url_is_not_found() {
        let cache = TempDir::new().unwrap();
        let result = resolve_in(&source("m.onnx"), cache.path(), None);
        assert!(matches!(result, Err(ModelResolveError::NotFound { .. })));
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("MaskWatch"));
        assert!(path.to_string_lossy().contains("models"));
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
