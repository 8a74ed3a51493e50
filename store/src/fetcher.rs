//! Fetching `file://` references straight from disk.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use concordia_core::{FetchError, SchemaFetcher};
use tracing::debug;

const FILE_SCHEME: &str = "file://";

/// Resolves `file://` URLs by reading the named file.
///
/// With a root directory set, relative paths are read from inside it and
/// paths that escape it are refused.
///
/// ```no_run
/// use concordia_core::Concordia;
/// use concordia_store::FileFetcher;
///
/// let concordia = Concordia::builder()
///     .fetcher(FileFetcher::with_root("schemas/"))
///     .build_str(r#"{
///         "type": "object",
///         "schema": [{ "$ref": "file://audit.json" }]
///     }"#)
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    /// A fetcher that reads any path the URL names.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fetcher confined to `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn locate(&self, url: &str) -> Result<PathBuf, FetchError> {
        let Some(rest) = url.strip_prefix(FILE_SCHEME) else {
            return Err(FetchError::Unsupported(format!(
                "{url:?} is not a file:// URL"
            )));
        };
        let path = Path::new(rest);

        let Some(root) = &self.root else {
            return Ok(path.to_path_buf());
        };
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(FetchError::Unsupported(format!(
                "{url:?} leaves the schema root"
            )));
        }
        if path.is_absolute() {
            if path.starts_with(root) {
                Ok(path.to_path_buf())
            } else {
                Err(FetchError::Unsupported(format!(
                    "{url:?} is outside {}",
                    root.display()
                )))
            }
        } else {
            Ok(root.join(path))
        }
    }
}

impl SchemaFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let path = self.locate(url)?;
        debug!(url, path = %path.display(), "reading schema file");
        std::fs::read_to_string(&path).map_err(|error| match error.kind() {
            ErrorKind::NotFound => FetchError::NotFound,
            _ => FetchError::Io(error),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();

        let fetcher = FileFetcher::with_root(dir.path());
        assert_eq!(fetcher.root(), Some(dir.path()));
        assert_eq!(fetcher.fetch("file://a.json").unwrap(), "{}");
        assert!(matches!(
            fetcher.fetch("file://b.json"),
            Err(FetchError::NotFound)
        ));
    }

    #[test]
    fn test_reads_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        std::fs::write(&path, "{}").unwrap();
        let url = format!("file://{}", path.display());

        assert_eq!(FileFetcher::new().fetch(&url).unwrap(), "{}");
        assert_eq!(FileFetcher::with_root(dir.path()).fetch(&url).unwrap(), "{}");
    }

    #[test]
    fn test_confined_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inner");
        std::fs::create_dir(&inner).unwrap();
        std::fs::write(dir.path().join("secret.json"), "{}").unwrap();

        let fetcher = FileFetcher::with_root(&inner);
        assert!(matches!(
            fetcher.fetch("file://../secret.json"),
            Err(FetchError::Unsupported(_))
        ));
        let outside = format!("file://{}", dir.path().join("secret.json").display());
        assert!(matches!(
            fetcher.fetch(&outside),
            Err(FetchError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            FileFetcher::new().fetch("https://example.com/a.json"),
            Err(FetchError::Unsupported(_))
        ));
    }
}
