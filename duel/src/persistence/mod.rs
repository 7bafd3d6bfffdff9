pub mod transcript;

use std::path::{Path, PathBuf};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Saved games as `.txt` transcripts under one directory.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Relative names live in the store directory; `.txt` is added when the
    /// name has no extension.
    pub fn resolve(&self, name: &str) -> PathBuf {
        let mut path = PathBuf::from(name);
        if path.extension().is_none() {
            path.set_extension("txt");
        }
        if path.is_relative() {
            self.dir.join(path)
        } else {
            path
        }
    }

    /// Save moves. Returns the path written.
    pub fn save(&self, name: &str, moves: &[String]) -> Result<PathBuf, PersistenceError> {
        let path = self.resolve(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, transcript::render(moves)).map_err(|source| {
            PersistenceError::Io {
                path: path.clone(),
                source,
            }
        })?;
        tracing::info!("Saved {} moves to {}", moves.len(), path.display());
        Ok(path)
    }

    /// Read a transcript's text.
    pub fn load(&self, name: &str) -> Result<String, PersistenceError> {
        let path = self.resolve(name);
        let text = std::fs::read_to_string(&path)
            .map_err(|source| PersistenceError::Io { path: path.clone(), source })?;
        tracing::debug!("Read transcript {}", path.display());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_adds_extension_and_directory() {
        let store = TranscriptStore::new(PathBuf::from("/games"));
        assert_eq!(store.resolve("opening"), PathBuf::from("/games/opening.txt"));
        assert_eq!(store.resolve("notes.pgn"), PathBuf::from("/games/notes.pgn"));
        assert_eq!(store.resolve("/tmp/x"), PathBuf::from("/tmp/x.txt"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path().join("nested"));
        let moves = vec!["e2e4".to_string(), "c7c5".to_string()];

        let path = store.save("sicilian", &moves).unwrap();
        assert!(path.ends_with("nested/sicilian.txt"));
        assert_eq!(store.load("sicilian").unwrap(), "e2e4\nc7c5\n");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path().to_path_buf());
        assert!(matches!(
            store.load("nope"),
            Err(PersistenceError::Io { .. })
        ));
    }
}
