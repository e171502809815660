//! XDG-compliant path resolution.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

const APP_DIR: &str = "flashcard-rag";

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(flashcard::paths::no_home),
        help("Set the HOME environment variable or pass --config explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(flashcard::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global directories for the CLI and daemon.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// `$XDG_CONFIG_HOME/flashcard-rag/`
    pub config_dir: PathBuf,
    /// `$XDG_CACHE_HOME/flashcard-rag/`
    pub cache_dir: PathBuf,
}

impl AppPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join(APP_DIR);

        let cache_dir = std::env::var("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".cache"))
            .join(APP_DIR);

        Ok(Self {
            config_dir,
            cache_dir,
        })
    }

    /// Path to the config file, whether or not it exists.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// The config file if one has been written.
    pub fn existing_config_file(&self) -> Option<PathBuf> {
        let path = self.config_file();
        path.is_file().then_some(path)
    }

    /// Default scratch directory for uploaded documents.
    pub fn uploads_dir(&self) -> PathBuf {
        self.cache_dir.join("uploads")
    }

    /// Create the base directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [&self.config_dir, &self.cache_dir, &self.uploads_dir()] {
            ensure_dir(dir)?;
        }
        Ok(())
    }
}

/// Create `dir` and its parents.
pub fn ensure_dir(dir: &Path) -> PathResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
        path: dir.display().to_string(),
        source: e,
    })
}
