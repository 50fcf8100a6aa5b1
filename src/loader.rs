//! Scenario file loaders.
//!
//! A loader turns a scenario path into bytes. A missing file is `Ok(None)`;
//! any other failure is an error.

use anyhow::Context;
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Load a scenario or body file by path.
pub trait LoadFile: Send + Sync {
    fn load(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>>;
}

impl<F> LoadFile for F
where
    F: Fn(&str) -> anyhow::Result<Option<Vec<u8>>> + Send + Sync,
{
    fn load(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self(path)
    }
}

/// Reads files below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => anyhow::bail!("Scenario path escapes the root directory: {}", path),
            }
        }
        Ok(self.root.join(relative))
    }
}

impl LoadFile for DirectoryLoader {
    fn load(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let full_path = self.resolve(path)?;
        match std::fs::read(&full_path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", full_path.display())),
        }
    }
}

/// Serves files from memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    files: HashMap<String, Vec<u8>>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous content at the same path.
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }
}

impl LoadFile for InMemoryLoader {
    fn load(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }
}
