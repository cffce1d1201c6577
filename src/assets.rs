//! # Feature: Static Assets
//!
//! Caches the file listing of the asset directory at startup so `meme` can
//! pick a random file without touching the disk on every call.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial release

use anyhow::{Context, Result};
use log::info;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct AssetLibrary {
    files: Vec<PathBuf>,
}

impl AssetLibrary {
    /// An empty library for when no directory is configured.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the listing of `dir`, creating the directory if it is missing.
    pub fn load(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating asset directory {}", dir.display()))?;

        let mut files = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
            let entry = entry?;
            let name = entry.file_name();
            if entry.file_type()?.is_file() && !name.to_string_lossy().starts_with('.') {
                files.push(entry.path());
            }
        }
        files.sort();

        info!("🖼️ Loaded {} asset(s) from {}", files.len(), dir.display());
        Ok(AssetLibrary { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn random(&self) -> Option<&Path> {
        if self.files.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..self.files.len());
        Some(self.files[index].as_path())
    }
}
