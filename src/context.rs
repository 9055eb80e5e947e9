//! Context
//!
//! Entry point for opening datasets. A context owns the configuration and
//! the handle registry, and every handle it opens holds one registry slot
//! until it is terminated or dropped.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::codec::{SddsReader, SddsWriter};
use crate::config::Config;
use crate::error::Result;
use crate::layout::Description;
use crate::registry::HandleRegistry;
use crate::types::DataMode;

/// Configuration plus handle registry
#[derive(Debug, Clone)]
pub struct SddsContext {
    config: Config,
    registry: HandleRegistry,
}

impl SddsContext {
    pub fn new(config: Config) -> Self {
        let registry = HandleRegistry::new(config.max_handle_index);
        Self { config, registry }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Open a dataset for reading on the lowest free index
    pub fn initialize_input(&self, path: impl AsRef<Path>) -> Result<SddsReader<BufReader<File>>> {
        self.open_input(None, path.as_ref())
    }

    /// Open a dataset for reading on a specific index
    pub fn initialize_input_at(
        &self,
        index: usize,
        path: impl AsRef<Path>,
    ) -> Result<SddsReader<BufReader<File>>> {
        self.open_input(Some(index), path.as_ref())
    }

    fn open_input(&self, index: Option<usize>, path: &Path) -> Result<SddsReader<BufReader<File>>> {
        let slot = self.registry.acquire(index)?;
        SddsReader::open(path, self.config.clone(), Some(slot))
    }

    /// Create a dataset for writing on the lowest free index
    pub fn initialize_output(
        &self,
        path: impl AsRef<Path>,
        mode: DataMode,
        description: Description,
    ) -> Result<SddsWriter> {
        let slot = self.registry.acquire(None)?;
        SddsWriter::create(path.as_ref(), mode, description, self.config.clone(), Some(slot))
    }

    /// Create a dataset for writing on a specific index
    pub fn initialize_output_at(
        &self,
        index: usize,
        path: impl AsRef<Path>,
        mode: DataMode,
        description: Description,
    ) -> Result<SddsWriter> {
        let slot = self.registry.acquire(Some(index))?;
        SddsWriter::create(path.as_ref(), mode, description, self.config.clone(), Some(slot))
    }

    /// Open an existing dataset to add pages
    pub fn initialize_append(&self, path: impl AsRef<Path>) -> Result<SddsWriter> {
        let slot = self.registry.acquire(None)?;
        SddsWriter::open_append(path.as_ref(), self.config.clone(), Some(slot))
    }

    /// Open an existing dataset to add rows to its last page
    ///
    /// Returns the writer and the number of rows already in that page.
    pub fn initialize_append_to_page(
        &self,
        path: impl AsRef<Path>,
        row_hint: usize,
    ) -> Result<(SddsWriter, u64)> {
        let slot = self.registry.acquire(None)?;
        SddsWriter::open_append_to_page(path.as_ref(), row_hint, self.config.clone(), Some(slot))
    }
}

impl Default for SddsContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
