//! Configuration for SDDS
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

/// Main configuration shared by every handle opened through a
/// [`SddsContext`](crate::SddsContext)
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Handle Registry Configuration
    // -------------------------------------------------------------------------
    /// Highest handle index that may be assigned (indices are `0..=max_handle_index`)
    pub max_handle_index: usize,

    // -------------------------------------------------------------------------
    // Read Configuration
    // -------------------------------------------------------------------------
    /// Delay before the single retry of a failed input open
    pub open_retry_delay: Duration,

    /// Return the complete rows of a binary page torn at end of file
    /// instead of reporting it as corrupt
    pub auto_recover: bool,

    // -------------------------------------------------------------------------
    // Write Configuration
    // -------------------------------------------------------------------------
    /// Array elements written per line in ASCII mode
    pub ascii_values_per_line: usize,

    /// Initial fsync setting for new writers
    pub fsync: bool,

    /// Initial column ordering for new binary writers
    pub column_major: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_handle_index: 1000,
            open_retry_delay: Duration::from_secs(1),
            auto_recover: false,
            ascii_values_per_line: 10,
            fsync: false,
            column_major: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the highest assignable handle index
    pub fn max_handle_index(mut self, index: usize) -> Self {
        self.config.max_handle_index = index;
        self
    }

    /// Set the delay before retrying a failed input open
    pub fn open_retry_delay(mut self, delay: Duration) -> Self {
        self.config.open_retry_delay = delay;
        self
    }

    /// Enable or disable recovery of torn binary pages
    pub fn auto_recover(mut self, enabled: bool) -> Self {
        self.config.auto_recover = enabled;
        self
    }

    /// Set the number of array elements per ASCII line
    pub fn ascii_values_per_line(mut self, count: usize) -> Self {
        self.config.ascii_values_per_line = count.max(1);
        self
    }

    /// Set the initial fsync mode for writers
    pub fn fsync(mut self, enabled: bool) -> Self {
        self.config.fsync = enabled;
        self
    }

    /// Set the initial column ordering for binary writers
    pub fn column_major(mut self, enabled: bool) -> Self {
        self.config.column_major = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
