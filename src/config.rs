use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATA_FILE: &str = "user_data.json";

/// Where the store lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_file: PathBuf,
    /// `None` blocks until the store lock is free.
    pub lock_timeout: Option<Duration>,
}

impl Config {
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            lock_timeout: None,
        }
    }

    pub fn with_lock_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.lock_timeout = ms.map(Duration::from_millis);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_FILE)
    }
}
