//! Per-session values threaded into the formatter and commands.

use crate::utils::color::{detect_color_depth, ColorDepth};
use std::time::{SystemTime, UNIX_EPOCH};

/// Picked once per process. Not persisted.
#[derive(Debug, Clone)]
pub struct SessionContext {
    color_seed: u64,
    color_depth: ColorDepth,
    whitelist: Option<Vec<String>>,
}

impl SessionContext {
    /// `whitelist` comes from the command line; `None` defers to the filter file.
    pub fn new(whitelist: Option<Vec<String>>) -> Self {
        Self::with_seed(random_seed(), detect_color_depth(), whitelist)
    }

    pub fn with_seed(color_seed: u64, color_depth: ColorDepth, whitelist: Option<Vec<String>>) -> Self {
        let whitelist = whitelist
            .filter(|names| !names.is_empty())
            .map(|names| names.into_iter().map(|name| name.to_lowercase()).collect());
        Self {
            color_seed,
            color_depth,
            whitelist,
        }
    }

    pub fn color_seed(&self) -> u64 {
        self.color_seed
    }

    pub fn color_depth(&self) -> ColorDepth {
        self.color_depth
    }

    pub fn whitelist(&self) -> Option<&[String]> {
        self.whitelist.as_deref()
    }
}

fn random_seed() -> u64 {
    let mut bytes = [0u8; 8];
    match getrandom::fill(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes),
        Err(_) => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default(),
    }
}
