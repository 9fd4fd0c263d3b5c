//! Release configuration with sensible defaults.

use std::collections::HashSet;

use crate::tokens::DEFAULT_BYTES_PER_TOKEN;

/// Default number of tool calls released when no ids are given.
pub const DEFAULT_RELEASE_COUNT: i64 = 3;

/// Settings for [`ContextReleaser`](crate::release::ContextReleaser).
///
/// Only auto-selection reads `protected_tools` and `min_output_bytes`;
/// explicitly named calls are released regardless.
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    /// Calls auto-selected when the request gives no `count`. Default: 3.
    pub default_count: i64,
    /// Ratio for the default token estimator. Default: 4.0.
    pub bytes_per_token: f64,
    /// Tools whose results are never auto-selected.
    pub protected_tools: HashSet<String>,
    /// Outputs smaller than this are not worth auto-selecting. Default: 0.
    pub min_output_bytes: usize,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            default_count: DEFAULT_RELEASE_COUNT,
            bytes_per_token: DEFAULT_BYTES_PER_TOKEN,
            protected_tools: HashSet::new(),
            min_output_bytes: 0,
        }
    }
}

impl ReleaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_count(mut self, count: i64) -> Self {
        self.default_count = count;
        self
    }

    pub fn with_bytes_per_token(mut self, ratio: f64) -> Self {
        self.bytes_per_token = ratio;
        self
    }

    /// Never auto-select results of this tool.
    pub fn protect_tool(mut self, name: impl Into<String>) -> Self {
        self.protected_tools.insert(name.into());
        self
    }

    pub fn with_min_output_bytes(mut self, bytes: usize) -> Self {
        self.min_output_bytes = bytes;
        self
    }
}
