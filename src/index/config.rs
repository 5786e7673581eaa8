//! Configuration for an index.
//!
//! ```
//! use quarry::index::config::IndexConfig;
//!
//! let config = IndexConfig::builder()
//!     .max_prefix_expansions(1000)
//!     .page_size(64)
//!     .build();
//! assert_eq!(config.max_prefix_expansions, Some(1000));
//!
//! let config = IndexConfig::from_json_str(r#"{ "auto_compaction": false }"#).unwrap();
//! assert!(!config.auto_compaction);
//! assert_eq!(config.page_size, 128);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};

/// Tunables of an index. Missing keys in JSON fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Maximum number of terms a prefix, fuzzy or lex-range node expands to.
    /// `None` means unlimited.
    pub max_prefix_expansions: Option<usize>,

    /// Shortest prefix accepted by a prefix node.
    pub min_prefix_len: usize,

    /// Largest edit distance accepted by a fuzzy node.
    pub max_fuzzy_distance: u8,

    /// Number of posting entries an iterator copies per yield point.
    pub page_size: usize,

    /// Compact automatically when the deleted ratio crosses the threshold.
    pub auto_compaction: bool,

    /// Deleted/total document ratio that triggers automatic compaction.
    pub compaction_threshold: f64,

    /// Distinct values a numeric leaf holds before it splits.
    pub numeric_split_cardinality: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            max_prefix_expansions: None,
            min_prefix_len: 1,
            max_fuzzy_distance: 3,
            page_size: 128,
            auto_compaction: true,
            compaction_threshold: 0.3,
            numeric_split_cardinality: 16,
        }
    }
}

impl IndexConfig {
    /// Create a new builder for IndexConfig.
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::new()
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IndexConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Serialize the configuration to pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every value is inside its accepted domain.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(QuarryError::invalid_argument("page_size must be positive"));
        }
        if self.numeric_split_cardinality < 2 {
            return Err(QuarryError::invalid_argument(
                "numeric_split_cardinality must be at least 2",
            ));
        }
        if !(0.0..=1.0).contains(&self.compaction_threshold) {
            return Err(QuarryError::invalid_argument(
                "compaction_threshold must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Builder for IndexConfig.
#[derive(Debug, Default)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit prefix, fuzzy and lex-range expansions.
    pub fn max_prefix_expansions(mut self, max: usize) -> Self {
        self.config.max_prefix_expansions = Some(max);
        self
    }

    /// Set the shortest accepted prefix.
    pub fn min_prefix_len(mut self, len: usize) -> Self {
        self.config.min_prefix_len = len;
        self
    }

    /// Set the largest accepted fuzzy distance.
    pub fn max_fuzzy_distance(mut self, distance: u8) -> Self {
        self.config.max_fuzzy_distance = distance;
        self
    }

    /// Set the number of postings copied per yield point.
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Enable or disable automatic compaction.
    pub fn auto_compaction(mut self, enabled: bool) -> Self {
        self.config.auto_compaction = enabled;
        self
    }

    /// Set the deleted ratio that triggers compaction.
    pub fn compaction_threshold(mut self, threshold: f64) -> Self {
        self.config.compaction_threshold = threshold;
        self
    }

    /// Set the numeric leaf split cardinality.
    pub fn numeric_split_cardinality(mut self, cardinality: usize) -> Self {
        self.config.numeric_split_cardinality = cardinality;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> IndexConfig {
        self.config
    }
}
