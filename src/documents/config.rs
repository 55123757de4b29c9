//! Configuration types for document chunking.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Violations of the chunk size contract.
///
/// These are the only hard failures the chunker reports; everything else
/// (empty input, missing text) degrades to zero chunks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkConfigError {
    #[error("min_chunk_size ({min}) must be less than max_chunk_size ({max})")]
    MinNotBelowMax { min: usize, max: usize },

    #[error("overlap_size ({overlap}) must be less than max_chunk_size ({max})")]
    OverlapNotBelowMax { overlap: usize, max: usize },

    #[error("max_chunk_size must be greater than zero")]
    ZeroMax,
}

/// Size limits and split heuristics for the chunker.
///
/// All sizes are measured in characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum chunk size in characters. Larger chunks are split.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Minimum chunk size in characters. Smaller chunks are merged backwards.
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,

    /// Characters carried from the end of one chunk into the next.
    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,

    /// Split oversized chunks on sentence boundaries (word boundaries otherwise).
    #[serde(default = "default_true")]
    pub preserve_sentences: bool,

    /// Treat blank lines as paragraph breaks when accumulating chunks.
    #[serde(default = "default_true")]
    pub preserve_paragraphs: bool,
}

fn default_max_chunk_size() -> usize {
    1000
}

fn default_min_chunk_size() -> usize {
    200
}

fn default_overlap_size() -> usize {
    100
}

fn default_true() -> bool {
    true
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            min_chunk_size: default_min_chunk_size(),
            overlap_size: default_overlap_size(),
            preserve_sentences: true,
            preserve_paragraphs: true,
        }
    }
}

impl ChunkConfig {
    /// Create a config with the given sizes and default split heuristics.
    pub fn with_sizes(max_chunk_size: usize, min_chunk_size: usize, overlap_size: usize) -> Self {
        Self {
            max_chunk_size,
            min_chunk_size,
            overlap_size,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ChunkConfigError> {
        if self.max_chunk_size == 0 {
            return Err(ChunkConfigError::ZeroMax);
        }

        if self.min_chunk_size >= self.max_chunk_size {
            return Err(ChunkConfigError::MinNotBelowMax {
                min: self.min_chunk_size,
                max: self.max_chunk_size,
            });
        }

        if self.overlap_size >= self.max_chunk_size {
            return Err(ChunkConfigError::OverlapNotBelowMax {
                overlap: self.overlap_size,
                max: self.max_chunk_size,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_config_defaults() {
        let config = ChunkConfig::default();
        assert_eq!(config.max_chunk_size, 1000);
        assert_eq!(config.min_chunk_size, 200);
        assert_eq!(config.overlap_size, 100);
        assert!(config.preserve_sentences);
        assert!(config.preserve_paragraphs);
    }

    #[test]
    fn test_chunk_config_validation() {
        let mut config = ChunkConfig::default();

        // Valid config
        assert!(config.validate().is_ok());

        // Invalid: min >= max
        config.min_chunk_size = 1000;
        assert_eq!(
            config.validate(),
            Err(ChunkConfigError::MinNotBelowMax {
                min: 1000,
                max: 1000
            })
        );

        // Invalid: overlap >= max
        config.min_chunk_size = 200;
        config.overlap_size = 1500;
        assert!(matches!(
            config.validate(),
            Err(ChunkConfigError::OverlapNotBelowMax { .. })
        ));

        // Overlap above min is allowed as long as it stays below max
        config.overlap_size = 300;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ChunkConfig = toml::from_str("max_chunk_size = 800").unwrap();
        assert_eq!(config.max_chunk_size, 800);
        assert_eq!(config.min_chunk_size, 200);
        assert!(config.preserve_sentences);
    }
}
