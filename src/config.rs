//! Model configuration.
//!
//! A [`TransformerConfig`] is built once, validated, and then shared read-only (behind an
//! `Arc`) by every part of the model.
//!
//! ```rust
//! use decoder_rs::config::TransformerConfig;
//!
//! let config = TransformerConfig::new(2, 4, 100, 32, 64).with_dropout(0.0);
//! config.validate().unwrap();
//! assert_eq!(config.head_size(), 8);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while building or loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Validation(String),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

fn default_dropout() -> f64 {
    0.1
}

fn default_layer_norm_epsilon() -> f64 {
    1e-5
}

/// Hyperparameters of a decoder-only transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerConfig {
    /// Number of stacked decoder blocks.
    pub num_layers: usize,
    /// Number of attention heads. Must divide `hidden_size`.
    pub num_heads: usize,
    /// Vocabulary size.
    pub vocab_size: usize,
    /// Width of every hidden state.
    pub hidden_size: usize,
    /// Length of the precomputed positional table.
    pub max_seq_len: usize,
    /// Dropout probability, in `[0, 1)`.
    #[serde(default = "default_dropout")]
    pub dropout: f64,
    /// Epsilon used by the per-block layer norms.
    #[serde(default = "default_layer_norm_epsilon")]
    pub layer_norm_epsilon: f64,
}

impl TransformerConfig {
    /// Creates a config with default `dropout` (0.1) and `layer_norm_epsilon` (1e-5).
    pub fn new(
        num_layers: usize,
        num_heads: usize,
        vocab_size: usize,
        hidden_size: usize,
        max_seq_len: usize,
    ) -> Self {
        Self {
            num_layers,
            num_heads,
            vocab_size,
            hidden_size,
            max_seq_len,
            dropout: default_dropout(),
            layer_norm_epsilon: default_layer_norm_epsilon(),
        }
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_layer_norm_epsilon(mut self, eps: f64) -> Self {
        self.layer_norm_epsilon = eps;
        self
    }

    /// Width of one attention head.
    pub fn head_size(&self) -> usize {
        if self.num_heads == 0 {
            0
        } else {
            self.hidden_size / self.num_heads
        }
    }

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("num_layers", self.num_layers),
            ("num_heads", self.num_heads),
            ("vocab_size", self.vocab_size),
            ("hidden_size", self.hidden_size),
            ("max_seq_len", self.max_seq_len),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{name} must be >= 1")));
            }
        }

        if self.hidden_size % self.num_heads != 0 {
            return Err(ConfigError::Validation(format!(
                "hidden_size ({}) must be divisible by num_heads ({})",
                self.hidden_size, self.num_heads
            )));
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ConfigError::Validation(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }

        if self.layer_norm_epsilon.is_nan() || self.layer_norm_epsilon <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "layer_norm_epsilon must be > 0, got {}",
                self.layer_norm_epsilon
            )));
        }

        Ok(())
    }

    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
