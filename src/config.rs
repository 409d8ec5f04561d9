//! Encoding configuration with builder pattern.
//!
//! [`EncodingConfig`] collects the constants of the big-M formulation. It uses
//! the `bon` crate for builder generation with validation at build time.
//!
//! # Example
//!
//! ```
//! use treemax::config::EncodingConfig;
//! use treemax::milp::ObjectiveSense;
//!
//! // All defaults: big-M 1e5, epsilon 1e-6, maximize
//! let config = EncodingConfig::builder().build().unwrap();
//!
//! // Tighter big-M for inputs known to live in [0, 10]
//! let config = EncodingConfig::builder()
//!     .big_m(50.0)
//!     .sense(ObjectiveSense::Minimize)
//!     .build()
//!     .unwrap();
//! ```

use bon::Builder;

use crate::milp::ObjectiveSense;

/// Default big-M relaxation constant.
pub const DEFAULT_BIG_M: f64 = 1e5;

/// Default margin separating the strict side of a split from its threshold.
pub const DEFAULT_EPSILON: f64 = 1e-6;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Big-M must be finite and positive.
    InvalidBigM(f64),
    /// Epsilon must be finite and non-negative.
    InvalidEpsilon(f64),
    /// Epsilon must be smaller than big-M, or every branch would be infeasible.
    EpsilonExceedsBigM { epsilon: f64, big_m: f64 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBigM(v) => write!(f, "big_m must be finite and positive, got {}", v),
            Self::InvalidEpsilon(v) => {
                write!(f, "epsilon must be finite and non-negative, got {}", v)
            }
            Self::EpsilonExceedsBigM { epsilon, big_m } => {
                write!(f, "epsilon ({}) must be smaller than big_m ({})", epsilon, big_m)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// EncodingConfig
// =============================================================================

/// Constants of the tree-to-MILP encoding.
///
/// `big_m` must dominate `Σ coeff·x − threshold` over every reachable input,
/// i.e. exceed the widest distance between a feature value and any split
/// threshold on that feature. An undersized value silently cuts off feasible
/// inputs; an oversized one weakens the LP relaxation.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct EncodingConfig {
    /// Relaxation constant of the leaf bound rows. Default: 1e5.
    #[builder(default = DEFAULT_BIG_M)]
    pub big_m: f64,

    /// Margin in the right-branch row `-x <= -threshold + epsilon`, which
    /// stands in for the strict `x > threshold`. Default: 1e-6.
    ///
    /// Both leaves of a split are admissible for inputs in
    /// `[threshold - epsilon, threshold]`; at `x == threshold` the model may
    /// select the right leaf although prediction routes left.
    #[builder(default = DEFAULT_EPSILON)]
    pub epsilon: f64,

    /// Direction of the model objective. Default: maximize.
    #[builder(default)]
    pub sense: ObjectiveSense,
}

/// Custom finishing function that validates the config.
impl<S: encoding_config_builder::IsComplete> EncodingConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `big_m` is not a positive finite number,
    /// `epsilon` is negative or non-finite, or `epsilon >= big_m`.
    pub fn build(self) -> Result<EncodingConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl EncodingConfig {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.big_m.is_finite() || self.big_m <= 0.0 {
            return Err(ConfigError::InvalidBigM(self.big_m));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }
        if self.epsilon >= self.big_m {
            return Err(ConfigError::EpsilonExceedsBigM {
                epsilon: self.epsilon,
                big_m: self.big_m,
            });
        }
        Ok(())
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}
