//! External format compatibility loaders.
//!
//! This module provides loaders for models trained in external frameworks
//! and converts them to native treemax types.

pub mod lightgbm;

pub use lightgbm::{ConversionError, LgbDump, ParseError};
