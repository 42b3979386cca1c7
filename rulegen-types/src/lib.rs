//! Shared model types for the rulegen workspace.
//!
//! # Design constraints
//! - Values here are immutable once built and recomputed on every run.
//! - Catalogs (kinds, attribute priorities) are fixed tables; output stability depends on them.
//! - The package model is supplied by an external provider, so it is serde-friendly and tolerant.

pub mod attrs;
pub mod config;
pub mod kinds;
pub mod label;
pub mod package;
pub mod rule;

pub use config::{ConfigError, ExternalRepo, GeneratorConfig, ResolverMode};
pub use label::{Label, LabelParseError};
pub use package::{Package, PlatformStrings, Target};
pub use rule::{AttrValue, Rule};
