//! Embeddable core library for rulegen.
//!
//! Provides a clap-free, I/O-abstracted entry point for generating and merging build files, so
//! the pipeline can be linked into other host processes or driven from tests.
//!
//! # Port traits
//!
//! I/O goes through the traits in [`ports`]:
//! - [`PackageSource`](ports::PackageSource) loads the package model
//! - [`RepoView`](ports::RepoView) finds and reads previous build files
//! - [`WritePort`](ports::WritePort) writes changed build files
//!
//! The [`adapters`] module provides filesystem-backed and in-memory implementations.
//!
//! # Entry points
//!
//! - [`run_generate`](pipeline::run_generate) generates, merges and (unless dry-running) writes
//!   one build file per package

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use rulegen_types::{GeneratorConfig, Package, ResolverMode};
