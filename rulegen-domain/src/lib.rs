//! Domain logic: turn a package model into generated rules.
//!
//! This crate owns *what* gets declared for a package and how its imports map to labels. Merging
//! the result into an existing build file is the `rulegen-merge` crate's job.

mod generator;
mod load;
mod resolve;

pub use generator::{Generator, rule_call};
pub use load::{Load, compose_load, load_stmt};
pub use resolve::{
    ExternalResolver, ModeResolver, ResolveError, ResolveErrorKind, Resolver, VendoredResolver,
    WorkspaceResolver,
};
