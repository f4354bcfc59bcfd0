#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Per-module emission for JavaScript builds.
//!
//! Alongside a bundler's chunks, every compiled source module is written as its
//! own file in a flattened output tree, with relative imports rewritten to point
//! at the emitted siblings. Each entry chunk also gets a `.d.ts` stub
//! re-exporting the entry's emitted module.

pub mod config;
pub mod error;
pub mod fs;
pub mod host;
pub mod manifest;
pub mod path_map;
pub mod pipeline;
pub mod plugin;
pub mod rewrite;

#[cfg(test)]
mod test_support;

pub use config::{load_config, EmitAllOptions};
pub use error::{Error, Result};
pub use fs::{DiskFileSystem, MemoryFileSystem, OutputFileSystem};
pub use host::{AssetMap, BuildHost, ChunkId, EntryPoint, ModuleId, ModuleKind, ModuleRecord};
pub use manifest::{BuildManifest, ManifestHost};
pub use path_map::{PathMapper, PathMapping};
pub use pipeline::{run, EmitSummary, WriteQueue};
pub use plugin::{EmitAllPlugin, EntryStub, ModuleEmit, Plugin};
pub use rewrite::ImportRewriter;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
