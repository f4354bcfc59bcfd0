//! The boundary to the host build tool.
//!
//! emitall never compiles, resolves or chunks anything itself. Everything it
//! needs from the build (finished modules, their compiled text, entry points
//! and chunk file names) comes through [`BuildHost`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of a module within one build.
pub type ModuleId = usize;

/// Identifier of an output chunk within one build.
pub type ChunkId = usize;

/// Module type tag as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModuleKind {
    #[default]
    JavascriptAuto,
    JavascriptEsm,
    JavascriptDynamic,
    Json,
    Css,
    Asset,
    Other(String),
}

impl ModuleKind {
    /// Whether modules of this kind are emitted (the `javascript/*` family).
    #[must_use]
    pub fn is_script(&self) -> bool {
        match self {
            Self::JavascriptAuto | Self::JavascriptEsm | Self::JavascriptDynamic => true,
            Self::Other(tag) => tag.starts_with("javascript/"),
            Self::Json | Self::Css | Self::Asset => false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::JavascriptAuto => "javascript/auto",
            Self::JavascriptEsm => "javascript/esm",
            Self::JavascriptDynamic => "javascript/dynamic",
            Self::Json => "json",
            Self::Css => "css",
            Self::Asset => "asset",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for ModuleKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "javascript/auto" => Self::JavascriptAuto,
            "javascript/esm" => Self::JavascriptEsm,
            "javascript/dynamic" => Self::JavascriptDynamic,
            "json" => Self::Json,
            "css" => Self::Css,
            "asset" => Self::Asset,
            _ => Self::Other(tag),
        }
    }
}

impl From<ModuleKind> for String {
    fn from(kind: ModuleKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A module the host has finished compiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub id: ModuleId,
    /// Absolute path of the module's source file. Virtual modules have none.
    #[serde(default)]
    pub resource: Option<PathBuf>,
    #[serde(rename = "type", default)]
    pub kind: ModuleKind,
    /// Set for modules the host leaves to the runtime environment.
    #[serde(default)]
    pub external: bool,
    /// Directory the host resolved this module's own requests from.
    #[serde(default)]
    pub context: Option<PathBuf>,
}

impl ModuleRecord {
    /// Create a script module record for the given path.
    #[must_use]
    pub fn new(id: ModuleId, resource: impl Into<PathBuf>) -> Self {
        let resource = resource.into();
        let context = resource.parent().map(Path::to_path_buf);
        Self {
            id,
            resource: Some(resource),
            kind: ModuleKind::JavascriptAuto,
            external: false,
            context,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ModuleKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }
}

/// A configured build entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    pub name: String,
    /// The entry request exactly as configured, e.g. `./src/index.js`.
    pub request: String,
    /// Modules the entry depends on; the first one is the entry module.
    #[serde(default)]
    pub dependencies: Vec<ModuleId>,
}

/// Build assets by file name, relative to the output directory.
pub type AssetMap = BTreeMap<String, String>;

/// What emitall reads from the host build.
pub trait BuildHost {
    /// Project root that output paths are computed relative to.
    fn context(&self) -> &Path;

    /// Default output directory of the build.
    fn output_path(&self) -> &Path;

    /// Finished modules in the order the host completed them.
    fn modules(&self) -> &[ModuleRecord];

    fn module(&self, id: ModuleId) -> Option<&ModuleRecord> {
        self.modules().iter().find(|m| m.id == id)
    }

    /// Compiled text of a module.
    fn compiled_source(&self, id: ModuleId) -> Option<&str>;

    fn entries(&self) -> &[EntryPoint];

    /// Chunks a module was assigned to.
    fn module_chunks(&self, id: ModuleId) -> Vec<ChunkId>;

    /// Output file names of a chunk.
    fn chunk_files(&self, chunk: ChunkId) -> &[String];
}
