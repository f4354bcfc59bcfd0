//! Build manifest host.
//!
//! A JSON snapshot of a finished compilation, used to drive emission outside
//! of a live build tool:
//!
//! ```json
//! {
//!   "context": "/project",
//!   "outputPath": "/project/dist",
//!   "modules": [
//!     { "id": 0, "resource": "/project/src/index.js", "type": "javascript/esm",
//!       "source": "export * from './util';" },
//!     { "id": 1, "resource": "/project/src/util.js", "sourcePath": "build/util.js" }
//!   ],
//!   "chunks": [{ "id": 0, "files": ["main.js"], "modules": [0, 1] }],
//!   "entries": [{ "name": "main", "request": "./src/index.js", "dependencies": [0] }]
//! }
//! ```
//!
//! Relative paths (`context`, `outputPath`, `sourcePath`) are resolved against
//! the directory containing the manifest.

use crate::error::{Error, Result};
use crate::host::{BuildHost, ChunkId, EntryPoint, ModuleId, ModuleRecord};
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Serialized form of a finished build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    pub context: PathBuf,
    pub output_path: PathBuf,
    #[serde(default)]
    pub modules: Vec<ManifestModule>,
    #[serde(default)]
    pub chunks: Vec<ManifestChunk>,
    #[serde(default)]
    pub entries: Vec<EntryPoint>,
}

/// A module entry of the manifest: the record plus where its compiled text is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestModule {
    #[serde(flatten)]
    pub record: ModuleRecord,
    /// Compiled text inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// File holding the compiled text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestChunk {
    pub id: ChunkId,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub modules: Vec<ModuleId>,
}

/// [`BuildHost`] backed by a [`BuildManifest`].
#[derive(Debug)]
pub struct ManifestHost {
    context: PathBuf,
    output_path: PathBuf,
    modules: Vec<ModuleRecord>,
    module_index: HashMap<ModuleId, usize>,
    sources: HashMap<ModuleId, String>,
    entries: Vec<EntryPoint>,
    chunk_files: HashMap<ChunkId, Vec<String>>,
    module_chunks: HashMap<ModuleId, Vec<ChunkId>>,
}

impl ManifestHost {
    /// Load a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: BuildManifest =
            serde_json::from_str(&text).map_err(|source| Error::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_manifest(manifest, base)
    }

    /// Build a host from an already parsed manifest.
    ///
    /// `base` is the directory relative manifest paths are resolved against.
    pub fn from_manifest(manifest: BuildManifest, base: &Path) -> Result<Self> {
        let mut modules = Vec::with_capacity(manifest.modules.len());
        let mut module_index = HashMap::default();
        let mut sources = HashMap::default();

        for module in manifest.modules {
            let id = module.record.id;
            let source = match (module.source, module.source_path) {
                (Some(source), _) => Some(source),
                (None, Some(source_path)) => {
                    let path = base.join(source_path);
                    let text = std::fs::read_to_string(&path)
                        .map_err(|source| Error::SourceRead { path, source })?;
                    Some(text)
                }
                (None, None) => None,
            };
            if let Some(source) = source {
                sources.insert(id, source);
            }
            module_index.insert(id, modules.len());
            modules.push(module.record);
        }

        let mut chunk_files = HashMap::default();
        let mut module_chunks: HashMap<ModuleId, Vec<ChunkId>> = HashMap::default();
        for chunk in manifest.chunks {
            for &module in &chunk.modules {
                module_chunks.entry(module).or_default().push(chunk.id);
            }
            chunk_files.insert(chunk.id, chunk.files);
        }

        Ok(Self {
            context: base.join(manifest.context),
            output_path: base.join(manifest.output_path),
            modules,
            module_index,
            sources,
            entries: manifest.entries,
            chunk_files,
            module_chunks,
        })
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str, base: &Path) -> Result<Self> {
        let manifest = serde_json::from_str(json).map_err(|source| Error::ManifestParse {
            path: base.to_path_buf(),
            source,
        })?;
        Self::from_manifest(manifest, base)
    }
}

impl BuildHost for ManifestHost {
    fn context(&self) -> &Path {
        &self.context
    }

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn modules(&self) -> &[ModuleRecord] {
        &self.modules
    }

    fn module(&self, id: ModuleId) -> Option<&ModuleRecord> {
        self.module_index.get(&id).map(|&index| &self.modules[index])
    }

    fn compiled_source(&self, id: ModuleId) -> Option<&str> {
        self.sources.get(&id).map(String::as_str)
    }

    fn entries(&self) -> &[EntryPoint] {
        &self.entries
    }

    fn module_chunks(&self, id: ModuleId) -> Vec<ChunkId> {
        self.module_chunks.get(&id).cloned().unwrap_or_default()
    }

    fn chunk_files(&self, chunk: ChunkId) -> &[String] {
        self.chunk_files.get(&chunk).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ModuleKind;
    use tempfile::tempdir;

    const MANIFEST: &str = r#"{
        "context": "/project",
        "outputPath": "dist",
        "modules": [
            { "id": 7, "resource": "/project/src/index.js", "type": "javascript/esm", "source": "export {};" },
            { "id": 8, "type": "css" }
        ],
        "chunks": [
            { "id": 0, "files": ["main.js", "main.js.map"], "modules": [7] },
            { "id": 1, "files": ["vendor.js"], "modules": [7, 8] }
        ],
        "entries": [{ "name": "main", "request": "./src/index.js", "dependencies": [7] }]
    }"#;

    #[test]
    fn test_from_json() {
        let host = ManifestHost::from_json(MANIFEST, Path::new("/manifests")).unwrap();

        assert_eq!(host.context(), Path::new("/project"));
        assert_eq!(host.output_path(), Path::new("/manifests/dist"));
        assert_eq!(host.modules().len(), 2);
        assert_eq!(host.module(7).unwrap().kind, ModuleKind::JavascriptEsm);
        assert_eq!(host.module(8).unwrap().kind, ModuleKind::Css);
        assert!(host.module(9).is_none());

        assert_eq!(host.compiled_source(7), Some("export {};"));
        assert_eq!(host.compiled_source(8), None);

        assert_eq!(host.module_chunks(7), vec![0, 1]);
        assert_eq!(host.module_chunks(8), vec![1]);
        assert!(host.module_chunks(42).is_empty());
        assert_eq!(host.chunk_files(0), ["main.js", "main.js.map"]);
        assert!(host.chunk_files(5).is_empty());

        assert_eq!(host.entries()[0].request, "./src/index.js");
    }

    #[test]
    fn test_load_reads_source_path() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("build")).unwrap();
        std::fs::write(dir.path().join("build/a.js"), "require('./b');").unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{
                "context": ".",
                "outputPath": "out",
                "modules": [{ "id": 0, "resource": "/x/a.js", "sourcePath": "build/a.js" }]
            }"#,
        )
        .unwrap();

        let host = ManifestHost::load(&dir.path().join("manifest.json")).unwrap();
        assert_eq!(host.compiled_source(0), Some("require('./b');"));
        assert_eq!(host.output_path(), dir.path().join("out"));
    }

    #[test]
    fn test_load_missing_source_path() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{"context": ".", "outputPath": "out", "modules": [{ "id": 0, "sourcePath": "nope.js" }]}"#,
        )
        .unwrap();

        let err = ManifestHost::load(&dir.path().join("manifest.json")).unwrap_err();
        assert!(matches!(err, Error::SourceRead { .. }));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("manifest.json"), "{ not json").unwrap();

        let err = ManifestHost::load(&dir.path().join("manifest.json")).unwrap_err();
        assert!(matches!(err, Error::ManifestParse { .. }));
    }
}
