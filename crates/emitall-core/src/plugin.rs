//! The emit-all plugin.
//!
//! Hooks into two points of a build:
//!
//! - **succeed module**: every finished script module is rewritten and
//!   scheduled to be written to its flattened location in the output tree.
//! - **process assets**: once all modules are done, each entry gets a
//!   `.d.ts` stub next to its chunk re-exporting the entry's emitted module.

use crate::config::EmitAllOptions;
use crate::error::Result;
use crate::host::{AssetMap, BuildHost, ModuleId, ModuleRecord};
use crate::path_map::{PathMapper, PathMapping};
use crate::rewrite::{quote, ImportRewriter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extension of emitted chunk files that get a declaration stub.
const CHUNK_EXTENSION: &str = ".js";

/// Extension of declaration stubs.
const DECLARATION_EXTENSION: &str = ".d.ts";

/// A module ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEmit {
    pub module: ModuleId,
    /// Absolute source path of the module.
    pub resource: PathBuf,
    pub mapping: PathMapping,
    /// Rewritten compiled text.
    pub code: String,
}

/// A declaration stub for one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryStub {
    pub entry: String,
    pub chunk_file: String,
    pub stub_file: String,
    pub content: String,
}

/// Lifecycle hooks a build calls into.
///
/// Both hooks default to doing nothing.
pub trait Plugin: Send + Sync {
    /// Plugin name for debugging and error messages.
    fn name(&self) -> &str;

    /// Called once for every module the host finished compiling.
    ///
    /// Return `Some(emit)` to have the module written.
    fn succeed_module(
        &self,
        _host: &dyn BuildHost,
        _module: &ModuleRecord,
    ) -> Result<Option<ModuleEmit>> {
        Ok(None)
    }

    /// Called once after every module has been handled and written.
    fn process_assets(&self, _host: &dyn BuildHost, _assets: &mut AssetMap) -> Result<()> {
        Ok(())
    }
}

/// Emits every module as its own file, plus a declaration stub per entry.
#[derive(Debug, Clone, Default)]
pub struct EmitAllPlugin {
    options: Arc<EmitAllOptions>,
}

impl EmitAllPlugin {
    #[must_use]
    pub fn new(options: EmitAllOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    #[must_use]
    pub fn options(&self) -> &EmitAllOptions {
        &self.options
    }

    /// Path mapper for a build: the configured output path wins over the host's.
    #[must_use]
    pub fn mapper(&self, host: &dyn BuildHost) -> PathMapper {
        let output = self.options.path.as_deref().unwrap_or(host.output_path());
        PathMapper::new(host.context(), output)
    }

    /// Decide whether `module` is emitted and, if so, produce its output.
    pub fn handle_module(
        &self,
        host: &dyn BuildHost,
        module: &ModuleRecord,
    ) -> Result<Option<ModuleEmit>> {
        let Some(resource) = self.emit_path(module) else {
            return Ok(None);
        };

        let mapper = self.mapper(host);
        let mapping = mapper.map_module(resource);
        let source = host.compiled_source(module.id).unwrap_or_default();
        let code = ImportRewriter::new(&mapper).rewrite(resource, source)?;

        tracing::debug!(
            module = %resource.display(),
            output = %mapping.absolute_output_path,
            "module rewritten"
        );

        Ok(Some(ModuleEmit {
            module: module.id,
            resource: resource.to_path_buf(),
            mapping,
            code,
        }))
    }

    /// The module's path if it passes every filter, checked in order:
    /// kind, path presence, external flag, ignore pattern.
    fn emit_path<'m>(&self, module: &'m ModuleRecord) -> Option<&'m Path> {
        if !module.kind.is_script() {
            tracing::debug!(id = module.id, kind = %module.kind, "skipping non-script module");
            return None;
        }
        let Some(resource) = module.resource.as_deref() else {
            tracing::debug!(id = module.id, "skipping module without a path");
            return None;
        };
        if self.options.ignore_externals && module.external {
            tracing::debug!(module = %resource.display(), "skipping external module");
            return None;
        }
        if self.options.should_ignore(resource) {
            tracing::debug!(module = %resource.display(), "skipping ignored module");
            return None;
        }
        Some(resource)
    }

    /// Declaration stubs for every entry that resolves to an emitted chunk file.
    #[must_use]
    pub fn entry_stubs(&self, host: &dyn BuildHost) -> Vec<EntryStub> {
        let mapper = self.mapper(host);
        let mut stubs = Vec::new();

        for entry in host.entries() {
            let chunk_file = entry
                .dependencies
                .first()
                .and_then(|&module| host.module_chunks(module).first().copied())
                .and_then(|chunk| host.chunk_files(chunk).first().cloned());
            let Some(chunk_file) = chunk_file else {
                tracing::debug!(entry = %entry.name, "entry has no chunk file, no stub");
                continue;
            };
            let Some(stub_file) = declaration_file_name(&chunk_file) else {
                tracing::debug!(entry = %entry.name, %chunk_file, "chunk is not a .js file, no stub");
                continue;
            };

            let target = mapper.map_entry(&entry.request);
            stubs.push(EntryStub {
                entry: entry.name.clone(),
                chunk_file,
                stub_file,
                content: format!("export * from {};\n", quote(&target.relative_output_path)),
            });
        }

        stubs
    }
}

impl Plugin for EmitAllPlugin {
    fn name(&self) -> &str {
        "emit-all"
    }

    fn succeed_module(
        &self,
        host: &dyn BuildHost,
        module: &ModuleRecord,
    ) -> Result<Option<ModuleEmit>> {
        self.handle_module(host, module)
    }

    fn process_assets(&self, host: &dyn BuildHost, assets: &mut AssetMap) -> Result<()> {
        for stub in self.entry_stubs(host) {
            tracing::info!(entry = %stub.entry, stub = %stub.stub_file, "declaration stub");
            assets.insert(stub.stub_file, stub.content);
        }
        Ok(())
    }
}

/// `dir/main.js` → `dir/main.d.ts`; `None` for anything not ending in `.js`.
#[must_use]
pub fn declaration_file_name(chunk_file: &str) -> Option<String> {
    chunk_file
        .strip_suffix(CHUNK_EXTENSION)
        .map(|stem| format!("{stem}{DECLARATION_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestHost;
    use crate::test_support::CapturedLogs;

    fn host() -> ManifestHost {
        ManifestHost::from_json(
            r#"{
                "context": "/proj",
                "outputPath": "/proj/dist",
                "modules": [
                    { "id": 0, "resource": "/proj/src/index.js", "source": "import { a } from './lib/a';\nexport default a;\n" },
                    { "id": 1, "resource": "/proj/src/lib/a.js", "type": "javascript/esm", "source": "export const a = require('lodash');\n" },
                    { "id": 2, "resource": "/proj/node_modules/lodash/index.js", "source": "module.exports = {};" },
                    { "id": 3, "resource": "/proj/src/styles.css", "type": "css", "source": "body {}" },
                    { "id": 4, "type": "javascript/auto", "source": "export {};" },
                    { "id": 5, "resource": "/proj/src/ext.js", "external": true, "source": "module.exports = globalThis.ext;" }
                ],
                "chunks": [
                    { "id": 0, "files": ["js/main.js", "js/main.js.map"], "modules": [0, 1] },
                    { "id": 1, "files": ["styles.css"], "modules": [3] }
                ],
                "entries": [
                    { "name": "main", "request": "./src/index.js", "dependencies": [0] },
                    { "name": "styles", "request": "./src/styles.css", "dependencies": [3] },
                    { "name": "orphan", "request": "./src/orphan.js", "dependencies": [9] },
                    { "name": "empty", "request": "./src/empty.js" }
                ]
            }"#,
            Path::new("/"),
        )
        .unwrap()
    }

    fn record(host: &ManifestHost, id: ModuleId) -> &ModuleRecord {
        host.module(id).unwrap()
    }

    #[test]
    fn test_handle_module_rewrites_and_maps() {
        let host = host();
        let plugin = EmitAllPlugin::default();

        let emit = plugin.handle_module(&host, record(&host, 0)).unwrap().unwrap();
        assert_eq!(emit.mapping.absolute_output_path, "/proj/dist/src/index.js");
        assert_eq!(emit.mapping.relative_output_path, "./src/index.js");
        assert_eq!(
            emit.code,
            "import { a } from \"./src/lib/a.js\";\nexport default a;\n"
        );

        let emit = plugin.handle_module(&host, record(&host, 1)).unwrap().unwrap();
        assert_eq!(emit.code, "export const a = require('lodash');\n");
    }

    #[test]
    fn test_handle_module_skips() {
        let host = host();
        let plugin = EmitAllPlugin::default();

        // node_modules matches the default ignore pattern.
        assert!(plugin.handle_module(&host, record(&host, 2)).unwrap().is_none());
        // Not a script.
        assert!(plugin.handle_module(&host, record(&host, 3)).unwrap().is_none());
        // No path.
        assert!(plugin.handle_module(&host, record(&host, 4)).unwrap().is_none());
    }

    #[test]
    fn test_every_skip_is_logged_at_debug() {
        let host = host();
        let plugin = EmitAllPlugin::new(EmitAllOptions::new().with_ignore_externals(true));
        let logs = CapturedLogs::default();

        tracing::subscriber::with_default(logs.subscriber(), || {
            for id in [2, 3, 4, 5] {
                assert!(plugin.handle_module(&host, record(&host, id)).unwrap().is_none());
            }
        });

        let output = logs.contents();
        for message in [
            "skipping ignored module",
            "skipping non-script module",
            "skipping module without a path",
            "skipping external module",
        ] {
            let line = output
                .lines()
                .find(|line| line.contains(message))
                .unwrap_or_else(|| panic!("no log line for {message}: {output}"));
            assert!(line.contains("DEBUG"), "{line}");
        }
    }

    #[test]
    fn test_externals_only_skipped_when_enabled() {
        let host = host();

        let plugin = EmitAllPlugin::default();
        assert!(plugin.handle_module(&host, record(&host, 5)).unwrap().is_some());

        let plugin = EmitAllPlugin::new(EmitAllOptions::new().with_ignore_externals(true));
        assert!(plugin.options().ignore_externals);
        assert!(plugin.handle_module(&host, record(&host, 5)).unwrap().is_none());
    }

    #[test]
    fn test_ignore_pattern_checked_before_parsing() {
        let host = ManifestHost::from_json(
            r#"{
                "context": "/proj",
                "outputPath": "/out",
                "modules": [{ "id": 0, "resource": "/proj/gen/broken.js", "source": "this is { not js" }]
            }"#,
            Path::new("/"),
        )
        .unwrap();
        let plugin = EmitAllPlugin::new(EmitAllOptions::new().with_ignore_pattern("/gen/").unwrap());

        assert!(plugin.handle_module(&host, record(&host, 0)).unwrap().is_none());
        assert!(EmitAllPlugin::default()
            .handle_module(&host, record(&host, 0))
            .is_err());
    }

    #[test]
    fn test_configured_path_overrides_output() {
        let host = host();
        let plugin = EmitAllPlugin::new(EmitAllOptions::new().with_path("/elsewhere"));

        let emit = plugin.handle_module(&host, record(&host, 1)).unwrap().unwrap();
        assert_eq!(emit.mapping.absolute_output_path, "/elsewhere/src/lib/a.js");
    }

    #[test]
    fn test_missing_source_is_empty() {
        let host = ManifestHost::from_json(
            r#"{"context": "/p", "outputPath": "/o", "modules": [{ "id": 0, "resource": "/p/a.js" }]}"#,
            Path::new("/"),
        )
        .unwrap();
        let emit = EmitAllPlugin::default()
            .handle_module(&host, record(&host, 0))
            .unwrap()
            .unwrap();
        assert_eq!(emit.code, "");
    }

    #[test]
    fn test_entry_stubs() {
        let host = host();
        let stubs = EmitAllPlugin::default().entry_stubs(&host);

        // styles: chunk file is not .js; orphan: unknown module; empty: no dependencies.
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].entry, "main");
        assert_eq!(stubs[0].chunk_file, "js/main.js");
        assert_eq!(stubs[0].stub_file, "js/main.d.ts");
        assert_eq!(stubs[0].content, "export * from \"./src/index.js\";\n");
    }

    #[test]
    fn test_process_assets_overwrites() {
        let host = host();
        let mut assets = AssetMap::new();
        assets.insert("js/main.d.ts".to_string(), "stale".to_string());
        assets.insert("js/main.js".to_string(), "bundle".to_string());

        EmitAllPlugin::default()
            .process_assets(&host, &mut assets)
            .unwrap();

        assert_eq!(assets["js/main.d.ts"], "export * from \"./src/index.js\";\n");
        assert_eq!(assets["js/main.js"], "bundle");
        assert_eq!(assets.len(), 2);
    }

    #[test]
    fn test_declaration_file_name() {
        assert_eq!(declaration_file_name("main.js").as_deref(), Some("main.d.ts"));
        assert_eq!(
            declaration_file_name("static/js/app.bundle.js").as_deref(),
            Some("static/js/app.bundle.d.ts")
        );
        assert_eq!(declaration_file_name("main.mjs"), None);
        assert_eq!(declaration_file_name("main.js.map"), None);
    }

    #[test]
    fn test_default_hooks_do_nothing() {
        struct Noop;
        impl Plugin for Noop {
            fn name(&self) -> &str {
                "noop"
            }
        }

        let host = host();
        let mut assets = AssetMap::new();
        assert!(Noop.succeed_module(&host, record(&host, 0)).unwrap().is_none());
        Noop.process_assets(&host, &mut assets).unwrap();
        assert!(assets.is_empty());
    }
}
