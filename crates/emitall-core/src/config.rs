//! Plugin configuration.
//!
//! Options may come from a JSON config file in the project root:
//!
//! ```json
//! {
//!   "ignorePattern": "node_modules|\\.stories\\.",
//!   "ignoreExternals": true,
//!   "path": "dist/modules"
//! }
//! ```

use crate::error::{Error, Result};
use regex_lite::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};

/// Pattern excluding dependency directories from emission.
pub const DEFAULT_IGNORE_PATTERN: &str = "node_modules";

/// Config file names in priority order.
const CONFIG_FILES: &[&str] = &["emitall.config.json", ".emitallrc.json"];

/// Options of the emit-all plugin. Fixed for the lifetime of a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmitAllOptions {
    /// Modules whose absolute path matches are not emitted.
    #[serde(
        serialize_with = "serialize_pattern",
        deserialize_with = "deserialize_pattern"
    )]
    pub ignore_pattern: Regex,
    /// Skip modules the host marks as external.
    pub ignore_externals: bool,
    /// Output directory; the host's output path when unset.
    pub path: Option<PathBuf>,
}

impl Default for EmitAllOptions {
    fn default() -> Self {
        Self {
            ignore_pattern: default_ignore_pattern(),
            ignore_externals: false,
            path: None,
        }
    }
}

impl EmitAllOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ignore pattern from its source text.
    pub fn with_ignore_pattern(mut self, pattern: &str) -> Result<Self> {
        self.ignore_pattern = compile_pattern(pattern)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_ignore_externals(mut self, ignore: bool) -> Self {
        self.ignore_externals = ignore;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Whether a module at `path` is excluded by the ignore pattern.
    #[must_use]
    pub fn should_ignore(&self, path: &Path) -> bool {
        self.ignore_pattern.is_match(&path.to_string_lossy())
    }
}

/// Find a config file in the given root directory.
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.exists())
}

/// Load options from a config file in `root`.
///
/// If `config_path` is `Some`, that file must exist (relative paths are taken
/// from `root`). Otherwise the root is searched and defaults are used when
/// nothing is found. A relative `path` option is resolved against `root`.
pub fn load_config(root: &Path, config_path: Option<&Path>) -> Result<EmitAllOptions> {
    let path = match config_path {
        Some(p) => {
            let abs = root.join(p);
            if !abs.exists() {
                return Err(Error::ConfigNotFound { path: abs });
            }
            abs
        }
        None => match find_config_file(root) {
            Some(p) => p,
            None => return Ok(EmitAllOptions::default()),
        },
    };

    let text = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
        path: path.clone(),
        source,
    })?;
    let mut options: EmitAllOptions =
        serde_json::from_str(&text).map_err(|source| Error::ConfigParse { path, source })?;

    if let Some(out) = options.path.take() {
        options.path = Some(root.join(out));
    }
    Ok(options)
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn default_ignore_pattern() -> Regex {
    Regex::new(DEFAULT_IGNORE_PATTERN).unwrap_or_else(|_| unreachable!("literal pattern"))
}

fn serialize_pattern<S: Serializer>(pattern: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(pattern.as_str())
}

fn deserialize_pattern<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Regex, D::Error> {
    let source = String::deserialize(deserializer)?;
    Regex::new(&source).map_err(serde::de::Error::custom)
}
