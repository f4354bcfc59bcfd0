//! Output path flattening.
//!
//! Maps an absolute module path (or a relative specifier seen from a module)
//! onto its location in the emitted tree. The mapping is purely lexical: the
//! filesystem is never consulted, so the same inputs always produce the same
//! output.
//!
//! ```text
//! root   = /proj/src
//! module = /proj/src/a/b.js
//!
//! "./c"          -> ./a/c.js
//! "../c"         -> ./c.js
//! "../../lib/x"  -> ./_/lib/x.js
//! ".."           -> ./index.js
//! ```

use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// Directory segment substituted for every `..` so output never leaves its root.
pub const PARENT_PLACEHOLDER: &str = "_";

/// Extension given to every emitted module.
pub const EMITTED_EXTENSION: &str = ".js";

/// Name used when a mapped path has no usable file name.
const INDEX_NAME: &str = "index";

/// Where a module lands in the emitted tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PathMapping {
    /// `output_root` joined with the relative path, forward slashes.
    pub absolute_output_path: String,
    /// Explicitly relative (`./`-prefixed) path, forward slashes.
    pub relative_output_path: String,
}

/// Maps module paths onto a flattened output tree.
#[derive(Debug, Clone)]
pub struct PathMapper {
    project_root: PathBuf,
    output_root: PathBuf,
}

impl PathMapper {
    /// Create a mapper for the given project root and output directory.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: normalize(&project_root.into()),
            output_root: normalize(&output_root.into()),
        }
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Map `specifier` as imported from the module at `current_path`.
    ///
    /// The specifier is resolved against the directory of `current_path`. If
    /// that directory is relative (an empty current path, for instance) it is
    /// taken relative to the project root.
    #[must_use]
    pub fn map(&self, current_path: &Path, specifier: &str) -> PathMapping {
        let base = current_path.parent().unwrap_or_else(|| Path::new(""));
        let base = if base.is_absolute() {
            base.to_path_buf()
        } else {
            self.project_root.join(base)
        };
        self.map_target(&normalize(&base.join(specifier)))
    }

    /// Map a module's own absolute path.
    #[must_use]
    pub fn map_module(&self, module_path: &Path) -> PathMapping {
        self.map_target(&normalize(&self.project_root.join(module_path)))
    }

    /// Map an entry request, treated as relative to the project root.
    #[must_use]
    pub fn map_entry(&self, request: &str) -> PathMapping {
        self.map(Path::new(""), request)
    }

    fn map_target(&self, target: &Path) -> PathMapping {
        let flattened = flatten(&relative_to(&self.project_root, target));
        PathMapping {
            absolute_output_path: to_slash(&self.output_root.join(&flattened)),
            relative_output_path: format!("./{flattened}"),
        }
    }
}

/// Lexically normalize a path: drop `.`, fold `..` into its parent.
///
/// Leading `..` segments of a relative path are kept; `..` above a root is dropped.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(result.components().next_back(), Some(Component::Normal(_))) {
                    result.pop();
                } else if !result.has_root() {
                    result.push("..");
                }
            }
            other => result.push(other),
        }
    }
    result
}

/// Path of `target` relative to `root`; both must already be normalized.
fn relative_to(root: &Path, target: &Path) -> PathBuf {
    let root: Vec<Component<'_>> = root.components().collect();
    let target: Vec<Component<'_>> = target.components().collect();
    let common = root
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..root.len() {
        relative.push("..");
    }
    for component in &target[common..] {
        relative.push(component);
    }
    relative
}

/// Flatten a root-relative path into an emitted file path (no `./` prefix).
///
/// An empty file name (a dotfile such as `.config`, or a trailing `..`) becomes `index`.
fn flatten(relative: &Path) -> String {
    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::ParentDir => Some(PARENT_PLACEHOLDER.to_string()),
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            // A root or drive prefix only survives when the target shares
            // nothing with the project root; it has no place in the tree.
            Component::RootDir | Component::Prefix(_) | Component::CurDir => None,
        })
        .collect();

    let last_is_parent = matches!(relative.components().next_back(), Some(Component::ParentDir));
    let name = if last_is_parent {
        INDEX_NAME.to_string()
    } else {
        let file = segments.pop().unwrap_or_default();
        let stem = file.split('.').next().unwrap_or_default();
        if stem.is_empty() {
            INDEX_NAME.to_string()
        } else {
            stem.to_string()
        }
    };

    segments.push(format!("{name}{EMITTED_EXTENSION}"));
    segments.join("/")
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
