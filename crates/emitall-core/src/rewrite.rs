//! Import specifier rewriting.
//!
//! Parses a module's compiled text with SWC and substitutes the string literal
//! of every relative import-like form with the path of the emitted sibling:
//!
//! - `import x from "./a"` and `import "./a"`
//! - `export * from "./a"` and `export { x } from "./a"`
//! - `require("./a")`
//! - `import("./a")`
//!
//! Everything outside the replaced literals is copied through byte-for-byte.
//! Bare specifiers are left alone; non-literal arguments to `require`/`import()`
//! cannot be rewritten statically and only produce a warning.

use crate::error::{Error, Result};
use crate::path_map::PathMapper;
use std::path::Path;
use swc_common::{sync::Lrc, BytePos, FileName, SourceMap, Span, Spanned};
use swc_ecma_ast::{
    CallExpr, Callee, EsVersion, ExportAll, Expr, ImportDecl, Lit, NamedExport, Str,
};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};
use swc_ecma_visit::{Visit, VisitWith};

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Byte range of a literal in the module text, quotes included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LiteralSpan {
    pub start: usize,
    pub end: usize,
}

/// A relative specifier literal located during the parse pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteTarget {
    pub span: LiteralSpan,
    /// Specifier value as written (unquoted).
    pub value: String,
}

/// Rewrites relative import specifiers to their emitted locations.
#[derive(Debug, Clone, Copy)]
pub struct ImportRewriter<'a> {
    mapper: &'a PathMapper,
}

impl<'a> ImportRewriter<'a> {
    #[must_use]
    pub fn new(mapper: &'a PathMapper) -> Self {
        Self { mapper }
    }

    /// Rewrite the module at `module_path` whose compiled text is `source`.
    pub fn rewrite(&self, module_path: &Path, source: &str) -> Result<String> {
        let targets = collect_targets(module_path, source)?;
        if targets.is_empty() {
            return Ok(source.to_string());
        }

        let mut result = String::with_capacity(source.len() + targets.len() * 8);
        let mut index = 0;
        for target in &targets {
            if target.span.start < index {
                continue;
            }
            let mapped = self.mapper.map(module_path, &target.value);
            result.push_str(&source[index..target.span.start]);
            result.push_str(&quote(&mapped.relative_output_path));
            index = target.span.end;
        }
        result.push_str(&source[index..]);

        Ok(result)
    }
}

/// Find every relative specifier literal in `source`, in ascending offset order.
///
/// Offsets index into `source` as given, byte-order mark included.
pub fn collect_targets(module_path: &Path, source: &str) -> Result<Vec<RewriteTarget>> {
    // swc drops a leading BOM before assigning spans.
    let (bom_len, text) = match source.strip_prefix(BYTE_ORDER_MARK) {
        Some(rest) => (BYTE_ORDER_MARK.len_utf8(), rest),
        None => (0, source),
    };

    let cm: Lrc<SourceMap> = Lrc::default();
    let fm = cm.new_source_file(
        Lrc::new(FileName::Real(module_path.to_path_buf())),
        text.to_string(),
    );

    let syntax = Syntax::Es(EsSyntax {
        import_attributes: true,
        ..Default::default()
    });
    let lexer = Lexer::new(
        syntax,
        EsVersion::EsNext,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let module = parser.parse_module().map_err(|e| Error::Parse {
        path: module_path.to_path_buf(),
        message: format!("{:?}", e.kind()),
    })?;

    let errors: Vec<String> = parser
        .take_errors()
        .into_iter()
        .map(|e| format!("{:?}", e.kind()))
        .collect();
    if !errors.is_empty() {
        return Err(Error::Parse {
            path: module_path.to_path_buf(),
            message: errors.join(", "),
        });
    }

    let mut collector = SpecifierCollector {
        module_path,
        file_start: fm.start_pos,
        bom_len,
        targets: Vec::new(),
    };
    module.visit_with(&mut collector);

    let mut targets = collector.targets;
    targets.sort_by_key(|t| t.span);
    Ok(targets)
}

/// Whether a specifier is resolved relative to the importing file.
#[must_use]
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with('.')
}

pub(crate) fn quote(path: &str) -> String {
    // Serializing a str cannot fail.
    serde_json::to_string(path).unwrap_or_else(|_| format!("\"{path}\""))
}

struct SpecifierCollector<'p> {
    module_path: &'p Path,
    file_start: BytePos,
    bom_len: usize,
    targets: Vec<RewriteTarget>,
}

impl SpecifierCollector<'_> {
    fn offsets(&self, span: Span) -> LiteralSpan {
        LiteralSpan {
            start: (span.lo.0 - self.file_start.0) as usize + self.bom_len,
            end: (span.hi.0 - self.file_start.0) as usize + self.bom_len,
        }
    }

    fn source_literal(&mut self, src: &Str) {
        let value: &str = &src.value;
        if is_relative_specifier(value) {
            self.targets.push(RewriteTarget {
                span: self.offsets(src.span),
                value: value.to_string(),
            });
        }
    }

    fn call_argument(&mut self, call: &CallExpr, callee: &str) {
        let Some(arg) = call.args.first() else {
            tracing::warn!(
                module = %self.module_path.display(),
                callee,
                "{callee}() call without arguments ignored"
            );
            return;
        };

        match (&arg.spread, &*arg.expr) {
            (None, Expr::Lit(Lit::Str(src))) => self.source_literal(src),
            _ => {
                let span = self.offsets(arg.expr.span());
                tracing::warn!(
                    module = %self.module_path.display(),
                    callee,
                    offset = span.start,
                    "non-literal or non-string {callee}() argument ignored"
                );
            }
        }
    }
}

impl Visit for SpecifierCollector<'_> {
    fn visit_import_decl(&mut self, node: &ImportDecl) {
        self.source_literal(&node.src);
    }

    fn visit_export_all(&mut self, node: &ExportAll) {
        self.source_literal(&node.src);
    }

    fn visit_named_export(&mut self, node: &NamedExport) {
        if let Some(src) = &node.src {
            self.source_literal(src);
        }
    }

    fn visit_call_expr(&mut self, node: &CallExpr) {
        match &node.callee {
            Callee::Import(_) => self.call_argument(node, "import"),
            Callee::Expr(callee) => {
                if let Expr::Ident(ident) = &**callee {
                    if &*ident.sym == "require" {
                        self.call_argument(node, "require");
                    }
                }
            }
            Callee::Super(_) => {}
        }
        node.visit_children_with(self);
    }
}
