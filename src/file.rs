//! Resolved command file and library descriptors.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::command::export_key;
use crate::graceful_map::GracefulMap;

/// Namespace string to the command files discovered for it, in resolution order.
pub type NamespaceMap = GracefulMap<String, Vec<CommandFile>>;

/// Library name to the prebuilt modules re-exported under it.
pub type LibraryMap = GracefulMap<String, Vec<LibModule>>;

/// Statically inferred shape of a command file's `handler`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HandlerSignature {
    pub is_async: bool,
    /// Type of the single model argument; `None` for zero-argument handlers.
    pub model: Option<String>,
    /// Declared return type, `()` when omitted.
    pub output: String,
}

impl HandlerSignature {
    /// True when the declared output is some `Result`, e.g. `anyhow::Result<T>`.
    pub fn returns_result(&self) -> bool {
        let head = self.output.split('<').next().unwrap_or_default();
        head.rsplit("::").next() == Some("Result")
    }
}

/// A source file that declares a command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandFile {
    pub abs_path: PathBuf,
    /// Path of the file relative to the generated wiring directory, `/`-separated.
    pub import_path: String,
    /// Path of the file relative to the commands root, `/`-separated.
    pub rel_path: String,
    pub name: String,
    pub version: Option<String>,
    /// `name` or `name@version`.
    pub export_key: String,
    /// Dot-joined namespace derived from the file's directory.
    pub parent: String,
    pub handler: HandlerSignature,
}

impl CommandFile {
    pub fn new(
        abs_path: PathBuf,
        import_path: String,
        rel_path: String,
        name: String,
        version: Option<String>,
        parent: String,
        handler: HandlerSignature,
    ) -> Self {
        let version = version.filter(|v| !v.is_empty());
        let export_key = export_key(&name, version.as_deref());
        Self {
            abs_path,
            import_path,
            rel_path,
            name,
            version,
            export_key,
            parent,
            handler,
        }
    }

    /// Namespace the file is grouped under.
    pub fn namespace(&self) -> String {
        self.parent.replace(['/', '\\'], ".")
    }

    /// `<namespace>.<exportKey>`, the composite key the container resolves.
    pub fn export_name(&self) -> String {
        format!("{}.{}", self.namespace(), self.export_key)
    }
}

/// Externally built library as configured in `coresep.toml`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LibSpec {
    pub name: String,
    /// Rust path to the library's generated glue root, e.g. `::tools::coresep`.
    pub path: String,
    #[serde(default)]
    pub modules: Vec<LibModuleSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LibModuleSpec {
    pub name: String,
    #[serde(default)]
    pub commands: Vec<String>,
}

/// One module of a library after resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LibModule {
    pub lib: String,
    pub path: String,
    pub module: String,
    pub commands: Vec<String>,
}

impl LibModule {
    /// Composite keys of the module's commands: `<lib>.<module>.<command>`.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.commands
            .iter()
            .map(|c| format!("{}.{}.{}", self.lib, self.module, c))
    }
}

/// Turn a namespace or file stem into a Rust identifier.
pub fn ident(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Words that cannot appear bare as a module name.
const RESERVED: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Path segments that have no raw form.
const PATH_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

/// Like [`ident`], but safe to use as a module name in generated source.
///
/// Reserved words become raw identifiers (`r#match`). Path keywords, which
/// cannot be raw, and a lone `_` get a trailing underscore instead.
pub fn module_ident(raw: &str) -> String {
    let base = ident(raw);
    if RESERVED.contains(&base.as_str()) {
        format!("r#{base}")
    } else if PATH_KEYWORDS.contains(&base.as_str()) || base == "_" {
        format!("{base}_")
    } else {
        base
    }
}

/// Lexically compute `target` relative to `base`; both should be absolute.
pub fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = target.components().collect();
    let shared = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in shared..base.len() {
        out.push("..");
    }
    for part in &target[shared..] {
        out.push(part.as_os_str());
    }
    out
}

/// Render a path with `/` separators regardless of platform.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
