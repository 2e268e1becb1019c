//! File resolution and namespace building.
//!
//! A [`FileResolver`] decides which files are commands. The provided methods
//! group them into a [`NamespaceMap`], rejecting duplicate export keys inside a
//! namespace, and turn library descriptors into a [`LibraryMap`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ErrorCode, Errorer};
use crate::exports;
use crate::file::{
    CommandFile, LibModule, LibSpec, LibraryMap, NamespaceMap, relative_path, slash_path,
};

pub trait FileResolver {
    /// Resolve one file; `None` when it does not declare a command.
    fn command_file(&self, path: &Path) -> Result<Option<CommandFile>>;

    /// Every command file under `dir`, in a stable traversal order.
    fn each_command_file(&self, dir: &Path) -> Result<Vec<CommandFile>>;

    /// Group the command files under `dir` by namespace.
    fn resolve_modules(&self, dir: &Path) -> Result<NamespaceMap> {
        let mut map = NamespaceMap::new("modules");
        for file in self.each_command_file(dir)? {
            insert_command_file(&mut map, file)?;
        }
        Ok(map)
    }

    /// Group library modules by library name, in the order supplied.
    fn resolve_libs(&self, libs: &[LibSpec]) -> Result<LibraryMap> {
        let mut map = LibraryMap::new("libs");
        for lib in libs {
            for spec in &lib.modules {
                let module = LibModule {
                    lib: lib.name.clone(),
                    path: lib.path.clone(),
                    module: spec.name.clone(),
                    commands: spec.commands.clone(),
                };
                map.update(
                    lib.name.clone(),
                    |mut modules| {
                        modules.push(module);
                        modules
                    },
                    Vec::new(),
                );
            }
        }
        Ok(map)
    }
}

/// Append `file` to its namespace bucket, failing on a duplicate export key.
pub fn insert_command_file(map: &mut NamespaceMap, file: CommandFile) -> Result<()> {
    let namespace = file.namespace();
    if let Some(existing) = map
        .get(&namespace)
        .and_then(|files| files.iter().find(|f| f.export_key == file.export_key))
    {
        return Err(Errorer::select(ErrorCode::DuplicateCommandsInNamespace)
            .with_context(format!(
                "'{}' is declared by both {} and {}",
                file.export_key,
                existing.rel_path,
                file.rel_path
            ))
            .with_context(format!(
                "command '{}' already exists in namespace '{namespace}'",
                file.export_key
            ))
            .throw()
            .into());
    }
    debug!(namespace = %namespace, key = %file.export_key, "command file resolved");
    map.update(
        namespace,
        |mut files| {
            files.push(file);
            files
        },
        Vec::new(),
    );
    Ok(())
}

/// Resolver over Rust source files under a commands root.
#[derive(Clone, Debug)]
pub struct SourceResolver {
    commands_dir: PathBuf,
    wiring_dir: PathBuf,
}

impl SourceResolver {
    /// `wiring_dir` is where per-namespace wiring files are generated; import
    /// paths are computed relative to it.
    pub fn new(commands_dir: impl Into<PathBuf>, wiring_dir: impl Into<PathBuf>) -> Self {
        Self {
            commands_dir: commands_dir.into(),
            wiring_dir: wiring_dir.into(),
        }
    }

    pub fn commands_dir(&self) -> &Path {
        &self.commands_dir
    }

    /// Namespace for a file: its directory below the commands root, dot-joined.
    /// Files directly in the root use the root directory's own name.
    fn parent_of(&self, path: &Path) -> String {
        let dir = path.parent().unwrap_or(Path::new(""));
        let below = dir.strip_prefix(&self.commands_dir).unwrap_or(dir);
        let segments: Vec<String> = below
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.is_empty() {
            self.commands_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "commands".to_string())
        } else {
            segments.join(".")
        }
    }
}

impl FileResolver for SourceResolver {
    fn command_file(&self, path: &Path) -> Result<Option<CommandFile>> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let exports = exports::scan(&source)
            .with_context(|| format!("failed to scan exports of {}", path.display()))?;
        if !exports.is_command() {
            debug!(path = %path.display(), "not a command file");
            return Ok(None);
        }
        let (Some(name), Some(handler)) = (exports.name_value, exports.handler) else {
            return Ok(None);
        };

        let import_path = slash_path(&relative_path(&self.wiring_dir, path));
        let rel_path = slash_path(path.strip_prefix(&self.commands_dir).unwrap_or(path));
        Ok(Some(CommandFile::new(
            path.to_path_buf(),
            import_path,
            rel_path,
            name,
            exports.version_value,
            self.parent_of(path),
            handler,
        )))
    }

    fn each_command_file(&self, dir: &Path) -> Result<Vec<CommandFile>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("failed to walk {}", dir.display()))?;
            if !entry.file_type().is_file() || !is_rust_source(entry.path()) {
                continue;
            }
            if let Some(file) = self.command_file(entry.path())? {
                files.push(file);
            }
        }
        Ok(files)
    }
}

pub fn is_rust_source(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "rs")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::code_of;
    use crate::file::LibModuleSpec;
    use tempfile::TempDir;

    pub(crate) fn command_source(name: &str) -> String {
        format!(
            "pub const NAME: &str = \"{name}\";\n\
             pub fn handler(model: i64) -> anyhow::Result<i64> {{ Ok(model) }}\n"
        )
    }

    pub(crate) fn write(root: &Path, rel: &str, body: &str) -> Result<PathBuf> {
        let path = root.join(rel);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, body)?;
        Ok(path)
    }

    pub(crate) fn project() -> Result<(TempDir, SourceResolver)> {
        let tmp = TempDir::new()?;
        let commands = tmp.path().join("src/commands");
        fs::create_dir_all(&commands)?;
        let resolver = SourceResolver::new(&commands, tmp.path().join("src/coresep/modules"));
        Ok((tmp, resolver))
    }

    #[test]
    fn resolves_namespaces_from_directories() -> Result<()> {
        let (_tmp, resolver) = project()?;
        let root = resolver.commands_dir().to_path_buf();
        write(&root, "math/sub.rs", &command_source("sub"))?;
        write(&root, "math/add.rs", &command_source("add"))?;
        write(&root, "math/ops/mul.rs", &command_source("mul"))?;
        write(&root, "ping.rs", &command_source("ping"))?;
        write(&root, "math/helpers.rs", "pub fn helper() {}")?;
        write(&root, "README.md", "not rust")?;

        let map = resolver.resolve_modules(&root)?;
        let namespaces: Vec<_> = map.keys().cloned().collect();
        assert_eq!(namespaces, ["math", "math.ops", "commands"]);

        let math: Vec<_> = map
            .get(&"math".to_string())
            .unwrap()
            .iter()
            .map(|f| f.export_name())
            .collect();
        assert_eq!(math, ["math.add", "math.sub"]);

        let mul = &map.get(&"math.ops".to_string()).unwrap()[0];
        assert_eq!(mul.import_path, "../../commands/math/ops/mul.rs");
        assert_eq!(mul.rel_path, "math/ops/mul.rs");
        Ok(())
    }

    #[test]
    fn duplicate_key_in_namespace_aborts() -> Result<()> {
        let (_tmp, resolver) = project()?;
        let root = resolver.commands_dir().to_path_buf();
        write(&root, "m/a.rs", &command_source("foo"))?;
        write(&root, "m/b.rs", &command_source("foo"))?;

        let err = resolver.resolve_modules(&root).unwrap_err();
        assert_eq!(code_of(&err), Some(ErrorCode::DuplicateCommandsInNamespace));
        let rendered = format!("{err:#}");
        assert!(rendered.contains("'foo'"));
        assert!(rendered.contains("'m'"));
        Ok(())
    }

    #[test]
    fn same_key_in_different_namespaces_is_fine() -> Result<()> {
        let (_tmp, resolver) = project()?;
        let root = resolver.commands_dir().to_path_buf();
        write(&root, "a/x.rs", &command_source("foo"))?;
        write(&root, "b/x.rs", &command_source("foo"))?;
        let map = resolver.resolve_modules(&root)?;
        assert_eq!(map.len(), 2);
        Ok(())
    }

    #[test]
    fn versions_make_keys_distinct() -> Result<()> {
        let (_tmp, resolver) = project()?;
        let root = resolver.commands_dir().to_path_buf();
        write(&root, "m/a.rs", &command_source("foo"))?;
        write(
            &root,
            "m/b.rs",
            &format!("{}pub const VERSION: &str = \"2\";\n", command_source("foo")),
        )?;
        let map = resolver.resolve_modules(&root)?;
        let keys: Vec<_> = map
            .get(&"m".to_string())
            .unwrap()
            .iter()
            .map(|f| f.export_key.clone())
            .collect();
        assert_eq!(keys, ["foo", "foo@2"]);
        Ok(())
    }

    #[test]
    fn broken_source_fails_resolution() -> Result<()> {
        let (_tmp, resolver) = project()?;
        let root = resolver.commands_dir().to_path_buf();
        write(&root, "m/bad.rs", "pub fn {")?;
        let err = resolver.resolve_modules(&root).unwrap_err();
        assert!(err.to_string().contains("bad.rs"));
        Ok(())
    }

    #[test]
    fn libraries_group_in_supplied_order() -> Result<()> {
        let (_tmp, resolver) = project()?;
        let libs = vec![
            LibSpec {
                name: "tools".into(),
                path: "::tools::coresep".into(),
                modules: vec![
                    LibModuleSpec {
                        name: "text".into(),
                        commands: vec!["upper".into()],
                    },
                    LibModuleSpec {
                        name: "math".into(),
                        commands: vec!["add".into()],
                    },
                ],
            },
            LibSpec {
                name: "auth".into(),
                path: "::auth::coresep".into(),
                modules: vec![LibModuleSpec {
                    name: "session".into(),
                    commands: vec![],
                }],
            },
        ];
        let map = resolver.resolve_libs(&libs)?;
        let names: Vec<_> = map.keys().cloned().collect();
        assert_eq!(names, ["tools", "auth"]);
        let modules: Vec<_> = map
            .get(&"tools".to_string())
            .unwrap()
            .iter()
            .map(|m| m.module.clone())
            .collect();
        assert_eq!(modules, ["text", "math"]);
        Ok(())
    }
}
