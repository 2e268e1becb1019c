//! Glue generation: namespace map in, named source artifacts out.
//!
//! Generation is a pure function of the maps and flags; writing is a separate
//! step that skips unchanged files and prunes wiring left over from namespaces
//! that no longer exist.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{debug, info};

use crate::file::{CommandFile, LibModule, LibraryMap, NamespaceMap, ident, module_ident};
use crate::fingerprint;
use crate::glue::{self, EntryPoint, HEADER, TypeMap};

pub const MODULES_DIR: &str = "modules";
pub const LIBS_DIR: &str = "libs";
pub const ENTRY_FILE: &str = "mod.rs";
pub const TYPES_FILE: &str = "types.rs";
pub const EXPORTS_FILE: &str = "exports.rs";

/// One generated file, addressed relative to the output directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

impl Artifact {
    fn new(path: impl Into<PathBuf>, contents: String) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }

    pub fn fingerprint(&self) -> String {
        fingerprint::of_text(&self.contents)
    }
}

pub trait GlueGenerator {
    /// Render every artifact for the current maps.
    fn generate_glue(
        &self,
        modules: &NamespaceMap,
        libs: &LibraryMap,
        is_lib: bool,
        emit_types: bool,
    ) -> Result<Vec<Artifact>>;
}

/// Generator emitting Rust glue that links against the runtime crate.
#[derive(Clone, Debug)]
pub struct RustGlueGenerator {
    runtime_crate: String,
    namespace: String,
    singleton: bool,
}

impl RustGlueGenerator {
    pub fn new(runtime_crate: &str, namespace: impl Into<String>) -> Self {
        let runtime_crate = if runtime_crate == "crate" || runtime_crate.starts_with("::") {
            runtime_crate.to_string()
        } else {
            format!("::{runtime_crate}")
        };
        Self {
            runtime_crate,
            namespace: namespace.into(),
            singleton: false,
        }
    }

    /// Make the generated `initialize()` publish into the process-wide slot.
    pub fn with_singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }
}

impl GlueGenerator for RustGlueGenerator {
    fn generate_glue(
        &self,
        modules: &NamespaceMap,
        libs: &LibraryMap,
        is_lib: bool,
        emit_types: bool,
    ) -> Result<Vec<Artifact>> {
        let rt = self.runtime_crate.as_str();
        let mut artifacts = Vec::new();
        let mut taken = BTreeSet::from(["types".to_string(), "exports".to_string()]);

        let lib_namespace = if is_lib {
            let name = module_ident(&self.namespace);
            claim(&mut taken, &name, &self.namespace)?;
            Some(name)
        } else {
            None
        };

        let mut namespaces = Vec::new();
        let mut typed_namespaces: Vec<(&str, &[CommandFile])> = Vec::new();
        for (namespace, files) in modules.iter() {
            let name = module_ident(namespace);
            claim(&mut taken, &name, namespace)?;
            let rel = format!("{MODULES_DIR}/{}.rs", ident(namespace));
            artifacts.push(Artifact::new(&rel, glue::namespace_module(rt, namespace, files)));
            namespaces.push((name, rel));
            typed_namespaces.push((namespace.as_str(), files.as_slice()));
        }

        let mut lib_entries = Vec::new();
        let mut typed_libs: Vec<(&str, String, &[LibModule])> = Vec::new();
        for (lib, lib_modules) in libs.iter() {
            let file_stem = ident(lib);
            let name = format!("lib_{file_stem}");
            claim(&mut taken, &name, lib)?;
            let rel = format!("{LIBS_DIR}/{file_stem}.rs");
            artifacts.push(Artifact::new(
                &rel,
                glue::library_module(lib, lib_modules, emit_types),
            ));
            lib_entries.push((name.clone(), rel, lib_modules.as_slice()));
            typed_libs.push((lib.as_str(), name, lib_modules.as_slice()));
        }

        if emit_types {
            let text = glue::type_map(&TypeMap {
                rt,
                namespaces: &typed_namespaces,
                libs: &typed_libs,
            });
            artifacts.push(Artifact::new(TYPES_FILE, text));
        }

        if is_lib {
            let idents: Vec<String> = namespaces.iter().map(|(name, _)| name.clone()).collect();
            artifacts.push(Artifact::new(
                EXPORTS_FILE,
                glue::library_exports(rt, &self.namespace, &idents, emit_types),
            ));
        }

        artifacts.push(Artifact::new(
            ENTRY_FILE,
            glue::entry_point(&EntryPoint {
                rt,
                namespaces: &namespaces,
                libs: &lib_entries,
                emit_types,
                lib_namespace: lib_namespace.as_deref(),
                singleton: self.singleton,
            }),
        ));

        debug!(artifacts = artifacts.len(), "glue rendered");
        Ok(artifacts)
    }
}

fn claim(taken: &mut BTreeSet<String>, name: &str, source: &str) -> Result<()> {
    if !taken.insert(name.to_string()) {
        bail!("`{source}` maps to the Rust module name `{name}`, which is already in use");
    }
    Ok(())
}

/// Outcome for one artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub fingerprint: String,
    pub written: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub artifacts: Vec<WrittenArtifact>,
    pub pruned: Vec<PathBuf>,
}

impl GenerationReport {
    pub fn written(&self) -> usize {
        self.artifacts.iter().filter(|a| a.written).count()
    }
}

/// Write artifacts under `out_dir`, skipping files whose contents already match,
/// then delete generated files that are no longer part of the set.
pub fn write_artifacts(out_dir: &Path, artifacts: &[Artifact]) -> Result<GenerationReport> {
    let mut report = GenerationReport::default();
    for artifact in artifacts {
        let target = out_dir.join(&artifact.path);
        let current = fs::read_to_string(&target).ok();
        let written = current.as_deref() != Some(artifact.contents.as_str());
        if written {
            if let Some(dir) = target.parent() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            fs::write(&target, &artifact.contents)
                .with_context(|| format!("failed to write {}", target.display()))?;
        }
        report.artifacts.push(WrittenArtifact {
            path: artifact.path.clone(),
            fingerprint: artifact.fingerprint(),
            written,
        });
    }

    let keep: BTreeSet<&Path> = artifacts.iter().map(|a| a.path.as_path()).collect();
    for candidate in generated_files(out_dir)? {
        if keep.contains(candidate.as_path()) {
            continue;
        }
        let target = out_dir.join(&candidate);
        fs::remove_file(&target)
            .with_context(|| format!("failed to remove {}", target.display()))?;
        report.pruned.push(candidate);
    }

    info!(
        written = report.written(),
        unchanged = report.artifacts.len() - report.written(),
        pruned = report.pruned.len(),
        "glue written to {}",
        out_dir.display()
    );
    Ok(report)
}

/// Previously generated files under `out_dir`, relative to it.
fn generated_files(out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut consider = |rel: PathBuf| -> Result<()> {
        let path = out_dir.join(&rel);
        if path.is_file() && is_generated(&path)? {
            found.push(rel);
        }
        Ok(())
    };
    for top in [ENTRY_FILE, TYPES_FILE, EXPORTS_FILE] {
        consider(PathBuf::from(top))?;
    }
    for dir in [MODULES_DIR, LIBS_DIR] {
        let Ok(entries) = fs::read_dir(out_dir.join(dir)) else {
            continue;
        };
        let mut names: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name())
            .collect();
        names.sort();
        for name in names {
            if Path::new(&name).extension().is_some_and(|ext| ext == "rs") {
                consider(Path::new(dir).join(name))?;
            }
        }
    }
    Ok(found)
}

fn is_generated(path: &Path) -> Result<bool> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(text.starts_with(HEADER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::{command_source, project, write};
    use crate::resolver::FileResolver;
    use crate::file::{LibModuleSpec, LibSpec};
    use tempfile::TempDir;

    fn generate(modules: &NamespaceMap, libs: &LibraryMap) -> Result<Vec<Artifact>> {
        RustGlueGenerator::new("coresep", "default").generate_glue(modules, libs, false, true)
    }

    #[test]
    fn output_is_deterministic() -> Result<()> {
        let (_tmp, resolver) = project()?;
        let root = resolver.commands_dir().to_path_buf();
        write(&root, "math/add.rs", &command_source("add"))?;
        write(&root, "math/sub.rs", &command_source("sub"))?;
        write(&root, "text/upper.rs", &command_source("upper"))?;
        let libs = LibraryMap::new("libs");

        let first = generate(&resolver.resolve_modules(&root)?, &libs)?;
        let second = generate(&resolver.resolve_modules(&root)?, &libs)?;
        assert_eq!(first, second);

        let paths: Vec<_> = first.iter().map(|a| a.path.clone()).collect();
        assert_eq!(
            paths,
            [
                PathBuf::from("modules/math.rs"),
                PathBuf::from("modules/text.rs"),
                PathBuf::from("types.rs"),
                PathBuf::from("mod.rs"),
            ]
        );
        let entry = &first[3].contents;
        assert!(entry.contains("#[path = \"modules/math.rs\"]\npub mod math;"));
        assert!(entry.contains("::coresep::Factory::new()"));
        Ok(())
    }

    #[test]
    fn lib_build_emits_exports() -> Result<()> {
        let (_tmp, resolver) = project()?;
        let root = resolver.commands_dir().to_path_buf();
        write(&root, "math/add.rs", &command_source("add"))?;
        let modules = resolver.resolve_modules(&root)?;
        let libs = resolver.resolve_libs(&[LibSpec {
            name: "auth".into(),
            path: "::auth::coresep::auth".into(),
            modules: vec![LibModuleSpec {
                name: "session".into(),
                commands: vec!["login".into()],
            }],
        }])?;
        let artifacts = RustGlueGenerator::new("crate", "tools")
            .with_singleton(true)
            .generate_glue(&modules, &libs, true, false)?;
        let paths: Vec<_> = artifacts.iter().map(|a| a.path.clone()).collect();
        assert_eq!(
            paths,
            [
                PathBuf::from("modules/math.rs"),
                PathBuf::from("libs/auth.rs"),
                PathBuf::from("exports.rs"),
                PathBuf::from("mod.rs"),
            ]
        );
        let entry = &artifacts[3].contents;
        assert!(entry.contains("#[path = \"exports.rs\"]\npub mod tools;"));
        assert!(
            entry.contains(".register_lib_module(lib_auth::NAME, lib_auth::session::module())")
        );
        assert!(entry.contains("crate::Factory::new()"));
        assert!(!entry.contains("pub mod types;"));
        Ok(())
    }

    #[test]
    fn colliding_module_names_are_rejected() -> Result<()> {
        let (_tmp, resolver) = project()?;
        let root = resolver.commands_dir().to_path_buf();
        write(&root, "a-b/x.rs", &command_source("x"))?;
        write(&root, "a_b/y.rs", &command_source("y"))?;
        let modules = resolver.resolve_modules(&root)?;
        let err = generate(&modules, &LibraryMap::new("libs")).unwrap_err();
        assert!(err.to_string().contains("a_b"));
        Ok(())
    }

    #[test]
    fn keyword_namespaces_render_parseable_glue() -> Result<()> {
        let (_tmp, resolver) = project()?;
        let root = resolver.commands_dir().to_path_buf();
        write(&root, "match/kw.rs", &command_source("kw"))?;
        write(&root, "self/me.rs", &command_source("me"))?;
        write(&root, "type/ref/deep.rs", &command_source("deep"))?;
        let modules = resolver.resolve_modules(&root)?;
        let libs = resolver.resolve_libs(&[LibSpec {
            name: "auth".into(),
            path: "::auth::coresep::auth".into(),
            modules: vec![LibModuleSpec {
                name: "use".into(),
                commands: vec!["login".into()],
            }],
        }])?;

        for is_lib in [false, true] {
            let artifacts = RustGlueGenerator::new("coresep", "crate")
                .generate_glue(&modules, &libs, is_lib, true)?;
            for artifact in &artifacts {
                if let Err(err) = syn::parse_file(&artifact.contents) {
                    panic!(
                        "{} does not parse: {err}\n{}",
                        artifact.path.display(),
                        artifact.contents
                    );
                }
            }
            let entry = &artifacts.last().unwrap().contents;
            assert!(entry.contains("#[path = \"modules/match.rs\"]\npub mod r#match;"));
            assert!(entry.contains(".register_module(r#match::module())"));
            assert!(entry.contains("pub mod self_;"));
            assert!(entry.contains("pub mod type_ref;"));
            assert!(entry.contains("lib_auth::r#use::module()"));
            assert!(entry.starts_with(&format!("{HEADER}#![allow(dead_code")));
            if is_lib {
                assert!(entry.contains("#[path = \"exports.rs\"]\npub mod crate_;"));
            }
        }
        Ok(())
    }

    #[test]
    fn path_keyword_suffix_still_collides() -> Result<()> {
        let (_tmp, resolver) = project()?;
        let root = resolver.commands_dir().to_path_buf();
        write(&root, "self/a.rs", &command_source("a"))?;
        write(&root, "self_/b.rs", &command_source("b"))?;
        let modules = resolver.resolve_modules(&root)?;
        let err = generate(&modules, &LibraryMap::new("libs")).unwrap_err();
        assert!(err.to_string().contains("self_"));
        Ok(())
    }

    #[test]
    fn writing_is_idempotent_and_prunes_stale_files() -> Result<()> {
        let out = TempDir::new()?;
        let artifacts = vec![
            Artifact::new("modules/a.rs", format!("{HEADER}// a\n")),
            Artifact::new("mod.rs", format!("{HEADER}// entry\n")),
        ];
        let first = write_artifacts(out.path(), &artifacts)?;
        assert_eq!(first.written(), 2);

        let again = write_artifacts(out.path(), &artifacts)?;
        assert_eq!(again.written(), 0);
        assert_eq!(again.artifacts[0].fingerprint, first.artifacts[0].fingerprint);

        fs::write(out.path().join("modules/handwritten.rs"), "// mine\n")?;
        let fewer = vec![Artifact::new("mod.rs", format!("{HEADER}// entry\n"))];
        let pruned = write_artifacts(out.path(), &fewer)?;
        assert_eq!(pruned.pruned, [PathBuf::from("modules/a.rs")]);
        assert!(!out.path().join("modules/a.rs").exists());
        assert!(out.path().join("modules/handwritten.rs").exists());
        Ok(())
    }
}
