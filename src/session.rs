//! Build session: owns the maps between a full discovery pass and later watch events.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::GlueOptions;
use crate::emitters;
use crate::file::{LibraryMap, NamespaceMap, slash_path};
use crate::generator::{self, Artifact, GenerationReport, GlueGenerator, RustGlueGenerator};
use crate::incremental::{self, Change, WatchEvent};
use crate::resolver::{FileResolver, SourceResolver, is_rust_source};

pub struct Session {
    root: PathBuf,
    options: GlueOptions,
    resolver: Box<dyn FileResolver + Send>,
    generator: Box<dyn GlueGenerator + Send>,
    modules: NamespaceMap,
    libs: LibraryMap,
}

impl Session {
    /// Session over `root` using the source resolver and Rust glue generator.
    pub fn new(root: impl Into<PathBuf>, options: GlueOptions) -> Self {
        let root = root.into();
        let resolver =
            SourceResolver::new(options.commands_path(&root), options.wiring_path(&root));
        let generator = RustGlueGenerator::new(&options.runtime_crate, options.namespace.clone())
            .with_singleton(options.singleton);
        Self {
            root,
            options,
            resolver: Box::new(resolver),
            generator: Box::new(generator),
            modules: NamespaceMap::new("modules"),
            libs: LibraryMap::new("libs"),
        }
    }

    pub fn with_resolver(mut self, resolver: impl FileResolver + Send + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn with_generator(mut self, generator: impl GlueGenerator + Send + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn options(&self) -> &GlueOptions {
        &self.options
    }

    pub fn modules(&self) -> &NamespaceMap {
        &self.modules
    }

    pub fn libs(&self) -> &LibraryMap {
        &self.libs
    }

    pub fn commands_dir(&self) -> PathBuf {
        self.options.commands_path(&self.root)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.options.out_path(&self.root)
    }

    /// Resolve commands and libraries into fresh maps without generating.
    /// The current maps are only replaced when both resolutions succeed.
    pub fn resolve(&mut self) -> Result<()> {
        let commands_dir = self.commands_dir();
        let modules = self
            .resolver
            .resolve_modules(&commands_dir)
            .with_context(|| format!("failed to resolve commands in {}", commands_dir.display()))?;
        let libs = self.resolver.resolve_libs(&self.options.libs)?;
        self.modules = modules;
        self.libs = libs;
        Ok(())
    }

    /// Full pass: optionally clear the output directory, resolve, then generate.
    pub fn build_start(&mut self) -> Result<GenerationReport> {
        if self.options.clear_out_dir {
            clear_dir(&self.out_dir())?;
        }
        self.resolve()?;
        self.regenerate()
    }

    /// Apply one file-system event. Paths outside the commands root or that are
    /// not Rust sources are ignored and yield `None`.
    ///
    /// A directory below the root that was renamed, moved or deleted reports
    /// only its own path, so such events trigger a full `build_start` instead.
    pub fn watch_change(
        &mut self,
        path: &Path,
        event: WatchEvent,
    ) -> Result<Option<GenerationReport>> {
        if self.is_directory_change(path) {
            info!(path = %path.display(), ?event, "directory changed, rescanning commands");
            return self.build_start().map(Some);
        }
        if !path.starts_with(self.commands_dir()) || !is_rust_source(path) {
            debug!(path = %path.display(), "ignoring change outside the commands root");
            return Ok(None);
        }
        let change =
            incremental::apply_event(self.resolver.as_ref(), &mut self.modules, path, event)?;
        match &change {
            Change::Unchanged => debug!(path = %path.display(), ?event, "no command affected"),
            Change::Removed {
                namespace,
                export_key,
            } => info!(%namespace, key = %export_key, "command removed"),
            Change::Upserted {
                namespace,
                export_key,
            } => info!(%namespace, key = %export_key, "command updated"),
        }
        self.regenerate().map(Some)
    }

    /// `path` is, or was, a directory strictly inside the commands root.
    fn is_directory_change(&self, path: &Path) -> bool {
        let commands_dir = self.commands_dir();
        if path == commands_dir || !path.starts_with(&commands_dir) {
            return false;
        }
        path.is_dir()
            || self
                .modules
                .values()
                .flatten()
                .any(|file| file.abs_path != path && file.abs_path.starts_with(path))
    }

    /// Render artifacts for the current maps without touching the disk.
    pub fn plan(&self) -> Result<Vec<Artifact>> {
        self.generator.generate_glue(
            &self.modules,
            &self.libs,
            self.options.is_lib(),
            self.options.emit_types,
        )
    }

    /// Rebuild every artifact from the current maps and run the auxiliary emitters.
    pub fn regenerate(&mut self) -> Result<GenerationReport> {
        if self.options.verbose {
            let commands: usize = self.modules.values().map(Vec::len).sum();
            info!(
                modules = self.modules.len(),
                commands,
                libs = self.libs.len(),
                "generating glue"
            );
        }

        let artifacts = self.plan()?;
        let out_dir = self.out_dir();
        let report = generator::write_artifacts(&out_dir, &artifacts)?;

        let glue_dir = slash_path(&self.options.out_dir);
        if self.options.emit_manifest() {
            emitters::emit_manifest_entry(&self.root, &self.options.namespace, &glue_dir)?;
        }
        if self.options.emit_git_ignore {
            emitters::emit_git_ignore(&out_dir)?;
        }
        if self.options.emit_rustfmt_ignore {
            emitters::emit_rustfmt_ignore(&self.root, &glue_dir)?;
        }
        Ok(report)
    }
}

/// Remove everything inside `dir`, keeping the directory itself.
fn clear_dir(dir: &Path) -> Result<()> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(());
    };
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
        .with_context(|| format!("failed to remove {}", path.display()))?;
    }
    info!(dir = %dir.display(), "cleared output directory");
    Ok(())
}
