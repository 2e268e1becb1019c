//! Generator options, loaded from `coresep.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::file::LibSpec;

pub const CONFIG_FILE: &str = "coresep.toml";

/// Options for discovery and glue generation. Every field is optional in the
/// file; missing fields take the defaults below.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GlueOptions {
    /// Commands root, relative to the project root.
    pub commands_dir: PathBuf,
    /// Output directory for generated glue, relative to the project root.
    pub out_dir: PathBuf,
    /// Library namespace used by library builds.
    pub namespace: String,
    /// Emit the `types.rs` signature map.
    pub emit_types: bool,
    /// Present for library builds.
    pub lib: Option<LibOptions>,
    pub libs: Vec<LibSpec>,
    pub emit_git_ignore: bool,
    pub emit_rustfmt_ignore: bool,
    pub clear_out_dir: bool,
    /// Generated `initialize()` also publishes into the process-wide slot.
    pub singleton: bool,
    /// Path used in generated code to reach this crate's runtime types.
    pub runtime_crate: String,
    pub verbose: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LibOptions {
    /// Record the library exports under `[package.metadata.coresep]`.
    pub emit_manifest: bool,
}

impl Default for GlueOptions {
    fn default() -> Self {
        Self {
            commands_dir: PathBuf::from("src/commands"),
            out_dir: PathBuf::from("src/coresep"),
            namespace: "default".to_string(),
            emit_types: true,
            lib: None,
            libs: Vec::new(),
            emit_git_ignore: true,
            emit_rustfmt_ignore: false,
            clear_out_dir: false,
            singleton: false,
            runtime_crate: "coresep".to_string(),
            verbose: false,
        }
    }
}

impl GlueOptions {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid options in {}", path.display()))
    }

    /// Load `explicit` if given, else `<root>/coresep.toml` when present, else defaults.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = root.join(CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn is_lib(&self) -> bool {
        self.lib.is_some()
    }

    pub fn emit_manifest(&self) -> bool {
        self.lib.as_ref().is_some_and(|lib| lib.emit_manifest)
    }

    pub fn commands_path(&self, root: &Path) -> PathBuf {
        root.join(&self.commands_dir)
    }

    pub fn out_path(&self, root: &Path) -> PathBuf {
        root.join(&self.out_dir)
    }

    /// Directory holding the per-namespace wiring files.
    pub fn wiring_path(&self, root: &Path) -> PathBuf {
        self.out_path(root).join(crate::generator::MODULES_DIR)
    }
}
