//! Auxiliary project files kept in sync with the generated glue.
//!
//! Each emitter compares the desired state with what is on disk and writes only
//! when they differ. The return value says whether a write happened.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use toml::{Table, Value};
use tracing::{info, warn};

pub const GIT_IGNORE: &str = ".gitignore";
pub const RUSTFMT_FILE: &str = "rustfmt.toml";
pub const MANIFEST_FILE: &str = "Cargo.toml";

const GIT_IGNORE_BODY: &str = "# generated by coresep\n*\n";
const METADATA_HEADER: &str = "[package.metadata.coresep]";

/// Keep a `.gitignore` in the output directory that ignores everything in it.
pub fn emit_git_ignore(out_dir: &Path) -> Result<bool> {
    let path = out_dir.join(GIT_IGNORE);
    if fs::read_to_string(&path).is_ok_and(|text| text == GIT_IGNORE_BODY) {
        return Ok(false);
    }
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    fs::write(&path, GIT_IGNORE_BODY)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote ignore file");
    Ok(true)
}

/// Add the output directory to rustfmt's `ignore` list in `<root>/rustfmt.toml`.
pub fn emit_rustfmt_ignore(root: &Path, out_dir: &str) -> Result<bool> {
    let path = root.join(RUSTFMT_FILE);
    let mut table = read_table(&path)?.unwrap_or_default();
    let ignore = table
        .entry("ignore")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(items) = ignore else {
        return Err(anyhow!("`ignore` in {} is not an array", path.display()));
    };
    if items.iter().any(|item| item.as_str() == Some(out_dir)) {
        return Ok(false);
    }
    items.push(Value::String(out_dir.to_string()));
    write_table(&path, &table)?;
    info!(path = %path.display(), dir = out_dir, "added output directory to rustfmt ignore");
    Ok(true)
}

/// Record the library glue under `[package.metadata.coresep]` in `<root>/Cargo.toml`.
pub fn emit_manifest_entry(root: &Path, namespace: &str, out_dir: &str) -> Result<bool> {
    let path = root.join(MANIFEST_FILE);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut manifest: Table = text
        .parse()
        .with_context(|| format!("invalid manifest {}", path.display()))?;

    let mut desired = Table::new();
    desired.insert("namespace".into(), Value::String(namespace.to_string()));
    desired.insert("glue".into(), Value::String(out_dir.to_string()));

    let package = manifest
        .get_mut("package")
        .and_then(Value::as_table_mut)
        .ok_or_else(|| anyhow!("{} has no [package] table", path.display()))?;
    let metadata = package
        .entry("metadata")
        .or_insert_with(|| Value::Table(Table::new()));
    let Value::Table(metadata) = metadata else {
        return Err(anyhow!("package.metadata in {} is not a table", path.display()));
    };

    let block = format!("{METADATA_HEADER}\nnamespace = {namespace:?}\nglue = {out_dir:?}\n");
    match metadata.get("coresep").cloned() {
        Some(Value::Table(current)) if current == desired => Ok(false),
        None => {
            // Appending keeps the rest of the manifest byte-for-byte.
            let mut updated = text;
            if !updated.ends_with('\n') {
                updated.push('\n');
            }
            updated.push('\n');
            updated.push_str(&block);
            fs::write(&path, updated)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "added coresep metadata to manifest");
            Ok(true)
        }
        Some(_) => {
            if let Some(updated) = replace_section(&text, METADATA_HEADER, &block) {
                fs::write(&path, updated)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), "updated coresep metadata in manifest");
                return Ok(true);
            }
            // Not a standalone section, e.g. an inline table under [package.metadata].
            metadata.insert("coresep".into(), Value::Table(desired));
            warn!(
                path = %path.display(),
                "rewriting manifest to update coresep metadata; comments and formatting are lost"
            );
            write_table(&path, &manifest)?;
            Ok(true)
        }
    }
}

/// Swap the key lines of the `header` section for `block`.
///
/// Lines outside the section are copied verbatim, as are blank and comment
/// lines inside it. Returns `None` when the section header is absent.
fn replace_section(text: &str, header: &str, block: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len() + block.len());
    let mut lines = text.split_inclusive('\n').peekable();
    let mut found = false;
    while let Some(line) = lines.next() {
        let bare = line.split('#').next().unwrap_or_default().trim();
        if found || bare != header {
            out.push_str(line);
            continue;
        }
        found = true;
        out.push_str(block);
        while let Some(next) = lines.next_if(|next| !next.trim_start().starts_with('[')) {
            let trimmed = next.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                out.push_str(next);
            }
        }
    }
    found.then_some(out)
}

fn read_table(path: &Path) -> Result<Option<Table>> {
    if !path.is_file() {
        return Ok(None);
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let table = text
        .parse()
        .with_context(|| format!("invalid TOML in {}", path.display()))?;
    Ok(Some(table))
}

fn write_table(path: &Path, table: &Table) -> Result<()> {
    let text = toml::to_string(table)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}
