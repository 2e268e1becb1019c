use std::path::Path;

use anyhow::Result;

use coresep::{GlueOptions, Session};

pub(crate) fn cmd_check(root: &Path, options: GlueOptions) -> Result<()> {
    let mut session = Session::new(root, options);
    session.resolve()?;
    // Rendering also catches namespaces that collide as Rust module names.
    session.plan()?;
    let commands: usize = session.modules().values().map(Vec::len).sum();
    println!(
        "ok: {commands} command(s) in {} namespace(s), {} library(ies)",
        session.modules().len(),
        session.libs().len()
    );
    Ok(())
}
