use std::path::Path;

use anyhow::Result;

use coresep::{GlueOptions, Session, fingerprint};

pub(crate) fn cmd_generate(root: &Path, options: GlueOptions, dry_run: bool) -> Result<()> {
    let mut session = Session::new(root, options);
    if dry_run {
        session.resolve()?;
        for artifact in session.plan()? {
            println!(
                "{}  {}",
                fingerprint::short(&artifact.fingerprint()),
                artifact.path.display()
            );
        }
        return Ok(());
    }

    let report = session.build_start()?;
    for artifact in &report.artifacts {
        let status = if artifact.written { "wrote" } else { "kept" };
        println!(
            "{status:5}  {}  {}",
            fingerprint::short(&artifact.fingerprint),
            artifact.path.display()
        );
    }
    for path in &report.pruned {
        println!("pruned {}", path.display());
    }
    Ok(())
}
