use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{error, info, warn};

use coresep::{GlueOptions, Session, WatchEvent};

pub(crate) fn cmd_watch(root: &Path, options: GlueOptions) -> Result<()> {
    let mut session = Session::new(root, options);
    match session.build_start() {
        Ok(report) => info!(written = report.written(), "initial pass complete"),
        Err(err) => error!("initial pass failed: {err:#}"),
    }

    let commands_dir = session.commands_dir();
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())
        .context("failed to create the file watcher")?;
    watcher
        .watch(&commands_dir, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", commands_dir.display()))?;
    info!(dir = %commands_dir.display(), "watching for changes");

    // Events are applied one at a time; the next is not read until generation finishes.
    for received in rx {
        let event = match received {
            Ok(event) => event,
            Err(err) => {
                warn!("watch error: {err}");
                continue;
            }
        };
        for (path, kind) in classify(&event) {
            if let Err(err) = session.watch_change(&path, kind) {
                error!(path = %path.display(), "regeneration failed: {err:#}");
            }
        }
    }
    Ok(())
}

fn classify(event: &Event) -> Vec<(PathBuf, WatchEvent)> {
    let base = match event.kind {
        EventKind::Create(_) => WatchEvent::Create,
        EventKind::Modify(_) => WatchEvent::Update,
        EventKind::Remove(_) => WatchEvent::Delete,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .map(|path| {
            // Renames arrive as modifications; a path that is gone was moved away.
            let kind = if base != WatchEvent::Delete && !path.exists() {
                WatchEvent::Delete
            } else {
                base
            };
            (path.clone(), kind)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use tempfile::TempDir;

    #[test]
    fn event_kinds_map_to_watch_events() -> Result<()> {
        let tmp = TempDir::new()?;
        let present = tmp.path().join("a.rs");
        std::fs::write(&present, "")?;
        let gone = tmp.path().join("b.rs");

        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(present.clone());
        assert_eq!(classify(&created), [(present.clone(), WatchEvent::Create)]);

        let modified = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(present.clone())
            .add_path(gone.clone());
        assert_eq!(
            classify(&modified),
            [(present, WatchEvent::Update), (gone.clone(), WatchEvent::Delete)]
        );

        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(gone.clone());
        assert_eq!(classify(&removed), [(gone, WatchEvent::Delete)]);

        assert!(classify(&Event::new(EventKind::Any)).is_empty());
        Ok(())
    }
}
