//! Apply single file-system events to an existing namespace map.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};

use crate::file::{CommandFile, NamespaceMap};
use crate::resolver::FileResolver;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchEvent {
    Create,
    Update,
    Delete,
}

/// What an event did to the map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Removed {
        namespace: String,
        export_key: String,
    },
    Upserted {
        namespace: String,
        export_key: String,
    },
    Unchanged,
}

/// Remove the entry for `path`; a namespace left empty is dropped entirely.
pub fn remove_file(map: &mut NamespaceMap, path: &Path) -> Change {
    let hit = map.iter().find_map(|(namespace, files)| {
        files
            .iter()
            .position(|f| f.abs_path == path)
            .map(|index| (namespace.clone(), index))
    });
    let Some((namespace, index)) = hit else {
        return Change::Unchanged;
    };

    let mut export_key = String::new();
    map.update(
        namespace.clone(),
        |mut files| {
            export_key = files.remove(index).export_key;
            files
        },
        Vec::new(),
    );
    if map.get(&namespace).is_some_and(Vec::is_empty) {
        map.remove(&namespace);
    }
    Change::Removed {
        namespace,
        export_key,
    }
}

/// Put `file` into its namespace bucket: any entry with the same export key is
/// removed and the new file appended.
pub fn upsert_file(map: &mut NamespaceMap, file: CommandFile) -> Change {
    // A file whose NAME changed or that moved namespace leaves a stale entry behind.
    let namespace = file.namespace();
    let stale = map.iter().any(|(ns, files)| {
        files.iter().any(|f| {
            f.abs_path == file.abs_path && (*ns != namespace || f.export_key != file.export_key)
        })
    });
    if stale {
        debug!(path = %file.abs_path.display(), "dropping stale entry");
        remove_file(map, &file.abs_path);
    }

    let export_key = file.export_key.clone();
    map.update(
        namespace.clone(),
        |mut files| {
            if let Some(index) = files.iter().position(|f| f.export_key == file.export_key) {
                let replaced = files.remove(index);
                if replaced.abs_path != file.abs_path {
                    warn!(
                        key = %file.export_key,
                        previous = %replaced.rel_path,
                        current = %file.rel_path,
                        "command key now provided by another file"
                    );
                }
            }
            files.push(file);
            files
        },
        Vec::new(),
    );
    Change::Upserted {
        namespace,
        export_key,
    }
}

/// Recompute the map after one watch event on `path`.
pub fn apply_event<R: FileResolver + ?Sized>(
    resolver: &R,
    map: &mut NamespaceMap,
    path: &Path,
    event: WatchEvent,
) -> Result<Change> {
    match event {
        WatchEvent::Delete => Ok(remove_file(map, path)),
        WatchEvent::Create | WatchEvent::Update => match resolver.command_file(path)? {
            Some(file) => Ok(upsert_file(map, file)),
            None => Ok(remove_file(map, path)),
        },
    }
}
