use std::path::Path;

use anyhow::Result;
use serde_json::json;

use coresep::{GlueOptions, Session};

pub(crate) fn cmd_list(root: &Path, options: GlueOptions, as_json: bool) -> Result<()> {
    let mut session = Session::new(root, options);
    session.resolve()?;

    if as_json {
        let namespaces: serde_json::Map<String, serde_json::Value> = session
            .modules()
            .iter()
            .map(|(namespace, files)| (namespace.clone(), json!(files)))
            .collect();
        let libs: serde_json::Map<String, serde_json::Value> = session
            .libs()
            .iter()
            .map(|(lib, modules)| (lib.clone(), json!(modules)))
            .collect();
        let body = json!({ "modules": namespaces, "libs": libs });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if session.modules().is_empty() && session.libs().is_empty() {
        println!("no commands found under {}", session.commands_dir().display());
        return Ok(());
    }
    for (namespace, files) in session.modules().iter() {
        println!("{namespace}");
        for file in files {
            let mode = if file.handler.is_async { "async" } else { "sync" };
            println!("  {:<32} {mode:5} {}", file.export_name(), file.rel_path);
        }
    }
    for (lib, modules) in session.libs().iter() {
        println!("{lib} (library)");
        for module in modules {
            for key in module.keys() {
                println!("  {key}");
            }
        }
    }
    Ok(())
}
