//! Text templates for generated glue.
//!
//! Every function here is a pure string builder. String literals are rendered
//! with `{:?}`, which yields valid Rust literals for arbitrary names.

use std::fmt::Write as _;

use crate::file::{CommandFile, LibModule, ident, module_ident};

pub const HEADER: &str =
    "// @generated by coresep. Do not edit by hand; rerun `coresep generate`.\n";

/// Keeps hosts warning-free when parts of the glue go unused.
const ALLOW: &str = "#![allow(dead_code, unused_imports, clippy::all)]\n";

/// Local module ident for the `index`-th command file of a namespace.
pub fn command_ident(index: usize, file: &CommandFile) -> String {
    let stem = file
        .abs_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("c{index}_{}", ident(&stem).trim_start_matches('_'))
}

/// Loader expression producing the command declared by `file`.
fn command_loader(rt: &str, module: &str, file: &CommandFile) -> String {
    let handler = &file.handler;
    let (param, call) = match handler.model {
        Some(_) => ("model".to_string(), format!("{module}::handler(model)")),
        None => (format!("_: {rt}::Value"), format!("{module}::handler()")),
    };
    let call = if handler.is_async {
        format!("{call}.await")
    } else {
        call
    };
    let body = if handler.returns_result() {
        format!("Ok({call}?)")
    } else {
        format!("Ok({call})")
    };
    let build = if handler.is_async {
        format!("{rt}::Command::typed_async({module}::NAME, |{param}| async move {{ {body} }})")
    } else {
        format!("{rt}::Command::typed({module}::NAME, |{param}| {body})")
    };
    let version = if file.version.is_some() {
        format!(".with_version({module}::VERSION)")
    } else {
        String::new()
    };
    format!("{rt}::ModuleEntry::lazy(|| async {{ Ok({build}{version}) }})")
}

/// Wiring file for one namespace: `NAME`, `commands()` and `module()`.
pub fn namespace_module(rt: &str, namespace: &str, files: &[CommandFile]) -> String {
    let mut out = String::from(HEADER);
    out.push_str(ALLOW);
    out.push('\n');

    for (index, file) in files.iter().enumerate() {
        let _ = writeln!(out, "#[path = {:?}]", file.import_path);
        let _ = writeln!(out, "mod {};", command_ident(index, file));
    }
    if !files.is_empty() {
        out.push('\n');
    }

    let _ = writeln!(out, "pub const NAME: &str = {namespace:?};\n");
    let _ = writeln!(out, "pub fn commands() -> Vec<(&'static str, {rt}::ModuleEntry)> {{");
    out.push_str("    vec![\n");
    for (index, file) in files.iter().enumerate() {
        let module = command_ident(index, file);
        let _ = writeln!(
            out,
            "        ({:?}, {}),",
            file.export_key,
            command_loader(rt, &module, file)
        );
    }
    out.push_str("    ]\n}\n\n");

    let _ = writeln!(out, "pub fn module() -> {rt}::Module {{");
    let _ = writeln!(out, "    {rt}::Module::from_entries(NAME, commands())");
    out.push_str("}\n");
    out
}

/// Re-export file for one library and the modules taken from it.
pub fn library_module(lib: &str, modules: &[LibModule], emit_types: bool) -> String {
    let mut out = String::from(HEADER);
    out.push_str(ALLOW);
    let _ = writeln!(out, "\npub const NAME: &str = {lib:?};\n");
    for module in modules {
        let _ = writeln!(out, "pub use {}::{};", module.path, module_ident(&module.module));
    }
    if emit_types {
        if let Some(first) = modules.first() {
            let _ = writeln!(out, "pub use {}::FUNCTION_MAP;", first.path);
        }
    }
    out
}

/// Library-mode aggregate of every namespace module.
pub fn library_exports(rt: &str, namespace: &str, idents: &[String], emit_types: bool) -> String {
    let mut out = String::from(HEADER);
    out.push_str(ALLOW);
    let _ = writeln!(out, "\npub const NAMESPACE: &str = {namespace:?};\n");
    for name in idents {
        let _ = writeln!(out, "pub use super::{name};");
    }
    if emit_types {
        out.push_str("pub use super::types::FUNCTION_MAP;\n");
    }
    let _ = writeln!(out, "\npub fn modules() -> Vec<{rt}::Module> {{");
    let list: Vec<String> = idents.iter().map(|name| format!("{name}::module()")).collect();
    let _ = writeln!(out, "    vec![{}]", list.join(", "));
    out.push_str("}\n");
    out
}

/// Inputs for the aggregating entry file.
pub struct EntryPoint<'a> {
    pub rt: &'a str,
    /// `(ident, wiring file path relative to the output dir)` in map order.
    pub namespaces: &'a [(String, String)],
    /// `(ident, file path, modules)` in map order.
    pub libs: &'a [(String, String, &'a [LibModule])],
    pub emit_types: bool,
    /// Library namespace ident when this is a library build.
    pub lib_namespace: Option<&'a str>,
    pub singleton: bool,
}

/// `mod.rs`: declares every wiring module and emits `initialize()`.
pub fn entry_point(entry: &EntryPoint<'_>) -> String {
    let rt = entry.rt;
    let mut out = String::from(HEADER);
    out.push_str(ALLOW);
    out.push('\n');
    for (name, path) in entry.namespaces {
        let _ = writeln!(out, "#[path = {path:?}]\npub mod {name};");
    }
    for (name, path, _) in entry.libs {
        let _ = writeln!(out, "#[path = {path:?}]\npub mod {name};");
    }
    if entry.emit_types {
        out.push_str("pub mod types;\n");
    }
    if let Some(namespace) = entry.lib_namespace {
        let _ = writeln!(out, "#[path = \"exports.rs\"]\npub mod {namespace};");
    }

    out.push_str("\n/// Register every discovered module and build the container.\n");
    let _ = writeln!(out, "pub fn initialize() -> std::sync::Arc<{rt}::Container> {{");
    let _ = writeln!(out, "    {rt}::Factory::new()");
    for (name, _) in entry.namespaces {
        let _ = writeln!(out, "        .register_module({name}::module())");
    }
    for (name, _, modules) in entry.libs {
        for module in modules.iter() {
            let _ = writeln!(
                out,
                "        .register_lib_module({name}::NAME, {name}::{}::module())",
                module_ident(&module.module)
            );
        }
    }
    if entry.singleton {
        out.push_str("        .singleton()\n");
    }
    out.push_str("        .build()\n}\n");
    out
}

/// Inputs for the signature map.
pub struct TypeMap<'a> {
    pub rt: &'a str,
    pub namespaces: &'a [(&'a str, &'a [CommandFile])],
    /// `(lib name, lib ident, modules)` in map order.
    pub libs: &'a [(&'a str, String, &'a [LibModule])],
}

/// `types.rs`: command keys mapped to their handler signatures.
pub fn type_map(map: &TypeMap<'_>) -> String {
    let rt = map.rt;
    let mut out = String::from(HEADER);
    out.push_str(ALLOW);
    let _ = writeln!(out, "\nuse {rt}::CommandSignature;\n");

    out.push_str("pub const FUNCTION_MAP: &[CommandSignature] = &[\n");
    for (namespace, files) in map.namespaces {
        for file in files.iter() {
            let _ = writeln!(out, "    CommandSignature {{");
            let _ = writeln!(out, "        key: {:?},", format!("{namespace}.{}", file.export_key));
            let _ = writeln!(out, "        model: {:?},", file.handler.model.as_deref());
            let _ = writeln!(out, "        output: {:?},", file.handler.output);
            let _ = writeln!(out, "        is_async: {},", file.handler.is_async);
            let _ = writeln!(out, "        source: {:?},", file.rel_path);
            out.push_str("    },\n");
        }
    }
    out.push_str("];\n\n");

    out.push_str("/// Every resolvable key, library commands included.\n");
    out.push_str("pub const KEYS: &[&str] = &[\n");
    for (namespace, files) in map.namespaces {
        for file in files.iter() {
            let _ = writeln!(out, "    {:?},", format!("{namespace}.{}", file.export_key));
        }
    }
    for (_, _, modules) in map.libs {
        for module in modules.iter() {
            for key in module.keys() {
                let _ = writeln!(out, "    {key:?},");
            }
        }
    }
    out.push_str("];\n\n");

    out.push_str("pub const LIB_FUNCTION_MAPS: &[(&str, &[CommandSignature])] = &[\n");
    for (lib, name, modules) in map.libs {
        if !modules.is_empty() {
            let _ = writeln!(out, "    ({lib:?}, super::{name}::FUNCTION_MAP),");
        }
    }
    out.push_str("];\n\n");

    out.push_str("/// Look up the handler signature for a composite key.\n");
    out.push_str("pub fn signature(key: &str) -> Option<&'static CommandSignature> {\n");
    let _ = writeln!(out, "    if let Some(found) = {rt}::find_signature(FUNCTION_MAP, key) {{");
    out.push_str("        return Some(found);\n    }\n");
    out.push_str("    LIB_FUNCTION_MAPS.iter().find_map(|(lib, map)| {\n");
    out.push_str("        key.strip_prefix(lib)\n");
    out.push_str("            .and_then(|rest| rest.strip_prefix('.'))\n");
    let _ = writeln!(out, "            .and_then(|rest| {rt}::find_signature(map, rest))");
    out.push_str("    })\n}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::HandlerSignature;
    use std::path::PathBuf;

    fn file(
        stem: &str,
        name: &str,
        version: Option<&str>,
        handler: HandlerSignature,
    ) -> CommandFile {
        CommandFile::new(
            PathBuf::from(format!("/p/src/commands/math/{stem}.rs")),
            format!("../../commands/math/{stem}.rs"),
            format!("math/{stem}.rs"),
            name.into(),
            version.map(str::to_string),
            "math".into(),
            handler,
        )
    }

    fn sync_result() -> HandlerSignature {
        HandlerSignature {
            is_async: false,
            model: Some("AddModel".into()),
            output: "anyhow::Result<i64>".into(),
        }
    }

    #[test]
    fn namespace_module_binds_lazy_loaders() {
        let files = [
            file("add", "add", None, sync_result()),
            file(
                "now",
                "now",
                Some("2"),
                HandlerSignature {
                    is_async: true,
                    model: None,
                    output: "u64".into(),
                },
            ),
        ];
        let text = namespace_module("::coresep", "math", &files);
        assert!(text.starts_with(HEADER));
        assert!(text.contains("#[path = \"../../commands/math/add.rs\"]\nmod c0_add;"));
        assert!(text.contains("pub const NAME: &str = \"math\";"));
        assert!(text.contains("(\"add\", ::coresep::ModuleEntry::lazy(|| async { Ok("));
        assert!(text.contains(
            "::coresep::Command::typed(c0_add::NAME, |model| Ok(c0_add::handler(model)?))) })),"
        ));
        assert!(text.contains(
            "::coresep::Command::typed_async(c1_now::NAME, |_: ::coresep::Value| async move {"
        ));
        assert!(text.contains(" Ok(c1_now::handler().await) }).with_version(c1_now::VERSION)"));
        assert!(text.contains("(\"now@2\","));
        assert!(text.contains("::coresep::Module::from_entries(NAME, commands())"));
    }

    #[test]
    fn entry_point_registers_in_order() {
        let libs = [LibModule {
            lib: "tools".into(),
            path: "::tools::coresep::tools".into(),
            module: "text.case".into(),
            commands: vec!["upper".into()],
        }];
        let namespaces = [
            ("math".to_string(), "modules/math.rs".to_string()),
            ("io_fs".to_string(), "modules/io_fs.rs".to_string()),
        ];
        let lib_entries = [("lib_tools".to_string(), "libs/tools.rs".to_string(), &libs[..])];
        let text = entry_point(&EntryPoint {
            rt: "::coresep",
            namespaces: &namespaces,
            libs: &lib_entries,
            emit_types: true,
            lib_namespace: None,
            singleton: true,
        });
        let math = text.find(".register_module(math::module())").unwrap();
        let io = text.find(".register_module(io_fs::module())").unwrap();
        let lib = text
            .find(".register_lib_module(lib_tools::NAME, lib_tools::text_case::module())")
            .unwrap();
        assert!(math < io && io < lib);
        assert!(text.contains("pub mod types;"));
        assert!(text.contains(".singleton()\n        .build()"));
    }

    #[test]
    fn type_map_lists_namespace_and_library_keys() {
        let files = [file("add", "add", Some("1"), sync_result())];
        let libs = [LibModule {
            lib: "tools".into(),
            path: "::tools::coresep::tools".into(),
            module: "text".into(),
            commands: vec!["upper".into()],
        }];
        let namespaces = [("math", &files[..])];
        let lib_entries = [("tools", "lib_tools".to_string(), &libs[..])];
        let text = type_map(&TypeMap {
            rt: "::coresep",
            namespaces: &namespaces,
            libs: &lib_entries,
        });
        assert!(text.contains("key: \"math.add@1\","));
        assert!(text.contains("model: Some(\"AddModel\"),"));
        assert!(text.contains("output: \"anyhow::Result<i64>\","));
        assert!(text.contains("source: \"math/add.rs\","));
        assert!(text.contains("    \"tools.text.upper\","));
        assert!(text.contains("(\"tools\", super::lib_tools::FUNCTION_MAP),"));
    }

    #[test]
    fn library_files_re_export_modules() {
        let libs = [LibModule {
            lib: "tools".into(),
            path: "::tools::coresep::tools".into(),
            module: "text".into(),
            commands: vec![],
        }];
        let text = library_module("tools", &libs, true);
        assert!(text.contains("pub const NAME: &str = \"tools\";"));
        assert!(text.contains("pub use ::tools::coresep::tools::text;"));
        assert!(text.contains("pub use ::tools::coresep::tools::FUNCTION_MAP;"));

        let exports = library_exports("::coresep", "tools", &["math".into(), "text".into()], false);
        assert!(exports.contains("pub use super::math;"));
        assert!(exports.contains("vec![math::module(), text::module()]"));
        assert!(!exports.contains("FUNCTION_MAP"));
    }
}
