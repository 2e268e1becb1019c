//! Static export scanning for command files.
//!
//! Given source text, report the names a file exports at top level together
//! with the literal `NAME`/`VERSION` values and the shape of `handler`. The
//! file is parsed with `syn`; nothing is evaluated.

use std::collections::BTreeSet;

use anyhow::{Result, bail};
use quote::ToTokens;
use syn::{Expr, FnArg, Item, Lit, ReturnType, UseTree, Visibility};

use crate::file::HandlerSignature;

pub const NAME_EXPORT: &str = "NAME";
pub const VERSION_EXPORT: &str = "VERSION";
pub const HANDLER_EXPORT: &str = "handler";

/// Top-level public names of a source file and the values a command needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportSet {
    pub names: BTreeSet<String>,
    pub name_value: Option<String>,
    pub version_value: Option<String>,
    pub handler: Option<HandlerSignature>,
}

impl ExportSet {
    /// True when the file exports both a literal `NAME` and a `handler` fn.
    pub fn is_command(&self) -> bool {
        self.name_value.as_deref().is_some_and(|n| !n.is_empty()) && self.handler.is_some()
    }
}

/// Scan `source` for public top-level exports.
pub fn scan(source: &str) -> Result<ExportSet> {
    let file = syn::parse_file(source)?;
    let mut set = ExportSet::default();

    for item in &file.items {
        match item {
            Item::Const(c) if is_public(&c.vis) => {
                let name = c.ident.to_string();
                if name == NAME_EXPORT {
                    set.name_value = string_literal(&c.expr);
                } else if name == VERSION_EXPORT {
                    set.version_value = string_literal(&c.expr);
                }
                set.names.insert(name);
            }
            Item::Static(s) if is_public(&s.vis) => {
                set.names.insert(s.ident.to_string());
            }
            Item::Fn(f) if is_public(&f.vis) => {
                let name = f.sig.ident.to_string();
                if name == HANDLER_EXPORT {
                    set.handler = Some(handler_signature(&f.sig)?);
                }
                set.names.insert(name);
            }
            Item::Struct(s) if is_public(&s.vis) => {
                set.names.insert(s.ident.to_string());
            }
            Item::Enum(e) if is_public(&e.vis) => {
                set.names.insert(e.ident.to_string());
            }
            Item::Type(t) if is_public(&t.vis) => {
                set.names.insert(t.ident.to_string());
            }
            Item::Use(u) if is_public(&u.vis) => collect_use(&u.tree, &mut set.names),
            _ => {}
        }
    }
    Ok(set)
}

fn is_public(vis: &Visibility) -> bool {
    matches!(vis, Visibility::Public(_))
}

fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        Expr::Group(group) => string_literal(&group.expr),
        Expr::Paren(paren) => string_literal(&paren.expr),
        _ => None,
    }
}

fn handler_signature(sig: &syn::Signature) -> Result<HandlerSignature> {
    let mut model = None;
    for (index, input) in sig.inputs.iter().enumerate() {
        match input {
            FnArg::Receiver(_) => bail!("`handler` must be a free function"),
            FnArg::Typed(_) if index > 0 => {
                bail!("`handler` takes at most one model argument")
            }
            FnArg::Typed(pat) => model = Some(type_string(&pat.ty)),
        }
    }
    let output = match &sig.output {
        ReturnType::Default => "()".to_string(),
        ReturnType::Type(_, ty) => type_string(ty),
    };
    Ok(HandlerSignature {
        is_async: sig.asyncness.is_some(),
        model,
        output,
    })
}

fn collect_use(tree: &UseTree, names: &mut BTreeSet<String>) {
    match tree {
        UseTree::Path(path) => collect_use(&path.tree, names),
        UseTree::Name(name) => {
            names.insert(name.ident.to_string());
        }
        UseTree::Rename(rename) => {
            names.insert(rename.rename.to_string());
        }
        UseTree::Group(group) => {
            for item in &group.items {
                collect_use(item, names);
            }
        }
        UseTree::Glob(_) => {}
    }
}

/// Compact token rendering: `anyhow :: Result < i64 >` becomes `anyhow::Result<i64>`.
fn type_string(ty: &syn::Type) -> String {
    let raw = ty.to_token_stream().to_string();
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let wordy = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
            let keep = (wordy(prev) && wordy(next)) || prev == Some(',');
            if keep {
                out.push(c);
            }
        } else {
            out.push(c);
        }
    }
    out
}
