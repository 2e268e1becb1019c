//! Command discovery, lazy command registry and glue generation.
//!
//! The runtime half (`Command`, `Module`, `Factory`, `Container`) is what
//! generated glue links against. The build half (`resolver`, `incremental`,
//! `generator`, `session`) discovers command files and writes that glue.

pub mod command;
pub mod config;
pub mod container;
pub mod emitters;
pub mod error;
pub mod exports;
pub mod file;
pub mod fingerprint;
pub mod generator;
pub mod glue;
pub mod graceful_map;
pub mod incremental;
pub mod initiator;
pub mod resolver;
pub mod session;

pub type Result<T> = anyhow::Result<T>;

pub use command::{
    Command, CommandLoader, CommandSignature, Handler, Module, ModuleEntry, export_key,
    find_signature,
};
pub use config::GlueOptions;
pub use container::{Container, Factory, global, invoke_global};
pub use error::{Error, ErrorCode, Errorer, code_of};
pub use file::{CommandFile, LibModule, LibSpec, LibraryMap, NamespaceMap};
pub use generator::{Artifact, GenerationReport, GlueGenerator, RustGlueGenerator};
pub use graceful_map::GracefulMap;
pub use incremental::{Change, WatchEvent, apply_event};
pub use initiator::{Initiator, LazyInitiator, PreloadedInitiator};
pub use resolver::{FileResolver, SourceResolver};
pub use serde_json::Value;
pub use session::Session;
