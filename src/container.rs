//! Factory that accumulates initiators and the container that invokes them.

use std::sync::{Arc, RwLock};

use anyhow::{Result, bail};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::{debug, warn};

use crate::command::{Command, Module, ModuleEntry};
use crate::error::{Error, ErrorCode, Errorer};
use crate::initiator::{Initiator, LazyInitiator, PreloadedInitiator};

/// Resolves composite keys to initiators and runs their commands.
pub struct Container {
    initiators: IndexMap<String, Box<dyn Initiator>>,
}

impl Container {
    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.initiators.keys().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.initiators.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.initiators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initiators.is_empty()
    }

    /// Look up `key`, load its initiator if needed and return the command.
    pub async fn get_command(&self, key: &str) -> Result<Command, Error> {
        let Some(initiator) = self.initiators.get(key) else {
            let present: Vec<&str> = self.keys().collect();
            return Errorer::select(ErrorCode::CommandNotFound)
                .with_context(format!(
                    "present initiators: {}",
                    serde_json::to_string(&present).unwrap_or_default()
                ))
                .with_context(format!("no initiator registered for '{key}'"))
                .fail();
        };
        initiator.load().await?;
        initiator.get()
    }

    /// Resolve `key` and run its handler with `model`.
    pub async fn invoke(&self, key: &str, model: Value) -> Result<Value> {
        let command = self.get_command(key).await?;
        debug!(key, "invoking command");
        command.call(model).await
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("keys", &self.initiators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Accumulates initiators keyed by composite key, then builds a [`Container`].
#[derive(Default)]
pub struct Factory {
    initiators: IndexMap<String, Box<dyn Initiator>>,
    publish: bool,
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command directly under `name` or `name@version`.
    pub fn register_command(mut self, command: Command) -> Self {
        let key = command.key();
        self.insert(key, Box::new(PreloadedInitiator::new(command)));
        self
    }

    /// Register every entry of `module`. Lazy entries are keyed
    /// `<module>.<exportKey>`; eager entries use the command's own key.
    pub fn register_module(mut self, module: Module) -> Self {
        let prefix = module.name;
        self.insert_entries(&prefix, module.commands);
        self
    }

    /// Register a prebuilt library module; lazy entries are keyed
    /// `<lib>.<module>.<exportKey>`.
    pub fn register_lib_module(mut self, lib: &str, module: Module) -> Self {
        let prefix = format!("{lib}.{}", module.name);
        self.insert_entries(&prefix, module.commands);
        self
    }

    /// Also publish the built container into the process-wide slot.
    pub fn singleton(mut self) -> Self {
        self.publish = true;
        self
    }

    pub fn build(self) -> Arc<Container> {
        let container = Arc::new(Container {
            initiators: self.initiators,
        });
        if self.publish {
            publish(container.clone());
        }
        container
    }

    fn insert_entries(&mut self, prefix: &str, entries: Vec<(String, ModuleEntry)>) {
        for (export_key, entry) in entries {
            match entry {
                ModuleEntry::Lazy(loader) => {
                    let key = format!("{prefix}.{export_key}");
                    let initiator = LazyInitiator::new(loader, key.clone());
                    self.insert(key, Box::new(initiator));
                }
                ModuleEntry::Eager(command) => {
                    let key = command.key();
                    self.insert(key, Box::new(PreloadedInitiator::new(command)));
                }
            }
        }
    }

    fn insert(&mut self, key: String, initiator: Box<dyn Initiator>) {
        if self.initiators.insert(key.clone(), initiator).is_some() {
            warn!(%key, "initiator replaced by a later registration");
        }
    }
}

static SLOT: Lazy<RwLock<Option<Arc<Container>>>> = Lazy::new(|| RwLock::new(None));

fn publish(container: Arc<Container>) {
    let mut slot = SLOT.write().expect("container slot poisoned");
    *slot = Some(container);
}

/// The container published by a [`Factory::singleton`] build, if any.
pub fn global() -> Option<Arc<Container>> {
    SLOT.read().expect("container slot poisoned").clone()
}

/// Invoke through the published container.
pub async fn invoke_global(key: &str, model: Value) -> Result<Value> {
    let Some(container) = global() else {
        bail!("no container has been published; build a factory with `singleton()` first");
    };
    container.invoke(key, model).await
}
