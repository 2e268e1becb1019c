//! Command and module descriptors handed to the container factory.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::{self, BoxFuture, FutureExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Boxed future returned by every handler.
pub type HandlerFuture = BoxFuture<'static, Result<Value>>;

/// Uniform handler shape stored on a command.
pub type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// Zero-argument loader producing a command on first use.
pub type CommandLoader = Arc<dyn Fn() -> BoxFuture<'static, Result<Command>> + Send + Sync>;

/// A named unit of work with an optional version and metadata.
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub version: Option<String>,
    pub meta: Option<Value>,
    handler: Handler,
}

impl Command {
    /// Build a command from an async handler over JSON values.
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::from_handler(name, Arc::new(move |model| handler(model).boxed()))
    }

    /// Build a command from a synchronous handler over JSON values.
    pub fn from_fn<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self::from_handler(name, Arc::new(move |model| future::ready(handler(model)).boxed()))
    }

    /// Adapt a typed synchronous handler; the model is decoded from JSON and
    /// the output encoded back.
    pub fn typed<M, R, F>(name: impl Into<String>, handler: F) -> Self
    where
        M: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(M) -> Result<R> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self::from_handler(
            name,
            Arc::new(move |model| {
                let out = decode_model::<M>(&label, model)
                    .and_then(|m| handler(m))
                    .and_then(|r| encode_output(&label, r));
                future::ready(out).boxed()
            }),
        )
    }

    /// Async counterpart of [`Command::typed`].
    pub fn typed_async<M, R, F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        M: DeserializeOwned + 'static,
        R: Serialize + Send + 'static,
        F: Fn(M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self::from_handler(
            name,
            Arc::new(move |model| match decode_model::<M>(&label, model) {
                Ok(m) => {
                    let pending = handler(m);
                    let label = label.clone();
                    async move { encode_output(&label, pending.await?) }.boxed()
                }
                Err(err) => future::ready(Err(err)).boxed(),
            }),
        )
    }

    pub fn from_handler(name: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            version: None,
            meta: None,
            handler,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.version = if version.is_empty() {
            None
        } else {
            Some(version)
        };
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Container key for direct registration: `name` or `name@version`.
    pub fn key(&self) -> String {
        export_key(&self.name, self.version.as_deref())
    }

    /// Run the handler; sync and async handlers both resolve through here.
    pub async fn call(&self, model: Value) -> Result<Value> {
        (self.handler)(model).await
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Join a command name and optional version into an export key.
pub fn export_key(name: &str, version: Option<&str>) -> String {
    match version {
        Some(v) if !v.is_empty() => format!("{name}@{v}"),
        _ => name.to_string(),
    }
}

fn decode_model<M: DeserializeOwned>(name: &str, model: Value) -> Result<M> {
    serde_json::from_value(model).with_context(|| format!("invalid model for command `{name}`"))
}

fn encode_output<R: Serialize>(name: &str, output: R) -> Result<Value> {
    serde_json::to_value(output).with_context(|| format!("invalid output from command `{name}`"))
}

/// A module entry is either an eager command or a loader run on first use.
#[derive(Clone)]
pub enum ModuleEntry {
    Eager(Command),
    Lazy(CommandLoader),
}

impl ModuleEntry {
    pub fn eager(command: Command) -> Self {
        ModuleEntry::Eager(command)
    }

    pub fn lazy<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Command>> + Send + 'static,
    {
        ModuleEntry::Lazy(Arc::new(move || loader().boxed()))
    }
}

impl fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleEntry::Eager(command) => f.debug_tuple("Eager").field(command).finish(),
            ModuleEntry::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// A named group of commands keyed by export key, in declaration order.
#[derive(Clone, Debug)]
pub struct Module {
    pub name: String,
    pub commands: Vec<(String, ModuleEntry)>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    pub fn from_entries<K: Into<String>>(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (K, ModuleEntry)>,
    ) -> Self {
        Self {
            name: name.into(),
            commands: entries.into_iter().map(|(k, e)| (k.into(), e)).collect(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, entry: ModuleEntry) -> Self {
        self.commands.push((key.into(), entry));
        self
    }
}

/// Statically inferred handler signature emitted into the generated type map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSignature {
    pub key: &'static str,
    pub model: Option<&'static str>,
    pub output: &'static str,
    pub is_async: bool,
    pub source: &'static str,
}

/// Find a signature by composite key in a generated type map.
pub fn find_signature<'a>(
    map: &'a [CommandSignature],
    key: &str,
) -> Option<&'a CommandSignature> {
    map.iter().find(|sig| sig.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct AddModel {
        a: i64,
        b: i64,
    }

    #[tokio::test]
    async fn typed_handler_decodes_and_encodes() -> Result<()> {
        let command = Command::typed("add", |m: AddModel| Ok(m.a + m.b));
        assert_eq!(command.call(json!({"a": 2, "b": 3})).await?, json!(5));

        let err = command.call(json!("nope")).await.unwrap_err();
        assert!(err.to_string().contains("invalid model for command `add`"));
        Ok(())
    }

    #[tokio::test]
    async fn sync_and_async_handlers_share_one_call_path() -> Result<()> {
        let sync = Command::from_fn("sync", |v| Ok(json!(v.as_i64().unwrap_or(0) * 2)));
        let deferred = Command::new("async", |v: Value| async move { Ok(v) });
        let typed_async =
            Command::typed_async("inc", |x: i64| async move { Ok::<_, anyhow::Error>(x + 1) });
        assert_eq!(sync.call(json!(4)).await?, json!(8));
        assert_eq!(deferred.call(json!("x")).await?, json!("x"));
        assert_eq!(typed_async.call(json!(41)).await?, json!(42));
        Ok(())
    }

    #[test]
    fn key_includes_version_when_present() {
        let plain = Command::from_fn("ping", Ok);
        assert_eq!(plain.key(), "ping");
        let versioned = Command::from_fn("ping", Ok).with_version("1.2.0");
        assert_eq!(versioned.key(), "ping@1.2.0");
        assert_eq!(Command::from_fn("ping", Ok).with_version("").key(), "ping");
    }

    #[test]
    fn signature_lookup_by_key() {
        const MAP: &[CommandSignature] = &[CommandSignature {
            key: "math.add",
            model: Some("AddModel"),
            output: "anyhow::Result<i64>",
            is_async: false,
            source: "math/add.rs",
        }];
        assert_eq!(find_signature(MAP, "math.add").map(|s| s.output), Some("anyhow::Result<i64>"));
        assert!(find_signature(MAP, "math.sub").is_none());
    }
}
