//! Initiators mediate between "not yet loaded" and "loaded" commands.
//!
//! The container never touches a command directly: it asks the initiator to
//! `load` and then to `get`. Preloaded initiators already hold their command;
//! lazy ones run a loader once and then stay in a terminal state.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::command::{Command, CommandLoader};
use crate::error::{Error, ErrorCode, Errorer};

/// Access contract for a single command whose loading may be deferred.
#[async_trait]
pub trait Initiator: Send + Sync {
    /// Make the command available.
    async fn load(&self) -> Result<(), Error>;

    /// Return the command; fails if it is not available yet.
    fn get(&self) -> Result<Command, Error>;

    fn is_loaded(&self) -> bool;
}

/// Initiator around a command that is available from the start.
#[derive(Debug)]
pub struct PreloadedInitiator {
    command: Command,
}

impl PreloadedInitiator {
    pub fn new(command: Command) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Initiator for PreloadedInitiator {
    async fn load(&self) -> Result<(), Error> {
        Ok(())
    }

    fn get(&self) -> Result<Command, Error> {
        Ok(self.command.clone())
    }

    fn is_loaded(&self) -> bool {
        true
    }
}

#[derive(Debug)]
enum LoadState {
    Unloaded,
    Loaded(Command),
    Failed(String),
}

/// Initiator that runs its loader on the first `load` call.
pub struct LazyInitiator {
    loader: CommandLoader,
    display_name: String,
    state: Mutex<LoadState>,
}

impl LazyInitiator {
    pub fn new(loader: CommandLoader, display_name: impl Into<String>) -> Self {
        Self {
            loader,
            display_name: display_name.into(),
            state: Mutex::new(LoadState::Unloaded),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    fn load_failed(&self, detail: &str) -> Error {
        Errorer::select(ErrorCode::CommandLoadFailed)
            .with_context(format!(
                "failed to load the command: {}\n{detail}",
                self.display_name
            ))
            .throw()
    }
}

#[async_trait]
impl Initiator for LazyInitiator {
    async fn load(&self) -> Result<(), Error> {
        {
            let state = self.state.lock().expect("initiator state poisoned");
            match &*state {
                LoadState::Loaded(_) => return Ok(()),
                LoadState::Failed(detail) => return Err(self.load_failed(detail)),
                LoadState::Unloaded => {}
            }
        }

        let outcome = (self.loader)().await;

        let mut state = self.state.lock().expect("initiator state poisoned");
        match outcome {
            Ok(command) => {
                if matches!(*state, LoadState::Unloaded) {
                    *state = LoadState::Loaded(command);
                }
                Ok(())
            }
            Err(err) => {
                let detail = format!("{err:#}");
                let raised = self.load_failed(&detail);
                if matches!(*state, LoadState::Unloaded) {
                    *state = LoadState::Failed(detail);
                }
                Err(raised)
            }
        }
    }

    fn get(&self) -> Result<Command, Error> {
        let state = self.state.lock().expect("initiator state poisoned");
        match &*state {
            LoadState::Loaded(command) => Ok(command.clone()),
            _ => Errorer::select(ErrorCode::CommandNotFound)
                .with_context(format!(
                    "failed to find the command: {}. perhaps `load` was not called beforehand",
                    self.display_name
                ))
                .fail(),
        }
    }

    fn is_loaded(&self) -> bool {
        matches!(
            *self.state.lock().expect("initiator state poisoned"),
            LoadState::Loaded(_)
        )
    }
}
