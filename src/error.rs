//! Coded error registry shared by the registry, resolver and generator.
//!
//! Every failure the core raises carries a stable code (`0x0404`, ...) and a
//! breadcrumb of context lines. Lines are prepended as the error travels, so the
//! most recently added context is rendered first.

use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;

/// Stable error codes understood by callers of the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `throw` was reached without a prior `select`.
    ErrorerErrored,
    CommandLoadFailed,
    CommandNotFound,
    KeyExistsInMap,
    DuplicateCommandsInNamespace,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 5] = [
        ErrorCode::ErrorerErrored,
        ErrorCode::CommandLoadFailed,
        ErrorCode::CommandNotFound,
        ErrorCode::KeyExistsInMap,
        ErrorCode::DuplicateCommandsInNamespace,
    ];

    /// Return the stable string form of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ErrorerErrored => "0x0001",
            ErrorCode::CommandLoadFailed => "0x0002",
            ErrorCode::CommandNotFound => "0x0404",
            ErrorCode::KeyExistsInMap => "0x1001",
            ErrorCode::DuplicateCommandsInNamespace => "0x1002",
        }
    }

    /// Look up a code by its stable string form.
    pub fn from_code(code: &str) -> Option<ErrorCode> {
        ErrorCode::ALL.into_iter().find(|c| c.as_str() == code)
    }

    /// Human-readable template rendered after the code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::ErrorerErrored => {
                "error selector errored: no error was selected before raising"
            }
            ErrorCode::CommandLoadFailed => "command load failed",
            ErrorCode::CommandNotFound => "command not found",
            ErrorCode::KeyExistsInMap => "key already exists in map",
            ErrorCode::DuplicateCommandsInNamespace => "duplicate commands in namespace",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raised registry error: a code plus its accumulated context.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("[{code}] {message}{trail}", message = .code.message(), trail = render_trail(.context))]
pub struct Error {
    code: ErrorCode,
    context: SmallVec<[String; 4]>,
}

impl Error {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            context: SmallVec::new(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Context lines, most recently added first.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Prepend another context line and keep the original code.
    pub fn with_context(mut self, message: impl Into<String>) -> Self {
        self.context.insert(0, message.into());
        self
    }
}

fn render_trail(context: &[String]) -> String {
    let mut out = String::new();
    for line in context {
        out.push_str("\n  ");
        out.push_str(line);
    }
    out
}

/// Select-then-raise builder over the code registry.
///
/// ```
/// use coresep::error::{Errorer, ErrorCode};
///
/// let err = Errorer::select(ErrorCode::CommandNotFound)
///     .with_context("lookup of `math.add`")
///     .throw();
/// assert_eq!(err.code(), ErrorCode::CommandNotFound);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Errorer {
    selected: Option<ErrorCode>,
    context: SmallVec<[String; 4]>,
}

impl Errorer {
    /// Start a builder with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(code: ErrorCode) -> Self {
        Self {
            selected: Some(code),
            context: SmallVec::new(),
        }
    }

    /// Select by raw code string; unknown codes leave the selection empty.
    pub fn select_code(code: &str) -> Self {
        Self {
            selected: ErrorCode::from_code(code),
            context: SmallVec::new(),
        }
    }

    pub fn with_context(mut self, message: impl Into<String>) -> Self {
        self.context.insert(0, message.into());
        self
    }

    /// Materialise the selected error, falling back to `ErrorerErrored`.
    pub fn throw(self) -> Error {
        Error {
            code: self.selected.unwrap_or(ErrorCode::ErrorerErrored),
            context: self.context,
        }
    }

    /// Shorthand for `Err(self.throw())`.
    pub fn fail<T>(self) -> Result<T, Error> {
        Err(self.throw())
    }
}

/// Pull the registry code out of an `anyhow` chain, if one is present.
pub fn code_of(err: &anyhow::Error) -> Option<ErrorCode> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map(Error::code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_roundtrips_through_select_and_throw() {
        for code in ErrorCode::ALL {
            let err = Errorer::select(code).throw();
            assert_eq!(err.code(), code);
            assert!(err.to_string().contains(code.as_str()));

            let by_string = Errorer::select_code(code.as_str()).throw();
            assert_eq!(by_string.code(), code);
        }
    }

    #[test]
    fn context_is_rendered_for_every_code() {
        for code in ErrorCode::ALL {
            let err = Errorer::select(code).with_context("added context").throw();
            assert!(err.to_string().contains("added context"));
            assert_eq!(err.context(), ["added context".to_string()]);
        }
    }

    #[test]
    fn throw_without_select_is_selector_error() {
        let err = Errorer::new().with_context("orphan").throw();
        assert_eq!(err.code(), ErrorCode::ErrorerErrored);
        assert_eq!(
            Errorer::select_code("0xdead").throw().code(),
            ErrorCode::ErrorerErrored
        );
    }

    #[test]
    fn latest_context_comes_first() {
        let err = Errorer::select(ErrorCode::CommandNotFound)
            .with_context("inner")
            .throw()
            .with_context("outer");
        assert_eq!(err.context(), ["outer".to_string(), "inner".to_string()]);
        let rendered = err.to_string();
        assert!(rendered.find("outer").unwrap() < rendered.find("inner").unwrap());
    }

    #[test]
    fn code_survives_anyhow_context() {
        let err = anyhow::Error::new(Errorer::select(ErrorCode::KeyExistsInMap).throw())
            .context("while resolving");
        assert_eq!(code_of(&err), Some(ErrorCode::KeyExistsInMap));
        assert_eq!(code_of(&anyhow::anyhow!("plain")), None);
    }
}
