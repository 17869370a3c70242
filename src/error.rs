//! Error taxonomy.
//!
//! Mirrors the FTP reply-code hierarchy plus the library's own internal
//! failure modes. `Permanent`/`Temporary` classify 5xx/4xx replies the way
//! a caller would expect from an OSError-style mapping; `Internal` covers
//! failures that have nothing to do with a specific server reply.

pub type FtpResult<T> = Result<T, Error>;

/// A 5xx server reply, refined into the specific cases call sites care about.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PermanentKind {
    /// 502: the server doesn't implement the command at all (e.g. `SITE CHMOD`).
    #[error("command not implemented (code {code})")]
    CommandNotImplemented { code: u16 },
    /// 5xx interpreted as "no such file or directory".
    #[error("item not found (code {code})")]
    ItemNotFound { code: u16 },
    /// Any other 5xx.
    #[error("permanent failure (code {code}): {message}")]
    Other { code: u16, message: String },
}

impl PermanentKind {
    pub fn code(&self) -> u16 {
        match self {
            PermanentKind::CommandNotImplemented { code } => *code,
            PermanentKind::ItemNotFound { code } => *code,
            PermanentKind::Other { code, .. } => *code,
        }
    }
}

/// The internal-failure leaves named by the specification.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InternalKind {
    #[error("cannot cwd into the login directory {0:?}")]
    InaccessibleLoginDir(String),
    #[error("session factory produced a session without a declared encoding, but byte paths were used")]
    NoEncoding,
    #[error("could not parse listing line: {0:?}")]
    ParserFailure(String),
    #[error("the root directory cannot be stat'd")]
    RootDir,
    #[error("time shift error: {0}")]
    TimeShift(String),
    #[error("symlink chain too deep or cyclic")]
    RecursiveLink,
    #[error("mixed text and byte paths in a single call")]
    TypeMismatch,
    #[error("the host is already closed")]
    AlreadyClosed,
}

/// Root error type returned by every fallible operation in this crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// 5xx reply, classified.
    #[error(transparent)]
    Permanent(#[from] PermanentKind),
    /// 4xx reply, or a transport error with no reply code to classify.
    #[error("temporary failure (code {code:?}): {message}")]
    Temporary { code: Option<u16>, message: String },
    /// Failure reading or writing a remote file stream.
    #[error("I/O error on remote stream: {0}")]
    Io(String),
    /// Internal / library-level failure.
    #[error(transparent)]
    Internal(#[from] InternalKind),
}

impl Error {
    pub fn item_not_found(code: u16) -> Self {
        PermanentKind::ItemNotFound { code }.into()
    }

    pub fn command_not_implemented(code: u16) -> Self {
        PermanentKind::CommandNotImplemented { code }.into()
    }

    pub fn permanent(code: u16, message: impl Into<String>) -> Self {
        PermanentKind::Other {
            code,
            message: message.into(),
        }
        .into()
    }

    pub fn temporary(code: Option<u16>, message: impl Into<String>) -> Self {
        Error::Temporary {
            code,
            message: message.into(),
        }
    }

    /// Classify a raw FTP reply code the way a session backend would.
    pub fn from_reply(code: u16, text: &str) -> Self {
        match code {
            400..=499 => Error::temporary(Some(code), text),
            500..=599 => {
                let lower = text.to_lowercase();
                if code == 502 {
                    Self::command_not_implemented(code)
                } else if lower.contains("not found") || lower.contains("no such") {
                    Self::item_not_found(code)
                } else {
                    Self::permanent(code, text)
                }
            }
            _ => Error::temporary(Some(code), text),
        }
    }

    /// Whether this failure should make `is*` predicates return `false`
    /// rather than propagate, per spec.md §7.
    pub fn is_missing_entry(&self) -> bool {
        matches!(self, Error::Permanent(PermanentKind::ItemNotFound { .. }))
    }

    pub fn already_closed() -> Self {
        InternalKind::AlreadyClosed.into()
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Temporary { message, .. } => message.to_lowercase().contains("timeout"),
            Error::Io(message) => {
                let lower = message.to_lowercase();
                lower.contains("timeout") || lower.contains("timed out")
            }
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            Error::temporary(None, format!("I/O timeout: {e}"))
        } else {
            Error::Io(e.to_string())
        }
    }
}

impl From<&Error> for String {
    fn from(e: &Error) -> String {
        e.to_string()
    }
}
