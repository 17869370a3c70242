//! The low-level session contract. Everything above this module is pure
//! virtual-filesystem logic; everything below it is protocol plumbing the
//! caller supplies (or picks up ready-made from [`crate::session_ftp`]).

use crate::error::FtpResult;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// A data-channel socket: whatever `transfercmd` returns, regardless of
/// whether it's plain TCP or wrapped in TLS.
pub trait DataConnection: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> DataConnection for T {}

/// One FTP control connection. A `Host` drives its primary session through
/// this trait; child sessions used for data transfers implement it too.
///
/// Implementors own the wire protocol entirely — reply parsing, command
/// pipelining, TLS handshake details — none of that is this crate's
/// concern. [`crate::session_ftp`] ships a reference implementation.
#[async_trait]
pub trait Session: Send {
    /// `PWD`. Returns the raw reply text (the path, unquoted).
    async fn pwd(&mut self) -> FtpResult<String>;

    /// `CWD`.
    async fn cwd(&mut self, path: &str) -> FtpResult<()>;

    /// `MKD`.
    async fn mkd(&mut self, path: &str) -> FtpResult<()>;

    /// `RMD`.
    async fn rmd(&mut self, path: &str) -> FtpResult<()>;

    /// `DELE`.
    async fn dele(&mut self, path: &str) -> FtpResult<()>;

    /// `RNFR`/`RNTO` pair.
    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()>;

    /// Send an arbitrary command and require a 2xx reply, returning its text.
    async fn voidcmd(&mut self, cmd: &str) -> FtpResult<String>;

    /// Read the next queued reply and require it to be 2xx (used for the
    /// deferred `226 Transfer complete` after a data connection closes).
    async fn voidresp(&mut self) -> FtpResult<String>;

    /// `LIST`/`NLST`. `use_list_a` requests `LIST -a` when the caller wants
    /// dotfiles; the backend may ignore it if unsupported. Returns raw lines.
    async fn dir(&mut self, path: &str, use_list_a: bool) -> FtpResult<Vec<String>>;

    /// Open a data connection for `cmd` (`RETR <name>` / `STOR <name>` /
    /// `APPE <name>`), optionally after a `REST <rest>` to resume/seek.
    async fn transfercmd(
        &mut self,
        cmd: &str,
        rest: Option<u64>,
    ) -> FtpResult<Box<dyn DataConnection>>;

    /// `QUIT`, tolerating the server having already hung up.
    async fn close(&mut self) -> FtpResult<()>;

    /// The text encoding this session negotiated (e.g. via `OPTS UTF8`,
    /// or `None` if byte paths cannot be represented and must fail with
    /// [`crate::error::InternalKind::NoEncoding`]).
    fn encoding(&self) -> Option<&str>;
}

/// Produces fresh [`Session`]s on demand: one for a `Host`'s primary
/// connection, and one per child in the [`crate::pool::ChildSessionPool`].
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn connect(&self) -> FtpResult<Box<dyn Session>>;
}
