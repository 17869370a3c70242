//! `ftp-vfs` — a virtual filesystem facade over FTP.
//!
//! [`Host`] presents stat/listdir/open/walk/copy/remove/rename/chmod
//! semantics over a pluggable low-level [`Session`], so callers don't have
//! to speak RFC 959 directly. [`session_ftp`] ships a reference `Session`
//! implementation over a real control/data connection; anything
//! implementing [`Session`] works equally well (a test double, a different
//! transport, a caching proxy in front of a real server).

pub mod cache;
pub mod error;
pub mod host;
pub mod parser;
pub mod path;
pub mod pool;
pub mod session;
pub mod session_ftp;
pub mod stat;
pub mod stream;

pub use error::{Error, FtpResult};
pub use host::Host;
pub use parser::{DirectoryParser, DosParser, UnixParser};
pub use path::RemotePath;
pub use pool::{ChildSessionPool, PoolStats};
pub use session::{DataConnection, Session, SessionFactory};
pub use stat::{DirEntryMap, StatRecord};
pub use stream::{Mode, RemoteFile, TextEncoding};
