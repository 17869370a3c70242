//! Reference [`crate::session::Session`] implementation over a real FTP(S)
//! control/data connection (RFC 959, plus `AUTH TLS`/`PBSZ`/`PROT` from RFC
//! 4217 for explicit and implicit FTPS).
//!
//! This module is a ready-to-use backend, not part of the core
//! virtual-filesystem contract: any other `Session` implementation (a test
//! double, a different transport) plugs into [`crate::host::Host`] equally
//! well. Only passive data-connection modes (PASV/EPSV) are supported —
//! active mode and `MLSD`/`MLST` are out of scope here.

mod codec;
mod connection;
mod ftp_session;
mod tls;
mod transfer;
mod types;

pub mod factory;

pub use factory::FtpSessionFactory;
pub use types::{FtpConnectionConfig, FtpSecurityMode};
