//! TCP + TLS transport — establishes the FTP control connection.

use super::codec::FtpCodec;
use super::tls::build_tls_connector;
use super::types::{FtpConnectionConfig, FtpResponse, FtpSecurityMode};
use crate::error::{Error, FtpResult};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::pki_types::ServerName;

/// Establish the control connection and return a ready-to-use codec plus
/// the server welcome banner. For Explicit FTPS, the caller issues
/// `AUTH TLS` afterwards (see `ftp_session.rs`).
pub async fn connect(config: &FtpConnectionConfig) -> FtpResult<(FtpCodec, FtpResponse)> {
    let addr = format!("{}:{}", config.host, config.port);
    let dur = Duration::from_secs(config.connect_timeout_sec);

    let tcp = timeout(dur, TcpStream::connect(&addr))
        .await
        .map_err(|_| Error::temporary(None, format!("TCP connect to {addr} timed out")))?
        .map_err(|e| Error::temporary(None, format!("TCP connect to {addr}: {e}")))?;

    tcp.set_nodelay(true).ok();

    match config.security {
        FtpSecurityMode::Implicit => {
            let connector = build_tls_connector()?;
            let name = ServerName::try_from(config.host.clone())
                .map_err(|e| Error::temporary(None, format!("invalid TLS server name: {e}")))?;
            let tls = connector
                .connect(name, tcp)
                .await
                .map_err(|e| Error::temporary(None, format!("implicit TLS handshake: {e}")))?;
            let mut codec = FtpCodec::from_tls(tls);
            let banner = codec.read_response().await?;
            Ok((codec, banner))
        }
        _ => {
            let mut codec = FtpCodec::from_tcp(tcp);
            let banner = codec.read_response().await?;
            Ok((codec, banner))
        }
    }
}
