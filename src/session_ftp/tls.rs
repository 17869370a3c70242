//! TLS helpers for Explicit and Implicit FTPS (RFC 4217), over `rustls`.

use super::codec::{FtpCodec, ReadHalf, WriteHalf};
use crate::error::{Error, FtpResult};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

/// Build a `rustls::ClientConfig` rooted in the platform's native trust
/// store. There is deliberately no `accept_invalid_certs` escape hatch: a
/// caller that needs to trust a private CA should add it to a custom
/// `RootCertStore` and construct a connector directly.
pub fn build_tls_connector() -> FtpResult<TlsConnector> {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        log::warn!("error loading a native root certificate: {err}");
    }
    for cert in native.certs {
        if let Err(e) = roots.add(cert) {
            log::warn!("skipping unparseable native root certificate: {e}");
        }
    }
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

fn server_name(host: &str) -> FtpResult<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|e| Error::temporary(None, format!("invalid TLS server name {host:?}: {e}")))
}

/// Upgrade an existing **plain** control connection to TLS, after a
/// successful `AUTH TLS` and `234` reply.
pub async fn upgrade_to_tls(codec: FtpCodec, host: &str) -> FtpResult<FtpCodec> {
    let tcp = reunite_plain(codec)?;
    let connector = build_tls_connector()?;
    let name = server_name(host)?;
    let tls = connector
        .connect(name, tcp)
        .await
        .map_err(|e| Error::temporary(None, format!("explicit TLS handshake: {e}")))?;
    Ok(FtpCodec::from_tls(tls))
}

fn reunite_plain(codec: FtpCodec) -> FtpResult<TcpStream> {
    let rd = match codec.reader {
        ReadHalf::Plain(br) => br.into_inner(),
        ReadHalf::Tls(_) => {
            return Err(Error::temporary(None, "connection is already TLS"));
        }
    };
    let wr = match codec.writer {
        WriteHalf::Plain(w) => w,
        WriteHalf::Tls(_) => {
            return Err(Error::temporary(None, "connection is already TLS"));
        }
    };
    rd.reunite(wr).map_err(|e| Error::temporary(None, format!("reunite failed: {e}")))
}

/// Wrap a freshly-connected data-channel socket in TLS (`PROT P`).
pub async fn wrap_data_stream(
    tcp: TcpStream,
    host: &str,
) -> FtpResult<tokio_rustls::client::TlsStream<TcpStream>> {
    let connector = build_tls_connector()?;
    let name = server_name(host)?;
    connector
        .connect(name, tcp)
        .await
        .map_err(|e| Error::temporary(None, format!("data channel TLS: {e}")))
}
