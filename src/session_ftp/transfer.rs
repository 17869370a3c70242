//! Data-channel management for FTP transfers.
//!
//! Only passive modes are implemented: **PASV** and **EPSV**. Active mode
//! (`PORT`/`EPRT`) requires the client to accept an inbound connection,
//! which doesn't fit a library meant to run behind NAT/firewalls without
//! extra configuration the caller has no way to supply through the
//! `Session` contract — out of scope for this reference backend.

use super::codec::FtpCodec;
use super::tls;
use super::types::FtpSecurityMode;
use crate::error::{Error, FtpResult};
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

/// Which passive mode to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChannelMode {
    Passive,
    ExtendedPassive,
}

/// A plain or TLS-wrapped data stream.
pub enum DataStream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for DataStream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            DataStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            DataStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for DataStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            DataStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            DataStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            DataStream::Plain(s) => Pin::new(s).poll_flush(cx),
            DataStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            DataStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            DataStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Open a data channel according to the configured mode, wrapping it in
/// TLS when the control channel is secured (`PROT P` is implied).
pub async fn open_data_channel(
    codec: &mut FtpCodec,
    mode: DataChannelMode,
    security: &FtpSecurityMode,
    host: &str,
    data_timeout: Duration,
) -> FtpResult<DataStream> {
    let tcp = match mode {
        DataChannelMode::Passive => open_pasv(codec, data_timeout).await?,
        DataChannelMode::ExtendedPassive => open_epsv(codec, host, data_timeout).await?,
    };

    if *security != FtpSecurityMode::None {
        let tls = tls::wrap_data_stream(tcp, host).await?;
        Ok(DataStream::Tls(Box::new(tls)))
    } else {
        Ok(DataStream::Plain(tcp))
    }
}

/// Issue `PASV`, parse `227 ... (h1,h2,h3,h4,p1,p2)`, connect to it.
async fn open_pasv(codec: &mut FtpCodec, data_timeout: Duration) -> FtpResult<TcpStream> {
    let resp = codec.expect_ok("PASV").await?;
    let addr = parse_pasv_response(&resp.text())?;
    timeout(data_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| Error::temporary(None, "PASV data connect timed out"))?
        .map_err(|e| Error::temporary(None, format!("PASV data connect: {e}")))
}

lazy_static::lazy_static! {
    static ref PASV_RE: Regex = Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").unwrap();
    static ref EPSV_RE: Regex = Regex::new(r"\|\|\|(\d+)\|").unwrap();
}

fn parse_pasv_response(text: &str) -> FtpResult<SocketAddr> {
    let caps = PASV_RE
        .captures(text)
        .ok_or_else(|| Error::temporary(None, format!("cannot parse PASV reply: {text}")))?;

    let nums: Vec<u8> = (1..=6)
        .map(|i| {
            caps[i]
                .parse::<u8>()
                .map_err(|_| Error::temporary(None, "PASV number out of range"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = (nums[4] as u16) * 256 + (nums[5] as u16);
    Ok(SocketAddr::new(ip, port))
}

/// Issue `EPSV`, parse `229 ... (|||port|)`, connect to the same host.
async fn open_epsv(codec: &mut FtpCodec, host: &str, data_timeout: Duration) -> FtpResult<TcpStream> {
    let resp = codec.expect_ok("EPSV").await?;
    let port = parse_epsv_response(&resp.text())?;
    let addr = format!("{host}:{port}");
    timeout(data_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| Error::temporary(None, "EPSV data connect timed out"))?
        .map_err(|e| Error::temporary(None, format!("EPSV data connect: {e}")))
}

fn parse_epsv_response(text: &str) -> FtpResult<u16> {
    let caps = EPSV_RE
        .captures(text)
        .ok_or_else(|| Error::temporary(None, format!("cannot parse EPSV reply: {text}")))?;
    caps[1]
        .parse::<u16>()
        .map_err(|_| Error::temporary(None, "EPSV port out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pasv_tuple() {
        let addr = parse_pasv_response("Entering Passive Mode (127,0,0,1,200,56)").unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:51256");
    }

    #[test]
    fn parses_epsv_port() {
        let port = parse_epsv_response("Entering Extended Passive Mode (|||51256|)").unwrap();
        assert_eq!(port, 51256);
    }
}
