//! Remote file streams returned by [`crate::host::Host::open`].
//!
//! A `RemoteFile` owns a child session borrowed from the host's pool for the
//! duration of the transfer. Binary mode is a thin pass-through over the
//! data connection; text mode additionally transcodes and translates
//! newlines the way the spec's encoding contract requires.

use crate::error::{Error, FtpResult, InternalKind};
use crate::pool::ChildSessionPool;
use crate::session::{DataConnection, Session};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::Mutex;

/// Which direction a `RemoteFile` was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
    Append,
}

/// Text encodings this crate can transcode on the fly. Arbitrary codecs (as
/// a dynamically-typed client might support) are out of scope; these two
/// cover the overwhelming majority of FTP servers encountered in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

impl TextEncoding {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "utf-8" | "utf8" => Some(TextEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Some(TextEncoding::Latin1),
            _ => None,
        }
    }

    fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }

    fn encode(self, s: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => s.as_bytes().to_vec(),
            TextEncoding::Latin1 => s.chars().map(|c| c as u8).collect(),
        }
    }
}

enum Body {
    Binary,
    Text { encoding: TextEncoding },
}

/// An open remote file. Must be closed with [`RemoteFile::close`] to
/// release the underlying child session and collect the deferred `226`
/// reply; dropping without closing leaks the child session as busy.
pub struct RemoteFile {
    data: Box<dyn DataConnection>,
    session: Option<Box<dyn Session>>,
    pool: Arc<Mutex<ChildSessionPool>>,
    mode: Mode,
    body: Body,
    errored: bool,
    closed: bool,
}

impl RemoteFile {
    pub(crate) async fn open(
        pool: Arc<Mutex<ChildSessionPool>>,
        dirname: &str,
        basename: &str,
        mode: Mode,
        rest: Option<u64>,
        text_encoding: Option<TextEncoding>,
    ) -> FtpResult<Self> {
        let mut session = pool.lock().await.acquire().await?;
        if let Err(e) = session.cwd(dirname).await {
            pool.lock().await.release(session, true);
            return Err(e);
        }
        let cmd = match mode {
            Mode::Read => format!("RETR {basename}"),
            Mode::Write => format!("STOR {basename}"),
            Mode::Append => format!("APPE {basename}"),
        };
        let data = match session.transfercmd(&cmd, rest).await {
            Ok(d) => d,
            Err(e) => {
                pool.lock().await.release(session, true);
                return Err(e);
            }
        };
        let body = match text_encoding {
            Some(encoding) => Body::Text { encoding },
            None => Body::Binary,
        };
        Ok(Self {
            data,
            session: Some(session),
            pool,
            mode,
            body,
            errored: false,
            closed: false,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Read the whole remaining stream as a decoded string (text mode only).
    pub async fn read_to_string(&mut self) -> FtpResult<String> {
        let encoding = match &self.body {
            Body::Text { encoding, .. } => *encoding,
            Body::Binary => return Err(InternalKind::TypeMismatch.into()),
        };
        use tokio::io::AsyncReadExt;
        let mut raw = Vec::new();
        if let Err(e) = self.data.read_to_end(&mut raw).await {
            self.errored = true;
            return Err(e.into());
        }
        let text = encoding.decode(&raw);
        Ok(translate_newlines_in(&text))
    }

    /// Write a decoded string, translating `\n` to `\r\n` on the wire
    /// (text mode only).
    pub async fn write_str(&mut self, s: &str) -> FtpResult<()> {
        let encoding = match &self.body {
            Body::Text { encoding, .. } => *encoding,
            Body::Binary => return Err(InternalKind::TypeMismatch.into()),
        };
        use tokio::io::AsyncWriteExt;
        let wire = encoding.encode(&translate_newlines_out(s));
        if let Err(e) = self.data.write_all(&wire).await {
            self.errored = true;
            return Err(e.into());
        }
        Ok(())
    }

    /// Close the data connection, collect the deferred `226` reply on the
    /// control channel, and release the child session back to the pool.
    ///
    /// Some servers send `226 Transfer complete` only after the data socket
    /// is fully drained and closed on both ends; a premature `voidresp` can
    /// race it and read a reply meant for a *later* command instead. We
    /// shut the data side down first and only then collect the reply.
    pub async fn close(&mut self) -> FtpResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        use tokio::io::AsyncWriteExt;
        if self.mode != Mode::Read {
            if let Err(e) = self.data.shutdown().await {
                self.errored = true;
                self.release().await;
                return Err(e.into());
            }
        }
        let mut result = Ok(());
        if let Some(session) = self.session.as_mut() {
            match session.voidresp().await {
                Ok(_) => {}
                Err(e) if e.already_closed() => {}
                Err(e) => {
                    self.errored = true;
                    result = Err(e);
                }
            }
        }
        self.release().await;
        result
    }

    async fn release(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.lock().await.release(session, self.errored);
        }
    }
}

trait AlreadyClosedExt {
    fn already_closed(&self) -> bool;
}

impl AlreadyClosedExt for Error {
    fn already_closed(&self) -> bool {
        matches!(self, Error::Internal(InternalKind::AlreadyClosed))
    }
}

fn translate_newlines_in(s: &str) -> String {
    s.replace("\r\n", "\n")
}

fn translate_newlines_out(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\n' {
            out.push('\r');
        }
        out.push(c);
    }
    out
}

impl AsyncRead for RemoteFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}

impl AsyncWrite for RemoteFile {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.data).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.data).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.data).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_encoding_roundtrip_utf8() {
        let e = TextEncoding::Utf8;
        let bytes = e.encode("héllo");
        assert_eq!(e.decode(&bytes), "héllo");
    }

    #[test]
    fn text_encoding_roundtrip_latin1() {
        let e = TextEncoding::Latin1;
        let bytes = e.encode("caf\u{e9}");
        assert_eq!(e.decode(&bytes), "caf\u{e9}");
    }

    #[test]
    fn newline_translation() {
        assert_eq!(translate_newlines_in("a\r\nb\r\n"), "a\nb\n");
        assert_eq!(translate_newlines_out("a\nb\n"), "a\r\nb\r\n");
    }

    #[test]
    fn unknown_encoding_name_is_none() {
        assert!(TextEncoding::parse("shift-jis").is_none());
    }
}
