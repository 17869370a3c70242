//! Concrete [`Session`] implementation speaking real RFC 959/4217 FTP(S).

use super::codec::FtpCodec;
use super::transfer::{open_data_channel, DataChannelMode, DataStream};
use super::types::{FtpConnectionConfig, FtpSecurityMode};
use crate::error::{Error, FtpResult};
use crate::session::{DataConnection, Session};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::time::Duration;

/// One control connection plus whatever's needed to open data channels for
/// it. Used both as a `Host`'s primary session and as a pooled child.
pub struct FtpWireSession {
    codec: FtpCodec,
    config: FtpConnectionConfig,
    encoding: Option<String>,
}

impl FtpWireSession {
    pub(crate) fn new(codec: FtpCodec, config: FtpConnectionConfig, encoding: Option<String>) -> Self {
        Self {
            codec,
            config,
            encoding,
        }
    }

    async fn open_data(&mut self) -> FtpResult<DataStream> {
        let data_timeout = Duration::from_secs(self.config.data_timeout_sec);
        match open_data_channel(
            &mut self.codec,
            DataChannelMode::ExtendedPassive,
            &self.config.security,
            &self.config.host,
            data_timeout,
        )
        .await
        {
            Ok(stream) => Ok(stream),
            Err(_) => {
                log::debug!("EPSV failed, falling back to PASV");
                open_data_channel(
                    &mut self.codec,
                    DataChannelMode::Passive,
                    &self.config.security,
                    &self.config.host,
                    data_timeout,
                )
                .await
            }
        }
    }
}

/// Pull the quoted path out of a `257 "/some/path" is current directory`
/// style reply.
fn extract_quoted(text: &str) -> Option<String> {
    let start = text.find('"')?;
    let rest = &text[start + 1..];
    let end = rest.find('"')?;
    Some(rest[..end].replace("\"\"", "\""))
}

#[async_trait]
impl Session for FtpWireSession {
    async fn pwd(&mut self) -> FtpResult<String> {
        let resp = self.codec.expect("PWD", 2).await?;
        extract_quoted(&resp.text())
            .ok_or_else(|| Error::temporary(None, "PWD reply did not contain a quoted path"))
    }

    async fn cwd(&mut self, path: &str) -> FtpResult<()> {
        self.codec.expect_ok(&format!("CWD {path}")).await?;
        Ok(())
    }

    async fn mkd(&mut self, path: &str) -> FtpResult<()> {
        self.codec.expect_ok(&format!("MKD {path}")).await?;
        Ok(())
    }

    async fn rmd(&mut self, path: &str) -> FtpResult<()> {
        self.codec.expect_ok(&format!("RMD {path}")).await?;
        Ok(())
    }

    async fn dele(&mut self, path: &str) -> FtpResult<()> {
        self.codec.expect_ok(&format!("DELE {path}")).await?;
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()> {
        self.codec.expect(&format!("RNFR {from}"), 3).await?;
        self.codec.expect_ok(&format!("RNTO {to}")).await?;
        Ok(())
    }

    async fn voidcmd(&mut self, cmd: &str) -> FtpResult<String> {
        let resp = self.codec.expect_ok(cmd).await?;
        Ok(resp.text())
    }

    async fn voidresp(&mut self) -> FtpResult<String> {
        let resp = self.codec.expect_ok_reply().await?;
        Ok(resp.text())
    }

    async fn dir(&mut self, path: &str, use_list_a: bool) -> FtpResult<Vec<String>> {
        let mut data = self.open_data().await?;
        let cmd = if use_list_a {
            format!("LIST -a {path}")
        } else {
            format!("LIST {path}")
        };
        self.codec.expect(&cmd, 1).await?;

        let mut raw = Vec::new();
        data.read_to_end(&mut raw).await?;
        drop(data);

        self.codec.expect_ok_reply().await?;

        let text = String::from_utf8_lossy(&raw);
        Ok(text.lines().map(|l| l.trim_end_matches('\r').to_string()).collect())
    }

    async fn transfercmd(&mut self, cmd: &str, rest: Option<u64>) -> FtpResult<Box<dyn DataConnection>> {
        let data = self.open_data().await?;
        if let Some(offset) = rest {
            self.codec.expect(&format!("REST {offset}"), 3).await?;
        }
        self.codec.expect(cmd, 1).await?;
        Ok(Box::new(data))
    }

    async fn close(&mut self) -> FtpResult<()> {
        match self.codec.execute("QUIT").await {
            Ok(_) => Ok(()),
            Err(e) if e.is_timeout() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }
}

impl FtpConnectionConfig {
    pub(crate) fn is_secure(&self) -> bool {
        self.security != FtpSecurityMode::None
    }
}
