//! [`SessionFactory`] that dials a real FTP(S) server.

use super::connection;
use super::ftp_session::FtpWireSession;
use super::tls::upgrade_to_tls;
use super::types::{FtpConnectionConfig, FtpSecurityMode};
use crate::error::{Error, FtpResult};
use crate::session::{Session, SessionFactory};
use async_trait::async_trait;

/// Connection parameters shared by a `Host`'s primary session and every
/// child session in its pool; each [`connect`](SessionFactory::connect)
/// call performs a fresh login.
pub struct FtpSessionFactory {
    config: FtpConnectionConfig,
}

impl FtpSessionFactory {
    pub fn new(config: FtpConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for FtpSessionFactory {
    async fn connect(&self) -> FtpResult<Box<dyn Session>> {
        let (mut codec, _banner) = connection::connect(&self.config).await?;

        if self.config.security == FtpSecurityMode::Explicit {
            codec.expect_ok("AUTH TLS").await?;
            codec = upgrade_to_tls(codec, &self.config.host).await?;
        }

        login(&mut codec, &self.config).await?;

        if self.config.is_secure() {
            codec.expect_ok("PBSZ 0").await?;
            codec.expect_ok("PROT P").await?;
        }

        let encoding = match codec.expect_ok("OPTS UTF8 ON").await {
            Ok(_) => Some("utf-8".to_string()),
            Err(_) => None,
        };
        codec.expect_ok("TYPE I").await?;

        Ok(Box::new(FtpWireSession::new(codec, self.config.clone(), encoding)))
    }
}

/// Drive the `USER`/`PASS`/`ACCT` exchange (RFC 959 §4.1.1). `USER` alone can
/// already complete the login (`230`, e.g. some anonymous servers), ask for a
/// password (`331`, the common case), or ask for an account on top of that
/// (`332`) — a caller that blindly expects `230` from `USER` breaks on every
/// server requiring a password.
async fn login(codec: &mut super::codec::FtpCodec, config: &FtpConnectionConfig) -> FtpResult<()> {
    let user_resp = codec.execute(&format!("USER {}", config.user)).await?;
    match user_resp.code {
        230 => return Ok(()),
        331 => {}
        332 => {
            let account = config.account.as_deref().ok_or_else(|| {
                Error::temporary(Some(332), "server requires an account but none was configured")
            })?;
            codec.expect_ok(&format!("ACCT {account}")).await?;
            return Ok(());
        }
        _ => return Err(Error::from_reply(user_resp.code, &user_resp.text())),
    }

    let pass_resp = codec.execute(&format!("PASS {}", config.password)).await?;
    match pass_resp.code {
        230 => Ok(()),
        332 => {
            let account = config.account.as_deref().ok_or_else(|| {
                Error::temporary(Some(332), "server requires an account but none was configured")
            })?;
            codec.expect_ok(&format!("ACCT {account}")).await?;
            Ok(())
        }
        _ => Err(Error::from_reply(pass_resp.code, &pass_resp.text())),
    }
}
