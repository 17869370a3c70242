//! Wire-level types for the reference session backend.

/// Which flavor of TLS, if any, protects the control (and by extension
/// data, via `PROT P`) channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpSecurityMode {
    /// Plain FTP, no TLS.
    None,
    /// `AUTH TLS` negotiated after connecting in the clear.
    Explicit,
    /// TLS from the first byte (historically port 990).
    Implicit,
}

/// Connection parameters for one [`super::factory::FtpSessionFactory`].
#[derive(Debug, Clone)]
pub struct FtpConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Sent via `ACCT` if (and only if) the server asks for it with a `332`
    /// reply to `PASS` — most servers never do.
    pub account: Option<String>,
    pub security: FtpSecurityMode,
    pub connect_timeout_sec: u64,
    pub data_timeout_sec: u64,
}

impl FtpConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            account: None,
            security: FtpSecurityMode::None,
            connect_timeout_sec: 30,
            data_timeout_sec: 30,
        }
    }

    pub fn with_security(mut self, security: FtpSecurityMode) -> Self {
        self.security = security;
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}

/// One parsed FTP reply: the 3-digit code and every line of its body
/// (single-line replies have exactly one).
#[derive(Debug, Clone)]
pub struct FtpResponse {
    pub code: u16,
    pub lines: Vec<String>,
}

impl FtpResponse {
    /// The reply text, lines joined with spaces, leading reply code and
    /// continuation markers stripped from each line's first 4 characters.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.get(4..).unwrap_or(l.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
