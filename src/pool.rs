//! Pool of child sessions used for data transfers, so that a `RemoteFile`
//! held open by the caller doesn't block the primary connection from
//! servicing `stat`/`listdir`/etc.
//!
//! Grounded on the same ownership shape as `sorng-ftp`'s own connection
//! pool: sessions are checked out, used, and checked back in; a session that
//! errored mid-use is discarded rather than returned to the idle set.

use crate::error::FtpResult;
use crate::session::{Session, SessionFactory};
use std::sync::Arc;

/// Snapshot of pool occupancy, mirrored after the connection-pool stats the
/// teacher crate exposes to its UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub busy: usize,
}

pub struct ChildSessionPool {
    factory: Arc<dyn SessionFactory>,
    idle: Vec<Box<dyn Session>>,
    busy_count: usize,
    max_children: usize,
}

impl ChildSessionPool {
    pub fn new(factory: Arc<dyn SessionFactory>, max_children: usize) -> Self {
        Self {
            factory,
            idle: Vec::new(),
            busy_count: 0,
            max_children,
        }
    }

    /// Acquire a child session: reuse an idle one if available, otherwise
    /// dial a fresh one (subject to `max_children`, 0 meaning unlimited).
    pub async fn acquire(&mut self) -> FtpResult<Box<dyn Session>> {
        if let Some(session) = self.idle.pop() {
            self.busy_count += 1;
            return Ok(session);
        }
        if self.max_children > 0 && self.busy_count >= self.max_children {
            log::warn!(
                "child session pool at capacity ({}), dialing an extra connection anyway",
                self.max_children
            );
        }
        let session = self.factory.connect().await?;
        self.busy_count += 1;
        Ok(session)
    }

    /// Return a session after use. `errored` sessions are dropped instead
    /// of being recycled, since their control-channel state is unknown.
    pub fn release(&mut self, session: Box<dyn Session>, errored: bool) {
        self.busy_count = self.busy_count.saturating_sub(1);
        if errored {
            log::debug!("discarding child session after transfer error");
            return;
        }
        self.idle.push(session);
    }

    pub async fn close_all(&mut self) {
        for mut session in self.idle.drain(..) {
            let _ = session.close().await;
        }
        self.busy_count = 0;
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.idle.len(),
            busy: self.busy_count,
        }
    }
}
