//! The virtual filesystem facade.
//!
//! [`Host`] is the entry point: it owns a primary [`Session`] plus a pool of
//! child sessions for data transfers, and presents stat/listdir/open/walk
//! semantics over them, backed by a small LRU cache of parsed directory
//! entries.

use crate::cache::StatCache;
use crate::error::{Error, FtpResult, InternalKind};
use crate::parser::{self, DirectoryParser};
use crate::path::{self, RemotePath};
use crate::pool::ChildSessionPool;
use crate::session::{Session, SessionFactory};
use crate::stat::StatRecord;
use crate::stream::{Mode, RemoteFile, TextEncoding};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

const DEFAULT_CACHE_SIZE: usize = 5000;
const MAX_SYMLINK_DEPTH: usize = 20;

/// A live connection to a remote FTP server, presented as a virtual
/// filesystem. Not [`Send`]-shared across threads; wrap in a mutex if more
/// than one task needs access to the same host.
pub struct Host {
    session: Box<dyn Session>,
    pool: Arc<Mutex<ChildSessionPool>>,
    login_dir: String,
    cwd: String,
    parser: Box<dyn DirectoryParser>,
    cache: StatCache,
    /// `server_time - UTC`, in seconds. `None` until [`Host::set_time_shift`]
    /// or [`Host::synchronize_times`] establishes it — distinct from an
    /// explicit shift of `0` (server clock genuinely reads UTC).
    time_shift: Option<i64>,
    use_list_a: bool,
    closed: bool,
}

impl Host {
    /// Connect the primary session, capture and validate the login
    /// directory, and autodetect the listing dialect from one probe
    /// directory fetch.
    pub async fn connect(factory: Arc<dyn SessionFactory>) -> FtpResult<Self> {
        Self::connect_with_capacity(factory, 0, DEFAULT_CACHE_SIZE).await
    }

    pub async fn connect_with_capacity(
        factory: Arc<dyn SessionFactory>,
        max_children: usize,
        cache_size: usize,
    ) -> FtpResult<Self> {
        let mut session = factory.connect().await?;
        let login_dir = session.pwd().await?;
        session
            .cwd(&login_dir)
            .await
            .map_err(|_| InternalKind::InaccessibleLoginDir(login_dir.clone()))?;

        let probe_lines = session.dir(&login_dir, false).await.unwrap_or_default();
        let parser = parser::autodetect(&probe_lines, 0, Utc::now()).unwrap_or_else(|| {
            log::warn!("could not autodetect listing dialect, defaulting to unix");
            Box::new(parser::UnixParser)
        });
        log::debug!("autodetected listing dialect: {}", parser.name());

        let pool = Arc::new(Mutex::new(ChildSessionPool::new(factory, max_children)));

        Ok(Self {
            session,
            pool,
            login_dir: login_dir.clone(),
            cwd: login_dir,
            parser,
            cache: StatCache::new(cache_size),
            time_shift: None,
            use_list_a: false,
            closed: false,
        })
    }

    fn check_open(&self) -> FtpResult<()> {
        if self.closed {
            return Err(Error::already_closed());
        }
        Ok(())
    }

    fn to_wire(&self, path: &RemotePath) -> FtpResult<String> {
        match path {
            RemotePath::Text(s) => Ok(s.clone()),
            RemotePath::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => Ok(s.to_string()),
                Err(_) if self.session.encoding().is_some() => {
                    Ok(String::from_utf8_lossy(b).into_owned())
                }
                Err(_) => Err(InternalKind::NoEncoding.into()),
            },
        }
    }

    fn cwd_path(&self) -> RemotePath {
        RemotePath::Text(self.cwd.clone())
    }

    fn abs(&self, path: &RemotePath) -> FtpResult<RemotePath> {
        path::abspath(path, &self.cwd_path())
    }

    // ---- Navigation -----------------------------------------------------

    pub fn getcwd(&self) -> FtpResult<RemotePath> {
        self.check_open()?;
        Ok(self.cwd_path())
    }

    pub async fn chdir(&mut self, path: &RemotePath) -> FtpResult<()> {
        self.check_open()?;
        let target = self.abs(path)?;
        let wire = self.to_wire(&target)?;
        self.session.cwd(&wire).await?;
        self.cwd = wire;
        Ok(())
    }

    pub fn login_dir(&self) -> RemotePath {
        RemotePath::Text(self.login_dir.clone())
    }

    /// The autodetected listing dialect's name (`"unix"` or `"dos"`),
    /// exposed mainly for diagnostics and tests.
    pub fn dialect(&self) -> &'static str {
        self.parser.name()
    }

    /// Override autodetection with an explicit parser. Stays in effect until
    /// the next call to this method.
    pub fn set_parser(&mut self, parser: Box<dyn DirectoryParser>) {
        log::debug!("listing dialect overridden to {}", parser.name());
        self.parser = parser;
    }

    /// Whether `listdir`/`walk` ask the server for dotfiles via `LIST -a`.
    pub fn use_list_a_option(&self) -> bool {
        self.use_list_a
    }

    pub fn set_use_list_a_option(&mut self, enabled: bool) {
        self.use_list_a = enabled;
    }

    // ---- Directory operations --------------------------------------------

    pub async fn mkdir(&mut self, path: &RemotePath) -> FtpResult<()> {
        self.check_open()?;
        let target = self.abs(path)?;
        let wire = self.to_wire(&target)?;
        self.session.mkd(&wire).await?;
        self.invalidate_parent(&target);
        Ok(())
    }

    /// Create every missing component of `path`, like `mkdir -p`. Existing
    /// intermediate components are always tolerated (otherwise `mkdir -p`
    /// could never walk through a tree that already partly exists); whether
    /// the *final* component is allowed to already exist is controlled by
    /// `exist_ok`.
    pub async fn makedirs(&mut self, path: &RemotePath, exist_ok: bool) -> FtpResult<()> {
        self.check_open()?;
        let target = self.abs(path)?;
        let wire = self.to_wire(&target)?;
        let components: Vec<&str> = wire.split('/').filter(|c| !c.is_empty()).collect();
        let mut built = String::new();
        if wire.starts_with('/') {
            built.push('/');
        }
        for (i, comp) in components.iter().enumerate() {
            let is_final = i + 1 == components.len();
            if !built.is_empty() && !built.ends_with('/') {
                built.push('/');
            }
            built.push_str(comp);
            match self.session.mkd(&built).await {
                Ok(()) => {}
                Err(e) if is_final && !exist_ok => return Err(e),
                Err(e) => {
                    log::trace!("makedirs: mkd {built} returned {e}, assuming already exists");
                }
            }
        }
        self.invalidate_parent(&target);
        Ok(())
    }

    pub async fn rmdir(&mut self, path: &RemotePath) -> FtpResult<()> {
        self.check_open()?;
        let target = self.abs(path)?;
        let wire = self.to_wire(&target)?;
        self.session.rmd(&wire).await?;
        self.invalidate_parent(&target);
        Ok(())
    }

    /// Recursively remove a directory tree, shutil-style: children first
    /// (files removed, subdirectories recursed into), then the directory
    /// itself. With `ignore_errors` every failure is discarded silently; with
    /// a non-`None` `onerror` each failure is reported as
    /// `(operation, path, error)` and the walk continues; with neither, the
    /// first failure aborts the walk and is returned.
    pub async fn rmtree(
        &mut self,
        path: &RemotePath,
        ignore_errors: bool,
        mut onerror: Option<&mut dyn FnMut(&str, &RemotePath, &Error)>,
    ) -> FtpResult<()> {
        self.check_open()?;
        let target = self.abs(path)?;
        match self
            .rmtree_inner(&target, ignore_errors, onerror.as_deref_mut())
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if ignore_errors => {
                log::debug!("rmtree: ignoring error {e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn rmtree_inner<'a>(
        &'a mut self,
        dir: &'a RemotePath,
        ignore_errors: bool,
        mut onerror: Option<&'a mut dyn FnMut(&str, &RemotePath, &Error)>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = FtpResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let entries = match self.list_entries(dir).await {
                Ok(e) => e,
                Err(e) => {
                    return Self::handle_rmtree_error("listdir", dir, e, ignore_errors, onerror.as_deref_mut());
                }
            };
            for name in entries.sorted_names() {
                let is_dir = entries.entries[&name].is_dir();
                let child = path::join(dir, &RemotePath::Text(name))?;
                let result = if is_dir {
                    self.rmtree_inner(&child, ignore_errors, onerror.as_deref_mut()).await
                } else {
                    self.remove(&child).await
                };
                if let Err(e) = result {
                    let op = if is_dir { "rmtree" } else { "remove" };
                    Self::handle_rmtree_error(op, &child, e, ignore_errors, onerror.as_deref_mut())?;
                }
            }
            match self.rmdir(dir).await {
                Ok(()) => Ok(()),
                Err(e) => Self::handle_rmtree_error("rmdir", dir, e, ignore_errors, onerror.as_deref_mut()),
            }
        })
    }

    /// Shared error policy for one failed step of an `rmtree` walk: report to
    /// `onerror` and continue, swallow under `ignore_errors`, or propagate.
    fn handle_rmtree_error(
        op: &str,
        path: &RemotePath,
        error: Error,
        ignore_errors: bool,
        onerror: Option<&mut dyn FnMut(&str, &RemotePath, &Error)>,
    ) -> FtpResult<()> {
        if let Some(cb) = onerror {
            cb(op, path, &error);
            Ok(())
        } else if ignore_errors {
            Ok(())
        } else {
            Err(error)
        }
    }

    /// Fetch and parse one directory's entries, populating the stat cache
    /// as a side effect and growing it in place if needed. Internal; the
    /// public [`Host::listdir`] recovers just the sorted base names, per
    /// spec.md §4.4.
    async fn list_entries(&mut self, path: &RemotePath) -> FtpResult<crate::stat::DirEntryMap> {
        self.check_open()?;
        let target = self.abs(path)?;
        let wire = self.to_wire(&target)?;
        let lines = self.session.dir(&wire, self.use_list_a).await?;
        self.cache.ensure_capacity(lines.len());

        let shift = self.time_shift.unwrap_or(0);
        let mut map = crate::stat::DirEntryMap::new(wire.clone());
        let server_now = Utc::now() + chrono::Duration::seconds(shift);
        for line in &lines {
            if self.parser.ignores_line(line) {
                continue;
            }
            let record = self.parser.parse_line(line, shift, server_now)?;
            let abs_child = path::join(&target, &RemotePath::Text(record.name.clone()))?;
            let key = self.to_wire(&abs_child)?;
            self.cache.put(key, record.clone());
            map.insert(record);
        }
        Ok(map)
    }

    /// The sorted base names of `path`'s entries.
    pub async fn listdir(&mut self, path: &RemotePath) -> FtpResult<Vec<String>> {
        Ok(self.list_entries(path).await?.sorted_names())
    }

    /// Walk a directory tree, returning `(dirpath, subdirs, files)` triples,
    /// like `os.walk`. `topdown` selects whether a directory's own triple is
    /// yielded before (`true`) or after (`false`) its descendants'.
    /// `onerror`, if given, is called with each directory whose listing
    /// fails instead of aborting the walk. `followlinks` makes a symlink
    /// that resolves to a directory (checked via [`Host::stat`], not
    /// [`Host::lstat`]) get recursed into as well as reported.
    pub async fn walk(
        &mut self,
        path: &RemotePath,
        topdown: bool,
        mut onerror: Option<&mut dyn FnMut(&RemotePath, &Error)>,
        followlinks: bool,
    ) -> FtpResult<Vec<(RemotePath, Vec<String>, Vec<String>)>> {
        self.check_open()?;
        let target = self.abs(path)?;
        let mut out = Vec::new();
        self.walk_inner(&target, topdown, onerror.as_deref_mut(), followlinks, &mut out)
            .await?;
        Ok(out)
    }

    fn walk_inner<'a>(
        &'a mut self,
        dir: &'a RemotePath,
        topdown: bool,
        mut onerror: Option<&'a mut dyn FnMut(&RemotePath, &Error)>,
        followlinks: bool,
        out: &'a mut Vec<(RemotePath, Vec<String>, Vec<String>)>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = FtpResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let entries = match self.list_entries(dir).await {
                Ok(e) => e,
                Err(e) => {
                    return match onerror {
                        Some(cb) => {
                            cb(dir, &e);
                            Ok(())
                        }
                        None => Err(e),
                    };
                }
            };
            let mut dirs = Vec::new();
            let mut files = Vec::new();
            let mut recurse_targets = Vec::new();
            for name in entries.sorted_names() {
                let record = &entries.entries[&name];
                let child = path::join(dir, &RemotePath::Text(name.clone()))?;
                if record.is_dir() {
                    dirs.push(name);
                    recurse_targets.push(child);
                } else if record.is_symlink() && followlinks {
                    match self.stat(&child).await {
                        Ok(resolved) if resolved.is_dir() => {
                            dirs.push(name);
                            recurse_targets.push(child);
                        }
                        _ => files.push(name),
                    }
                } else {
                    files.push(name);
                }
            }

            if topdown {
                out.push((dir.clone(), dirs, files));
                for child in recurse_targets {
                    self.walk_inner(&child, topdown, onerror.as_deref_mut(), followlinks, out)
                        .await?;
                }
            } else {
                for child in &recurse_targets {
                    self.walk_inner(child, topdown, onerror.as_deref_mut(), followlinks, out)
                        .await?;
                }
                out.push((dir.clone(), dirs, files));
            }
            Ok(())
        })
    }

    fn invalidate_parent(&mut self, path: &RemotePath) {
        if let Ok(wire) = self.to_wire(path) {
            self.cache.invalidate(&wire);
        }
        let parent = path::dirname(path);
        if let Ok(wire) = self.to_wire(&parent) {
            self.cache.invalidate(&wire);
        }
    }

    // ---- File operations --------------------------------------------------

    pub async fn remove(&mut self, path: &RemotePath) -> FtpResult<()> {
        self.check_open()?;
        let target = self.abs(path)?;
        let wire = self.to_wire(&target)?;
        self.session.dele(&wire).await?;
        self.invalidate_parent(&target);
        Ok(())
    }

    pub async fn unlink(&mut self, path: &RemotePath) -> FtpResult<()> {
        self.remove(path).await
    }

    pub async fn rename(&mut self, from: &RemotePath, to: &RemotePath) -> FtpResult<()> {
        self.check_open()?;
        let abs_from = self.abs(from)?;
        let abs_to = self.abs(to)?;
        let wire_from = self.to_wire(&abs_from)?;
        let wire_to = self.to_wire(&abs_to)?;
        self.session.rename(&wire_from, &wire_to).await?;
        self.invalidate_parent(&abs_from);
        self.invalidate_parent(&abs_to);
        Ok(())
    }

    /// `SITE CHMOD`. Many servers (and the reference backend against
    /// anonymous logins) don't implement it at all, surfacing as
    /// [`crate::error::PermanentKind::CommandNotImplemented`] (502) — this
    /// is propagated, not swallowed.
    pub async fn chmod(&mut self, path: &RemotePath, mode: u32) -> FtpResult<()> {
        self.check_open()?;
        let target = self.abs(path)?;
        let wire = self.to_wire(&target)?;
        self.session
            .voidcmd(&format!("SITE CHMOD {mode:o} {wire}"))
            .await?;
        self.invalidate_parent(&target);
        Ok(())
    }

    // ---- Stat ---------------------------------------------------------------

    /// Stat an entry without following a trailing symlink.
    pub async fn lstat(&mut self, path: &RemotePath) -> FtpResult<StatRecord> {
        self.check_open()?;
        let target = self.abs(path)?;
        self.lstat_abs(&target).await
    }

    async fn lstat_abs(&mut self, target: &RemotePath) -> FtpResult<StatRecord> {
        let wire = self.to_wire(target)?;
        if wire == "/" {
            return Err(InternalKind::RootDir.into());
        }
        if let Some(cached) = self.cache.get(&wire) {
            return Ok(cached);
        }
        let parent = path::dirname(target);
        let basename = path::basename(target);
        let basename_str = self.to_wire(&basename)?;
        let entries = self.list_entries(&parent).await?;
        entries
            .entries
            .get(&basename_str)
            .cloned()
            .ok_or_else(|| Error::item_not_found(550))
    }

    /// Stat an entry, following symlinks up to a bounded depth; a cycle or
    /// chain deeper than that fails with
    /// [`crate::error::InternalKind::RecursiveLink`].
    pub async fn stat(&mut self, path: &RemotePath) -> FtpResult<StatRecord> {
        self.check_open()?;
        let target = self.abs(path)?;
        self.stat_depth(&target, 0).await
    }

    fn stat_depth<'a>(
        &'a mut self,
        target: &'a RemotePath,
        depth: usize,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = FtpResult<StatRecord>> + Send + 'a>> {
        Box::pin(async move {
            if depth >= MAX_SYMLINK_DEPTH {
                return Err(InternalKind::RecursiveLink.into());
            }
            let record = self.lstat_abs(target).await?;
            if !record.is_symlink() {
                return Ok(record);
            }
            let Some(link_target) = &record.target else {
                return Ok(record);
            };
            let link_path = RemotePath::Text(link_target.clone());
            let resolved = if path::isabs(&link_path) {
                path::normpath(&link_path)
            } else {
                let parent = path::dirname(target);
                path::normpath(&path::join(&parent, &link_path)?)
            };
            self.stat_depth(&resolved, depth + 1).await
        })
    }

    pub async fn exists(&mut self, path: &RemotePath) -> FtpResult<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_missing_entry() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn isdir(&mut self, path: &RemotePath) -> FtpResult<bool> {
        match self.stat(path).await {
            Ok(r) => Ok(r.is_dir()),
            Err(e) if e.is_missing_entry() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn isfile(&mut self, path: &RemotePath) -> FtpResult<bool> {
        match self.stat(path).await {
            Ok(r) => Ok(r.is_file()),
            Err(e) if e.is_missing_entry() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn islink(&mut self, path: &RemotePath) -> FtpResult<bool> {
        match self.lstat(path).await {
            Ok(r) => Ok(r.is_symlink()),
            Err(e) if e.is_missing_entry() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn getmtime(&mut self, path: &RemotePath) -> FtpResult<f64> {
        Ok(self.stat(path).await?.mtime)
    }

    pub async fn getsize(&mut self, path: &RemotePath) -> FtpResult<u64> {
        Ok(self.stat(path).await?.size)
    }

    // ---- Cache control ------------------------------------------------------

    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache.set_enabled(enabled);
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    pub fn resize_cache(&mut self, size_limit: usize) {
        self.cache.resize(size_limit);
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    // ---- Remote file streams -------------------------------------------------

    /// Open a remote file. `text_encoding` selects text mode with the named
    /// codec (`"utf-8"` or `"latin-1"`), or pass `None` for binary mode.
    pub async fn open(
        &mut self,
        path: &RemotePath,
        mode: Mode,
        rest: Option<u64>,
        text_encoding: Option<&str>,
    ) -> FtpResult<RemoteFile> {
        self.check_open()?;
        let target = self.abs(path)?;
        let (dir, base) = path::split(&target);
        let wire_dir = self.to_wire(&dir)?;
        let wire_base = self.to_wire(&base)?;
        let encoding = text_encoding.and_then(TextEncoding::parse);
        if text_encoding.is_some() && encoding.is_none() {
            return Err(InternalKind::NoEncoding.into());
        }
        self.invalidate_parent(&target);
        RemoteFile::open(self.pool.clone(), &wire_dir, &wire_base, mode, rest, encoding).await
    }

    // ---- Transfers ------------------------------------------------------------

    pub async fn upload(&mut self, local: &std::path::Path, remote: &RemotePath) -> FtpResult<()> {
        let data = tokio::fs::read(local).await?;
        let mut file = self.open(remote, Mode::Write, None, None).await?;
        use tokio::io::AsyncWriteExt;
        file.write_all(&data).await?;
        file.close().await
    }

    pub async fn download(&mut self, remote: &RemotePath, local: &std::path::Path) -> FtpResult<()> {
        let mut file = self.open(remote, Mode::Read, None, None).await?;
        use tokio::io::AsyncReadExt;
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;
        file.close().await?;
        tokio::fs::write(local, data).await?;
        Ok(())
    }

    /// Upload only if the local file is strictly newer than the remote one
    /// (or the remote one doesn't exist), tolerating each side's timestamp
    /// precision. Mirrors the conditional-transfer inequality: transfer iff
    /// `source_mtime + source_precision > target_mtime - target_precision`.
    pub async fn upload_if_newer(
        &mut self,
        local: &std::path::Path,
        remote: &RemotePath,
    ) -> FtpResult<bool> {
        if self.time_shift.is_none() {
            return Err(InternalKind::TimeShift(
                "time shift has never been established; call set_time_shift or synchronize_times first"
                    .to_string(),
            )
            .into());
        }
        let meta = tokio::fs::metadata(local).await?;
        let local_mtime = meta
            .modified()?
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let remote_stat = match self.stat(remote).await {
            Ok(r) => Some(r),
            Err(e) if e.is_missing_entry() => None,
            Err(e) => return Err(e),
        };
        let should_transfer = match &remote_stat {
            None => true,
            Some(r) => conditional_transfer(local_mtime, 1.0, r.mtime, r.mtime_precision.unwrap_or(60.0)),
        };
        if should_transfer {
            self.upload(local, remote).await?;
        }
        Ok(should_transfer)
    }

    pub async fn download_if_newer(
        &mut self,
        remote: &RemotePath,
        local: &std::path::Path,
    ) -> FtpResult<bool> {
        if self.time_shift.is_none() {
            return Err(InternalKind::TimeShift(
                "time shift has never been established; call set_time_shift or synchronize_times first"
                    .to_string(),
            )
            .into());
        }
        let remote_stat = self.stat(remote).await?;
        let local_mtime = match tokio::fs::metadata(local).await {
            Ok(meta) => meta
                .modified()
                .ok()
                .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64()),
            Err(_) => None,
        };
        let should_transfer = match local_mtime {
            None => true,
            Some(local_mtime) => {
                conditional_transfer(remote_stat.mtime, remote_stat.mtime_precision.unwrap_or(60.0), local_mtime, 1.0)
            }
        };
        if should_transfer {
            self.download(remote, local).await?;
        }
        Ok(should_transfer)
    }

    // ---- Time shift -----------------------------------------------------------

    /// Set the assumed `server_time - UTC` offset, in seconds. Must be a
    /// multiple of 900 (15 minutes, the finest timezone granularity in
    /// use) and within a day of zero.
    pub fn set_time_shift(&mut self, shift: i64) -> FtpResult<()> {
        if shift.abs() > 86_400 || shift % 900 != 0 {
            return Err(InternalKind::TimeShift(format!(
                "{shift} is not a multiple of 900 within +/- 86400"
            ))
            .into());
        }
        self.time_shift = Some(shift);
        self.cache.clear();
        Ok(())
    }

    /// `None` if the shift has never been established (neither
    /// [`Host::set_time_shift`] nor [`Host::synchronize_times`] has run yet).
    pub fn time_shift(&self) -> Option<i64> {
        self.time_shift
    }

    /// Probe the time shift by writing a marker file, stat'ing it, and
    /// comparing the server-reported mtime against our local clock.
    pub async fn synchronize_times(&mut self) -> FtpResult<()> {
        self.check_open()?;
        let probe_name = format!(".ftp-vfs-sync-{}", uuid::Uuid::new_v4());
        let probe = RemotePath::Text(probe_name);
        {
            let mut file = self.open(&probe, Mode::Write, None, None).await?;
            use tokio::io::AsyncWriteExt;
            file.write_all(b"").await?;
            file.close().await?;
        }
        let before_shift = self.time_shift;
        self.time_shift = Some(0);
        let record = match self.stat(&probe).await {
            Ok(r) => r,
            Err(e) => {
                self.time_shift = before_shift;
                let _ = self.remove(&probe).await;
                return Err(e);
            }
        };
        let _ = self.remove(&probe).await;
        let now = Utc::now().timestamp() as f64;
        let raw_shift = record.mtime - now;
        let rounded = ((raw_shift / 900.0).round() as i64) * 900;
        self.set_time_shift(rounded)
    }

    // ---- Lifecycle ----------------------------------------------------------

    /// Send a no-op on the primary control channel to keep the connection
    /// from timing out, without touching the cache or cwd.
    pub async fn keep_alive(&mut self) -> FtpResult<()> {
        self.check_open()?;
        self.session.pwd().await?;
        Ok(())
    }

    pub async fn close(&mut self) -> FtpResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.pool.lock().await.close_all().await;
        self.session.close().await
    }

    /// Snapshot of the child-session pool's occupancy, mainly for tests and
    /// diagnostics.
    pub async fn pool_stats(&self) -> crate::pool::PoolStats {
        self.pool.lock().await.stats()
    }

    /// Number of entries currently held in the stat cache, mainly for tests.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

/// `true` iff the source is newer than the target beyond the combined
/// precision tolerance of both timestamps.
fn conditional_transfer(source_mtime: f64, source_precision: f64, target_mtime: f64, target_precision: f64) -> bool {
    source_mtime + source_precision > target_mtime - target_precision
}
