//! Integration tests driving [`Host`] against an in-memory mock
//! [`Session`], covering the scenarios in spec.md §8: autodetecting the
//! listing dialect, following a symlink, detecting a recursive link,
//! skipping an up-to-date conditional upload, surfacing `chmod` as
//! "not implemented", and the stat cache's eviction/auto-grow behavior.

use async_trait::async_trait;
use ftp_vfs::{DataConnection, Error, Host, RemotePath, Session, SessionFactory};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shared in-memory directory tree: each entry is one directory's raw
/// `LIST` lines, keyed by its absolute path. One instance backs every
/// session (primary and pooled children) a `MockFactory` produces.
#[derive(Default)]
struct MockState {
    dirs: HashMap<String, Vec<String>>,
    dir_calls: usize,
    chmod_calls: usize,
}

struct MockFactory {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl SessionFactory for MockFactory {
    async fn connect(&self) -> ftp_vfs::FtpResult<Box<dyn Session>> {
        Ok(Box::new(MockSession {
            state: self.state.clone(),
            cwd: "/".to_string(),
        }))
    }
}

struct MockSession {
    state: Arc<Mutex<MockState>>,
    cwd: String,
}

#[async_trait]
impl Session for MockSession {
    async fn pwd(&mut self) -> ftp_vfs::FtpResult<String> {
        Ok(self.cwd.clone())
    }

    async fn cwd(&mut self, path: &str) -> ftp_vfs::FtpResult<()> {
        let state = self.state.lock().unwrap();
        if !state.dirs.contains_key(path) {
            return Err(Error::item_not_found(550));
        }
        drop(state);
        self.cwd = path.to_string();
        Ok(())
    }

    async fn mkd(&mut self, _path: &str) -> ftp_vfs::FtpResult<()> {
        Ok(())
    }

    async fn rmd(&mut self, _path: &str) -> ftp_vfs::FtpResult<()> {
        Ok(())
    }

    async fn dele(&mut self, _path: &str) -> ftp_vfs::FtpResult<()> {
        Ok(())
    }

    async fn rename(&mut self, _from: &str, _to: &str) -> ftp_vfs::FtpResult<()> {
        Ok(())
    }

    async fn voidcmd(&mut self, cmd: &str) -> ftp_vfs::FtpResult<String> {
        if cmd.starts_with("SITE CHMOD") {
            self.state.lock().unwrap().chmod_calls += 1;
            return Err(Error::command_not_implemented(502));
        }
        Ok(String::new())
    }

    async fn voidresp(&mut self) -> ftp_vfs::FtpResult<String> {
        Ok("226 Transfer complete".to_string())
    }

    async fn dir(&mut self, path: &str, _use_list_a: bool) -> ftp_vfs::FtpResult<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.dir_calls += 1;
        state
            .dirs
            .get(path)
            .cloned()
            .ok_or_else(|| Error::item_not_found(550))
    }

    async fn transfercmd(
        &mut self,
        _cmd: &str,
        _rest: Option<u64>,
    ) -> ftp_vfs::FtpResult<Box<dyn DataConnection>> {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let mut server = server;
            use tokio::io::AsyncWriteExt;
            let _ = server.shutdown().await;
        });
        Ok(Box::new(client))
    }

    async fn close(&mut self) -> ftp_vfs::FtpResult<()> {
        Ok(())
    }

    fn encoding(&self) -> Option<&str> {
        Some("utf-8")
    }
}

fn new_host_state() -> Arc<Mutex<MockState>> {
    Arc::new(Mutex::new(MockState::default()))
}

async fn connect(state: Arc<Mutex<MockState>>) -> Host {
    let factory: Arc<dyn SessionFactory> = Arc::new(MockFactory { state });
    Host::connect(factory).await.expect("mock connect should succeed")
}

#[tokio::test]
async fn autodetects_unix_dialect_and_lists_entries() {
    let state = new_host_state();
    state.lock().unwrap().dirs.insert(
        "/".to_string(),
        vec![
            "total 8".to_string(),
            "-rw-r--r--   1 alice users     12 Jan 02 03:04 readme.txt".to_string(),
            "drwxr-xr-x   2 alice users   4096 Jan 02 2023 data".to_string(),
        ],
    );
    let mut host = connect(state).await;
    assert_eq!(host.dialect(), "unix");

    let names = host.listdir(&RemotePath::text("/")).await.unwrap();
    assert_eq!(names, vec!["data".to_string(), "readme.txt".to_string()]);
    assert!(host.isdir(&RemotePath::text("/data")).await.unwrap());
    assert!(host.isfile(&RemotePath::text("/readme.txt")).await.unwrap());
}

#[tokio::test]
async fn stat_follows_symlink_to_its_target() {
    let state = new_host_state();
    state.lock().unwrap().dirs.insert(
        "/".to_string(),
        vec![
            "-rw-r--r--   1 alice users    512 Jan 02 2020 real.bin".to_string(),
            "lrwxrwxrwx   1 alice users      8 Jan 02 2020 alias -> real.bin".to_string(),
        ],
    );
    let mut host = connect(state).await;

    let link_stat = host.lstat(&RemotePath::text("/alias")).await.unwrap();
    assert!(link_stat.is_symlink());

    let followed = host.stat(&RemotePath::text("/alias")).await.unwrap();
    assert!(followed.is_file());
    assert_eq!(followed.size, 512);
}

#[tokio::test]
async fn stat_detects_a_recursive_link_cycle() {
    let state = new_host_state();
    state.lock().unwrap().dirs.insert(
        "/".to_string(),
        vec!["lrwxrwxrwx   1 a g   4 Jan 02 2020 loop -> loop".to_string()],
    );
    let mut host = connect(state).await;

    let err = host.stat(&RemotePath::text("/loop")).await.unwrap_err();
    match err {
        Error::Internal(ftp_vfs::error::InternalKind::RecursiveLink) => {}
        other => panic!("expected RecursiveLink, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_if_newer_skips_when_remote_is_already_current() {
    let state = new_host_state();
    state.lock().unwrap().dirs.insert(
        "/".to_string(),
        vec!["-rw-r--r--   1 a g   10 Jan 02 2023 report.txt".to_string()],
    );
    let mut host = connect(state).await;
    host.set_time_shift(0).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let local_path = dir.path().join("report.txt");
    std::fs::write(&local_path, b"old content").unwrap();
    let old_time = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_500_000_000);
    std::fs::File::options()
        .write(true)
        .open(&local_path)
        .unwrap()
        .set_modified(old_time)
        .unwrap();

    let transferred = host
        .upload_if_newer(&local_path, &RemotePath::text("/report.txt"))
        .await
        .unwrap();
    assert!(!transferred, "local file is older than the remote copy, should skip");
}

#[tokio::test]
async fn upload_if_newer_transfers_when_local_is_newer() {
    let state = new_host_state();
    state.lock().unwrap().dirs.insert(
        "/".to_string(),
        vec!["-rw-r--r--   1 a g   10 Jan 02 2020 report.txt".to_string()],
    );
    let mut host = connect(state).await;
    host.set_time_shift(0).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let local_path = dir.path().join("report.txt");
    std::fs::write(&local_path, b"fresh content").unwrap();
    let new_time = std::time::SystemTime::now();
    std::fs::File::options()
        .write(true)
        .open(&local_path)
        .unwrap()
        .set_modified(new_time)
        .unwrap();

    let transferred = host
        .upload_if_newer(&local_path, &RemotePath::text("/report.txt"))
        .await
        .unwrap();
    assert!(transferred, "local file is newer than the remote copy, should transfer");
}

#[tokio::test]
async fn conditional_transfer_requires_established_time_shift() {
    let state = new_host_state();
    state.lock().unwrap().dirs.insert(
        "/".to_string(),
        vec!["-rw-r--r--   1 a g   10 Jan 02 2020 report.txt".to_string()],
    );
    let mut host = connect(state).await;

    let dir = tempfile::tempdir().unwrap();
    let local_path = dir.path().join("report.txt");
    std::fs::write(&local_path, b"content").unwrap();

    let err = host
        .upload_if_newer(&local_path, &RemotePath::text("/report.txt"))
        .await
        .unwrap_err();
    match err {
        Error::Internal(ftp_vfs::error::InternalKind::TimeShift(_)) => {}
        other => panic!("expected TimeShift, got {other:?}"),
    }

    host.set_time_shift(0).unwrap();
    host.upload_if_newer(&local_path, &RemotePath::text("/report.txt"))
        .await
        .unwrap();
}

#[tokio::test]
async fn set_time_shift_clears_the_cache() {
    let state = new_host_state();
    state.lock().unwrap().dirs.insert(
        "/".to_string(),
        vec!["-rw-r--r--   1 a g   10 Jan 02 2020 report.txt".to_string()],
    );
    let mut host = connect(state).await;

    host.stat(&RemotePath::text("/report.txt")).await.unwrap();
    assert!(host.cached_entries() > 0);

    host.set_time_shift(900).unwrap();
    assert_eq!(host.cached_entries(), 0);
}

#[tokio::test]
async fn chmod_surfaces_command_not_implemented() {
    let state = new_host_state();
    state.lock().unwrap().dirs.insert("/".to_string(), vec![]);
    let mut host = connect(state.clone()).await;

    let err = host.chmod(&RemotePath::text("/anything"), 0o644).await.unwrap_err();
    match err {
        Error::Permanent(ftp_vfs::error::PermanentKind::CommandNotImplemented { code }) => {
            assert_eq!(code, 502);
        }
        other => panic!("expected CommandNotImplemented, got {other:?}"),
    }
    assert_eq!(state.lock().unwrap().chmod_calls, 1);
}

#[tokio::test]
async fn stat_cache_evicts_lru_entries_and_grows_on_listdir_overflow() {
    let state = new_host_state();
    {
        let mut s = state.lock().unwrap();
        s.dirs.insert("/".to_string(), vec![]);
        s.dirs.insert(
            "/a".to_string(),
            vec!["-rw-r--r--   1 u g   1 Jan 02 2020 file1".to_string()],
        );
        s.dirs.insert(
            "/b".to_string(),
            vec!["-rw-r--r--   1 u g   1 Jan 02 2020 file1".to_string()],
        );
        s.dirs.insert(
            "/c".to_string(),
            vec!["-rw-r--r--   1 u g   1 Jan 02 2020 file1".to_string()],
        );
        let mut many = Vec::new();
        for i in 0..10 {
            many.push(format!("-rw-r--r--   1 u g   1 Jan 02 2020 f{i}"));
        }
        s.dirs.insert("/big".to_string(), many);
    }
    let factory: Arc<dyn SessionFactory> = Arc::new(MockFactory { state: state.clone() });
    let mut host = Host::connect_with_capacity(factory, 0, 2).await.unwrap();

    host.stat(&RemotePath::text("/a/file1")).await.unwrap();
    host.stat(&RemotePath::text("/b/file1")).await.unwrap();
    assert_eq!(host.cached_entries(), 2);

    // A third, distinct parent directory pushes the cache past its
    // size_limit of 2; the oldest entry (/a/file1) must be evicted.
    host.stat(&RemotePath::text("/c/file1")).await.unwrap();
    assert_eq!(host.cached_entries(), 2);

    let calls_before = state.lock().unwrap().dir_calls;
    host.stat(&RemotePath::text("/a/file1")).await.unwrap();
    let calls_after = state.lock().unwrap().dir_calls;
    assert!(calls_after > calls_before, "evicted entry should re-fetch from the session");

    // listdir against a directory with more entries than size_limit grows
    // the cache in place rather than thrashing.
    let names = host.listdir(&RemotePath::text("/big")).await.unwrap();
    assert_eq!(names.len(), 10);
    assert_eq!(host.cached_entries(), 10);
}

fn tree_state() -> Arc<Mutex<MockState>> {
    let state = new_host_state();
    {
        let mut s = state.lock().unwrap();
        s.dirs.insert(
            "/".to_string(),
            vec![
                "drwxr-xr-x   2 u g 4096 Jan 02 2020 a".to_string(),
                "-rw-r--r--   1 u g    1 Jan 02 2020 root.txt".to_string(),
            ],
        );
        s.dirs.insert(
            "/a".to_string(),
            vec![
                "drwxr-xr-x   2 u g 4096 Jan 02 2020 missing".to_string(),
                "-rw-r--r--   1 u g    1 Jan 02 2020 a.txt".to_string(),
            ],
        );
        // "/a/missing" deliberately has no entry in `dirs`, so listing it
        // fails with ItemNotFound.
    }
    state
}

#[tokio::test]
async fn walk_topdown_propagates_listing_failure_without_onerror() {
    let state = tree_state();
    let mut host = connect(state).await;
    let err = host
        .walk(&RemotePath::text("/"), true, None, false)
        .await
        .unwrap_err();
    assert!(err.is_missing_entry() || matches!(err, Error::Permanent(_)));
}

#[tokio::test]
async fn walk_topdown_onerror_continues_past_a_failing_subdirectory() {
    let state = tree_state();
    let mut host = connect(state).await;
    let mut failures = Vec::new();
    let mut onerror = |path: &RemotePath, _err: &Error| failures.push(path.to_string());
    let triples = host
        .walk(&RemotePath::text("/"), true, Some(&mut onerror), false)
        .await
        .unwrap();

    assert_eq!(failures, vec!["/a/missing".to_string()]);
    let paths: Vec<String> = triples.iter().map(|(p, _, _)| p.to_string()).collect();
    // top-level triple comes first; "/a" is visited before its failing child.
    assert_eq!(paths[0], "/");
    assert_eq!(paths[1], "/a");
    let root_entry = &triples[0];
    assert_eq!(root_entry.1, vec!["a".to_string()]);
    assert_eq!(root_entry.2, vec!["root.txt".to_string()]);
}

#[tokio::test]
async fn walk_bottom_up_yields_children_before_parent() {
    let state = tree_state();
    let mut host = connect(state).await;
    let mut onerror = |_path: &RemotePath, _err: &Error| {};
    let triples = host
        .walk(&RemotePath::text("/"), false, Some(&mut onerror), false)
        .await
        .unwrap();

    let paths: Vec<String> = triples.iter().map(|(p, _, _)| p.to_string()).collect();
    let root_pos = paths.iter().position(|p| p == "/").unwrap();
    let a_pos = paths.iter().position(|p| p == "/a").unwrap();
    assert!(a_pos < root_pos, "child directory must be yielded before its parent in bottom-up walk");
}
