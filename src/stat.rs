//! Stat records and per-directory entry maps.

use std::collections::HashMap;

/// Unix mode bit helpers, grounded on the `libc` constants the way
/// `unftp-core` (part of the `bolcom-libunftp` pack) does.
pub mod mode {
    pub const S_IFMT: u32 = libc::S_IFMT as u32;
    pub const S_IFREG: u32 = libc::S_IFREG as u32;
    pub const S_IFDIR: u32 = libc::S_IFDIR as u32;
    pub const S_IFLNK: u32 = libc::S_IFLNK as u32;

    pub fn is_dir(m: u32) -> bool {
        m & S_IFMT == S_IFDIR
    }

    pub fn is_file(m: u32) -> bool {
        m & S_IFMT == S_IFREG
    }

    pub fn is_symlink(m: u32) -> bool {
        m & S_IFMT == S_IFLNK
    }
}

/// Stat-like metadata for a single remote entry, parsed from one listing
/// line. Created once by a parser, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    pub mode: u32,
    pub ino: Option<u64>,
    pub dev: Option<u64>,
    pub nlink: Option<u64>,
    pub uid: Option<String>,
    pub gid: Option<String>,
    pub size: u64,
    pub atime: Option<f64>,
    pub mtime: f64,
    pub ctime: Option<f64>,
    pub name: String,
    pub target: Option<String>,
    pub mtime_precision: Option<f64>,
}

impl StatRecord {
    pub fn is_dir(&self) -> bool {
        mode::is_dir(self.mode)
    }

    pub fn is_file(&self) -> bool {
        mode::is_file(self.mode)
    }

    pub fn is_symlink(&self) -> bool {
        mode::is_symlink(self.mode)
    }

    /// Clamp a parsed timestamp to the epoch floor, per spec invariant.
    pub fn clamp_mtime(mut self) -> Self {
        if self.mtime < 0.0 {
            self.mtime = 0.0;
        }
        self
    }
}

/// All entries of one directory, keyed by base name, plus a link back to
/// the directory they belong to. Built once per directory fetch.
#[derive(Debug, Clone)]
pub struct DirEntryMap {
    pub parent: String,
    pub entries: HashMap<String, StatRecord>,
}

impl DirEntryMap {
    pub fn new(parent: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, record: StatRecord) {
        self.entries.insert(record.name.clone(), record);
    }

    pub fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}
