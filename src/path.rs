//! POSIX-style remote path manipulation.
//!
//! Every operation is pure string surgery — nothing here ever touches the
//! server. A [`RemotePath`] is either `Text` or `Bytes`; a call that mixes
//! the two kinds fails with [`Error::Internal`]`(`[`InternalKind::TypeMismatch`]`)`
//! rather than silently picking one.

use crate::error::{Error, FtpResult, InternalKind};

/// A remote path, preserving whether the caller supplied text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemotePath {
    Text(String),
    Bytes(Vec<u8>),
}

impl RemotePath {
    pub fn text(s: impl Into<String>) -> Self {
        RemotePath::Text(s.into())
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        RemotePath::Bytes(b.into())
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            RemotePath::Text(s) => s.as_bytes(),
            RemotePath::Bytes(b) => b,
        }
    }

    fn from_bytes_like(&self, bytes: Vec<u8>) -> RemotePath {
        match self {
            RemotePath::Text(_) => {
                RemotePath::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            RemotePath::Bytes(_) => RemotePath::Bytes(bytes),
        }
    }

    /// Render as a `&str` for use on the wire / in log messages. Lossy for
    /// byte paths that aren't valid UTF-8.
    pub fn display(&self) -> std::borrow::Cow<'_, str> {
        match self {
            RemotePath::Text(s) => std::borrow::Cow::Borrowed(s),
            RemotePath::Bytes(b) => String::from_utf8_lossy(b),
        }
    }

    fn same_kind(&self, other: &RemotePath) -> FtpResult<()> {
        match (self, other) {
            (RemotePath::Text(_), RemotePath::Text(_)) => Ok(()),
            (RemotePath::Bytes(_), RemotePath::Bytes(_)) => Ok(()),
            _ => Err(InternalKind::TypeMismatch.into()),
        }
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<&str> for RemotePath {
    fn from(s: &str) -> Self {
        RemotePath::Text(s.to_string())
    }
}

impl From<String> for RemotePath {
    fn from(s: String) -> Self {
        RemotePath::Text(s)
    }
}

/// Join two path components. `b` absolute overrides `a` entirely (POSIX
/// `os.path.join` semantics).
pub fn join(a: &RemotePath, b: &RemotePath) -> FtpResult<RemotePath> {
    a.same_kind(b)?;
    if isabs(b) {
        return Ok(b.clone());
    }
    let ab = a.as_bytes();
    let bb = b.as_bytes();
    let mut out = ab.to_vec();
    if !out.is_empty() && !out.ends_with(b"/") {
        out.push(b'/');
    }
    out.extend_from_slice(bb);
    Ok(a.from_bytes_like(out))
}

/// Split into `(dirname, basename)`.
pub fn split(p: &RemotePath) -> (RemotePath, RemotePath) {
    let bytes = p.as_bytes();
    match bytes.iter().rposition(|&c| c == b'/') {
        None => (p.from_bytes_like(Vec::new()), p.clone()),
        Some(idx) => {
            let mut head = &bytes[..idx + 1];
            let tail = bytes[idx + 1..].to_vec();
            // Collapse trailing run of slashes in head, unless head is all slashes.
            if !head.iter().all(|&c| c == b'/') {
                while head.len() > 1 && head.ends_with(b"/") {
                    head = &head[..head.len() - 1];
                }
            }
            (p.from_bytes_like(head.to_vec()), p.from_bytes_like(tail))
        }
    }
}

pub fn dirname(p: &RemotePath) -> RemotePath {
    split(p).0
}

pub fn basename(p: &RemotePath) -> RemotePath {
    split(p).1
}

/// Split `(root, ext)` where `ext` includes the leading dot, if any.
pub fn splitext(p: &RemotePath) -> (RemotePath, RemotePath) {
    let bytes = p.as_bytes();
    let base_start = bytes.iter().rposition(|&c| c == b'/').map(|i| i + 1).unwrap_or(0);
    let base = &bytes[base_start..];
    // A dot-only leading run (e.g. ".bashrc") does not count as an extension.
    let leading_dots = base.iter().take_while(|&&c| c == b'.').count();
    match base[leading_dots..].iter().rposition(|&c| c == b'.') {
        None => (p.clone(), p.from_bytes_like(Vec::new())),
        Some(rel) => {
            let dot_idx = base_start + leading_dots + rel;
            (
                p.from_bytes_like(bytes[..dot_idx].to_vec()),
                p.from_bytes_like(bytes[dot_idx..].to_vec()),
            )
        }
    }
}

/// Remote paths have no drive letter; returns `("", p)`.
pub fn splitdrive(p: &RemotePath) -> (RemotePath, RemotePath) {
    (p.from_bytes_like(Vec::new()), p.clone())
}

/// Collapse `//`, resolve `.`/`..` textually. The parent of `/` is `/`.
pub fn normpath(p: &RemotePath) -> RemotePath {
    let bytes = p.as_bytes();
    if bytes.is_empty() {
        return p.from_bytes_like(b".".to_vec());
    }
    let absolute = bytes.starts_with(b"/");
    let mut out: Vec<&[u8]> = Vec::new();
    for comp in bytes.split(|&c| c == b'/') {
        match comp {
            b"" | b"." => {}
            b".." => {
                if out.last().map(|c| *c != b"..").unwrap_or(false) {
                    out.pop();
                } else if !absolute {
                    out.push(b"..");
                }
                // at the absolute root, ".." is a no-op
            }
            other => out.push(other),
        }
    }
    let mut result = Vec::new();
    if absolute {
        result.push(b'/');
    }
    result.extend(out.join(&b"/"[..]));
    if result.is_empty() {
        result.push(b'.');
    }
    p.from_bytes_like(result)
}

/// Identity on a remote (case-sensitive POSIX-style) filesystem.
pub fn normcase(p: &RemotePath) -> RemotePath {
    p.clone()
}

pub fn isabs(p: &RemotePath) -> bool {
    p.as_bytes().starts_with(b"/")
}

/// Resolve `p` against `cwd` if it is relative, then normalize.
pub fn abspath(p: &RemotePath, cwd: &RemotePath) -> FtpResult<RemotePath> {
    p.same_kind(cwd)?;
    let joined = if isabs(p) { p.clone() } else { join(cwd, p)? };
    Ok(normpath(&joined))
}

/// Longest common literal prefix (byte-wise, like `os.path.commonprefix`,
/// not component-aware).
pub fn commonprefix(paths: &[RemotePath]) -> FtpResult<RemotePath> {
    let Some(first) = paths.first() else {
        return Ok(RemotePath::Text(String::new()));
    };
    for p in &paths[1..] {
        first.same_kind(p)?;
    }
    let mut prefix = first.as_bytes();
    for p in &paths[1..] {
        let b = p.as_bytes();
        let common = prefix
            .iter()
            .zip(b.iter())
            .take_while(|(a, b)| a == b)
            .count();
        prefix = &prefix[..common];
    }
    Ok(first.from_bytes_like(prefix.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_basename_roundtrip() {
        let p = RemotePath::text("/a/b/c.txt");
        let (dir, base) = split(&p);
        let rejoined = join(&dir, &base).unwrap();
        assert_eq!(normpath(&rejoined), normpath(&p));
    }

    #[test]
    fn join_absolute_overrides() {
        let a = RemotePath::text("/a/b");
        let b = RemotePath::text("/c");
        assert_eq!(join(&a, &b).unwrap(), RemotePath::text("/c"));
    }

    #[test]
    fn normpath_collapses_dotdot() {
        assert_eq!(
            normpath(&RemotePath::text("/a//b/../c/./d")),
            RemotePath::text("/a/c/d")
        );
    }

    #[test]
    fn normpath_root_parent_is_root() {
        assert_eq!(normpath(&RemotePath::text("/..")), RemotePath::text("/"));
    }

    #[test]
    fn splitext_basic() {
        let (root, ext) = splitext(&RemotePath::text("/a/b/file.tar.gz"));
        assert_eq!(root, RemotePath::text("/a/b/file.tar"));
        assert_eq!(ext, RemotePath::text(".gz"));
    }

    #[test]
    fn splitext_dotfile_has_no_extension() {
        let (root, ext) = splitext(&RemotePath::text("/a/.bashrc"));
        assert_eq!(root, RemotePath::text("/a/.bashrc"));
        assert_eq!(ext, RemotePath::text(""));
    }

    #[test]
    fn mixing_kinds_is_type_mismatch() {
        let t = RemotePath::text("/a");
        let b = RemotePath::bytes(b"/b".to_vec());
        match join(&t, &b) {
            Err(Error::Internal(InternalKind::TypeMismatch)) => {}
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn abspath_resolves_relative() {
        let cwd = RemotePath::text("/home/user");
        let rel = RemotePath::text("../other");
        assert_eq!(
            abspath(&rel, &cwd).unwrap(),
            RemotePath::text("/home/other")
        );
    }

    #[test]
    fn commonprefix_literal() {
        let paths = vec![RemotePath::text("/abc/def"), RemotePath::text("/abc/xyz")];
        assert_eq!(commonprefix(&paths).unwrap(), RemotePath::text("/abc/"));
    }
}
