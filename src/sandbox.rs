//! Sandboxed workspace filesystem access.
//!
//! Every path a client supplies is relative to a single workspace root
//! resolved once at construction time. [`Sandbox::resolve`] is the one
//! containment check every other operation routes through — no operation
//! in this module touches the filesystem without it.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{McpError, McpResult};

/// Environment variable naming the workspace root. Falls back to the
/// process working directory when unset.
pub const WORKSPACE_ENV: &str = "EVA_MCP_WORKSPACE";

/// Environment variable overriding the default listing cap.
pub const MAX_LIST_ENV: &str = "EVA_MCP_MAX_LIST";

/// Default cap on `Sandbox::list` entries; overridable via `EVA_MCP_MAX_LIST`.
pub const DEFAULT_MAX_LIST: usize = 1000;

/// A workspace root with containment-checked path resolution.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Build a sandbox rooted at `workspace`, or at `EVA_MCP_WORKSPACE`, or
    /// at the current working directory, in that order of preference.
    /// The root is canonicalized once and retained.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved root does not exist or cannot be
    /// canonicalized.
    pub fn new(workspace: Option<PathBuf>) -> McpResult<Self> {
        let candidate = workspace
            .or_else(|| std::env::var_os(WORKSPACE_ENV).map(PathBuf::from))
            .map_or_else(
                || std::env::current_dir().map_err(|source| McpError::Io {
                    path: PathBuf::from("."),
                    source,
                }),
                Ok,
            )?;

        let root = candidate.canonicalize().map_err(|source| McpError::Io {
            path: candidate.clone(),
            source,
        })?;

        debug!(root = %root.display(), "sandbox workspace resolved");
        Ok(Self { root })
    }

    /// The canonical workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` against the workspace root, requiring the result
    /// to equal the root or be prefixed by `root + separator`.
    ///
    /// Accepts either platform path separator in `relative` so inputs
    /// carrying `\` (e.g. a client on Windows) or `/` both work; `..`
    /// segments that would escape the root fail regardless of which
    /// separator produced them.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::PathOutsideWorkspace`] if containment fails.
    pub fn resolve(&self, relative: &str) -> McpResult<PathBuf> {
        let normalized = relative.replace('\\', "/");
        let joined = self.root.join(normalized.trim_start_matches('/'));
        let resolved = lexically_normalize(&joined);

        if resolved == self.root || resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(McpError::PathOutsideWorkspace { path: resolved })
        }
    }

    /// Depth-first traversal from the root, yielding up to `max` relative
    /// paths to regular files. Directory ordering is platform-defined;
    /// callers must not depend on it. Relative paths use `/` regardless of
    /// platform so the emitted listing is stable across host platforms.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the root or any traversed directory cannot
    /// be read.
    pub fn list(&self, max: usize) -> McpResult<Vec<String>> {
        let max = max.max(1);
        let mut out = Vec::new();
        walk(&self.root, &self.root, max, &mut out)?;
        Ok(out)
    }

    /// Resolve and read `relative` as UTF-8 text.
    ///
    /// # Errors
    ///
    /// [`McpError::PathOutsideWorkspace`] on containment failure,
    /// [`McpError::NotAFile`] if the target is not a regular file, or an
    /// I/O error if the read fails.
    pub fn read(&self, relative: &str) -> McpResult<(String, String)> {
        let resolved = self.resolve(relative)?;

        // `symlink_metadata` (not `metadata`) so a symlink inside the
        // workspace can never be used to read through to a target outside
        // it — it reports as not-a-file rather than being followed.
        let metadata = std::fs::symlink_metadata(&resolved).map_err(|source| McpError::Io {
            path: resolved.clone(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(McpError::NotAFile { path: resolved });
        }

        let content = std::fs::read_to_string(&resolved).map_err(|source| McpError::Io {
            path: resolved.clone(),
            source,
        })?;

        Ok((relative.to_owned(), content))
    }
}

/// Resolve `..` and `.` segments lexically, without touching the
/// filesystem — the containment check only needs the resolved form
/// compared against the root, not a fully symlink-chased path.
fn lexically_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn walk(root: &Path, dir: &Path, max: usize, out: &mut Vec<String>) -> McpResult<()> {
    if out.len() >= max {
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|source| McpError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        if out.len() >= max {
            break;
        }
        let entry = entry.map_err(|source| McpError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| McpError::Io {
            path: path.clone(),
            source,
        })?;

        if file_type.is_dir() {
            walk(root, &path, max, out)?;
        } else if file_type.is_file() {
            if let Ok(relative) = path.strip_prefix(root) {
                let slashed = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(slashed);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_accepts_root_and_children() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.txt"), "hi").expect("write");

        let sandbox = Sandbox::new(Some(dir.path().to_path_buf())).expect("sandbox");
        assert_eq!(sandbox.resolve("").expect("resolve root"), *sandbox.root());
        assert_eq!(
            sandbox.resolve("a.txt").expect("resolve child"),
            sandbox.root().join("a.txt")
        );
    }

    #[test]
    fn resolve_rejects_parent_escape() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sandbox = Sandbox::new(Some(dir.path().to_path_buf())).expect("sandbox");

        let err = sandbox.resolve("../../etc/passwd").unwrap_err();
        assert!(matches!(err, McpError::PathOutsideWorkspace { .. }));
    }

    #[test]
    fn resolve_rejects_disguised_escape_with_nested_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("sub/deeper")).expect("mkdir");
        let sandbox = Sandbox::new(Some(dir.path().to_path_buf())).expect("sandbox");

        let err = sandbox.resolve("sub/deeper/../../../outside").unwrap_err();
        assert!(matches!(err, McpError::PathOutsideWorkspace { .. }));
    }

    #[test]
    fn resolve_accepts_windows_separators() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("sub")).expect("mkdir");
        std::fs::write(dir.path().join("sub/a.txt"), "hi").expect("write");

        let sandbox = Sandbox::new(Some(dir.path().to_path_buf())).expect("sandbox");
        let resolved = sandbox.resolve(r"sub\a.txt").expect("resolve");
        assert_eq!(resolved, sandbox.root().join("sub").join("a.txt"));
    }

    #[test]
    fn list_caps_at_max() {
        let dir = tempfile::tempdir().expect("tempdir");
        for i in 0..5 {
            std::fs::write(dir.path().join(format!("f{i}.txt")), "x").expect("write");
        }
        let sandbox = Sandbox::new(Some(dir.path().to_path_buf())).expect("sandbox");

        let listed = sandbox.list(1).expect("list");
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn list_only_emits_regular_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("sub")).expect("mkdir");
        std::fs::write(dir.path().join("a.txt"), "hi").expect("write");
        std::fs::write(dir.path().join("sub/b.txt"), "hi").expect("write");

        let sandbox = Sandbox::new(Some(dir.path().to_path_buf())).expect("sandbox");
        let mut listed = sandbox.list(DEFAULT_MAX_LIST).expect("list");
        listed.sort();
        assert_eq!(listed, vec!["a.txt".to_owned(), "sub/b.txt".to_owned()]);
    }

    #[test]
    fn read_rejects_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("sub")).expect("mkdir");

        let sandbox = Sandbox::new(Some(dir.path().to_path_buf())).expect("sandbox");
        let err = sandbox.read("sub").unwrap_err();
        assert!(matches!(err, McpError::NotAFile { .. }));
    }

    #[test]
    fn read_returns_relative_path_and_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.txt"), "hello\n").expect("write");

        let sandbox = Sandbox::new(Some(dir.path().to_path_buf())).expect("sandbox");
        let (path, content) = sandbox.read("a.txt").expect("read");
        assert_eq!(path, "a.txt");
        assert_eq!(content, "hello\n");
    }

    #[cfg(unix)]
    #[test]
    fn read_refuses_to_follow_a_symlink_out_of_the_workspace() {
        let outside = tempfile::tempdir().expect("tempdir outside");
        std::fs::write(outside.path().join("secret.txt"), "top secret").expect("write secret");

        let workspace = tempfile::tempdir().expect("tempdir workspace");
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), workspace.path().join("link.txt"))
            .expect("symlink");

        let sandbox = Sandbox::new(Some(workspace.path().to_path_buf())).expect("sandbox");
        let err = sandbox.read("link.txt").unwrap_err();
        assert!(matches!(err, McpError::NotAFile { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn list_skips_symlinks() {
        let outside = tempfile::tempdir().expect("tempdir outside");
        std::fs::write(outside.path().join("secret.txt"), "top secret").expect("write secret");

        let workspace = tempfile::tempdir().expect("tempdir workspace");
        std::fs::write(workspace.path().join("real.txt"), "real").expect("write real");
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), workspace.path().join("link.txt"))
            .expect("symlink");

        let sandbox = Sandbox::new(Some(workspace.path().to_path_buf())).expect("sandbox");
        let listed = sandbox.list(DEFAULT_MAX_LIST).expect("list");
        assert_eq!(listed, vec!["real.txt".to_owned()]);
    }
}
