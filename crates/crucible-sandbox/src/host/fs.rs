//! `Sandbox.IO.File`: file access confined to the directory grants.
//!
//! A guest path is matched against the grants' guest paths (the longest
//! match wins, `.` matches any relative path). The remainder is resolved
//! on the host and canonicalised through its deepest existing ancestor so
//! a symlink cannot lead outside the granted directory.

use std::io::Write as _;
use std::path::{Component, Path, PathBuf};

use crucible_core::HostFunction;
use extism::{CurrentPlugin, Error, UserData, Val};
use tracing::debug;

use crate::host::util::{self, MAX_GUEST_STRING_LEN, MAX_PATH_LEN};
use crate::provision::DirectoryGrant;
use crate::state::HostState;

pub(crate) fn call(
    host: HostFunction,
    plugin: &mut CurrentPlugin,
    inputs: &[Val],
    outputs: &mut [Val],
    user_data: &UserData<HostState>,
) -> Result<(), Error> {
    use HostFunction as H;

    let requested = util::arg_str(plugin, inputs, 0, MAX_PATH_LEN)?;
    let contents = match host {
        H::FileWriteText | H::FileAppendText => {
            Some(util::arg_str(plugin, inputs, 1, MAX_GUEST_STRING_LEN)?)
        },
        _ => None,
    };

    let (grants, max_file_bytes) = {
        let shared = util::shared(user_data)?;
        let state = util::lock(&shared)?;
        (std::sync::Arc::clone(&state.grants), state.max_file_bytes)
    };
    let (grant, resolved) = resolve(&grants, &requested)?;
    debug!(host = %host, path = %resolved.display(), "Guest file access");

    match host {
        H::FileReadText => {
            let meta = std::fs::metadata(&resolved).map_err(|e| io_error(&requested, &e))?;
            if meta.len() > max_file_bytes {
                return Err(Error::msg(format!(
                    "file '{requested}' exceeds the maximum readable size of {max_file_bytes} bytes"
                )));
            }
            let text =
                std::fs::read_to_string(&resolved).map_err(|e| io_error(&requested, &e))?;
            util::ret_str(plugin, outputs, &text)
        },
        H::FileWriteText => {
            require_writable(grant, &requested)?;
            let text = contents.unwrap_or_default();
            check_size(text.len() as u64, max_file_bytes, &requested)?;
            std::fs::write(&resolved, text).map_err(|e| io_error(&requested, &e))
        },
        H::FileAppendText => {
            require_writable(grant, &requested)?;
            let text = contents.unwrap_or_default();
            let existing = std::fs::metadata(&resolved).map(|m| m.len()).unwrap_or(0);
            check_size(existing.saturating_add(text.len() as u64), max_file_bytes, &requested)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&resolved)
                .map_err(|e| io_error(&requested, &e))?;
            file.write_all(text.as_bytes())
                .map_err(|e| io_error(&requested, &e))
        },
        H::FileExists => util::ret_bool(outputs, resolved.is_file()),
        H::FileDelete => {
            require_writable(grant, &requested)?;
            match std::fs::remove_file(&resolved) {
                Ok(()) => Ok(()),
                // Deleting a missing file is not an error.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_error(&requested, &e)),
            }
        },
        other => Err(Error::msg(format!("{other} is not a file function"))),
    }
}

fn io_error(requested: &str, err: &std::io::Error) -> Error {
    match err.kind() {
        std::io::ErrorKind::NotFound => {
            Error::msg(format!("Could not find file '{requested}'."))
        },
        _ => Error::msg(format!("{requested}: {err}")),
    }
}

fn require_writable(grant: &DirectoryGrant, requested: &str) -> Result<(), Error> {
    if grant.writable {
        Ok(())
    } else {
        Err(Error::msg(format!(
            "Access to the path '{requested}' is denied."
        )))
    }
}

fn check_size(len: u64, max: u64, requested: &str) -> Result<(), Error> {
    if len > max {
        return Err(Error::msg(format!(
            "file '{requested}' would exceed the maximum size of {max} bytes"
        )));
    }
    Ok(())
}

/// Split a guest path into its normal components, rejecting `..`.
fn guest_components(path: &str) -> Result<(bool, Vec<&str>), Error> {
    let p = Path::new(path);
    let absolute = p.has_root();
    let mut parts = Vec::new();
    for component in p.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| Error::msg("path is not valid UTF-8"))?,
            ),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {},
            Component::ParentDir => {
                return Err(Error::msg(format!(
                    "Access to the path '{path}' is denied: parent traversal is not allowed."
                )));
            },
        }
    }
    Ok((absolute, parts))
}

/// Pick the grant covering `requested` and map it to a host path.
fn resolve<'g>(
    grants: &'g [DirectoryGrant],
    requested: &str,
) -> Result<(&'g DirectoryGrant, PathBuf), Error> {
    if requested.is_empty() {
        return Err(Error::msg("The value cannot be an empty string. (Parameter 'path')"));
    }
    let (absolute, parts) = guest_components(requested)?;

    let mut best: Option<(&DirectoryGrant, usize)> = None;
    for grant in grants {
        let (grant_absolute, grant_parts) = guest_components(&grant.guest_path)?;
        let matches = if grant_parts.is_empty() && !grant_absolute {
            !absolute
        } else {
            grant_absolute == absolute && parts.starts_with(&grant_parts)
        };
        if matches && best.is_none_or(|(_, len)| grant_parts.len() > len) {
            best = Some((grant, grant_parts.len()));
        }
    }
    let (grant, skip) = best.ok_or_else(|| {
        Error::msg(format!(
            "Access to the path '{requested}' is denied: outside the granted directories."
        ))
    })?;

    let rest: PathBuf = parts.iter().skip(skip).collect();
    let resolved = resolve_physical(&grant.host_path, &rest, requested)?;
    Ok((grant, resolved))
}

/// Canonicalise `root/relative` through its deepest existing ancestor and
/// require the result to stay under `root`.
fn resolve_physical(root: &Path, relative: &Path, requested: &str) -> Result<PathBuf, Error> {
    let joined = root.join(relative);
    let mut existing = joined.clone();
    let mut missing = Vec::new();

    loop {
        if std::fs::symlink_metadata(&existing).is_ok() {
            let mut resolved = std::fs::canonicalize(&existing)
                .map_err(|e| Error::msg(format!("{requested}: {e}")))?;
            for part in missing.into_iter().rev() {
                resolved.push(part);
            }
            if !resolved.starts_with(root) {
                return Err(Error::msg(format!(
                    "Access to the path '{requested}' is denied: it resolves outside the granted directory."
                )));
            }
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent.to_path_buf();
            },
            _ => break,
        }
    }

    if joined.starts_with(root) {
        Ok(joined)
    } else {
        Err(Error::msg(format!(
            "Access to the path '{requested}' is denied."
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(path: &Path, guest: &str, writable: bool) -> DirectoryGrant {
        DirectoryGrant {
            host_path: path.canonicalize().unwrap(),
            guest_path: guest.to_owned(),
            writable,
        }
    }

    #[test]
    fn test_relative_paths_use_working_directory_grant() {
        let dir = tempfile::tempdir().unwrap();
        let grants = vec![grant(dir.path(), ".", true)];

        let (g, resolved) = resolve(&grants, "out/data.txt").unwrap();
        assert!(g.writable);
        assert_eq!(resolved, g.host_path.join("out").join("data.txt"));

        let (_, same) = resolve(&grants, "./out/data.txt").unwrap();
        assert_eq!(same, resolved);
    }

    #[test]
    fn test_parent_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let grants = vec![grant(dir.path(), ".", true)];
        assert!(resolve(&grants, "../escape.txt").is_err());
        assert!(resolve(&grants, "a/../../escape.txt").is_err());
    }

    #[test]
    fn test_longest_guest_prefix_wins() {
        let work = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let grants = vec![
            grant(work.path(), ".", true),
            grant(data.path(), "/data", false),
        ];

        let (g, resolved) = resolve(&grants, "/data/input.txt").unwrap();
        assert!(!g.writable);
        assert_eq!(resolved, g.host_path.join("input.txt"));

        assert!(resolve(&grants, "/etc/passwd").is_err());
    }

    #[test]
    fn test_read_only_grant_denies_writes() {
        let dir = tempfile::tempdir().unwrap();
        let ro = grant(dir.path(), ".", false);
        assert!(require_writable(&ro, "x.txt").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();

        let grants = vec![grant(root.path(), ".", true)];
        assert!(resolve(&grants, "link/secret.txt").is_err());
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let grants = vec![grant(dir.path(), ".", true)];
        assert!(resolve(&grants, "").is_err());
    }
}
