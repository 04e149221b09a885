//! Bin-directory module resolution.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{SandboxError, SandboxResult};

/// A module the guest imports, read from the bin directory.
#[derive(Debug, Clone)]
pub(crate) struct LinkedModule {
    pub(crate) name: String,
    pub(crate) bytes: Vec<u8>,
}

/// Read `<bin_dir>/<name>.wasm` for every required module.
pub(crate) fn resolve_modules<'a>(
    bin_dir: Option<&Path>,
    required: impl IntoIterator<Item = &'a String>,
) -> SandboxResult<Vec<LinkedModule>> {
    let mut linked = Vec::new();
    for name in required {
        let path = module_path(bin_dir, name)?;
        let bytes = std::fs::read(&path).map_err(|_| SandboxError::ModuleNotFound {
            module: name.clone(),
            path: path.clone(),
        })?;
        debug!(module = %name, path = %path.display(), size = bytes.len(), "Linked bin module");
        linked.push(LinkedModule {
            name: name.clone(),
            bytes,
        });
    }
    Ok(linked)
}

fn module_path(bin_dir: Option<&Path>, name: &str) -> SandboxResult<PathBuf> {
    let fallback = || PathBuf::from(format!("{name}.wasm"));
    let Some(dir) = bin_dir else {
        return Err(SandboxError::ModuleNotFound {
            module: name.to_owned(),
            path: fallback(),
        });
    };
    // Module names are plain identifiers; anything path-like is refused.
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && !name.starts_with('.')
        && name != "main";
    let path = dir.join(format!("{name}.wasm"));
    if plain {
        Ok(path)
    } else {
        Err(SandboxError::ModuleNotFound {
            module: name.to_owned(),
            path,
        })
    }
}
