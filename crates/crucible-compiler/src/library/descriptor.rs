//! Library descriptor files.
//!
//! A descriptor (`<Namespace>.toml`) declares the types a namespace exposes
//! and how each method is bound. Descriptors are read once when a
//! [`super::ReferenceManifest`] is resolved.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReferenceError, ReferenceResult};

/// Top-level descriptor document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryDescriptor {
    /// Namespace the library contributes to.
    pub namespace: String,
    /// Declared types.
    #[serde(default)]
    pub types: Vec<TypeDescriptor>,
}

/// A static type exposed by a library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDescriptor {
    /// Simple type name.
    pub name: String,
    /// Methods, overloads listed separately.
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
    /// Named constants.
    #[serde(default)]
    pub constants: Vec<ConstantDescriptor>,
}

/// A method and its binding. Exactly one of `host`, `intrinsic` or
/// `module` must be set; `export` accompanies `module`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDescriptor {
    /// Method name.
    pub name: String,
    /// Parameter type names.
    #[serde(default)]
    pub params: Vec<String>,
    /// Return type name.
    #[serde(default = "default_returns")]
    pub returns: String,
    /// Callable as `receiver.Name(...)` on a value of the first parameter's type.
    #[serde(default)]
    pub extension: bool,
    /// Host function from the ABI table.
    pub host: Option<String>,
    /// Compiler intrinsic.
    pub intrinsic: Option<String>,
    /// Wasm module loaded from the sandbox bin directory.
    pub module: Option<String>,
    /// Export inside `module`; defaults to the method name.
    pub export: Option<String>,
}

fn default_returns() -> String {
    "void".to_owned()
}

/// A named compile-time constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstantDescriptor {
    /// Constant name.
    pub name: String,
    /// Type name.
    #[serde(rename = "type")]
    pub ty: String,
    /// Literal value.
    pub value: toml::Value,
}

/// Load and parse one descriptor file.
///
/// # Errors
///
/// Returns [`ReferenceError::Read`] if the file cannot be read and
/// [`ReferenceError::Malformed`] if it is not a valid descriptor.
pub fn load_descriptor(path: &Path) -> ReferenceResult<LibraryDescriptor> {
    let content = std::fs::read_to_string(path).map_err(|source| ReferenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_descriptor(path, &content)
}

/// Parse descriptor text; `path` is used for error messages only.
///
/// # Errors
///
/// Returns [`ReferenceError::Malformed`] if `content` is not a valid descriptor.
pub fn parse_descriptor(path: &Path, content: &str) -> ReferenceResult<LibraryDescriptor> {
    toml::from_str(content).map_err(|e| ReferenceError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptor() {
        let text = r#"
            namespace = "Core"

            [[types]]
            name = "Console"

            [[types.methods]]
            name = "WriteLine"
            params = ["int"]
            host = "cr_console_write_line_i32"

            [[types.constants]]
            name = "Width"
            type = "int"
            value = 80
        "#;
        let desc = parse_descriptor(Path::new("Core.toml"), text).unwrap();
        assert_eq!(desc.namespace, "Core");
        let console = &desc.types[0];
        assert_eq!(console.methods[0].returns, "void");
        assert_eq!(console.methods[0].host.as_deref(), Some("cr_console_write_line_i32"));
        assert_eq!(console.constants[0].value, toml::Value::Integer(80));
    }

    #[test]
    fn test_unknown_field_is_malformed() {
        let err = parse_descriptor(Path::new("x.toml"), "namespace = \"X\"\nversion = 2\n").unwrap_err();
        assert!(matches!(err, ReferenceError::Malformed { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = load_descriptor(Path::new("/nonexistent/Core.toml")).unwrap_err();
        assert!(matches!(err, ReferenceError::Read { .. }));
    }
}
