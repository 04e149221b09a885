//! Reference libraries: what a `using` directive can bring into scope.
//!
//! A [`ReferenceManifest`] maps namespaces to descriptor files. Resolving it
//! validates every binding against the host ABI and produces an immutable
//! [`ReferenceSet`] that compilations borrow.

mod descriptor;
mod intrinsic;
mod manifest;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crucible_core::HostFunction;

pub use descriptor::{
    ConstantDescriptor, LibraryDescriptor, MethodDescriptor, TypeDescriptor, load_descriptor,
    parse_descriptor,
};
pub use intrinsic::Intrinsic;
pub use manifest::ReferenceManifest;

use crate::error::{ReferenceError, ReferenceResult};
use crate::types::Ty;

/// How a library method is implemented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Imported host function.
    Host(HostFunction),
    /// Expanded inline by the code generator.
    Intrinsic(Intrinsic),
    /// Export of a Wasm module resolved from the sandbox bin directory.
    Module {
        /// Module name (file stem inside the bin directory).
        module: String,
        /// Export name.
        export: String,
    },
}

/// A resolved library method.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryMethod {
    /// Method name.
    pub name: String,
    /// Parameter types.
    pub params: Vec<Ty>,
    /// Return type.
    pub returns: Ty,
    /// Callable on a receiver of the first parameter's type.
    pub extension: bool,
    /// Implementation.
    pub binding: Binding,
}

/// A compile-time constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `double`
    Double(f64),
    /// `bool`
    Bool(bool),
    /// `string`
    Str(String),
}

impl ConstValue {
    /// Type of the value.
    #[must_use]
    pub fn ty(&self) -> Ty {
        match self {
            Self::Int(_) => Ty::Int,
            Self::Long(_) => Ty::Long,
            Self::Double(_) => Ty::Double,
            Self::Bool(_) => Ty::Bool,
            Self::Str(_) => Ty::String,
        }
    }
}

/// A named constant.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryConstant {
    /// Constant name.
    pub name: String,
    /// Value.
    pub value: ConstValue,
}

/// A static library type.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryType {
    /// Simple name.
    pub name: String,
    /// Methods, overloads included.
    pub methods: Vec<LibraryMethod>,
    /// Constants.
    pub constants: Vec<LibraryConstant>,
}

impl LibraryType {
    /// Overloads named `name`.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a LibraryMethod> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    /// Constant named `name`.
    #[must_use]
    pub fn constant(&self, name: &str) -> Option<&LibraryConstant> {
        self.constants.iter().find(|c| c.name == name)
    }
}

/// A validated library.
#[derive(Debug, Clone, PartialEq)]
pub struct Library {
    /// Namespace contributed to.
    pub namespace: String,
    /// Descriptor the library was read from.
    pub path: PathBuf,
    /// Declared types.
    pub types: Vec<LibraryType>,
}

impl Library {
    /// Validate a parsed descriptor.
    ///
    /// # Errors
    ///
    /// Returns a [`ReferenceError`] describing the first invalid type,
    /// binding or constant.
    pub fn from_descriptor(desc: LibraryDescriptor, path: &Path) -> ReferenceResult<Self> {
        let malformed = |message: String| ReferenceError::Malformed {
            path: path.to_path_buf(),
            message,
        };

        let mut types = Vec::with_capacity(desc.types.len());
        for ty in desc.types {
            let mut methods = Vec::with_capacity(ty.methods.len());
            for method in ty.methods {
                let qualified = format!("{}.{}.{}", desc.namespace, ty.name, method.name);
                methods.push(resolve_method(method, &qualified, path)?);
            }

            let mut constants = Vec::with_capacity(ty.constants.len());
            for constant in ty.constants {
                let value = const_value(&constant).ok_or_else(|| {
                    malformed(format!(
                        "constant {}.{} is not a valid '{}'",
                        ty.name, constant.name, constant.ty
                    ))
                })?;
                constants.push(LibraryConstant {
                    name: constant.name,
                    value,
                });
            }

            types.push(LibraryType {
                name: ty.name,
                methods,
                constants,
            });
        }

        Ok(Self {
            namespace: desc.namespace,
            path: path.to_path_buf(),
            types,
        })
    }

    /// Type named `name`.
    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<&LibraryType> {
        self.types.iter().find(|t| t.name == name)
    }
}

fn parse_ty(name: &str, method: &str, path: &Path) -> ReferenceResult<Ty> {
    Ty::from_descriptor(name).ok_or_else(|| ReferenceError::Malformed {
        path: path.to_path_buf(),
        message: format!("{method}: unknown type '{name}'"),
    })
}

fn resolve_method(
    method: MethodDescriptor,
    qualified: &str,
    path: &Path,
) -> ReferenceResult<LibraryMethod> {
    let params = method
        .params
        .iter()
        .map(|p| parse_ty(p, qualified, path))
        .collect::<ReferenceResult<Vec<_>>>()?;
    let returns = parse_ty(&method.returns, qualified, path)?;
    if params.contains(&Ty::Void) {
        return Err(ReferenceError::SignatureMismatch {
            method: qualified.to_owned(),
            message: "parameters cannot be void".to_owned(),
        });
    }
    if method.extension && params.is_empty() {
        return Err(ReferenceError::SignatureMismatch {
            method: qualified.to_owned(),
            message: "extension methods need a receiver parameter".to_owned(),
        });
    }

    let mismatch = |message: String| ReferenceError::SignatureMismatch {
        method: qualified.to_owned(),
        message,
    };

    let binding = match (&method.host, &method.intrinsic, &method.module) {
        (Some(host), None, None) => {
            let func = HostFunction::from_name(host).ok_or_else(|| {
                ReferenceError::UnknownHostFunction {
                    method: qualified.to_owned(),
                    name: host.clone(),
                }
            })?;
            check_abi(&params, &returns, func.params(), func.results())
                .map_err(|m| mismatch(format!("{m} (host function '{host}')")))?;
            Binding::Host(func)
        },
        (None, Some(name), None) => {
            let intrinsic = Intrinsic::from_name(name).ok_or_else(|| ReferenceError::Malformed {
                path: path.to_path_buf(),
                message: format!("{qualified}: unknown intrinsic '{name}'"),
            })?;
            let (expected_params, expected_ret) = intrinsic.signature();
            if expected_params != params || expected_ret != returns {
                return Err(mismatch(format!("intrinsic '{name}' has a different signature")));
            }
            Binding::Intrinsic(intrinsic)
        },
        (None, None, Some(module)) => {
            if params.iter().chain(std::iter::once(&returns)).any(|t| matches!(t, Ty::Array(_))) {
                return Err(mismatch("arrays cannot cross a module boundary".to_owned()));
            }
            Binding::Module {
                module: module.clone(),
                export: method.export.clone().unwrap_or_else(|| method.name.clone()),
            }
        },
        _ => {
            return Err(ReferenceError::Malformed {
                path: path.to_path_buf(),
                message: format!(
                    "{qualified}: exactly one of 'host', 'intrinsic' or 'module' must be set"
                ),
            });
        },
    };

    if method.export.is_some() && method.module.is_none() {
        return Err(ReferenceError::Malformed {
            path: path.to_path_buf(),
            message: format!("{qualified}: 'export' requires 'module'"),
        });
    }

    Ok(LibraryMethod {
        name: method.name,
        params,
        returns,
        extension: method.extension,
        binding,
    })
}

/// Compare declared guest types with an ABI signature.
fn check_abi(
    params: &[Ty],
    returns: &Ty,
    abi_params: &[crucible_core::WasmType],
    abi_results: &[crucible_core::WasmType],
) -> Result<(), String> {
    if params.iter().chain(std::iter::once(returns)).any(|t| matches!(t, Ty::Array(_))) {
        return Err("arrays cannot cross the host boundary".to_owned());
    }
    let declared: Vec<_> = params.iter().filter_map(Ty::wasm).collect();
    if declared != abi_params {
        return Err(format!(
            "declared {} parameter(s) do not match the ABI's {}",
            declared.len(),
            abi_params.len()
        ));
    }
    let declared_ret: Vec<_> = returns.wasm().into_iter().collect();
    if declared_ret != abi_results {
        return Err(format!("return type '{returns}' does not match the ABI"));
    }
    Ok(())
}

fn const_value(constant: &ConstantDescriptor) -> Option<ConstValue> {
    use toml::Value;

    Some(match (constant.ty.as_str(), &constant.value) {
        ("int", Value::Integer(v)) => ConstValue::Int(i32::try_from(*v).ok()?),
        ("long", Value::Integer(v)) => ConstValue::Long(*v),
        ("double", Value::Float(v)) => ConstValue::Double(*v),
        #[allow(clippy::cast_precision_loss)]
        ("double", Value::Integer(v)) => ConstValue::Double(*v as f64),
        ("bool", Value::Boolean(v)) => ConstValue::Bool(*v),
        ("string", Value::String(v)) => ConstValue::Str(v.clone()),
        _ => return None,
    })
}

/// An immutable, ordered set of resolved libraries.
///
/// Cheap to clone; libraries are shared.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    libraries: Vec<Arc<Library>>,
}

impl ReferenceSet {
    /// A set containing `libraries` in order.
    #[must_use]
    pub fn new(libraries: Vec<Library>) -> Self {
        Self {
            libraries: libraries.into_iter().map(Arc::new).collect(),
        }
    }

    /// The libraries of `self` followed by those of `other`.
    #[must_use]
    pub fn union(&self, other: &ReferenceSet) -> Self {
        let mut libraries = self.libraries.clone();
        for lib in &other.libraries {
            if !libraries.iter().any(|l| Arc::ptr_eq(l, lib)) {
                libraries.push(Arc::clone(lib));
            }
        }
        Self { libraries }
    }

    /// Libraries in order.
    pub fn libraries(&self) -> impl Iterator<Item = &Library> {
        self.libraries.iter().map(AsRef::as_ref)
    }

    /// Number of libraries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    /// Whether the set holds no libraries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Whether `namespace` exists, either declared by a library or as a
    /// prefix of one (`Core` exists when `Core.Text` is referenced).
    #[must_use]
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.libraries.iter().any(|lib| {
            lib.namespace == namespace
                || lib
                    .namespace
                    .strip_prefix(namespace)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// Type `name` declared in exactly `namespace`.
    #[must_use]
    pub fn find_type(&self, namespace: &str, name: &str) -> Option<&LibraryType> {
        self.libraries
            .iter()
            .filter(|lib| lib.namespace == namespace)
            .find_map(|lib| lib.find_type(name))
    }

    /// Every type declared in `namespace`.
    pub fn types_in<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a LibraryType> {
        self.libraries
            .iter()
            .filter(move |lib| lib.namespace == namespace)
            .flat_map(|lib| lib.types.iter())
    }

    /// Wasm modules bound by any library method.
    #[must_use]
    pub fn modules(&self) -> BTreeSet<String> {
        self.libraries()
            .flat_map(|lib| lib.types.iter())
            .flat_map(|ty| ty.methods.iter())
            .filter_map(|m| match &m.binding {
                Binding::Module { module, .. } => Some(module.clone()),
                _ => None,
            })
            .collect()
    }
}
