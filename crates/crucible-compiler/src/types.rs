//! Guest-language types and their Wasm representation.

use std::fmt;

use crucible_core::WasmType;

/// A guest-language type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Ty {
    /// No value.
    #[default]
    Void,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 64-bit float.
    Double,
    /// Boolean, stored as `i32`.
    Bool,
    /// Immutable string, an Extism memory handle (`0` is null).
    String,
    /// Single-dimension array, a pointer into linear memory (`0` is null).
    Array(Box<Ty>),
    /// Type of the `null` literal before conversion.
    Null,
    /// Type of an expression that already produced a diagnostic.
    Error,
}

impl Ty {
    /// Parse a type name used in library descriptors (`int`, `string[]`, ...).
    #[must_use]
    pub fn from_descriptor(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(elem) = name.strip_suffix("[]") {
            let elem = Self::from_descriptor(elem)?;
            if elem == Self::Void {
                return None;
            }
            return Some(Self::Array(Box::new(elem)));
        }
        Some(match name {
            "void" => Self::Void,
            "int" => Self::Int,
            "long" => Self::Long,
            "double" => Self::Double,
            "bool" => Self::Bool,
            "string" => Self::String,
            _ => return None,
        })
    }

    /// Wasm value type carrying this type, `None` for `void`.
    #[must_use]
    pub fn wasm(&self) -> Option<WasmType> {
        match self {
            Self::Void => None,
            Self::Int | Self::Bool | Self::Array(_) | Self::Null | Self::Error => {
                Some(WasmType::I32)
            },
            Self::Long | Self::String => Some(WasmType::I64),
            Self::Double => Some(WasmType::F64),
        }
    }

    /// Bytes occupied by one array element of this type.
    #[must_use]
    pub fn elem_size(&self) -> u32 {
        match self.wasm() {
            Some(WasmType::I64 | WasmType::F64) => 8,
            _ => 4,
        }
    }

    /// Rank among numeric types, wider types rank higher.
    #[must_use]
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            Self::Int => Some(1),
            Self::Long => Some(2),
            Self::Double => Some(3),
            _ => None,
        }
    }

    /// `int`, `long` or `double`.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    /// `int` or `long`.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        matches!(self, Self::Int | Self::Long)
    }

    /// Whether `null` converts to this type.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::String | Self::Array(_))
    }

    /// Element type of an array.
    #[must_use]
    pub fn element(&self) -> Option<&Ty> {
        match self {
            Self::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Cost of an implicit conversion from `self` to `target`, `None` when no
    /// implicit conversion exists. Zero means identity.
    #[must_use]
    pub fn implicit_cost(&self, target: &Ty) -> Option<u8> {
        if self == target || *self == Self::Error || *target == Self::Error {
            return Some(0);
        }
        match (self, target) {
            (Self::Null, t) if t.is_nullable() => Some(1),
            (from, to) => {
                let (a, b) = (from.numeric_rank()?, to.numeric_rank()?);
                b.checked_sub(a).filter(|d| *d > 0)
            },
        }
    }

    /// Whether an explicit cast from `self` to `target` is allowed.
    #[must_use]
    pub fn casts_to(&self, target: &Ty) -> bool {
        self.implicit_cost(target).is_some() || (self.is_numeric() && target.is_numeric())
    }

    /// Smallest type both operands implicitly convert to.
    #[must_use]
    pub fn common(a: &Ty, b: &Ty) -> Option<Ty> {
        if a.implicit_cost(b).is_some() {
            Some(b.clone())
        } else if b.implicit_cost(a).is_some() {
            Some(a.clone())
        } else {
            None
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Double => f.write_str("double"),
            Self::Bool => f.write_str("bool"),
            Self::String => f.write_str("string"),
            Self::Array(elem) => write!(f, "{elem}[]"),
            Self::Null => f.write_str("<null>"),
            Self::Error => f.write_str("?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_descriptor() {
        assert_eq!(Ty::from_descriptor("int"), Some(Ty::Int));
        assert_eq!(
            Ty::from_descriptor("string[]"),
            Some(Ty::Array(Box::new(Ty::String)))
        );
        assert_eq!(Ty::from_descriptor("void[]"), None);
        assert_eq!(Ty::from_descriptor("object"), None);
    }

    #[test]
    fn test_widening_costs() {
        assert_eq!(Ty::Int.implicit_cost(&Ty::Int), Some(0));
        assert_eq!(Ty::Int.implicit_cost(&Ty::Long), Some(1));
        assert_eq!(Ty::Int.implicit_cost(&Ty::Double), Some(2));
        assert_eq!(Ty::Long.implicit_cost(&Ty::Int), None);
        assert_eq!(Ty::Bool.implicit_cost(&Ty::Int), None);
    }

    #[test]
    fn test_null_conversions() {
        assert_eq!(Ty::Null.implicit_cost(&Ty::String), Some(1));
        assert_eq!(
            Ty::Null.implicit_cost(&Ty::Array(Box::new(Ty::Int))),
            Some(1)
        );
        assert_eq!(Ty::Null.implicit_cost(&Ty::Int), None);
    }

    #[test]
    fn test_casts() {
        assert!(Ty::Double.casts_to(&Ty::Int));
        assert!(!Ty::String.casts_to(&Ty::Int));
    }

    #[test]
    fn test_common_type() {
        assert_eq!(Ty::common(&Ty::Int, &Ty::Double), Some(Ty::Double));
        assert_eq!(Ty::common(&Ty::Null, &Ty::String), Some(Ty::String));
        assert_eq!(Ty::common(&Ty::Bool, &Ty::String), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Ty::Array(Box::new(Ty::Long)).to_string(), "long[]");
    }

    #[test]
    fn test_wasm_layout() {
        assert_eq!(Ty::String.wasm(), Some(WasmType::I64));
        assert_eq!(Ty::Array(Box::new(Ty::Double)).wasm(), Some(WasmType::I32));
        assert_eq!(Ty::Double.elem_size(), 8);
        assert_eq!(Ty::Bool.elem_size(), 4);
    }
}
