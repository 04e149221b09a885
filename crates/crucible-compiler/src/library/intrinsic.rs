//! Operations the compiler expands inline instead of calling out.

use std::fmt;

use crate::types::Ty;

/// A compiler intrinsic a library method may be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// `f64.sqrt`
    F64Sqrt,
    /// `f64.abs`
    F64Abs,
    /// `f64.floor`
    F64Floor,
    /// `f64.ceil`
    F64Ceil,
    /// `f64.trunc`
    F64Trunc,
    /// `f64.nearest` (round half to even)
    F64Nearest,
    /// `f64.min`
    F64Min,
    /// `f64.max`
    F64Max,
    /// Absolute value of an `int`.
    I32Abs,
    /// Smaller of two `int`s.
    I32Min,
    /// Larger of two `int`s.
    I32Max,
    /// Sum of an `int[]`.
    SeqSum,
    /// Smallest element of a non-empty `int[]`.
    SeqMin,
    /// Largest element of a non-empty `int[]`.
    SeqMax,
    /// Mean of a non-empty `int[]`.
    SeqAverage,
    /// Membership test on an `int[]`.
    SeqContains,
    /// `count` consecutive `int`s starting at `start`.
    SeqRange,
}

impl Intrinsic {
    /// Every intrinsic.
    pub const ALL: &'static [Self] = &[
        Self::F64Sqrt,
        Self::F64Abs,
        Self::F64Floor,
        Self::F64Ceil,
        Self::F64Trunc,
        Self::F64Nearest,
        Self::F64Min,
        Self::F64Max,
        Self::I32Abs,
        Self::I32Min,
        Self::I32Max,
        Self::SeqSum,
        Self::SeqMin,
        Self::SeqMax,
        Self::SeqAverage,
        Self::SeqContains,
        Self::SeqRange,
    ];

    /// Name used in descriptors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::F64Sqrt => "f64.sqrt",
            Self::F64Abs => "f64.abs",
            Self::F64Floor => "f64.floor",
            Self::F64Ceil => "f64.ceil",
            Self::F64Trunc => "f64.trunc",
            Self::F64Nearest => "f64.nearest",
            Self::F64Min => "f64.min",
            Self::F64Max => "f64.max",
            Self::I32Abs => "i32.abs",
            Self::I32Min => "i32.min",
            Self::I32Max => "i32.max",
            Self::SeqSum => "seq.sum",
            Self::SeqMin => "seq.min",
            Self::SeqMax => "seq.max",
            Self::SeqAverage => "seq.average",
            Self::SeqContains => "seq.contains",
            Self::SeqRange => "seq.range",
        }
    }

    /// Look an intrinsic up by descriptor name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|i| i.name() == name)
    }

    /// Parameter and return types the binding requires.
    #[must_use]
    pub fn signature(self) -> (Vec<Ty>, Ty) {
        let ints = || Ty::Array(Box::new(Ty::Int));
        match self {
            Self::F64Sqrt
            | Self::F64Abs
            | Self::F64Floor
            | Self::F64Ceil
            | Self::F64Trunc
            | Self::F64Nearest => (vec![Ty::Double], Ty::Double),
            Self::F64Min | Self::F64Max => (vec![Ty::Double, Ty::Double], Ty::Double),
            Self::I32Abs => (vec![Ty::Int], Ty::Int),
            Self::I32Min | Self::I32Max => (vec![Ty::Int, Ty::Int], Ty::Int),
            Self::SeqSum | Self::SeqMin | Self::SeqMax => (vec![ints()], Ty::Int),
            Self::SeqAverage => (vec![ints()], Ty::Double),
            Self::SeqContains => (vec![ints(), Ty::Int], Ty::Bool),
            Self::SeqRange => (vec![Ty::Int, Ty::Int], ints()),
        }
    }
}

impl fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
