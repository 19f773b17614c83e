//! Tensor types, dimensions and storage formats.
//!
//! These are the collaborator shapes the index notation IR queries but
//! never computes: a tensor's component datatype, the size of each mode,
//! and how each mode is stored.

use serde::{Serialize, Deserialize};
use std::fmt;

/// Scalar component type of a tensor or literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datatype {
    Bool,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl Datatype {
    pub fn is_bool(&self) -> bool { matches!(self, Datatype::Bool) }

    pub fn is_uint(&self) -> bool {
        matches!(self, Datatype::UInt8 | Datatype::UInt16 | Datatype::UInt32 | Datatype::UInt64)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Datatype::Int8 | Datatype::Int16 | Datatype::Int32 | Datatype::Int64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Datatype::Float32 | Datatype::Float64)
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Datatype::Complex64 | Datatype::Complex128)
    }

    /// Width of one component in bits.
    pub fn num_bits(&self) -> usize {
        match self {
            Datatype::Bool | Datatype::UInt8 | Datatype::Int8 => 8,
            Datatype::UInt16 | Datatype::Int16 => 16,
            Datatype::UInt32 | Datatype::Int32 | Datatype::Float32 => 32,
            Datatype::UInt64 | Datatype::Int64 | Datatype::Float64 | Datatype::Complex64 => 64,
            Datatype::Complex128 => 128,
        }
    }

    /// Promotion rank: bool < unsigned < signed < float < complex.
    fn rank(&self) -> u8 {
        if self.is_bool() {
            0
        } else if self.is_uint() {
            1
        } else if self.is_int() {
            2
        } else if self.is_float() {
            3
        } else {
            4
        }
    }

    /// Result type of combining two operands.
    ///
    /// The wider category wins; within one category the wider width wins.
    pub fn max_type(a: Datatype, b: Datatype) -> Datatype {
        if a == b {
            return a;
        }
        match a.rank().cmp(&b.rank()) {
            std::cmp::Ordering::Greater => a,
            std::cmp::Ordering::Less => b,
            std::cmp::Ordering::Equal => {
                if a.num_bits() >= b.num_bits() { a } else { b }
            }
        }
    }
}

impl Default for Datatype {
    fn default() -> Self { Datatype::Float64 }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Datatype::Bool => "bool",
            Datatype::UInt8 => "uint8",
            Datatype::UInt16 => "uint16",
            Datatype::UInt32 => "uint32",
            Datatype::UInt64 => "uint64",
            Datatype::Int8 => "int8",
            Datatype::Int16 => "int16",
            Datatype::Int32 => "int32",
            Datatype::Int64 => "int64",
            Datatype::Float32 => "float32",
            Datatype::Float64 => "float64",
            Datatype::Complex64 => "complex64",
            Datatype::Complex128 => "complex128",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Datatype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(Datatype::Bool),
            "uint8" => Ok(Datatype::UInt8),
            "uint16" => Ok(Datatype::UInt16),
            "uint32" => Ok(Datatype::UInt32),
            "uint64" => Ok(Datatype::UInt64),
            "int8" => Ok(Datatype::Int8),
            "int16" => Ok(Datatype::Int16),
            "int32" => Ok(Datatype::Int32),
            "int64" => Ok(Datatype::Int64),
            "float32" => Ok(Datatype::Float32),
            "float64" => Ok(Datatype::Float64),
            "complex64" => Ok(Datatype::Complex64),
            "complex128" => Ok(Datatype::Complex128),
            _ => Err(format!("unknown datatype '{}'", s)),
        }
    }
}

/// Size of one tensor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Known at compile time
    Fixed(usize),
    /// Bound at run time
    Variable,
}

impl Dimension {
    pub fn is_fixed(&self) -> bool { matches!(self, Dimension::Fixed(_)) }

    pub fn size(&self) -> Option<usize> {
        match self {
            Dimension::Fixed(n) => Some(*n),
            Dimension::Variable => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Fixed(n) => write!(f, "{}", n),
            Dimension::Variable => write!(f, "?"),
        }
    }
}

/// Tensor type: component datatype plus one dimension per mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Type {
    pub datatype: Datatype,
    pub shape: Vec<Dimension>,
}

impl Type {
    pub fn new(datatype: Datatype, shape: Vec<Dimension>) -> Self {
        Self { datatype, shape }
    }

    /// A scalar (order-0) type.
    pub fn scalar(datatype: Datatype) -> Self {
        Self { datatype, shape: Vec::new() }
    }

    /// Type with fixed dimensions.
    pub fn fixed(datatype: Datatype, sizes: &[usize]) -> Self {
        Self { datatype, shape: sizes.iter().map(|&n| Dimension::Fixed(n)).collect() }
    }

    pub fn order(&self) -> usize { self.shape.len() }

    pub fn dimension(&self, mode: usize) -> Option<Dimension> {
        self.shape.get(mode).copied()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.datatype)?;
        if !self.shape.is_empty() {
            let dims: Vec<String> = self.shape.iter().map(|d| d.to_string()).collect();
            write!(f, "[{}]", dims.join(","))?;
        }
        Ok(())
    }
}

/// Storage of a single tensor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeFormat {
    Dense,
    Sparse,
}

/// Storage layout of a tensor, one mode format per dimension.
///
/// Opaque to the IR: carried through lowering untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Format {
    pub modes: Vec<ModeFormat>,
}

impl Format {
    pub fn new(modes: Vec<ModeFormat>) -> Self {
        Self { modes }
    }

    /// All-dense format of the given order.
    pub fn dense(order: usize) -> Self {
        Self { modes: vec![ModeFormat::Dense; order] }
    }

    /// Parse the compact `ds`-style notation: one letter per mode.
    pub fn from_letters(letters: &str) -> Option<Self> {
        letters
            .chars()
            .map(|c| match c {
                'd' => Some(ModeFormat::Dense),
                's' => Some(ModeFormat::Sparse),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Self::new)
    }

    pub fn order(&self) -> usize { self.modes.len() }

    pub fn is_dense(&self) -> bool {
        self.modes.iter().all(|m| *m == ModeFormat::Dense)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for mode in &self.modes {
            match mode {
                ModeFormat::Dense => write!(f, "d")?,
                ModeFormat::Sparse => write!(f, "s")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_type() {
        assert_eq!(Datatype::max_type(Datatype::Int32, Datatype::Float32), Datatype::Float32);
        assert_eq!(Datatype::max_type(Datatype::Int64, Datatype::Int8), Datatype::Int64);
        assert_eq!(Datatype::max_type(Datatype::UInt64, Datatype::Int8), Datatype::Int8);
        assert_eq!(Datatype::max_type(Datatype::Float64, Datatype::Complex64), Datatype::Complex64);
        assert_eq!(Datatype::max_type(Datatype::Bool, Datatype::Bool), Datatype::Bool);
    }

    #[test]
    fn test_type_display() {
        let ty = Type::new(Datatype::Float64, vec![Dimension::Fixed(3), Dimension::Variable]);
        assert_eq!(ty.to_string(), "float64[3,?]");
        assert_eq!(ty.order(), 2);
        assert_eq!(Type::scalar(Datatype::Int32).to_string(), "int32");
    }

    #[test]
    fn test_format_letters() {
        let format = Format::from_letters("ds").unwrap();
        assert_eq!(format.modes, vec![ModeFormat::Dense, ModeFormat::Sparse]);
        assert_eq!(format.to_string(), "ds");
        assert!(!format.is_dense());
        assert!(Format::from_letters("dx").is_none());
        assert!(Format::dense(3).is_dense());
    }

    #[test]
    fn test_datatype_names() {
        assert_eq!("int32".parse::<Datatype>(), Ok(Datatype::Int32));
        assert_eq!(Datatype::Complex128.to_string().parse::<Datatype>(), Ok(Datatype::Complex128));
        assert!("double".parse::<Datatype>().is_err());
    }
}
