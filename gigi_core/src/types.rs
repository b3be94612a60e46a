use std::fmt;

use serde_derive::{Deserialize, Serialize};

/// Semantic type of a render graph variable.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum DataFieldType {
    Int,
    Int2,
    Int3,
    Int4,
    Uint,
    Uint2,
    Uint3,
    Uint4,
    Float,
    Float2,
    Float3,
    Float4,
    Bool,
    Float4x4,
    #[serde(alias = "Uint_16")]
    Uint16,
}

/// Scalar type stored in each component of a [`DataFieldType`].
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ComponentType {
    Int,
    Uint16,
    Uint,
    Float,
    Bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataFieldTypeInfo {
    pub component_type: ComponentType,
    pub component_count: usize,
    pub type_bytes: usize,
}

impl DataFieldType {
    pub fn info(&self) -> DataFieldTypeInfo {
        let (component_type, component_count) = match self {
            Self::Int => (ComponentType::Int, 1),
            Self::Int2 => (ComponentType::Int, 2),
            Self::Int3 => (ComponentType::Int, 3),
            Self::Int4 => (ComponentType::Int, 4),
            Self::Uint => (ComponentType::Uint, 1),
            Self::Uint2 => (ComponentType::Uint, 2),
            Self::Uint3 => (ComponentType::Uint, 3),
            Self::Uint4 => (ComponentType::Uint, 4),
            Self::Float => (ComponentType::Float, 1),
            Self::Float2 => (ComponentType::Float, 2),
            Self::Float3 => (ComponentType::Float, 3),
            Self::Float4 => (ComponentType::Float, 4),
            Self::Bool => (ComponentType::Bool, 1),
            Self::Float4x4 => (ComponentType::Float, 16),
            Self::Uint16 => (ComponentType::Uint16, 1),
        };

        DataFieldTypeInfo {
            component_type,
            component_count,
            type_bytes: component_type.size_bytes() * component_count,
        }
    }

    pub fn component_type(&self) -> ComponentType {
        self.info().component_type
    }

    pub fn component_count(&self) -> usize {
        self.info().component_count
    }
}

impl fmt::Display for DataFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Which operator categories a component type accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperatorCapabilities {
    pub arithmetic: bool,
    pub bitwise: bool,
    pub rounding: bool,
}

impl ComponentType {
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::Int => std::mem::size_of::<i32>(),
            Self::Uint16 => std::mem::size_of::<u16>(),
            Self::Uint => std::mem::size_of::<u32>(),
            Self::Float => std::mem::size_of::<f32>(),
            Self::Bool => std::mem::size_of::<bool>(),
        }
    }

    pub fn capabilities(&self) -> OperatorCapabilities {
        match self {
            Self::Int | Self::Uint16 | Self::Uint => OperatorCapabilities {
                arithmetic: true,
                bitwise: true,
                rounding: true,
            },
            Self::Float => OperatorCapabilities {
                arithmetic: true,
                bitwise: false,
                rounding: true,
            },
            Self::Bool => OperatorCapabilities {
                arithmetic: false,
                bitwise: true,
                rounding: false,
            },
        }
    }

    /// Whether `op` is a legal operator for values of this type.
    pub fn supports(&self, op: SetVariableOperator) -> bool {
        let capabilities = self.capabilities();
        match op.category() {
            OperatorCategory::Arithmetic => capabilities.arithmetic,
            OperatorCategory::Bitwise => capabilities.bitwise,
            OperatorCategory::Rounding => capabilities.rounding,
            OperatorCategory::Passthrough => true,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Uint16 => "uint16",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorCategory {
    Arithmetic,
    Bitwise,
    Rounding,
    Passthrough,
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum SetVariableOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    PowerOf2GE,
    BitwiseOr,
    BitwiseAnd,
    BitwiseXor,
    BitwiseNot,
    Noop,
}

impl SetVariableOperator {
    pub fn category(&self) -> OperatorCategory {
        match self {
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo => {
                OperatorCategory::Arithmetic
            }
            Self::BitwiseOr | Self::BitwiseAnd | Self::BitwiseXor | Self::BitwiseNot => {
                OperatorCategory::Bitwise
            }
            Self::PowerOf2GE => OperatorCategory::Rounding,
            Self::Noop => OperatorCategory::Passthrough,
        }
    }

    /// Operators that only read operand A.
    pub fn is_unary(&self) -> bool {
        matches!(self, Self::BitwiseNot | Self::PowerOf2GE | Self::Noop)
    }
}

impl Default for SetVariableOperator {
    fn default() -> Self {
        Self::Noop
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConditionComparison {
    IsTrue,
    IsFalse,
    Equals,
    NotEquals,
    #[serde(alias = "LT")]
    Lt,
    #[serde(alias = "LTE")]
    Lte,
    #[serde(alias = "GT")]
    Gt,
    #[serde(alias = "GTE")]
    Gte,
}
