use std::fmt;

use thiserror::Error;

use gigi_core::{ComponentType, SetVariableOperator};
use gigi_graph::NodeKind;

use crate::handler::NodeAction;

/// Text that could not be read as a variable value.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("cannot parse \"{text}\" as {count} {component_type} component(s): {reason}")]
pub struct ParseError {
    pub text: String,
    pub component_type: ComponentType,
    pub count: usize,
    pub reason: String,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum EvaluationError {
    #[error(transparent)]
    InvalidLiteral(#[from] ParseError),
    #[error("\"{label}\" is neither a label of enum {enum_name} nor an integer")]
    UnknownEnumLabel { enum_name: String, label: String },
    #[error("operator {op:?} is not valid for {component_type} values")]
    UnsupportedOperator {
        op: SetVariableOperator,
        component_type: ComponentType,
    },
    #[error("component {index} is out of range for a value with {count} component(s)")]
    ComponentOutOfRange { index: usize, count: usize },
    #[error("expected {expected} components, found {found}")]
    TypeMismatch {
        expected: ComponentType,
        found: ComponentType,
    },
    #[error("variable {index} has no storage")]
    MissingVariable { index: usize },
}

/// Part of a set-variable statement an evaluation error came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Destination,
    A,
    B,
    Condition,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Destination => "destination",
            Self::A => "A",
            Self::B => "B",
            Self::Condition => "condition",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("{action:?} failed in node \"{node}\" ({kind})")]
    NodeExecution {
        node: String,
        kind: NodeKind,
        action: NodeAction,
    },
    #[error("setVars[{statement}] ({destination}), operand {operand}: {source}")]
    Evaluation {
        statement: usize,
        destination: String,
        operand: Operand,
        #[source]
        source: EvaluationError,
    },
    #[error("invalid default for variable \"{variable}\": {source}")]
    VariableDefault {
        variable: String,
        #[source]
        source: ParseError,
    },
    #[error("variable index {index} is out of range ({count} variables)")]
    VariableIndexOutOfRange { index: usize, count: usize },
    #[error(transparent)]
    Parse(#[from] ParseError),
}
