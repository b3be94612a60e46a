pub mod component;
pub mod condition;
pub mod error;
pub mod handler;
pub mod interpreter;
pub mod runtime_data;
pub mod scratch;
pub mod set_variable;
pub mod storage;

pub use error::*;
pub use handler::*;
pub use interpreter::*;
pub use runtime_data::{RuntimeDataMap, RuntimeDataRegistry, RuntimeNodeData};
pub use storage::{RuntimeVariable, Storage};

pub use gigi_graph::GigiCompileResult;
