pub mod builder;
pub mod compiler;
pub mod graph;
pub mod parser;
pub mod types;

pub use compiler::{
    compile_file, compile_graph, compile_str, CompileError, GigiCompileResult, PostLoadFn,
};
pub use types::*;
