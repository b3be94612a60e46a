use std::{
    fmt,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{builder::Builder, graph, parser, types::*};

pub const FLATTENED_FILE_NAME: &str = "flattened.json";

/// Status of the last compile, as reported to hosts.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum GigiCompileResult {
    Ok,
    NotCompiledYet,
    Compiling,
    CantLoadRenderGraph,
    Validation,
    ReferenceFixup,
    FlattenFailed,
    ScratchDirectory,
    InterpreterError,
}

impl fmt::Display for GigiCompileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("could not read render graph {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse render graph: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid render graph: {0}")]
    Validation(String),
    #[error("{context} references unknown {kind} \"{name}\"")]
    UnknownReference {
        context: String,
        kind: &'static str,
        name: String,
    },
    #[error("{context} expects a {expected} node but \"{name}\" is a {found}")]
    WrongNodeKind {
        context: String,
        name: String,
        expected: NodeKind,
        found: NodeKind,
    },
    #[error("render graph has a dependency cycle through node \"{node}\"")]
    Cycle { node: String },
    #[error("scratch directory {path:?}: {source}")]
    ScratchDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn result(&self) -> GigiCompileResult {
        match self {
            Self::Read { .. } | Self::Parse(_) => GigiCompileResult::CantLoadRenderGraph,
            Self::Validation(_) => GigiCompileResult::Validation,
            Self::UnknownReference { .. } | Self::WrongNodeKind { .. } => {
                GigiCompileResult::ReferenceFixup
            }
            Self::Cycle { .. } => GigiCompileResult::FlattenFailed,
            Self::ScratchDirectory { .. } => GigiCompileResult::ScratchDirectory,
        }
    }
}

/// Hook run on the freshly parsed graph, before validation.
pub type PostLoadFn<'a> = &'a dyn Fn(&mut RenderGraph);

pub fn compile_file(
    file_name: &Path,
    scratch_directory: Option<&Path>,
    post_load: Option<PostLoadFn>,
) -> Result<RenderGraph, CompileError> {
    log::debug!("Compiling render graph {:?}", file_name);
    let render_graph = parser::parse_from_file(file_name)?;
    compile_graph(render_graph, scratch_directory, post_load)
}

pub fn compile_str(
    source: &str,
    scratch_directory: Option<&Path>,
    post_load: Option<PostLoadFn>,
) -> Result<RenderGraph, CompileError> {
    let render_graph = parser::parse_from_string(source)?;
    compile_graph(render_graph, scratch_directory, post_load)
}

/// Validates, resolves and flattens an already loaded graph.
pub fn compile_graph(
    mut render_graph: RenderGraph,
    scratch_directory: Option<&Path>,
    post_load: Option<PostLoadFn>,
) -> Result<RenderGraph, CompileError> {
    if let Some(post_load) = post_load {
        post_load(&mut render_graph);
    }

    let builder = Builder::new(&render_graph)?;
    builder.build(&mut render_graph)?;

    render_graph.flattened_node_list = graph::flatten(&render_graph)?;

    if let Some(scratch_directory) = scratch_directory {
        write_flattened(&render_graph, scratch_directory)?;
    }

    log::info!(
        "Compiled render graph \"{}\" ({} nodes, {} variables)",
        render_graph.name,
        render_graph.nodes.len(),
        render_graph.variables.len()
    );

    Ok(render_graph)
}

fn write_flattened(render_graph: &RenderGraph, scratch_directory: &Path) -> Result<(), CompileError> {
    let path = scratch_directory.join(FLATTENED_FILE_NAME);
    let contents = parser::write_to_string(render_graph)?;
    std::fs::write(&path, contents)
        .map_err(|source| CompileError::ScratchDirectory { path, source })
}
