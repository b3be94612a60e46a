use std::path::Path;

use log::Level;

use gigi_graph::{
    CompileError, Condition, GigiCompileResult, PostLoadFn, RenderGraph, RenderGraphNode, Variable,
};

use crate::{
    condition::{evaluate_condition, variable_enum},
    error::{EvaluationError, InterpreterError},
    handler::{NodeAction, NodeActionHandler, NodeContext},
    runtime_data::{RuntimeDataRegistry, RuntimeNodeData},
    scratch::ScratchDirectory,
    set_variable::execute_set_vars,
    storage::RuntimeVariables,
};

pub type LogFn = Box<dyn FnMut(Level, &str)>;

// Takes the node's runtime data out of its map for the duration of the callback
// so the context can borrow everything else.
macro_rules! dispatch_node {
    ($self:ident, $node:ident, $action:ident, $map:ident, $callback:ident) => {{
        let mut data = $self.runtime_data.$map.take_or_default(&$node.name);
        let context = NodeContext {
            render_graph: &$self.render_graph,
            variables: &$self.variables,
            runtime_data: &$self.runtime_data,
        };
        let succeeded = $self.handler.$callback($node, &mut data, $action, &context);
        $self.runtime_data.$map.insert(&$node.name, data);
        succeeded
    }};
}

/// Runs a compiled render graph by calling back into a host for every node.
pub struct Interpreter<H: NodeActionHandler> {
    handler: H,
    render_graph: RenderGraph,
    compile_result: GigiCompileResult,
    variables: RuntimeVariables,
    runtime_data: RuntimeDataRegistry<H>,
    scratch_directory: ScratchDirectory,
    log_fn: Option<LogFn>,
    reported_not_compiled: bool,
}

impl<H: NodeActionHandler + Default> Default for Interpreter<H> {
    fn default() -> Self {
        Self::new(H::default())
    }
}

impl<H: NodeActionHandler> Interpreter<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            render_graph: RenderGraph::default(),
            compile_result: GigiCompileResult::NotCompiledYet,
            variables: RuntimeVariables::default(),
            runtime_data: RuntimeDataRegistry::default(),
            scratch_directory: ScratchDirectory::new(),
            log_fn: None,
            reported_not_compiled: false,
        }
    }

    /// Sends diagnostics to `log_fn` as well as to the `log` facade.
    pub fn set_log_fn(&mut self, log_fn: impl FnMut(Level, &str) + 'static) {
        self.log_fn = Some(Box::new(log_fn));
    }

    fn log(&mut self, level: Level, message: &str) {
        log::log!(level, "{}", message);
        if let Some(log_fn) = self.log_fn.as_mut() {
            log_fn(level, message);
        }
    }

    pub fn compile(
        &mut self,
        file_name: impl AsRef<Path>,
        post_load: Option<PostLoadFn>,
    ) -> GigiCompileResult {
        let file_name = file_name.as_ref();
        self.compile_with(|scratch_directory| {
            gigi_graph::compile_file(file_name, Some(scratch_directory), post_load)
        })
    }

    pub fn compile_from_str(&mut self, source: &str, post_load: Option<PostLoadFn>) -> GigiCompileResult {
        self.compile_with(|scratch_directory| {
            gigi_graph::compile_str(source, Some(scratch_directory), post_load)
        })
    }

    fn compile_with(
        &mut self,
        load: impl FnOnce(&Path) -> Result<RenderGraph, CompileError>,
    ) -> GigiCompileResult {
        self.handler.on_pre_compile();

        self.compile_result = GigiCompileResult::Compiling;
        self.reported_not_compiled = false;
        self.render_graph = RenderGraph::default();
        self.variables.unbind();
        self.runtime_data.clear();

        if let Err(error) = self.scratch_directory.recreate() {
            let message = format!(
                "Could not create scratch directory {:?}: {}",
                self.scratch_directory.path(),
                error
            );
            self.log(Level::Error, &message);
            return self.finish_compile(GigiCompileResult::ScratchDirectory);
        }

        self.render_graph = match load(self.scratch_directory.path()) {
            Ok(render_graph) => render_graph,
            Err(error) => {
                self.log(Level::Error, &format!("Render graph compile failed: {}", error));
                return self.finish_compile(error.result());
            }
        };

        if let Err(error) = self.variables.create(&self.render_graph) {
            self.log(Level::Error, &error.to_string());
            return self.finish_compile(GigiCompileResult::InterpreterError);
        }

        self.handler.on_compile_ok(&self.render_graph);
        self.runtime_data.clear();

        for position in 0..self.render_graph.flattened_node_list.len() {
            let node_index = self.render_graph.flattened_node_list[position];
            if let Err(error) = self.run_node(node_index, NodeAction::Init) {
                self.log(Level::Error, &error.to_string());
                return self.finish_compile(GigiCompileResult::InterpreterError);
            }
        }

        self.finish_compile(GigiCompileResult::Ok)
    }

    fn finish_compile(&mut self, result: GigiCompileResult) -> GigiCompileResult {
        self.compile_result = result;
        if result == GigiCompileResult::Ok {
            let message = format!(
                "Render graph \"{}\" ready: {} nodes, {} variables",
                self.render_graph.name,
                self.render_graph.nodes.len(),
                self.variables.len()
            );
            self.log(Level::Info, &message);
        }
        result
    }

    /// Runs one frame: pre-execution set-vars, every node in dependency
    /// order, then post-execution set-vars. Does nothing unless the last
    /// compile succeeded.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        if self.compile_result != GigiCompileResult::Ok {
            if !self.reported_not_compiled {
                self.reported_not_compiled = true;
                let message = format!(
                    "Skipping execute, render graph is not compiled ({})",
                    self.compile_result
                );
                self.log(Level::Warn, &message);
            }
            return Ok(());
        }

        self.run_set_vars(true)?;

        for position in 0..self.render_graph.flattened_node_list.len() {
            let node_index = self.render_graph.flattened_node_list[position];
            if let Err(error) = self.run_node(node_index, NodeAction::Execute) {
                self.log(Level::Error, &error.to_string());
                return Err(error);
            }
        }

        self.run_set_vars(false)
    }

    fn run_set_vars(&mut self, before_execution: bool) -> Result<(), InterpreterError> {
        let result = execute_set_vars(
            &self.render_graph,
            &mut self.variables,
            &self.runtime_data,
            before_execution,
        );
        if let Err(error) = &result {
            self.log(Level::Error, &error.to_string());
        }
        result
    }

    fn run_node(&mut self, node_index: usize, action: NodeAction) -> Result<(), InterpreterError> {
        let node = &self.render_graph.nodes[node_index];
        log::trace!("{:?} node {} ({})", action, node.name(), node.kind());

        let succeeded = match node {
            RenderGraphNode::ResourceTexture(node) => {
                dispatch_node!(self, node, action, textures, on_texture)
            }
            RenderGraphNode::ResourceBuffer(node) => {
                dispatch_node!(self, node, action, buffers, on_buffer)
            }
            RenderGraphNode::ActionComputeShader(node) => {
                dispatch_node!(self, node, action, compute_shaders, on_compute_shader)
            }
            RenderGraphNode::ActionRayShader(node) => {
                dispatch_node!(self, node, action, ray_shaders, on_ray_shader)
            }
            RenderGraphNode::ActionDrawCall(node) => {
                dispatch_node!(self, node, action, draw_calls, on_draw_call)
            }
            RenderGraphNode::ActionCopyResource(node) => {
                dispatch_node!(self, node, action, copy_resources, on_copy_resource)
            }
            RenderGraphNode::ActionSubGraph(node) => {
                dispatch_node!(self, node, action, sub_graphs, on_sub_graph)
            }
            RenderGraphNode::ActionBarrier(node) => {
                dispatch_node!(self, node, action, barriers, on_barrier)
            }
        };

        if succeeded {
            Ok(())
        } else {
            let node = &self.render_graph.nodes[node_index];
            Err(InterpreterError::NodeExecution {
                node: node.name().to_string(),
                kind: node.kind(),
                action,
            })
        }
    }

    /// Drops the graph and every piece of runtime state, including variable values.
    pub fn clear(&mut self) {
        self.render_graph = RenderGraph::default();
        self.compile_result = GigiCompileResult::NotCompiledYet;
        self.reported_not_compiled = false;
        self.variables.clear();
        self.runtime_data.clear();
    }

    pub fn render_graph(&self) -> &RenderGraph {
        &self.render_graph
    }

    pub fn compile_result(&self) -> GigiCompileResult {
        self.compile_result
    }

    pub fn scratch_directory(&self) -> &Path {
        self.scratch_directory.path()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn runtime_data(&self) -> &RuntimeDataRegistry<H> {
        &self.runtime_data
    }

    pub fn runtime_data_mut(&mut self) -> &mut RuntimeDataRegistry<H> {
        &mut self.runtime_data
    }

    /// Runtime data of `node`, `None` until its first callback.
    pub fn runtime_node_data(&self, node: &RenderGraphNode) -> Option<RuntimeNodeData<'_, H>> {
        self.runtime_data.node_data(node)
    }

    pub fn texture_runtime_data(&self, name: &str) -> Option<&H::Texture> {
        self.runtime_data.textures.get(name)
    }

    pub fn buffer_runtime_data(&self, name: &str) -> Option<&H::Buffer> {
        self.runtime_data.buffers.get(name)
    }

    pub fn compute_shader_runtime_data(&self, name: &str) -> Option<&H::ComputeShader> {
        self.runtime_data.compute_shaders.get(name)
    }

    pub fn ray_shader_runtime_data(&self, name: &str) -> Option<&H::RayShader> {
        self.runtime_data.ray_shaders.get(name)
    }

    pub fn draw_call_runtime_data(&self, name: &str) -> Option<&H::DrawCall> {
        self.runtime_data.draw_calls.get(name)
    }

    pub fn copy_resource_runtime_data(&self, name: &str) -> Option<&H::CopyResource> {
        self.runtime_data.copy_resources.get(name)
    }

    pub fn sub_graph_runtime_data(&self, name: &str) -> Option<&H::SubGraph> {
        self.runtime_data.sub_graphs.get(name)
    }

    pub fn barrier_runtime_data(&self, name: &str) -> Option<&H::Barrier> {
        self.runtime_data.barriers.get(name)
    }

    pub fn evaluate_condition(&self, condition: &Condition) -> Result<bool, EvaluationError> {
        evaluate_condition(&self.render_graph, &self.variables, condition)
    }

    pub fn runtime_variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn runtime_variable_index(&self, name: &str) -> Option<usize> {
        self.render_graph
            .variable_index(name)
            .filter(|index| *index < self.variables.len())
    }

    pub fn runtime_variable(&self, index: usize) -> Option<&Variable> {
        self.variables
            .get(index)
            .and_then(|variable| self.render_graph.variables.get(variable.variable_index))
    }

    pub fn runtime_variable_value_as_string(&self, index: usize) -> Option<String> {
        self.variables.value_as_string(index)
    }

    /// Parses `text` into the variable's current value. Enum variables take
    /// a label first and fall back to an integer.
    pub fn set_runtime_variable_from_string(
        &mut self,
        index: usize,
        text: &str,
    ) -> Result<(), InterpreterError> {
        let label_value = variable_enum(&self.render_graph, index)
            .and_then(|e| e.label_to_value(text.trim()))
            .map(|value| value.to_string());

        let count = self.variables.len();
        let storage = self
            .variables
            .storage_mut(index)
            .ok_or(InterpreterError::VariableIndexOutOfRange { index, count })?;

        storage.set_value_from_string(label_value.as_deref().unwrap_or(text))?;
        Ok(())
    }

    pub fn set_runtime_variable_to_dflt(&mut self, index: usize) -> Result<(), InterpreterError> {
        let count = self.variables.len();
        self.variables
            .storage_mut(index)
            .ok_or(InterpreterError::VariableIndexOutOfRange { index, count })?
            .reset_to_default();
        Ok(())
    }
}
