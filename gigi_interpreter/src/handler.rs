use gigi_graph::*;

use crate::{
    component::Component,
    condition,
    error::EvaluationError,
    runtime_data::{RuntimeDataRegistry, RuntimeNodeData},
    storage::RuntimeVariables,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeAction {
    Init,
    Execute,
}

/// Runtime data of texture nodes must expose the resolved size.
pub trait TextureRuntimeData: Default {
    fn size(&self) -> [u32; 3];
}

/// Runtime data of buffer nodes must expose the resolved element count.
pub trait BufferRuntimeData: Default {
    fn count(&self) -> u32;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureRuntime {
    pub size: [u32; 3],
    pub dirty: bool,
}

impl TextureRuntimeData for TextureRuntime {
    fn size(&self) -> [u32; 3] {
        self.size
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferRuntime {
    pub count: u32,
    pub dirty: bool,
}

impl BufferRuntimeData for BufferRuntime {
    fn count(&self) -> u32 {
        self.count
    }
}

/// Host callbacks, one per node kind. Returning `false` aborts the current
/// compile or frame.
///
/// Every method has a default that succeeds, so hosts only override the
/// kinds they care about.
#[allow(unused_variables)]
pub trait NodeActionHandler: Sized {
    type Texture: TextureRuntimeData;
    type Buffer: BufferRuntimeData;
    type ComputeShader: Default;
    type RayShader: Default;
    type DrawCall: Default;
    type CopyResource: Default;
    type SubGraph: Default;
    type Barrier: Default;

    /// Called before anything of the previous graph is released.
    fn on_pre_compile(&mut self) {}

    /// Called once the graph compiled and variables have storage, before Init runs.
    fn on_compile_ok(&mut self, render_graph: &RenderGraph) {}

    fn on_texture(
        &mut self,
        node: &TextureNode,
        data: &mut Self::Texture,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        true
    }

    fn on_buffer(
        &mut self,
        node: &BufferNode,
        data: &mut Self::Buffer,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        true
    }

    fn on_compute_shader(
        &mut self,
        node: &ComputeShaderNode,
        data: &mut Self::ComputeShader,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        true
    }

    fn on_ray_shader(
        &mut self,
        node: &RayShaderNode,
        data: &mut Self::RayShader,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        true
    }

    fn on_draw_call(
        &mut self,
        node: &DrawCallNode,
        data: &mut Self::DrawCall,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        true
    }

    fn on_copy_resource(
        &mut self,
        node: &CopyResourceNode,
        data: &mut Self::CopyResource,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        true
    }

    fn on_sub_graph(
        &mut self,
        node: &SubGraphNode,
        data: &mut Self::SubGraph,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        true
    }

    fn on_barrier(
        &mut self,
        node: &BarrierNode,
        data: &mut Self::Barrier,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        true
    }
}

/// Handler that accepts every node and keeps only sizes and counts.
#[derive(Debug, Default)]
pub struct DefaultNodeHandler;

impl NodeActionHandler for DefaultNodeHandler {
    type Texture = TextureRuntime;
    type Buffer = BufferRuntime;
    type ComputeShader = ();
    type RayShader = ();
    type DrawCall = ();
    type CopyResource = ();
    type SubGraph = ();
    type Barrier = ();
}

/// What a node callback can see of the interpreter. The calling node's own
/// runtime data is handed over separately and is not visible here.
pub struct NodeContext<'a, H: NodeActionHandler> {
    pub(crate) render_graph: &'a RenderGraph,
    pub(crate) variables: &'a RuntimeVariables,
    pub(crate) runtime_data: &'a RuntimeDataRegistry<H>,
}

impl<'a, H: NodeActionHandler> NodeContext<'a, H> {
    pub fn render_graph(&self) -> &'a RenderGraph {
        self.render_graph
    }

    pub fn variable_values<T: Component>(&self, name: &str) -> Option<&'a [T]> {
        let index = self.render_graph.variable_index(name)?;
        self.variables.values(index)
    }

    pub fn variable_value_as_string(&self, name: &str) -> Option<String> {
        let index = self.render_graph.variable_index(name)?;
        self.variables.value_as_string(index)
    }

    pub fn evaluate_condition(&self, condition: &Condition) -> Result<bool, EvaluationError> {
        condition::evaluate_condition(self.render_graph, self.variables, condition)
    }

    pub fn texture(&self, name: &str) -> Option<&'a H::Texture> {
        self.runtime_data.textures.get(name)
    }

    pub fn buffer(&self, name: &str) -> Option<&'a H::Buffer> {
        self.runtime_data.buffers.get(name)
    }

    pub fn runtime_node_data(&self, node: &RenderGraphNode) -> Option<RuntimeNodeData<'a, H>> {
        self.runtime_data.node_data(node)
    }

    /// Evaluates a size descriptor against current runtime sizes and variable values.
    pub fn resolve_size(&self, size: &ResourceSize) -> [u32; 3] {
        size.apply(self.size_base(size))
    }

    fn size_base(&self, size: &ResourceSize) -> [u32; 3] {
        if let Some(node) = size.node.node_index {
            let name = size.node.name.as_str();
            return match &self.render_graph.nodes[node] {
                RenderGraphNode::ResourceTexture(_) => self
                    .texture(name)
                    .map(TextureRuntimeData::size)
                    .unwrap_or_default(),
                RenderGraphNode::ResourceBuffer(_) => self
                    .buffer(name)
                    .map(|buffer| [buffer.count(), 1, 1])
                    .unwrap_or_default(),
                _ => [0; 3],
            };
        }

        if let Some(variable) = size.variable.variable_index {
            // Missing components of narrower variables count as 1
            let mut base = [1; 3];
            if let Some(storage) = self.variables.storage(variable) {
                for (base, value) in base.iter_mut().zip(storage.current().to_u32s()) {
                    *base = value;
                }
            }
            return base;
        }

        [0; 3]
    }
}
