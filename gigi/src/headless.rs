use std::collections::HashMap;

use gigi_graph::*;
use gigi_interpreter::{
    BufferRuntime, NodeAction, NodeActionHandler, NodeContext, TextureRuntime,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchRuntime {
    pub dispatch_size: [u32; 3],
    pub executions: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionRuntime {
    pub executions: u64,
}

/// Node handlers without a GPU: resolves sizes, counts and dispatch sizes,
/// honours node conditions and records what would have run.
#[derive(Debug, Default)]
pub struct HeadlessRuntime {
    imported_textures: HashMap<String, [u32; 3]>,
    imported_buffers: HashMap<String, u32>,
    trace: Vec<String>,
}

impl HeadlessRuntime {
    pub fn set_imported_texture(mut self, name: &str, size: [u32; 3]) -> Self {
        self.imported_textures.insert(name.to_string(), size);
        self
    }

    pub fn set_imported_buffer(mut self, name: &str, count: u32) -> Self {
        self.imported_buffers.insert(name.to_string(), count);
        self
    }

    /// One line per executed action, in execution order.
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    fn should_run(&self, name: &str, condition: &Condition, context: &NodeContext<Self>) -> Option<bool> {
        match context.evaluate_condition(condition) {
            Ok(enabled) => {
                if !enabled {
                    log::trace!("Skipping {}, condition is false", name);
                }
                Some(enabled)
            }
            Err(error) => {
                log::error!("Condition of node {} failed: {}", name, error);
                None
            }
        }
    }

    fn dispatch(
        &mut self,
        name: &str,
        dispatch_size: &ResourceSize,
        condition: &Condition,
        data: &mut DispatchRuntime,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        data.dispatch_size = context.resolve_size(dispatch_size);
        if action == NodeAction::Init {
            return true;
        }

        match self.should_run(name, condition, context) {
            Some(true) => {
                data.executions += 1;
                let [x, y, z] = data.dispatch_size;
                self.trace.push(format!("{} dispatch {}x{}x{}", name, x, y, z));
                true
            }
            Some(false) => true,
            None => false,
        }
    }

    fn run_action(
        &mut self,
        name: &str,
        condition: &Condition,
        data: &mut ActionRuntime,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        if action == NodeAction::Init {
            return true;
        }

        match self.should_run(name, condition, context) {
            Some(true) => {
                data.executions += 1;
                self.trace.push(name.to_string());
                true
            }
            Some(false) => true,
            None => false,
        }
    }
}

impl NodeActionHandler for HeadlessRuntime {
    type Texture = TextureRuntime;
    type Buffer = BufferRuntime;
    type ComputeShader = DispatchRuntime;
    type RayShader = DispatchRuntime;
    type DrawCall = ActionRuntime;
    type CopyResource = ActionRuntime;
    type SubGraph = ();
    type Barrier = ();

    fn on_pre_compile(&mut self) {
        self.trace.clear();
    }

    fn on_texture(
        &mut self,
        node: &TextureNode,
        data: &mut TextureRuntime,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        let size = if node.visibility == ResourceVisibility::Imported {
            match self.imported_textures.get(&node.name) {
                Some(size) => *size,
                None => {
                    log::error!("Imported texture {} was not given a size", node.name);
                    return false;
                }
            }
        } else {
            context.resolve_size(&node.size)
        };

        data.dirty = action == NodeAction::Init || data.size != size;
        if data.dirty {
            log::debug!("Texture {} is {:?} ({:?})", node.name, size, node.dimension);
        }
        data.size = size;
        true
    }

    fn on_buffer(
        &mut self,
        node: &BufferNode,
        data: &mut BufferRuntime,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        let count = if node.visibility == ResourceVisibility::Imported {
            match self.imported_buffers.get(&node.name) {
                Some(count) => *count,
                None => {
                    log::error!("Imported buffer {} was not given a count", node.name);
                    return false;
                }
            }
        } else {
            context.resolve_size(&node.count)[0]
        };

        data.dirty = action == NodeAction::Init || data.count != count;
        data.count = count;
        true
    }

    fn on_compute_shader(
        &mut self,
        node: &ComputeShaderNode,
        data: &mut DispatchRuntime,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        self.dispatch(
            &node.name,
            &node.dispatch_size,
            &node.condition,
            data,
            action,
            context,
        )
    }

    fn on_ray_shader(
        &mut self,
        node: &RayShaderNode,
        data: &mut DispatchRuntime,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        self.dispatch(
            &node.name,
            &node.dispatch_size,
            &node.condition,
            data,
            action,
            context,
        )
    }

    fn on_draw_call(
        &mut self,
        node: &DrawCallNode,
        data: &mut ActionRuntime,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        self.run_action(&node.name, &node.condition, data, action, context)
    }

    fn on_copy_resource(
        &mut self,
        node: &CopyResourceNode,
        data: &mut ActionRuntime,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        self.run_action(&node.name, &node.condition, data, action, context)
    }

    fn on_sub_graph(
        &mut self,
        node: &SubGraphNode,
        _data: &mut (),
        action: NodeAction,
        _context: &NodeContext<Self>,
    ) -> bool {
        // XXX: sub graphs are expected to be inlined before they reach the interpreter
        if action == NodeAction::Init {
            log::warn!("Sub graph {} ({}) is not inlined, ignoring it", node.name, node.file_name);
        }
        true
    }
}
