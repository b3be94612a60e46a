use std::collections::{hash_map, HashMap};

use gigi_graph::RenderGraphNode;

use crate::handler::NodeActionHandler;

/// Runtime data of one node kind, keyed by node name.
#[derive(Debug)]
pub struct RuntimeDataMap<T> {
    map: HashMap<String, T>,
}

impl<T> Default for RuntimeDataMap<T> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl<T: Default> RuntimeDataMap<T> {
    /// Returns the data for `name`, creating it if needed. The flag tells
    /// whether it existed before.
    pub fn get_or_create(&mut self, name: &str) -> (&mut T, bool) {
        match self.map.entry(name.to_string()) {
            hash_map::Entry::Occupied(entry) => (entry.into_mut(), true),
            hash_map::Entry::Vacant(entry) => {
                log::trace!("Creating runtime data for node {}", name);
                (entry.insert(T::default()), false)
            }
        }
    }

    pub(crate) fn take_or_default(&mut self, name: &str) -> T {
        self.map.remove(name).unwrap_or_default()
    }
}

impl<T> RuntimeDataMap<T> {
    pub fn get(&self, name: &str) -> Option<&T> {
        self.map.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.map.get_mut(name)
    }

    pub fn insert(&mut self, name: &str, data: T) {
        self.map.insert(name.to_string(), data);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.map.iter().map(|(name, data)| (name.as_str(), data))
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

/// Per node kind runtime data owned by an interpreter.
pub struct RuntimeDataRegistry<H: NodeActionHandler> {
    pub textures: RuntimeDataMap<H::Texture>,
    pub buffers: RuntimeDataMap<H::Buffer>,
    pub compute_shaders: RuntimeDataMap<H::ComputeShader>,
    pub ray_shaders: RuntimeDataMap<H::RayShader>,
    pub draw_calls: RuntimeDataMap<H::DrawCall>,
    pub copy_resources: RuntimeDataMap<H::CopyResource>,
    pub sub_graphs: RuntimeDataMap<H::SubGraph>,
    pub barriers: RuntimeDataMap<H::Barrier>,
}

impl<H: NodeActionHandler> Default for RuntimeDataRegistry<H> {
    fn default() -> Self {
        Self {
            textures: RuntimeDataMap::default(),
            buffers: RuntimeDataMap::default(),
            compute_shaders: RuntimeDataMap::default(),
            ray_shaders: RuntimeDataMap::default(),
            draw_calls: RuntimeDataMap::default(),
            copy_resources: RuntimeDataMap::default(),
            sub_graphs: RuntimeDataMap::default(),
            barriers: RuntimeDataMap::default(),
        }
    }
}

/// Borrowed runtime data of a single node, tagged by kind.
pub enum RuntimeNodeData<'a, H: NodeActionHandler> {
    Texture(&'a H::Texture),
    Buffer(&'a H::Buffer),
    ComputeShader(&'a H::ComputeShader),
    RayShader(&'a H::RayShader),
    DrawCall(&'a H::DrawCall),
    CopyResource(&'a H::CopyResource),
    SubGraph(&'a H::SubGraph),
    Barrier(&'a H::Barrier),
}

impl<H: NodeActionHandler> RuntimeDataRegistry<H> {
    pub fn node_data(&self, node: &RenderGraphNode) -> Option<RuntimeNodeData<'_, H>> {
        let name = node.name();
        match node {
            RenderGraphNode::ResourceTexture(_) => self.textures.get(name).map(RuntimeNodeData::Texture),
            RenderGraphNode::ResourceBuffer(_) => self.buffers.get(name).map(RuntimeNodeData::Buffer),
            RenderGraphNode::ActionComputeShader(_) => self
                .compute_shaders
                .get(name)
                .map(RuntimeNodeData::ComputeShader),
            RenderGraphNode::ActionRayShader(_) => {
                self.ray_shaders.get(name).map(RuntimeNodeData::RayShader)
            }
            RenderGraphNode::ActionDrawCall(_) => {
                self.draw_calls.get(name).map(RuntimeNodeData::DrawCall)
            }
            RenderGraphNode::ActionCopyResource(_) => self
                .copy_resources
                .get(name)
                .map(RuntimeNodeData::CopyResource),
            RenderGraphNode::ActionSubGraph(_) => {
                self.sub_graphs.get(name).map(RuntimeNodeData::SubGraph)
            }
            RenderGraphNode::ActionBarrier(_) => self.barriers.get(name).map(RuntimeNodeData::Barrier),
        }
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.buffers.clear();
        self.compute_shaders.clear();
        self.ray_shaders.clear();
        self.draw_calls.clear();
        self.copy_resources.clear();
        self.sub_graphs.clear();
        self.barriers.clear();
    }

    pub fn len(&self) -> usize {
        self.textures.len()
            + self.buffers.len()
            + self.compute_shaders.len()
            + self.ray_shaders.len()
            + self.draw_calls.len()
            + self.copy_resources.len()
            + self.sub_graphs.len()
            + self.barriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
