use std::fmt;

use serde_derive::{Deserialize, Serialize};

use gigi_core::*;

// Indices are stored as -1 when unset in graph files, and as `Option` in memory.
mod optional_index {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<usize>, D::Error> {
        let value = Option::<i64>::deserialize(deserializer)?;
        Ok(value.and_then(|index| usize::try_from(index).ok()))
    }

    pub fn serialize<S: Serializer>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(index) => serializer.serialize_i64(*index as i64),
            None => serializer.serialize_i64(-1),
        }
    }
}

/// Reference to a variable by name. The index is filled in by the builder.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VariableReference {
    pub name: String,
    pub variable_index: Option<usize>,
}

impl VariableReference {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            variable_index: None,
        }
    }

    pub fn is_set(&self) -> bool {
        !self.name.is_empty()
    }
}

impl From<String> for VariableReference {
    fn from(name: String) -> Self {
        Self {
            name,
            variable_index: None,
        }
    }
}

impl From<VariableReference> for String {
    fn from(reference: VariableReference) -> Self {
        reference.name
    }
}

/// Reference to a node by name. The index is filled in by the builder.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NodeReference {
    pub name: String,
    pub node_index: Option<usize>,
}

impl NodeReference {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            node_index: None,
        }
    }

    pub fn is_set(&self) -> bool {
        !self.name.is_empty()
    }
}

impl From<String> for NodeReference {
    fn from(name: String) -> Self {
        Self {
            name,
            node_index: None,
        }
    }
}

impl From<NodeReference> for String {
    fn from(reference: NodeReference) -> Self {
        reference.name
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumItem {
    pub label: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enum {
    pub name: String,
    /// Name as the author wrote it. Literals may be scoped with `OriginalName::`.
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub items: Vec<EnumItem>,
}

impl Enum {
    /// Index of the item whose label matches, ignoring case and an optional
    /// `OriginalName::` scope.
    pub fn label_to_value(&self, label: &str) -> Option<usize> {
        let prefix = format!("{}::", self.original_name);
        let label = strip_prefix_ignore_ascii_case(label, &prefix);

        self.items
            .iter()
            .position(|item| item.label.eq_ignore_ascii_case(label))
    }
}

fn strip_prefix_ignore_ascii_case<'a>(text: &'a str, prefix: &str) -> &'a str {
    match text.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &text[prefix.len()..],
        _ => text,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataFieldType,
    #[serde(default)]
    pub dflt: String,
    #[serde(default, rename = "enum")]
    pub enum_name: String,
    #[serde(default, rename = "const")]
    pub constant: bool,
    #[serde(default)]
    pub comment: String,

    #[serde(skip)]
    pub enum_index: Option<usize>,
}

impl Variable {
    pub fn new(name: &str, data_type: DataFieldType, dflt: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            dflt: dflt.to_string(),
            enum_name: String::new(),
            constant: false,
            comment: String::new(),
            enum_index: None,
        }
    }

    pub fn set_enum(mut self, enum_name: &str) -> Self {
        self.enum_name = enum_name.to_string();
        self
    }

    pub fn set_constant(mut self, constant: bool) -> Self {
        self.constant = constant;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default)]
    pub variable1: VariableReference,
    #[serde(default)]
    pub variable2: VariableReference,
    #[serde(default)]
    pub value2: String,
    #[serde(default)]
    pub comparison: Option<ConditionComparison>,
    #[serde(default)]
    pub always_false: bool,
}

impl Condition {
    pub fn new(variable1: &str, comparison: ConditionComparison) -> Self {
        Self {
            variable1: VariableReference::new(variable1),
            comparison: Some(comparison),
            ..Default::default()
        }
    }

    pub fn set_value2(mut self, value2: &str) -> Self {
        self.value2 = value2.to_string();
        self
    }

    pub fn set_variable2(mut self, variable2: &str) -> Self {
        self.variable2 = VariableReference::new(variable2);
        self
    }

    /// Whether this condition can ever evaluate to false.
    pub fn is_conditional(&self) -> bool {
        self.comparison.is_some() || self.always_false
    }
}

/// Binds a set-variable operand to the live size of a texture or count of a buffer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperandNode {
    #[serde(default)]
    pub texture_node: Option<NodeReference>,
    #[serde(default)]
    pub buffer_node: Option<NodeReference>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariable {
    #[serde(default)]
    pub destination: VariableReference,
    #[serde(default, with = "optional_index")]
    pub destination_index: Option<usize>,

    #[serde(default, rename = "AVar")]
    pub a_var: VariableReference,
    #[serde(default, rename = "AVarIndex", with = "optional_index")]
    pub a_var_index: Option<usize>,
    #[serde(default, rename = "ANode")]
    pub a_node: OperandNode,
    #[serde(default, rename = "ALiteral")]
    pub a_literal: String,

    #[serde(default, rename = "BVar")]
    pub b_var: VariableReference,
    #[serde(default, rename = "BVarIndex", with = "optional_index")]
    pub b_var_index: Option<usize>,
    #[serde(default, rename = "BNode")]
    pub b_node: OperandNode,
    #[serde(default, rename = "BLiteral")]
    pub b_literal: String,

    #[serde(default)]
    pub op: SetVariableOperator,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub set_before: bool,
}

impl SetVariable {
    pub fn new(destination: &str, op: SetVariableOperator, set_before: bool) -> Self {
        Self {
            destination: VariableReference::new(destination),
            op,
            set_before,
            ..Default::default()
        }
    }

    pub fn set_a_var(mut self, name: &str) -> Self {
        self.a_var = VariableReference::new(name);
        self
    }

    pub fn set_a_literal(mut self, literal: &str) -> Self {
        self.a_literal = literal.to_string();
        self
    }

    pub fn set_a_texture(mut self, node: &str) -> Self {
        self.a_node.texture_node = Some(NodeReference::new(node));
        self
    }

    pub fn set_a_buffer(mut self, node: &str) -> Self {
        self.a_node.buffer_node = Some(NodeReference::new(node));
        self
    }

    pub fn set_b_var(mut self, name: &str) -> Self {
        self.b_var = VariableReference::new(name);
        self
    }

    pub fn set_b_literal(mut self, literal: &str) -> Self {
        self.b_literal = literal.to_string();
        self
    }

    pub fn set_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn set_indices(
        mut self,
        destination: Option<usize>,
        a: Option<usize>,
        b: Option<usize>,
    ) -> Self {
        self.destination_index = destination;
        self.a_var_index = a;
        self.b_var_index = b;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceVisibility {
    Imported,
    Internal,
    Exported,
}

impl Default for ResourceVisibility {
    fn default() -> Self {
        Self::Internal
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureDimension {
    Texture2D,
    Texture2DArray,
    Texture3D,
    TextureCube,
}

impl Default for TextureDimension {
    fn default() -> Self {
        Self::Texture2D
    }
}

fn default_scale() -> [u32; 3] {
    [1, 1, 1]
}

/// Size of a texture, count of a buffer or dispatch size of a shader, derived from
/// a node or variable: `((base + pre_add) * multiply) / divide + post_add`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSize {
    #[serde(default)]
    pub node: NodeReference,
    #[serde(default)]
    pub variable: VariableReference,
    #[serde(default = "default_scale")]
    pub multiply: [u32; 3],
    #[serde(default = "default_scale")]
    pub divide: [u32; 3],
    #[serde(default)]
    pub pre_add: [i32; 3],
    #[serde(default)]
    pub post_add: [i32; 3],
}

impl Default for ResourceSize {
    fn default() -> Self {
        Self {
            node: NodeReference::default(),
            variable: VariableReference::default(),
            multiply: default_scale(),
            divide: default_scale(),
            pre_add: [0; 3],
            post_add: [0; 3],
        }
    }
}

impl ResourceSize {
    pub fn fixed(size: [u32; 3]) -> Self {
        Self {
            post_add: size.map(|value| value as i32),
            ..Default::default()
        }
    }

    pub fn from_node(node: &str) -> Self {
        Self {
            node: NodeReference::new(node),
            ..Default::default()
        }
    }

    pub fn from_variable(variable: &str) -> Self {
        Self {
            variable: VariableReference::new(variable),
            ..Default::default()
        }
    }

    pub fn apply(&self, base: [u32; 3]) -> [u32; 3] {
        let mut size = [0u32; 3];
        for i in 0..3 {
            // Widest case is (u32::MAX + i32::MAX) * u32::MAX, which overflows i64.
            let mut value = base[i] as i128 + self.pre_add[i] as i128;
            value *= self.multiply[i] as i128;
            if self.divide[i] != 0 {
                value /= self.divide[i] as i128;
            }
            value += self.post_add[i] as i128;
            size[i] = value.clamp(0, u32::MAX as i128) as u32;
        }
        size
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConnection {
    pub src_pin: String,
    pub dst_node: NodeReference,
    #[serde(default)]
    pub dst_pin: String,
}

impl NodeConnection {
    pub fn new(src_pin: &str, dst_node: &str) -> Self {
        Self {
            src_pin: src_pin.to_string(),
            dst_node: NodeReference::new(dst_node),
            dst_pin: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShaderReference {
    pub file_name: String,
    #[serde(default)]
    pub entry_point: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureNode {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub visibility: ResourceVisibility,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub dimension: TextureDimension,
    #[serde(default)]
    pub size: ResourceSize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferNode {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub visibility: ResourceVisibility,
    #[serde(default)]
    pub format: Option<DataFieldType>,
    #[serde(default)]
    pub struct_name: String,
    /// Only the first component is used.
    #[serde(default)]
    pub count: ResourceSize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeShaderNode {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub shader: ShaderReference,
    #[serde(default)]
    pub dispatch_size: ResourceSize,
    #[serde(default)]
    pub connections: Vec<NodeConnection>,
    #[serde(default)]
    pub condition: Condition,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RayShaderNode {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub shader: ShaderReference,
    #[serde(default)]
    pub dispatch_size: ResourceSize,
    #[serde(default)]
    pub max_recursion_depth: u32,
    #[serde(default)]
    pub connections: Vec<NodeConnection>,
    #[serde(default)]
    pub condition: Condition,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawCallNode {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub vertex_shader: ShaderReference,
    #[serde(default)]
    pub pixel_shader: ShaderReference,
    #[serde(default)]
    pub vertex_buffer: NodeReference,
    #[serde(default)]
    pub index_buffer: NodeReference,
    #[serde(default)]
    pub connections: Vec<NodeConnection>,
    #[serde(default)]
    pub condition: Condition,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyResourceNode {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    pub source: NodeReference,
    pub dest: NodeReference,
    #[serde(default)]
    pub condition: Condition,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubGraphNode {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub connections: Vec<NodeConnection>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarrierNode {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub connections: Vec<NodeConnection>,
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum NodeKind {
    Texture,
    Buffer,
    ComputeShader,
    RayShader,
    DrawCall,
    CopyResource,
    SubGraph,
    Barrier,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Texture => "Resource_Texture",
            Self::Buffer => "Resource_Buffer",
            Self::ComputeShader => "Action_ComputeShader",
            Self::RayShader => "Action_RayShader",
            Self::DrawCall => "Action_DrawCall",
            Self::CopyResource => "Action_CopyResource",
            Self::SubGraph => "Action_SubGraph",
            Self::Barrier => "Action_Barrier",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A render graph node. The set of kinds is closed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderGraphNode {
    ResourceTexture(TextureNode),
    ResourceBuffer(BufferNode),
    ActionComputeShader(ComputeShaderNode),
    ActionRayShader(RayShaderNode),
    ActionDrawCall(DrawCallNode),
    ActionCopyResource(CopyResourceNode),
    ActionSubGraph(SubGraphNode),
    ActionBarrier(BarrierNode),
}

impl RenderGraphNode {
    pub fn name(&self) -> &str {
        match self {
            Self::ResourceTexture(node) => &node.name,
            Self::ResourceBuffer(node) => &node.name,
            Self::ActionComputeShader(node) => &node.name,
            Self::ActionRayShader(node) => &node.name,
            Self::ActionDrawCall(node) => &node.name,
            Self::ActionCopyResource(node) => &node.name,
            Self::ActionSubGraph(node) => &node.name,
            Self::ActionBarrier(node) => &node.name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::ResourceTexture(_) => NodeKind::Texture,
            Self::ResourceBuffer(_) => NodeKind::Buffer,
            Self::ActionComputeShader(_) => NodeKind::ComputeShader,
            Self::ActionRayShader(_) => NodeKind::RayShader,
            Self::ActionDrawCall(_) => NodeKind::DrawCall,
            Self::ActionCopyResource(_) => NodeKind::CopyResource,
            Self::ActionSubGraph(_) => NodeKind::SubGraph,
            Self::ActionBarrier(_) => NodeKind::Barrier,
        }
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Self::ActionComputeShader(node) => Some(&node.condition),
            Self::ActionRayShader(node) => Some(&node.condition),
            Self::ActionDrawCall(node) => Some(&node.condition),
            Self::ActionCopyResource(node) => Some(&node.condition),
            _ => None,
        }
    }

    /// Nodes whose results this node consumes. Unset references are skipped.
    pub fn dependencies(&self) -> Vec<&NodeReference> {
        let references: Vec<&NodeReference> = match self {
            Self::ResourceTexture(node) => vec![&node.size.node],
            Self::ResourceBuffer(node) => vec![&node.count.node],
            Self::ActionComputeShader(node) => std::iter::once(&node.dispatch_size.node)
                .chain(node.connections.iter().map(|c| &c.dst_node))
                .collect(),
            Self::ActionRayShader(node) => std::iter::once(&node.dispatch_size.node)
                .chain(node.connections.iter().map(|c| &c.dst_node))
                .collect(),
            Self::ActionDrawCall(node) => [&node.vertex_buffer, &node.index_buffer]
                .into_iter()
                .chain(node.connections.iter().map(|c| &c.dst_node))
                .collect(),
            Self::ActionCopyResource(node) => vec![&node.source, &node.dest],
            Self::ActionSubGraph(node) => node.connections.iter().map(|c| &c.dst_node).collect(),
            Self::ActionBarrier(node) => node.connections.iter().map(|c| &c.dst_node).collect(),
        };

        references.into_iter().filter(|r| r.is_set()).collect()
    }

    pub(crate) fn node_references_mut(&mut self) -> Vec<&mut NodeReference> {
        let references: Vec<&mut NodeReference> = match self {
            Self::ResourceTexture(node) => vec![&mut node.size.node],
            Self::ResourceBuffer(node) => vec![&mut node.count.node],
            Self::ActionComputeShader(node) => std::iter::once(&mut node.dispatch_size.node)
                .chain(node.connections.iter_mut().map(|c| &mut c.dst_node))
                .collect(),
            Self::ActionRayShader(node) => std::iter::once(&mut node.dispatch_size.node)
                .chain(node.connections.iter_mut().map(|c| &mut c.dst_node))
                .collect(),
            Self::ActionDrawCall(node) => [&mut node.vertex_buffer, &mut node.index_buffer]
                .into_iter()
                .chain(node.connections.iter_mut().map(|c| &mut c.dst_node))
                .collect(),
            Self::ActionCopyResource(node) => vec![&mut node.source, &mut node.dest],
            Self::ActionSubGraph(node) => node
                .connections
                .iter_mut()
                .map(|c| &mut c.dst_node)
                .collect(),
            Self::ActionBarrier(node) => node
                .connections
                .iter_mut()
                .map(|c| &mut c.dst_node)
                .collect(),
        };

        references.into_iter().filter(|r| r.is_set()).collect()
    }

    pub(crate) fn size_variable_mut(&mut self) -> Option<&mut VariableReference> {
        match self {
            Self::ResourceTexture(node) => Some(&mut node.size.variable),
            Self::ResourceBuffer(node) => Some(&mut node.count.variable),
            Self::ActionComputeShader(node) => Some(&mut node.dispatch_size.variable),
            Self::ActionRayShader(node) => Some(&mut node.dispatch_size.variable),
            _ => None,
        }
    }

    pub(crate) fn condition_mut(&mut self) -> Option<&mut Condition> {
        match self {
            Self::ActionComputeShader(node) => Some(&mut node.condition),
            Self::ActionRayShader(node) => Some(&mut node.condition),
            Self::ActionDrawCall(node) => Some(&mut node.condition),
            Self::ActionCopyResource(node) => Some(&mut node.condition),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderGraph {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub nodes: Vec<RenderGraphNode>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub enums: Vec<Enum>,
    #[serde(default)]
    pub set_vars: Vec<SetVariable>,

    /// Execution order, computed by the compiler.
    #[serde(default, skip_deserializing)]
    pub flattened_node_list: Vec<usize>,
}

impl RenderGraph {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_node(mut self, node: RenderGraphNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn add_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn add_enum(mut self, name: &str, labels: &[&str]) -> Self {
        self.enums.push(Enum {
            name: name.to_string(),
            original_name: name.to_string(),
            comment: String::new(),
            items: labels
                .iter()
                .map(|label| EnumItem {
                    label: label.to_string(),
                    comment: String::new(),
                })
                .collect(),
        });
        self
    }

    pub fn add_set_var(mut self, set_var: SetVariable) -> Self {
        self.set_vars.push(set_var);
        self
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.name() == name)
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|variable| variable.name == name)
    }
}
