use std::collections::HashMap;

use gigi_core::*;

use crate::{compiler::CompileError, types::*};

/// Resolves references by name and validates a loaded render graph.
pub struct Builder {
    node_map: HashMap<String, usize>,
    node_kinds: Vec<NodeKind>,
    variable_map: HashMap<String, usize>,
    enum_map: HashMap<String, usize>,
}

impl Builder {
    pub fn new(render_graph: &RenderGraph) -> Result<Self, CompileError> {
        let mut node_map = HashMap::new();
        for (index, node) in render_graph.nodes.iter().enumerate() {
            if node.name().is_empty() {
                return Err(CompileError::Validation(format!(
                    "node {} ({}) has no name",
                    index,
                    node.kind()
                )));
            }
            if node_map.insert(node.name().to_string(), index).is_some() {
                return Err(CompileError::Validation(format!(
                    "duplicate node name \"{}\"",
                    node.name()
                )));
            }
        }

        let mut variable_map = HashMap::new();
        for (index, variable) in render_graph.variables.iter().enumerate() {
            if variable_map.insert(variable.name.clone(), index).is_some() {
                return Err(CompileError::Validation(format!(
                    "duplicate variable name \"{}\"",
                    variable.name
                )));
            }
        }

        let mut enum_map = HashMap::new();
        for (index, e) in render_graph.enums.iter().enumerate() {
            if enum_map.insert(e.name.clone(), index).is_some() {
                return Err(CompileError::Validation(format!(
                    "duplicate enum name \"{}\"",
                    e.name
                )));
            }
        }

        Ok(Self {
            node_map,
            node_kinds: render_graph.nodes.iter().map(|node| node.kind()).collect(),
            variable_map,
            enum_map,
        })
    }

    pub fn build(&self, render_graph: &mut RenderGraph) -> Result<(), CompileError> {
        self.fixup_enums(render_graph);
        self.fixup_variables(render_graph)?;
        self.fixup_nodes(render_graph)?;
        self.fixup_set_vars(render_graph)?;

        self.validate_nodes(render_graph)?;
        self.validate_set_vars(render_graph)?;

        Ok(())
    }

    fn resolve_node(&self, reference: &mut NodeReference, context: &str) -> Result<(), CompileError> {
        if !reference.is_set() {
            reference.node_index = None;
            return Ok(());
        }

        match self.node_map.get(&reference.name) {
            Some(index) => {
                reference.node_index = Some(*index);
                Ok(())
            }
            None => Err(CompileError::UnknownReference {
                context: context.to_string(),
                kind: "node",
                name: reference.name.clone(),
            }),
        }
    }

    fn resolve_node_of_kind(
        &self,
        reference: &mut NodeReference,
        kind: NodeKind,
        context: &str,
    ) -> Result<(), CompileError> {
        self.resolve_node(reference, context)?;
        match reference.node_index {
            Some(index) if self.node_kinds[index] != kind => Err(CompileError::WrongNodeKind {
                context: context.to_string(),
                name: reference.name.clone(),
                expected: kind,
                found: self.node_kinds[index],
            }),
            _ => Ok(()),
        }
    }

    fn resolve_variable(
        &self,
        reference: &mut VariableReference,
        context: &str,
    ) -> Result<(), CompileError> {
        if !reference.is_set() {
            reference.variable_index = None;
            return Ok(());
        }

        match self.variable_map.get(&reference.name) {
            Some(index) => {
                reference.variable_index = Some(*index);
                Ok(())
            }
            None => Err(CompileError::UnknownReference {
                context: context.to_string(),
                kind: "variable",
                name: reference.name.clone(),
            }),
        }
    }

    fn resolve_condition(&self, condition: &mut Condition, context: &str) -> Result<(), CompileError> {
        self.resolve_variable(&mut condition.variable1, context)?;
        self.resolve_variable(&mut condition.variable2, context)
    }

    fn fixup_enums(&self, render_graph: &mut RenderGraph) {
        for e in render_graph.enums.iter_mut() {
            if e.original_name.is_empty() {
                e.original_name = e.name.clone();
            }
        }
    }

    fn fixup_variables(&self, render_graph: &mut RenderGraph) -> Result<(), CompileError> {
        for variable in render_graph.variables.iter_mut() {
            if variable.enum_name.is_empty() {
                variable.enum_index = None;
                continue;
            }

            let enum_index = *self.enum_map.get(&variable.enum_name).ok_or_else(|| {
                CompileError::UnknownReference {
                    context: format!("variable \"{}\"", variable.name),
                    kind: "enum",
                    name: variable.enum_name.clone(),
                }
            })?;

            if variable.data_type != DataFieldType::Int {
                return Err(CompileError::Validation(format!(
                    "variable \"{}\" uses enum \"{}\" but has type {}, enums require Int",
                    variable.name, variable.enum_name, variable.data_type
                )));
            }
            variable.enum_index = Some(enum_index);

            // Enum defaults may be written as labels; storage only understands integers.
            let dflt = variable.dflt.trim();
            if !dflt.is_empty() && dflt.parse::<i32>().is_err() {
                let value = render_graph.enums[enum_index]
                    .label_to_value(dflt)
                    .ok_or_else(|| CompileError::UnknownReference {
                        context: format!("default of variable \"{}\"", variable.name),
                        kind: "enum label",
                        name: variable.dflt.clone(),
                    })?;
                log::trace!(
                    "Variable {} default {} resolved to enum value {}",
                    variable.name,
                    variable.dflt,
                    value
                );
                variable.dflt = value.to_string();
            }
        }

        Ok(())
    }

    fn fixup_nodes(&self, render_graph: &mut RenderGraph) -> Result<(), CompileError> {
        for node in render_graph.nodes.iter_mut() {
            let context = format!("node \"{}\"", node.name());

            for reference in node.node_references_mut() {
                self.resolve_node(reference, &context)?;
            }

            if let Some(variable) = node.size_variable_mut() {
                self.resolve_variable(variable, &context)?;
            }

            if let Some(condition) = node.condition_mut() {
                self.resolve_condition(condition, &context)?;
            }
        }

        Ok(())
    }

    fn fixup_set_vars(&self, render_graph: &mut RenderGraph) -> Result<(), CompileError> {
        for (index, set_var) in render_graph.set_vars.iter_mut().enumerate() {
            let context = format!("setVars[{}]", index);

            self.resolve_variable(&mut set_var.destination, &context)?;
            self.resolve_variable(&mut set_var.a_var, &context)?;
            self.resolve_variable(&mut set_var.b_var, &context)?;

            for operand in [&mut set_var.a_node, &mut set_var.b_node] {
                if let Some(texture) = operand.texture_node.as_mut() {
                    self.resolve_node_of_kind(texture, NodeKind::Texture, &context)?;
                }
                if let Some(buffer) = operand.buffer_node.as_mut() {
                    self.resolve_node_of_kind(buffer, NodeKind::Buffer, &context)?;
                }
            }

            self.resolve_condition(&mut set_var.condition, &context)?;
        }

        Ok(())
    }

    fn validate_condition(
        &self,
        render_graph: &RenderGraph,
        condition: &Condition,
        context: &str,
    ) -> Result<(), CompileError> {
        let (Some(variable1), Some(variable2)) = (
            condition.variable1.variable_index,
            condition.variable2.variable_index,
        ) else {
            return Ok(());
        };

        let variable1 = &render_graph.variables[variable1];
        let variable2 = &render_graph.variables[variable2];
        if variable1.data_type.component_type() != variable2.data_type.component_type()
            || variable1.data_type.component_count() != variable2.data_type.component_count()
        {
            return Err(CompileError::Validation(format!(
                "{}: condition compares {} variable \"{}\" with {} variable \"{}\"",
                context,
                variable1.data_type,
                variable1.name,
                variable2.data_type,
                variable2.name
            )));
        }

        Ok(())
    }

    fn validate_nodes(&self, render_graph: &RenderGraph) -> Result<(), CompileError> {
        for node in &render_graph.nodes {
            let context = format!("node \"{}\"", node.name());

            let size_variable = match node {
                RenderGraphNode::ResourceTexture(node) => node.size.variable.variable_index,
                RenderGraphNode::ResourceBuffer(node) => node.count.variable.variable_index,
                RenderGraphNode::ActionComputeShader(node) => {
                    node.dispatch_size.variable.variable_index
                }
                RenderGraphNode::ActionRayShader(node) => node.dispatch_size.variable.variable_index,
                _ => None,
            };

            if let Some(index) = size_variable {
                let variable = &render_graph.variables[index];
                let info = variable.data_type.info();
                let integral = matches!(
                    info.component_type,
                    ComponentType::Int | ComponentType::Uint | ComponentType::Uint16
                );
                if !integral || info.component_count > 3 {
                    return Err(CompileError::Validation(format!(
                        "{}: size variable \"{}\" must be an integer with at most 3 components, not {}",
                        context, variable.name, variable.data_type
                    )));
                }
            }

            if let Some(condition) = node.condition() {
                self.validate_condition(render_graph, condition, &context)?;
            }
        }

        Ok(())
    }

    fn validate_set_vars(&self, render_graph: &RenderGraph) -> Result<(), CompileError> {
        for (index, set_var) in render_graph.set_vars.iter().enumerate() {
            let context = format!("setVars[{}]", index);
            self.validate_condition(render_graph, &set_var.condition, &context)?;

            let Some(destination) = set_var.destination.variable_index else {
                continue;
            };

            let destination = &render_graph.variables[destination];
            if destination.constant {
                return Err(CompileError::Validation(format!(
                    "{}: destination \"{}\" is const",
                    context, destination.name
                )));
            }

            let info = destination.data_type.info();
            if !info.component_type.supports(set_var.op) {
                return Err(CompileError::Validation(format!(
                    "{}: operator {:?} is not valid for {} variable \"{}\"",
                    context, set_var.op, destination.data_type, destination.name
                )));
            }

            let a_count = self.operand_count(
                render_graph,
                info,
                &set_var.a_node,
                &set_var.a_var,
                &context,
                "A",
            )?;
            let b_count = self.operand_count(
                render_graph,
                info,
                &set_var.b_node,
                &set_var.b_var,
                &context,
                "B",
            )?;

            let indexed = set_var.destination_index.is_some()
                || set_var.a_var_index.is_some()
                || set_var.b_var_index.is_some();

            let checks = [
                ("destination", set_var.destination_index, info.component_count),
                ("A", set_var.a_var_index, a_count),
                ("B", set_var.b_var_index, b_count),
            ];

            for (operand, component_index, count) in checks {
                let needed = if indexed {
                    component_index.unwrap_or(0) + 1
                } else {
                    info.component_count
                };

                if operand == "B" && set_var.op.is_unary() {
                    continue;
                }

                if needed > count {
                    return Err(CompileError::Validation(format!(
                        "{}: operand {} has {} components but {} are needed",
                        context, operand, count, needed
                    )));
                }
            }
        }

        Ok(())
    }

    fn operand_count(
        &self,
        render_graph: &RenderGraph,
        destination: DataFieldTypeInfo,
        node: &OperandNode,
        variable: &VariableReference,
        context: &str,
        operand: &str,
    ) -> Result<usize, CompileError> {
        if node.texture_node.is_some() {
            return Ok(3);
        }
        if node.buffer_node.is_some() {
            return Ok(1);
        }

        match variable.variable_index {
            Some(index) => {
                let source = &render_graph.variables[index];
                let source_info = source.data_type.info();
                if source_info.component_type != destination.component_type {
                    return Err(CompileError::Validation(format!(
                        "{}: operand {} \"{}\" is {} but the destination holds {}",
                        context,
                        operand,
                        source.name,
                        source_info.component_type,
                        destination.component_type
                    )));
                }
                Ok(source_info.component_count)
            }
            None => Ok(destination.component_count),
        }
    }
}
