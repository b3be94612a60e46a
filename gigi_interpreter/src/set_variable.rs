use gigi_graph::{OperandNode, RenderGraph, SetVariable, VariableReference};

use crate::{
    component::{apply_op, ComponentValues},
    condition::{evaluate_condition, resolve_enum_literal, variable_enum},
    error::{EvaluationError, InterpreterError, Operand},
    handler::{BufferRuntimeData, NodeActionHandler, TextureRuntimeData},
    runtime_data::RuntimeDataRegistry,
    storage::RuntimeVariables,
};

/// One side of a statement, before resolution.
struct OperandSource<'a> {
    node: &'a OperandNode,
    variable: &'a VariableReference,
    literal: &'a str,
    index: Option<usize>,
}

impl<'a> OperandSource<'a> {
    fn a(set_var: &'a SetVariable) -> Self {
        Self {
            node: &set_var.a_node,
            variable: &set_var.a_var,
            literal: &set_var.a_literal,
            index: set_var.a_var_index,
        }
    }

    fn b(set_var: &'a SetVariable) -> Self {
        Self {
            node: &set_var.b_node,
            variable: &set_var.b_var,
            literal: &set_var.b_literal,
            index: set_var.b_var_index,
        }
    }
}

/// Runs the set-variable statements of one phase, in declaration order.
/// Each statement sees the writes of the ones before it.
pub fn execute_set_vars<H: NodeActionHandler>(
    render_graph: &RenderGraph,
    variables: &mut RuntimeVariables,
    runtime_data: &RuntimeDataRegistry<H>,
    before_execution: bool,
) -> Result<(), InterpreterError> {
    for (statement, set_var) in render_graph.set_vars.iter().enumerate() {
        let Some(destination) = set_var.destination.variable_index else {
            continue;
        };

        if set_var.set_before != before_execution {
            continue;
        }

        let error = |operand: Operand| {
            move |source: EvaluationError| InterpreterError::Evaluation {
                statement,
                destination: set_var.destination.name.clone(),
                operand,
                source,
            }
        };

        let enabled = evaluate_condition(render_graph, variables, &set_var.condition)
            .map_err(error(Operand::Condition))?;
        if !enabled {
            continue;
        }

        let (a, b) = {
            let destination_values = variables
                .storage(destination)
                .ok_or(EvaluationError::MissingVariable { index: destination })
                .map_err(error(Operand::Destination))?
                .current();

            let single_component = set_var.destination_index.is_some()
                || set_var.a_var_index.is_some()
                || set_var.b_var_index.is_some();
            let count = if single_component {
                1
            } else {
                destination_values.len()
            };

            let resolve = |source: OperandSource| {
                resolve_operand(
                    render_graph,
                    variables,
                    runtime_data,
                    destination,
                    &destination_values,
                    source,
                    count,
                )
            };

            let a = resolve(OperandSource::a(set_var)).map_err(error(Operand::A))?;
            let b = if set_var.op.is_unary() {
                a.clone()
            } else {
                resolve(OperandSource::b(set_var)).map_err(error(Operand::B))?
            };
            (a, b)
        };

        let result = apply_op(&a, &b, set_var.op).map_err(error(Operand::Destination))?;

        let storage = variables
            .storage_mut(destination)
            .ok_or(EvaluationError::MissingVariable { index: destination })
            .map_err(error(Operand::Destination))?;
        storage
            .write(set_var.destination_index.unwrap_or(0), &result)
            .map_err(error(Operand::Destination))?;

        log::trace!(
            "setVars[{}]: {} = {}",
            statement,
            set_var.destination.name,
            storage.value_as_string()
        );
    }

    Ok(())
}

/// Resolves an operand to `count` components of the destination's type.
/// Texture sizes win over buffer counts, which win over variables, which win
/// over literals.
fn resolve_operand<H: NodeActionHandler>(
    render_graph: &RenderGraph,
    variables: &RuntimeVariables,
    runtime_data: &RuntimeDataRegistry<H>,
    destination: usize,
    destination_values: &ComponentValues,
    source: OperandSource,
    count: usize,
) -> Result<ComponentValues, EvaluationError> {
    let component_type = destination_values.component_type();

    let values = if let Some(texture) = &source.node.texture_node {
        let size = runtime_data
            .textures
            .get(&texture.name)
            .map(TextureRuntimeData::size)
            .unwrap_or_default();
        ComponentValues::from_u32s(component_type, &size)
    } else if let Some(buffer) = &source.node.buffer_node {
        let count = runtime_data
            .buffers
            .get(&buffer.name)
            .map(BufferRuntimeData::count)
            .unwrap_or_default();
        ComponentValues::from_u32s(component_type, &[count])
    } else if let Some(variable) = source.variable.variable_index {
        variables
            .storage(variable)
            .ok_or(EvaluationError::MissingVariable { index: variable })?
            .current()
    } else {
        // Literals are already the requested width
        return match variable_enum(render_graph, destination) {
            Some(e) => Ok(ComponentValues::Int(vec![resolve_enum_literal(e, source.literal)?])),
            None => Ok(ComponentValues::parse(component_type, source.literal, count)?),
        };
    };

    values.range(source.index.unwrap_or(0), count)
}
