use gigi_core::{ConditionComparison, DataFieldType};
use gigi_graph::{Condition, Enum, RenderGraph};

use crate::{
    component::{compare_values, ComponentValues},
    error::EvaluationError,
    storage::RuntimeVariables,
};

/// Value of an enum literal: a label (optionally scoped with the enum name),
/// or failing that a plain integer.
pub fn resolve_enum_literal(e: &Enum, text: &str) -> Result<i32, EvaluationError> {
    let text = text.trim();
    e.label_to_value(text)
        .and_then(|value| i32::try_from(value).ok())
        .or_else(|| text.parse().ok())
        .ok_or_else(|| EvaluationError::UnknownEnumLabel {
            enum_name: e.name.clone(),
            label: text.to_string(),
        })
}

/// The enum of an int variable, if it has one.
pub fn variable_enum(render_graph: &RenderGraph, variable_index: usize) -> Option<&Enum> {
    let variable = render_graph.variables.get(variable_index)?;
    if variable.data_type != DataFieldType::Int {
        return None;
    }
    variable
        .enum_index
        .and_then(|index| render_graph.enums.get(index))
}

/// Evaluates `condition` against current variable values. Conditions without
/// a variable or comparison always pass.
pub fn evaluate_condition(
    render_graph: &RenderGraph,
    variables: &RuntimeVariables,
    condition: &Condition,
) -> Result<bool, EvaluationError> {
    if condition.always_false {
        return Ok(false);
    }

    let (Some(variable1), Some(comparison)) =
        (condition.variable1.variable_index, condition.comparison)
    else {
        return Ok(true);
    };

    let a = variables
        .storage(variable1)
        .ok_or(EvaluationError::MissingVariable { index: variable1 })?
        .current();

    let b = if matches!(
        comparison,
        ConditionComparison::IsTrue | ConditionComparison::IsFalse
    ) {
        a.clone()
    } else if let Some(variable2) = condition.variable2.variable_index {
        variables
            .storage(variable2)
            .ok_or(EvaluationError::MissingVariable { index: variable2 })?
            .current()
    } else if let Some(e) = variable_enum(render_graph, variable1) {
        ComponentValues::Int(vec![resolve_enum_literal(e, &condition.value2)?])
    } else {
        ComponentValues::parse(a.component_type(), &condition.value2, a.len())?
    };

    compare_values(&a, &b, comparison)
}

#[cfg(test)]
mod tests {
    use gigi_core::*;
    use gigi_graph::*;
    use rstest::rstest;

    use super::*;

    fn setup(graph: RenderGraph) -> (RenderGraph, RuntimeVariables) {
        let graph = compile_graph(graph, None, None).unwrap();
        let mut variables = RuntimeVariables::default();
        variables.create(&graph).unwrap();
        (graph, variables)
    }

    fn resolved(graph: &RenderGraph, mut condition: Condition) -> Condition {
        condition.variable1.variable_index = graph.variable_index(&condition.variable1.name);
        condition.variable2.variable_index = graph.variable_index(&condition.variable2.name);
        condition
    }

    #[test]
    fn test_unset_condition_passes() {
        let (graph, variables) = setup(RenderGraph::new("test"));
        assert!(evaluate_condition(&graph, &variables, &Condition::default()).unwrap());

        let always_false = Condition {
            always_false: true,
            ..Default::default()
        };
        assert!(!evaluate_condition(&graph, &variables, &always_false).unwrap());
    }

    #[test]
    fn test_missing_comparison_passes() {
        let (graph, variables) = setup(
            RenderGraph::new("test").add_variable(Variable::new("flag", DataFieldType::Bool, "false")),
        );
        let condition = resolved(
            &graph,
            Condition {
                variable1: VariableReference::new("flag"),
                ..Default::default()
            },
        );
        assert!(evaluate_condition(&graph, &variables, &condition).unwrap());
    }

    #[rstest]
    #[case("ModeName::Fast", true)]
    #[case("modename::fast", true)]
    #[case("FAST", true)]
    #[case("1", true)]
    #[case("Slow", false)]
    #[case("ModeName::Slow", false)]
    fn test_enum_condition(#[case] value2: &str, #[case] expected: bool) {
        let (graph, variables) = setup(
            RenderGraph::new("test")
                .add_enum("ModeName", &["Slow", "Fast"])
                .add_variable(Variable::new("mode", DataFieldType::Int, "Fast").set_enum("ModeName")),
        );

        let condition = resolved(
            &graph,
            Condition::new("mode", ConditionComparison::Equals).set_value2(value2),
        );
        assert_eq!(
            evaluate_condition(&graph, &variables, &condition).unwrap(),
            expected
        );
    }

    #[test]
    fn test_unknown_enum_label() {
        let (graph, variables) = setup(
            RenderGraph::new("test")
                .add_enum("ModeName", &["Slow", "Fast"])
                .add_variable(Variable::new("mode", DataFieldType::Int, "0").set_enum("ModeName")),
        );
        let condition = resolved(
            &graph,
            Condition::new("mode", ConditionComparison::Equals).set_value2("Medium"),
        );
        assert!(matches!(
            evaluate_condition(&graph, &variables, &condition),
            Err(EvaluationError::UnknownEnumLabel { .. })
        ));
    }

    #[test]
    fn test_compare_against_variable_and_literal() {
        let (graph, variables) = setup(
            RenderGraph::new("test")
                .add_variable(Variable::new("a", DataFieldType::Float2, "1, 2"))
                .add_variable(Variable::new("b", DataFieldType::Float2, "1, 3")),
        );

        let lt = resolved(
            &graph,
            Condition::new("a", ConditionComparison::Lte).set_variable2("b"),
        );
        assert!(evaluate_condition(&graph, &variables, &lt).unwrap());

        let equals = resolved(
            &graph,
            Condition::new("a", ConditionComparison::Equals).set_value2("1, 2"),
        );
        assert!(evaluate_condition(&graph, &variables, &equals).unwrap());

        let malformed = resolved(
            &graph,
            Condition::new("a", ConditionComparison::Equals).set_value2("1"),
        );
        assert!(matches!(
            evaluate_condition(&graph, &variables, &malformed),
            Err(EvaluationError::InvalidLiteral(_))
        ));
    }

    #[test]
    fn test_shorter_variable2_is_an_error() {
        let (graph, variables) = setup(
            RenderGraph::new("test")
                .add_variable(Variable::new("a", DataFieldType::Float2, "1, 5"))
                .add_variable(Variable::new("b", DataFieldType::Float, "1")),
        );

        let condition = resolved(
            &graph,
            Condition::new("a", ConditionComparison::Equals).set_variable2("b"),
        );
        assert!(matches!(
            evaluate_condition(&graph, &variables, &condition),
            Err(EvaluationError::ComponentOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn test_is_true_ignores_value2() {
        let (graph, variables) = setup(
            RenderGraph::new("test").add_variable(Variable::new("enabled", DataFieldType::Bool, "true")),
        );
        let condition = resolved(
            &graph,
            Condition::new("enabled", ConditionComparison::IsTrue).set_value2("garbage"),
        );
        assert!(evaluate_condition(&graph, &variables, &condition).unwrap());
    }
}
