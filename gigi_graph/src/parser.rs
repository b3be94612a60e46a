use std::path::Path;

use crate::{compiler::CompileError, types::*};

pub fn parse_from_string(string: &str) -> Result<RenderGraph, CompileError> {
    let render_graph: RenderGraph = serde_json::from_str(string)?;
    log::trace!(
        "Parsed render graph \"{}\": {} nodes, {} variables, {} enums, {} set vars",
        render_graph.name,
        render_graph.nodes.len(),
        render_graph.variables.len(),
        render_graph.enums.len(),
        render_graph.set_vars.len()
    );
    Ok(render_graph)
}

pub fn parse_from_file(file_name: &Path) -> Result<RenderGraph, CompileError> {
    let file_contents =
        std::fs::read_to_string(file_name).map_err(|source| CompileError::Read {
            path: file_name.to_path_buf(),
            source,
        })?;
    parse_from_string(&file_contents)
}

pub fn write_to_string(render_graph: &RenderGraph) -> Result<String, CompileError> {
    Ok(serde_json::to_string_pretty(render_graph)?)
}

#[cfg(test)]
mod tests {
    use gigi_core::*;

    use super::*;

    const BOX_BLUR: &str = r#"{
        "name": "boxblur",
        "variables": [
            { "name": "enabled", "type": "Bool", "dflt": "true" },
            { "name": "radius", "type": "Int", "dflt": "2" },
            { "name": "mode", "type": "Int", "dflt": "Fast", "enum": "BlurMode" }
        ],
        "enums": [
            { "name": "BlurMode", "items": [ { "label": "Slow" }, { "label": "Fast" } ] }
        ],
        "nodes": [
            { "resourceTexture": { "name": "InputTexture", "visibility": "Imported" } },
            { "resourceTexture": { "name": "PingPongTexture", "size": { "node": "InputTexture" } } },
            { "actionComputeShader": {
                "name": "BlurH",
                "shader": { "fileName": "boxblur.hlsl", "entryPoint": "BlurH" },
                "dispatchSize": { "node": "InputTexture" },
                "connections": [
                    { "srcPin": "Input", "dstNode": "InputTexture" },
                    { "srcPin": "Output", "dstNode": "PingPongTexture" }
                ],
                "condition": { "variable1": "enabled", "comparison": "IsTrue" }
            } }
        ],
        "setVars": [
            { "destination": "radius", "AVar": "radius", "BLiteral": "1", "op": "Add",
              "destinationIndex": -1, "setBefore": true }
        ]
    }"#;

    #[test]
    fn test_parse() {
        let graph = parse_from_string(BOX_BLUR).unwrap();

        assert_eq!(graph.name, "boxblur");
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.variables[2].enum_name, "BlurMode");
        assert_eq!(graph.enums[0].items[1].label, "Fast");
        assert!(graph.flattened_node_list.is_empty());

        match &graph.nodes[2] {
            RenderGraphNode::ActionComputeShader(node) => {
                assert_eq!(node.shader.entry_point, "BlurH");
                assert_eq!(node.connections[1].dst_node.name, "PingPongTexture");
                assert_eq!(node.condition.comparison, Some(ConditionComparison::IsTrue));
            }
            other => panic!("unexpected node {:?}", other.kind()),
        }

        let set_var = &graph.set_vars[0];
        assert_eq!(set_var.destination.name, "radius");
        assert_eq!(set_var.destination_index, None);
        assert_eq!(set_var.op, SetVariableOperator::Add);
        assert!(set_var.set_before);
    }

    #[test]
    fn test_parse_rejects_unknown_node_kind() {
        let result = parse_from_string(r#"{ "nodes": [ { "resourceMesh": { "name": "M" } } ] }"#);
        assert!(matches!(result, Err(CompileError::Parse(_))));
    }

    #[test]
    fn test_parse_missing_file() {
        let result = parse_from_file(Path::new("this/graph/does/not/exist.gg"));
        assert!(matches!(result, Err(CompileError::Read { .. })));
    }
}
