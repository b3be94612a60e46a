use crate::{compiler::CompileError, types::*};

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    Visiting,
    Done,
}

/// Orders the nodes so every node comes after the nodes it depends on.
/// Ties keep declaration order. References must already be resolved.
pub fn flatten(render_graph: &RenderGraph) -> Result<Vec<usize>, CompileError> {
    let node_count = render_graph.nodes.len();

    let dependencies = render_graph
        .nodes
        .iter()
        .map(|node| {
            node.dependencies()
                .into_iter()
                .filter_map(|reference| reference.node_index)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut sorted_nodes = Vec::with_capacity(node_count);
    let mut node_stack = Vec::new();
    let mut visited = vec![VisitState::Unvisited; node_count];

    for root in 0..node_count {
        node_stack.push(root);

        while let Some(&current_node) = node_stack.last() {
            match visited[current_node] {
                VisitState::Done => {
                    node_stack.pop();
                }
                VisitState::Visiting => {
                    visited[current_node] = VisitState::Done;
                    node_stack.pop();
                    sorted_nodes.push(current_node);
                }
                VisitState::Unvisited => {
                    visited[current_node] = VisitState::Visiting;

                    // Reversed so the first declared dependency is visited first
                    for &dependency in dependencies[current_node].iter().rev() {
                        match visited[dependency] {
                            VisitState::Unvisited => node_stack.push(dependency),
                            VisitState::Visiting => {
                                return Err(CompileError::Cycle {
                                    node: render_graph.nodes[dependency].name().to_string(),
                                })
                            }
                            VisitState::Done => {}
                        }
                    }
                }
            }
        }
    }

    log::trace!(
        "Flattened render graph \"{}\": {:?}",
        render_graph.name,
        sorted_nodes
            .iter()
            .map(|index| render_graph.nodes[*index].name())
            .collect::<Vec<_>>()
    );

    Ok(sorted_nodes)
}
