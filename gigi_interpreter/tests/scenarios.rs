use gigi_core::*;
use gigi_graph::*;
use gigi_interpreter::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records every callback and fails on request.
#[derive(Default)]
struct RecordingHandler {
    calls: Vec<(NodeAction, String)>,
    fail_on: Option<(NodeAction, String)>,
    pre_compiles: usize,
    compile_oks: usize,
}

impl RecordingHandler {
    fn failing_on(action: NodeAction, node: &str) -> Self {
        Self {
            fail_on: Some((action, node.to_string())),
            ..Default::default()
        }
    }

    fn record(&mut self, name: &str, action: NodeAction) -> bool {
        self.calls.push((action, name.to_string()));
        self.fail_on != Some((action, name.to_string()))
    }

    fn calls(&self, action: NodeAction) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|(call, _)| *call == action)
            .map(|(_, name)| name.as_str())
            .collect()
    }
}

impl NodeActionHandler for RecordingHandler {
    type Texture = TextureRuntime;
    type Buffer = BufferRuntime;
    type ComputeShader = ();
    type RayShader = ();
    type DrawCall = ();
    type CopyResource = ();
    type SubGraph = ();
    type Barrier = ();

    fn on_pre_compile(&mut self) {
        self.pre_compiles += 1;
    }

    fn on_compile_ok(&mut self, _render_graph: &RenderGraph) {
        self.compile_oks += 1;
    }

    fn on_texture(
        &mut self,
        node: &TextureNode,
        data: &mut TextureRuntime,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        data.size = context.resolve_size(&node.size);
        self.record(&node.name, action)
    }

    fn on_buffer(
        &mut self,
        node: &BufferNode,
        data: &mut BufferRuntime,
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        data.count = context.resolve_size(&node.count)[0];
        self.record(&node.name, action)
    }

    fn on_compute_shader(
        &mut self,
        node: &ComputeShaderNode,
        _data: &mut (),
        action: NodeAction,
        context: &NodeContext<Self>,
    ) -> bool {
        if action == NodeAction::Execute && !context.evaluate_condition(&node.condition).unwrap() {
            return true;
        }
        self.record(&node.name, action)
    }

    fn on_copy_resource(
        &mut self,
        node: &CopyResourceNode,
        _data: &mut (),
        action: NodeAction,
        _context: &NodeContext<Self>,
    ) -> bool {
        self.record(&node.name, action)
    }
}

fn compute(name: &str, inputs: &[&str]) -> RenderGraphNode {
    RenderGraphNode::ActionComputeShader(ComputeShaderNode {
        name: name.to_string(),
        connections: inputs
            .iter()
            .map(|input| NodeConnection::new("Input", input))
            .collect(),
        ..Default::default()
    })
}

fn texture(name: &str, size: ResourceSize) -> RenderGraphNode {
    RenderGraphNode::ResourceTexture(TextureNode {
        name: name.to_string(),
        size,
        ..Default::default()
    })
}

fn compile_graph_json(interpreter: &mut Interpreter<RecordingHandler>, graph: &RenderGraph) -> GigiCompileResult {
    let json = gigi_graph::parser::write_to_string(graph).unwrap();
    interpreter.compile_from_str(&json, None)
}

fn value(interpreter: &Interpreter<RecordingHandler>, name: &str) -> String {
    let index = interpreter.runtime_variable_index(name).unwrap();
    interpreter.runtime_variable_value_as_string(index).unwrap()
}

#[test]
fn radius_doubles_every_frame() {
    init_logger();

    let graph = RenderGraph::new("radius")
        .add_variable(Variable::new("radius", DataFieldType::Uint, "1"))
        .add_set_var(
            SetVariable::new("radius", SetVariableOperator::Multiply, true)
                .set_a_var("radius")
                .set_b_literal("2"),
        );

    let mut interpreter = Interpreter::<RecordingHandler>::default();
    assert_eq!(compile_graph_json(&mut interpreter, &graph), GigiCompileResult::Ok);

    interpreter.execute().unwrap();
    assert_eq!(value(&interpreter, "radius"), "2");
    interpreter.execute().unwrap();
    assert_eq!(value(&interpreter, "radius"), "4");
}

#[test]
fn enum_condition_matches_label_case_insensitively() {
    init_logger();

    let graph = RenderGraph::new("modes")
        .add_enum("ModeName", &["Slow", "Fast", "Fancy"])
        .add_variable(Variable::new("mode", DataFieldType::Int, "0").set_enum("ModeName"))
        .add_variable(Variable::new("fastFrames", DataFieldType::Int, "0"))
        .add_set_var(
            SetVariable::new("fastFrames", SetVariableOperator::Add, true)
                .set_a_var("fastFrames")
                .set_b_literal("1")
                .set_condition(
                    Condition::new("mode", ConditionComparison::Equals).set_value2("ModeName::Fast"),
                ),
        );

    let mut interpreter = Interpreter::<RecordingHandler>::default();
    assert_eq!(compile_graph_json(&mut interpreter, &graph), GigiCompileResult::Ok);
    let mode = interpreter.runtime_variable_index("mode").unwrap();

    for (label, counted) in [("Slow", false), ("fast", true), ("FANCY", false), ("Fast", true)] {
        let before = value(&interpreter, "fastFrames").parse::<i32>().unwrap();
        interpreter.set_runtime_variable_from_string(mode, label).unwrap();
        interpreter.execute().unwrap();
        let after = value(&interpreter, "fastFrames").parse::<i32>().unwrap();
        assert_eq!(after - before, counted as i32, "mode {}", label);
    }

    let mut condition = Condition::new("mode", ConditionComparison::Equals).set_value2("MODENAME::fast");
    condition.variable1.variable_index = Some(mode);
    assert!(interpreter.evaluate_condition(&condition).unwrap());
}

#[test]
fn init_failure_stops_compile() {
    init_logger();

    let graph = RenderGraph::new("init")
        .add_node(texture("A", ResourceSize::fixed([4, 4, 1])))
        .add_node(texture("B", ResourceSize::from_node("A")))
        .add_node(texture("C", ResourceSize::from_node("B")));

    let mut interpreter =
        Interpreter::new(RecordingHandler::failing_on(NodeAction::Init, "B"));
    assert_eq!(
        compile_graph_json(&mut interpreter, &graph),
        GigiCompileResult::InterpreterError
    );
    assert_eq!(interpreter.handler().calls(NodeAction::Init), ["A", "B"]);

    // A failed compile turns execute into a no-op
    interpreter.execute().unwrap();
    assert!(interpreter.handler().calls(NodeAction::Execute).is_empty());
}

#[test]
fn execute_failure_skips_rest_of_frame() {
    init_logger();

    let graph = RenderGraph::new("execute")
        .add_variable(Variable::new("before", DataFieldType::Int, "0"))
        .add_variable(Variable::new("after", DataFieldType::Int, "0"))
        .add_node(texture("A", ResourceSize::fixed([4, 4, 1])))
        .add_node(compute("B", &["A"]))
        .add_node(compute("C", &["B"]))
        .add_set_var(
            SetVariable::new("before", SetVariableOperator::Add, true)
                .set_a_var("before")
                .set_b_literal("1"),
        )
        .add_set_var(
            SetVariable::new("after", SetVariableOperator::Add, false)
                .set_a_var("after")
                .set_b_literal("1"),
        );

    let mut interpreter =
        Interpreter::new(RecordingHandler::failing_on(NodeAction::Execute, "B"));
    assert_eq!(compile_graph_json(&mut interpreter, &graph), GigiCompileResult::Ok);

    let error = interpreter.execute().unwrap_err();
    assert!(matches!(
        error,
        InterpreterError::NodeExecution {
            ref node,
            kind: NodeKind::ComputeShader,
            action: NodeAction::Execute,
        } if node == "B"
    ));
    assert_eq!(interpreter.handler().calls(NodeAction::Execute), ["A", "B"]);
    assert_eq!(value(&interpreter, "before"), "1");
    assert_eq!(value(&interpreter, "after"), "0");
}

#[test]
fn statements_observe_earlier_statements() {
    init_logger();

    let graph = RenderGraph::new("sequential")
        .add_variable(Variable::new("a", DataFieldType::Float, "1.5"))
        .add_variable(Variable::new("b", DataFieldType::Float, "0"))
        .add_set_var(
            SetVariable::new("a", SetVariableOperator::Multiply, true)
                .set_a_var("a")
                .set_b_literal("2"),
        )
        .add_set_var(
            SetVariable::new("b", SetVariableOperator::Subtract, true)
                .set_a_var("a")
                .set_b_literal("0.5"),
        );

    let mut interpreter = Interpreter::<RecordingHandler>::default();
    compile_graph_json(&mut interpreter, &graph);
    interpreter.execute().unwrap();

    assert_eq!(value(&interpreter, "a"), "3");
    assert_eq!(value(&interpreter, "b"), "2.5");
}

#[test]
fn statement_without_comparison_always_runs() {
    init_logger();

    let graph = RenderGraph::new("vacuous")
        .add_variable(Variable::new("flag", DataFieldType::Bool, "false"))
        .add_variable(Variable::new("count", DataFieldType::Uint16, "0"))
        .add_set_var(
            SetVariable::new("count", SetVariableOperator::Add, true)
                .set_a_var("count")
                .set_b_literal("1")
                .set_condition(Condition {
                    variable1: VariableReference::new("flag"),
                    ..Default::default()
                }),
        );

    let mut interpreter = Interpreter::<RecordingHandler>::default();
    compile_graph_json(&mut interpreter, &graph);
    interpreter.execute().unwrap();
    interpreter.execute().unwrap();

    assert_eq!(value(&interpreter, "count"), "2");
}

#[test]
fn nodes_run_after_their_producers() {
    init_logger();

    let graph = RenderGraph::new("order")
        .add_node(compute("Composite", &["Bloom", "Color"]))
        .add_node(compute("Bloom", &["Color", "BloomTarget"]))
        .add_node(texture("BloomTarget", ResourceSize::from_node("Color")))
        .add_node(texture("Color", ResourceSize::fixed([1280, 720, 1])));

    let mut interpreter = Interpreter::<RecordingHandler>::default();
    assert_eq!(compile_graph_json(&mut interpreter, &graph), GigiCompileResult::Ok);
    interpreter.execute().unwrap();

    let order = interpreter.handler().calls(NodeAction::Execute);
    let position = |name: &str| order.iter().position(|call| *call == name).unwrap();
    for node in &interpreter.render_graph().nodes {
        for dependency in node.dependencies() {
            assert!(position(&dependency.name) < position(node.name()));
        }
    }

    assert_eq!(
        interpreter.texture_runtime_data("BloomTarget").map(|data| data.size),
        Some([1280, 720, 1])
    );
}

#[test]
fn variables_survive_recompile() {
    init_logger();

    let graph = RenderGraph::new("persist")
        .add_variable(Variable::new("exposure", DataFieldType::Float, "1"))
        .add_variable(Variable::new("steps", DataFieldType::Int, "4"));

    let mut interpreter = Interpreter::<RecordingHandler>::default();
    compile_graph_json(&mut interpreter, &graph);
    let exposure = interpreter.runtime_variable_index("exposure").unwrap();
    let steps = interpreter.runtime_variable_index("steps").unwrap();
    interpreter.set_runtime_variable_from_string(exposure, "2.25").unwrap();
    interpreter.set_runtime_variable_from_string(steps, "9").unwrap();

    // Same name and type keeps the value, a new type starts from the default
    let mut changed = graph.clone();
    changed.variables[1] = Variable::new("steps", DataFieldType::Uint, "4");
    assert_eq!(compile_graph_json(&mut interpreter, &changed), GigiCompileResult::Ok);

    assert_eq!(value(&interpreter, "exposure"), "2.25");
    assert_eq!(value(&interpreter, "steps"), "4");
    assert_eq!(interpreter.handler().pre_compiles, 2);
    assert_eq!(interpreter.handler().compile_oks, 2);
}

#[test]
fn bad_default_fails_compile() {
    init_logger();

    let graph = RenderGraph::new("defaults")
        .add_variable(Variable::new("size", DataFieldType::Uint2, "64, sixty-four"));

    let mut interpreter = Interpreter::<RecordingHandler>::default();
    assert_eq!(
        compile_graph_json(&mut interpreter, &graph),
        GigiCompileResult::InterpreterError
    );
    assert_eq!(interpreter.handler().compile_oks, 0);
}

#[test]
fn failed_compile_makes_execute_a_no_op() {
    init_logger();

    let mut interpreter = Interpreter::<RecordingHandler>::default();
    assert_eq!(
        interpreter.compile("this/graph/does/not/exist.gg", None),
        GigiCompileResult::CantLoadRenderGraph
    );
    assert!(interpreter.execute().is_ok());
    assert_eq!(interpreter.compile_result(), GigiCompileResult::CantLoadRenderGraph);
    assert!(interpreter.handler().calls.is_empty());
}

#[test]
fn box_blur_demo() {
    init_logger();

    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../demos/boxblur.gg.json");
    let mut interpreter = Interpreter::<RecordingHandler>::default();

    let import_size = |graph: &mut RenderGraph| {
        for node in graph.nodes.iter_mut() {
            if let RenderGraphNode::ResourceTexture(texture) = node {
                if texture.visibility == ResourceVisibility::Imported {
                    texture.size = ResourceSize::fixed([512, 256, 1]);
                }
            }
        }
    };
    assert_eq!(interpreter.compile(path, Some(&import_size)), GigiCompileResult::Ok);

    interpreter.execute().unwrap();
    interpreter.execute().unwrap();

    assert_eq!(value(&interpreter, "outputSize"), "512, 256, 1");
    assert_eq!(value(&interpreter, "frameIndex"), "2");
    assert_eq!(value(&interpreter, "mode"), "1");
    assert_eq!(interpreter.buffer_runtime_data("Weights").map(|data| data.count), Some(5));

    // mode is Fast, so BlurV is skipped
    let executed = interpreter.handler().calls(NodeAction::Execute);
    assert_eq!(executed.iter().filter(|name| **name == "BlurH").count(), 2);
    assert!(!executed.contains(&"BlurV"));
}
