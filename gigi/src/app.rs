use std::path::Path;

use anyhow::{bail, Context, Result};

use gigi_interpreter::{GigiCompileResult, Interpreter};

use crate::headless::HeadlessRuntime;

pub struct GigiApp {
    interpreter: Interpreter<HeadlessRuntime>,
    frame: u64,
}

impl GigiApp {
    pub fn new(render_graph: &Path, runtime: HeadlessRuntime) -> Result<Self> {
        let mut interpreter = Interpreter::new(runtime);

        let result = interpreter.compile(render_graph, None);
        if result != GigiCompileResult::Ok {
            bail!("Failed to compile {:?}: {}", render_graph, result);
        }
        log::debug!(
            "Scratch directory is {:?}",
            interpreter.scratch_directory()
        );

        Ok(Self {
            interpreter,
            frame: 0,
        })
    }

    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<()> {
        let index = self
            .interpreter
            .runtime_variable_index(name)
            .with_context(|| format!("Render graph has no variable \"{}\"", name))?;
        self.interpreter
            .set_runtime_variable_from_string(index, value)
            .with_context(|| format!("Failed to set variable \"{}\"", name))?;
        Ok(())
    }

    pub fn render(&mut self) -> Result<()> {
        self.interpreter.handler_mut().clear_trace();
        self.interpreter
            .execute()
            .with_context(|| format!("Frame {} failed", self.frame))?;

        for line in self.interpreter.handler().trace() {
            log::info!("[frame {}] {}", self.frame, line);
        }
        self.frame += 1;
        Ok(())
    }

    /// `(name, type, value)` of every variable.
    pub fn variables(&self) -> Vec<(String, String, String)> {
        (0..self.interpreter.runtime_variable_count())
            .filter_map(|index| {
                let variable = self.interpreter.runtime_variable(index)?;
                let value = self.interpreter.runtime_variable_value_as_string(index)?;
                Some((variable.name.clone(), variable.data_type.to_string(), value))
            })
            .collect()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}
