use std::collections::HashMap;

use gigi_core::{ComponentType, DataFieldType};
use gigi_graph::{RenderGraph, Variable};

use crate::{
    component::{Component, ComponentValues},
    error::{EvaluationError, InterpreterError, ParseError},
};

/// Backing memory of one variable: the current value followed by the default.
#[derive(Clone, Debug)]
pub struct Storage {
    data: ComponentValues,
    data_type: DataFieldType,
    count: usize,
}

impl Storage {
    fn new(data_type: DataFieldType) -> Self {
        let info = data_type.info();
        Self {
            data: ComponentValues::zeros(info.component_type, info.component_count * 2),
            data_type,
            count: info.component_count,
        }
    }

    pub fn data_type(&self) -> DataFieldType {
        self.data_type
    }

    pub fn component_type(&self) -> ComponentType {
        self.data.component_type()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn size_bytes(&self) -> usize {
        self.data_type.info().type_bytes
    }

    /// Typed view of the current value. `None` when `T` is the wrong type.
    pub fn values<T: Component>(&self) -> Option<&[T]> {
        T::values(&self.data).map(|values| &values[..self.count])
    }

    pub fn values_mut<T: Component>(&mut self) -> Option<&mut [T]> {
        let count = self.count;
        T::values_mut(&mut self.data).map(|values| &mut values[..count])
    }

    pub fn defaults<T: Component>(&self) -> Option<&[T]> {
        T::values(&self.data).map(|values| &values[self.count..])
    }

    pub fn current(&self) -> ComponentValues {
        self.component_values(0)
    }

    pub fn default_value(&self) -> ComponentValues {
        self.component_values(self.count)
    }

    fn component_values(&self, start: usize) -> ComponentValues {
        // Both halves always exist.
        self.data
            .range(start, self.count)
            .unwrap_or_else(|_| ComponentValues::zeros(self.component_type(), self.count))
    }

    /// Writes `values` into the current value starting at component `start`.
    pub fn write(&mut self, start: usize, values: &ComponentValues) -> Result<(), EvaluationError> {
        if start + values.len() > self.count {
            return Err(EvaluationError::ComponentOutOfRange {
                index: start + values.len().max(1) - 1,
                count: self.count,
            });
        }
        self.data.write(start, values)
    }

    pub fn set_value_from_string(&mut self, text: &str) -> Result<(), ParseError> {
        let values = ComponentValues::parse(self.component_type(), text, self.count)?;
        self.write_parsed(0, &values);
        Ok(())
    }

    fn set_default_from_string(&mut self, text: &str) -> Result<(), ParseError> {
        let values = ComponentValues::parse(self.component_type(), text, self.count)?;
        self.write_parsed(self.count, &values);
        Ok(())
    }

    // `values` has this storage's type and count, so the write always fits.
    fn write_parsed(&mut self, start: usize, values: &ComponentValues) {
        let written = self.data.write(start, values);
        debug_assert!(written.is_ok(), "storage write failed: {:?}", written);
    }

    pub fn value_as_string(&self) -> String {
        self.current().format()
    }

    pub fn reset_to_default(&mut self) {
        let defaults = self.default_value();
        self.write_parsed(0, &defaults);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StorageHandle(usize);

/// Storage for every variable seen by an interpreter, keyed by name and type.
/// Outlives recompiles so variables keep their values.
#[derive(Debug, Default)]
pub struct VariableStorage {
    slots: Vec<Storage>,
    keys: HashMap<(String, DataFieldType), StorageHandle>,
}

impl VariableStorage {
    /// Returns the storage for `variable`, creating it on first use.
    /// The default is re-parsed every call; the current value is only
    /// initialized from it when the storage is new.
    pub fn get(&mut self, variable: &Variable) -> Result<StorageHandle, ParseError> {
        let key = (variable.name.clone(), variable.data_type);

        if let Some(handle) = self.keys.get(&key) {
            let handle = *handle;
            self.slots[handle.0].set_default_from_string(&variable.dflt)?;
            return Ok(handle);
        }

        let mut storage = Storage::new(variable.data_type);
        storage.set_default_from_string(&variable.dflt)?;
        storage.reset_to_default();

        let handle = StorageHandle(self.slots.len());
        log::trace!(
            "Allocated storage for variable {} ({}, {} bytes)",
            variable.name,
            variable.data_type,
            storage.size_bytes()
        );
        self.slots.push(storage);
        self.keys.insert(key, handle);
        Ok(handle)
    }

    pub fn storage(&self, handle: StorageHandle) -> &Storage {
        &self.slots[handle.0]
    }

    pub fn storage_mut(&mut self, handle: StorageHandle) -> &mut Storage {
        &mut self.slots[handle.0]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.keys.clear();
    }
}

/// A graph variable bound to its storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeVariable {
    pub variable_index: usize,
    pub storage: StorageHandle,
}

/// Runtime variables of the compiled graph, indexed like `RenderGraph::variables`.
#[derive(Debug, Default)]
pub struct RuntimeVariables {
    storage: VariableStorage,
    variables: Vec<RuntimeVariable>,
}

impl RuntimeVariables {
    pub fn create(&mut self, render_graph: &RenderGraph) -> Result<(), InterpreterError> {
        self.variables.clear();

        for (variable_index, variable) in render_graph.variables.iter().enumerate() {
            let storage = match self.storage.get(variable) {
                Ok(storage) => storage,
                Err(source) => {
                    self.variables.clear();
                    return Err(InterpreterError::VariableDefault {
                        variable: variable.name.clone(),
                        source,
                    });
                }
            };
            self.variables.push(RuntimeVariable {
                variable_index,
                storage,
            });
        }

        Ok(())
    }

    /// Unbinds the variables but keeps their storage.
    pub fn unbind(&mut self) {
        self.variables.clear();
    }

    pub fn clear(&mut self) {
        self.variables.clear();
        self.storage.clear();
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RuntimeVariable> {
        self.variables.get(index)
    }

    pub fn storage(&self, index: usize) -> Option<&Storage> {
        self.variables
            .get(index)
            .map(|variable| self.storage.storage(variable.storage))
    }

    pub fn storage_mut(&mut self, index: usize) -> Option<&mut Storage> {
        let handle = self.variables.get(index)?.storage;
        Some(self.storage.storage_mut(handle))
    }

    pub fn values<T: Component>(&self, index: usize) -> Option<&[T]> {
        self.storage(index)?.values()
    }

    pub fn value_as_string(&self, index: usize) -> Option<String> {
        self.storage(index).map(Storage::value_as_string)
    }

    pub fn allocated_storage(&self) -> usize {
        self.storage.len()
    }
}
