//! Single-column variant of the operable container

use crate::frame::{sort_order, FrameError};
use crate::ops::OpArgs;
use crate::registry::{InterceptionRegistry, OpTable, Operable, TargetKind};
use crate::value::{DType, Value};

/// A named, typed sequence of values
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: String,
    dtype: DType,
    values: Vec<Value>,
}

impl Series {
    pub fn new(name: impl Into<String>, dtype: DType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mem_usage(&self) -> usize {
        self.name.len() + self.values.iter().map(Value::approx_size).sum::<usize>()
    }

    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// New series containing the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            dtype: self.dtype,
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }

    pub fn reorder_rows(&mut self, indices: &[usize]) {
        self.values = indices.iter().map(|&i| self.values[i].clone()).collect();
    }

    /// Row order that sorts the values. Nulls sort last.
    pub fn sorted_indices(&self, ascending: bool) -> Vec<usize> {
        sort_order(&self.values, ascending)
    }

    pub fn fill_nulls(&mut self, value: &Value) {
        if let Some(replacement) = value.cast(self.dtype) {
            if replacement.is_null() {
                return;
            }
            for cell in &mut self.values {
                if cell.is_null() {
                    *cell = replacement.clone();
                }
            }
        }
    }

    /// Invoke a named operation through the process-wide dispatcher.
    ///
    /// `Ok(None)` means the operation mutated this series in place.
    pub fn call(&mut self, op: &str, args: &OpArgs) -> Result<Option<Self>, FrameError> {
        crate::tracer::global().call(self, op, args)
    }
}

impl Operable for Series {
    const KIND: TargetKind = TargetKind::Series;

    fn table(registry: &InterceptionRegistry) -> &OpTable<Self> {
        registry.series_table()
    }

    fn table_mut(registry: &mut InterceptionRegistry) -> &mut OpTable<Self> {
        registry.series_table_mut()
    }

    fn row_count(&self) -> usize {
        self.len()
    }

    fn column_names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn dtype_of(&self, column: &str) -> Option<DType> {
        (column == self.name).then_some(self.dtype)
    }

    fn mem_usage(&self) -> usize {
        Series::mem_usage(self)
    }

    fn deep_copy(&self) -> Self {
        Series::deep_copy(self)
    }
}
