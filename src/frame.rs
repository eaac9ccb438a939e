//! Row-oriented tabular container with named, typed columns
//!
//! `Frame` itself is plain data: the methods here are the uninstrumented
//! building blocks the registered operations are made of. Instrumented
//! calls go through [`Frame::call`], which dispatches by operation name.

use std::cmp::Ordering;
use thiserror::Error;

use crate::ops::OpArgs;
use crate::registry::{InterceptionRegistry, OpTable, Operable, TargetKind};
use crate::value::{DType, Value};

/// Functional errors raised by container operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("no operation `{name}` registered for {kind}")]
    UnknownOperation { kind: TargetKind, name: String },
    #[error("cannot cast column `{column}` to {to}")]
    TypeMismatch { column: String, to: DType },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("column `{column}` has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// A named, typed column of values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: DType,
    values: Vec<Value>,
}

impl Column {
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

    fn approx_size(&self) -> usize {
        self.name.len() + self.values.iter().map(Value::approx_size).sum::<usize>()
    }
}

/// Rows by named columns; all columns have equal length
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append, enforcing equal column lengths
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        dtype: DType,
        values: Vec<Value>,
    ) -> Result<Self, FrameError> {
        self.push_column(Column::new(name, dtype, values))?;
        Ok(self)
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn dtype_of(&self, name: &str) -> Option<DType> {
        self.column(name).map(Column::dtype)
    }

    /// Approximate memory footprint in bytes
    pub fn mem_usage(&self) -> usize {
        self.columns.iter().map(Column::approx_size).sum()
    }

    /// Full independent copy; cell values are owned, so a clone is deep
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    pub fn push_column(&mut self, column: Column) -> Result<(), FrameError> {
        if !self.columns.is_empty() && column.len() != self.row_count() {
            return Err(FrameError::LengthMismatch {
                column: column.name,
                expected: self.row_count(),
                actual: column.values.len(),
            });
        }
        // assign semantics: replace an existing column of the same name
        self.columns.retain(|c| c.name != column.name);
        self.columns.push(column);
        Ok(())
    }

    /// New frame containing the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                dtype: c.dtype,
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        Self { columns }
    }

    /// Reorder rows in place
    pub fn reorder_rows(&mut self, indices: &[usize]) {
        for column in &mut self.columns {
            column.values = indices.iter().map(|&i| column.values[i].clone()).collect();
        }
    }

    pub fn row_has_null(&self, row: usize) -> bool {
        self.columns.iter().any(|c| c.values[row].is_null())
    }

    /// Row order that sorts by the given column. Nulls sort last.
    pub fn sorted_indices(&self, by: &str, ascending: bool) -> Result<Vec<usize>, FrameError> {
        let column = self
            .column(by)
            .ok_or_else(|| FrameError::UnknownColumn(by.to_string()))?;
        Ok(sort_order(column.values(), ascending))
    }

    /// New frame without the given columns; every name must exist
    pub fn drop_columns(&self, names: &[&str]) -> Result<Self, FrameError> {
        for name in names {
            if self.column(name).is_none() {
                return Err(FrameError::UnknownColumn((*name).to_string()));
            }
        }
        let columns = self
            .columns
            .iter()
            .filter(|c| !names.contains(&c.name.as_str()))
            .cloned()
            .collect();
        Ok(Self { columns })
    }

    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<(), FrameError> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == old)
            .ok_or_else(|| FrameError::UnknownColumn(old.to_string()))?;
        column.name = new.to_string();
        Ok(())
    }

    pub fn cast_column(&mut self, name: &str, to: DType) -> Result<(), FrameError> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| FrameError::UnknownColumn(name.to_string()))?;
        let mut converted = Vec::with_capacity(column.values.len());
        for value in &column.values {
            let cast = value.cast(to).ok_or_else(|| FrameError::TypeMismatch {
                column: name.to_string(),
                to,
            })?;
            converted.push(cast);
        }
        column.values = converted;
        column.dtype = to;
        Ok(())
    }

    /// Replace nulls with `value` in every column the value converts into.
    /// Columns the value cannot be cast for are left untouched.
    pub fn fill_nulls(&mut self, value: &Value) {
        for column in &mut self.columns {
            if let Some(replacement) = value.cast(column.dtype) {
                if replacement.is_null() {
                    continue;
                }
                for cell in &mut column.values {
                    if cell.is_null() {
                        *cell = replacement.clone();
                    }
                }
            }
        }
    }

    /// Invoke a named operation through the process-wide dispatcher.
    ///
    /// `Ok(None)` means the operation mutated this frame in place.
    pub fn call(&mut self, op: &str, args: &OpArgs) -> Result<Option<Self>, FrameError> {
        crate::tracer::global().call(self, op, args)
    }
}

/// Stable sort order over one column's values, nulls last either direction
pub(crate) fn sort_order(values: &[Value], ascending: bool) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| {
        let (va, vb) = (&values[a], &values[b]);
        match (va.is_null(), vb.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = va.compare(vb).unwrap_or(Ordering::Equal);
                if ascending {
                    ord
                } else {
                    ord.reverse()
                }
            }
        }
    });
    indices
}

impl Operable for Frame {
    const KIND: TargetKind = TargetKind::Frame;

    fn table(registry: &InterceptionRegistry) -> &OpTable<Self> {
        registry.frame_table()
    }

    fn table_mut(registry: &mut InterceptionRegistry) -> &mut OpTable<Self> {
        registry.frame_table_mut()
    }

    fn row_count(&self) -> usize {
        Frame::row_count(self)
    }

    fn column_names(&self) -> Vec<String> {
        Frame::column_names(self)
    }

    fn dtype_of(&self, column: &str) -> Option<DType> {
        Frame::dtype_of(self, column)
    }

    fn mem_usage(&self) -> usize {
        Frame::mem_usage(self)
    }

    fn deep_copy(&self) -> Self {
        Frame::deep_copy(self)
    }
}
