//! Supplementary cosmetic operations, outside the core interception set
//!
//! These are registered alongside the built-ins but only enter the default
//! allow-list when the `extras` option is set.

use std::sync::Arc;

use crate::frame::{Column, Frame, FrameError};
use crate::ops::OpArgs;
use crate::registry::InterceptionRegistry;
use crate::series::Series;
use crate::value::{DType, Value};

pub fn register_extras(registry: &mut InterceptionRegistry) {
    registry
        .frame_table_mut()
        .register("describe", Arc::new(frame_describe));
    registry
        .series_table_mut()
        .register("nlargest", Arc::new(series_nlargest));
}

/// `describe`: one summary row per input column
fn frame_describe(frame: &mut Frame, _args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    let mut names = Vec::new();
    let mut dtypes = Vec::new();
    let mut counts = Vec::new();
    let mut nulls = Vec::new();
    let mut mins = Vec::new();
    let mut maxs = Vec::new();

    for name in frame.column_names() {
        let column = frame
            .column(&name)
            .ok_or_else(|| FrameError::UnknownColumn(name.clone()))?;
        let non_null: Vec<&Value> = column.values().iter().filter(|v| !v.is_null()).collect();
        let min = non_null
            .iter()
            .copied()
            .min_by(|a, b| a.compare(b).unwrap_or(std::cmp::Ordering::Equal));
        let max = non_null
            .iter()
            .copied()
            .max_by(|a, b| a.compare(b).unwrap_or(std::cmp::Ordering::Equal));

        names.push(Value::Str(name.clone()));
        dtypes.push(Value::Str(column.dtype().to_string()));
        counts.push(Value::Int(non_null.len() as i64));
        nulls.push(Value::Int((column.len() - non_null.len()) as i64));
        mins.push(min.map_or(Value::Null, |v| Value::Str(v.to_string())));
        maxs.push(max.map_or(Value::Null, |v| Value::Str(v.to_string())));
    }

    let mut summary = Frame::new();
    summary.push_column(Column::new("column", DType::Str, names))?;
    summary.push_column(Column::new("dtype", DType::Str, dtypes))?;
    summary.push_column(Column::new("count", DType::Int, counts))?;
    summary.push_column(Column::new("nulls", DType::Int, nulls))?;
    summary.push_column(Column::new("min", DType::Str, mins))?;
    summary.push_column(Column::new("max", DType::Str, maxs))?;
    Ok(Some(summary))
}

/// `nlargest(n)`: the n largest values of a numeric series, descending
fn series_nlargest(series: &mut Series, args: &OpArgs) -> Result<Option<Series>, FrameError> {
    let n = args
        .get(0)
        .and_then(Value::as_usize)
        .ok_or_else(|| FrameError::InvalidArgument("nlargest expects a row count".to_string()))?;
    if !matches!(series.dtype(), DType::Int | DType::Float) {
        return Err(FrameError::TypeMismatch {
            column: series.name().to_string(),
            to: series.dtype(),
        });
    }
    let mut order = series.sorted_indices(false);
    // nulls sort last in either direction; cut them before truncating
    let non_null = series.values().iter().filter(|v| !v.is_null()).count();
    order.truncate(non_null.min(n));
    Ok(Some(series.select_rows(&order)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_summarizes_each_column() {
        let mut frame = Frame::new()
            .with_column(
                "age",
                DType::Int,
                vec![Value::Int(30), Value::Null, Value::Int(10)],
            )
            .unwrap()
            .with_column(
                "name",
                DType::Str,
                vec![
                    Value::Str("b".into()),
                    Value::Str("a".into()),
                    Value::Str("c".into()),
                ],
            )
            .unwrap();
        let summary = frame_describe(&mut frame, &OpArgs::new()).unwrap().unwrap();
        assert_eq!(summary.row_count(), 2);
        assert_eq!(summary.column("count").unwrap().values()[0], Value::Int(2));
        assert_eq!(summary.column("nulls").unwrap().values()[0], Value::Int(1));
        assert_eq!(
            summary.column("min").unwrap().values()[0],
            Value::Str("10".into())
        );
        assert_eq!(
            summary.column("max").unwrap().values()[1],
            Value::Str("c".into())
        );
    }

    #[test]
    fn test_nlargest_drops_nulls_and_sorts_descending() {
        let mut series = Series::new(
            "score",
            DType::Int,
            vec![Value::Int(5), Value::Null, Value::Int(9), Value::Int(1)],
        );
        let top = series_nlargest(&mut series, &OpArgs::new().arg(3))
            .unwrap()
            .unwrap();
        assert_eq!(
            top.values(),
            &[Value::Int(9), Value::Int(5), Value::Int(1)]
        );
    }

    #[test]
    fn test_nlargest_rejects_non_numeric() {
        let mut series = Series::new("tag", DType::Str, vec![Value::Str("x".into())]);
        assert!(matches!(
            series_nlargest(&mut series, &OpArgs::new().arg(1)),
            Err(FrameError::TypeMismatch { .. })
        ));
    }
}
