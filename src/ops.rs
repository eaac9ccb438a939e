//! Uniform operation signature and the built-in frame/series operations
//!
//! Every operation shares one dynamic shape so a single dispatcher keyed by
//! name can stand in for per-operation glue:
//!
//! ```text
//! OpFn<C>: Fn(&mut C, &OpArgs) -> Result<Option<C>, FrameError>
//! ```
//!
//! `Ok(Some(_))` is a newly produced container; `Ok(None)` signals a strictly
//! in-place mutation of the input.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::frame::{Column, Frame, FrameError};
use crate::registry::InterceptionRegistry;
use crate::series::Series;
use crate::value::{DType, Value};

/// Dynamic operation over a container of kind `C`
pub type OpFn<C> = Arc<dyn Fn(&mut C, &OpArgs) -> Result<Option<C>, FrameError> + Send + Sync>;

/// Default row count for `head` and `tail`
const DEFAULT_WINDOW: usize = 5;

/// Positional and keyword arguments for a dispatched operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpArgs {
    positional: Vec<Value>,
    keyword: BTreeMap<String, Value>,
}

impl OpArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument
    pub fn kw(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.to_string(), value.into());
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn get_kw(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name)
    }

    fn require(&self, index: usize, op: &str) -> Result<&Value, FrameError> {
        self.get(index).ok_or_else(|| {
            FrameError::InvalidArgument(format!("{op} expects an argument at position {index}"))
        })
    }

    fn require_str(&self, index: usize, op: &str) -> Result<&str, FrameError> {
        self.require(index, op)?.as_str().ok_or_else(|| {
            FrameError::InvalidArgument(format!("{op} expects a string at position {index}"))
        })
    }

    fn kw_bool(&self, name: &str, default: bool) -> bool {
        self.get_kw(name).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Window size shared by `head`/`tail`/`sample`: first positional or `n=`
    fn window(&self, op: &str, default: Option<usize>) -> Result<usize, FrameError> {
        match self.get(0).or_else(|| self.get_kw("n")) {
            Some(value) => value.as_usize().ok_or_else(|| {
                FrameError::InvalidArgument(format!("{op} expects a non-negative row count"))
            }),
            None => default.ok_or_else(|| {
                FrameError::InvalidArgument(format!("{op} expects a row count"))
            }),
        }
    }

    /// Render a call signature: the full argument list, or an elided form
    /// when full signatures are not requested.
    pub fn render(&self, name: &str, full: bool) -> String {
        if !full {
            return if self.positional.is_empty() && self.keyword.is_empty() {
                format!("{name}()")
            } else {
                format!("{name}(..)")
            };
        }
        let mut out = String::new();
        let _ = write!(out, "{name}(");
        let mut first = true;
        for value in &self.positional {
            if !first {
                out.push_str(", ");
            }
            first = false;
            render_value(&mut out, value);
        }
        for (key, value) in &self.keyword {
            if !first {
                out.push_str(", ");
            }
            first = false;
            let _ = write!(out, "{key}=");
            render_value(&mut out, value);
        }
        out.push(')');
        out
    }
}

fn render_value(out: &mut String, value: &Value) {
    match value {
        Value::Str(s) => {
            let _ = write!(out, "{s:?}");
        }
        other => {
            let _ = write!(out, "{other}");
        }
    }
}

/// Comparison operator accepted by `query`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }

    pub fn eval(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// Register every built-in operation into the given registry.
///
/// Registration only seeds the dispatch tables with the real
/// implementations; it installs no instrumentation.
pub fn register_builtins(registry: &mut InterceptionRegistry) {
    let frame = registry.frame_table_mut();
    frame.register("query", Arc::new(frame_query));
    frame.register("drop", Arc::new(frame_drop));
    frame.register("dropna", Arc::new(frame_dropna));
    frame.register("fillna", Arc::new(frame_fillna));
    frame.register("assign", Arc::new(frame_assign));
    frame.register("rename", Arc::new(frame_rename));
    frame.register("astype", Arc::new(frame_astype));
    frame.register("sort_values", Arc::new(frame_sort_values));
    frame.register("head", Arc::new(frame_head));
    frame.register("tail", Arc::new(frame_tail));
    frame.register("sample", Arc::new(frame_sample));
    frame.register("copy", Arc::new(frame_copy));

    let series = registry.series_table_mut();
    series.register("head", Arc::new(series_head));
    series.register("tail", Arc::new(series_tail));
    series.register("dropna", Arc::new(series_dropna));
    series.register("fillna", Arc::new(series_fillna));
    series.register("sort_values", Arc::new(series_sort_values));
    series.register("copy", Arc::new(series_copy));
}

// ---- frame operations ----

/// `query(column, cmp, literal)`: keep rows where the comparison holds.
/// Null cells and non-comparable literals never match.
fn frame_query(frame: &mut Frame, args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    let column_name = args.require_str(0, "query")?;
    let cmp_token = args.require_str(1, "query")?;
    let cmp = Cmp::parse(cmp_token).ok_or_else(|| {
        FrameError::InvalidArgument(format!("query does not understand operator `{cmp_token}`"))
    })?;
    let literal = args.require(2, "query")?;
    let column = frame
        .column(column_name)
        .ok_or_else(|| FrameError::UnknownColumn(column_name.to_string()))?;
    let keep: Vec<usize> = column
        .values()
        .iter()
        .enumerate()
        .filter(|(_, value)| {
            value
                .compare(literal)
                .map(|ordering| cmp.eval(ordering))
                .unwrap_or(false)
        })
        .map(|(index, _)| index)
        .collect();
    Ok(Some(frame.select_rows(&keep)))
}

/// `drop(column, ...)`: remove the named columns
fn frame_drop(frame: &mut Frame, args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    if args.positional().is_empty() {
        return Err(FrameError::InvalidArgument(
            "drop expects at least one column name".to_string(),
        ));
    }
    let mut names = Vec::with_capacity(args.positional().len());
    for (index, _) in args.positional().iter().enumerate() {
        names.push(args.require_str(index, "drop")?);
    }
    Ok(Some(frame.drop_columns(&names)?))
}

/// `dropna(inplace=false)`: remove rows containing any null
fn frame_dropna(frame: &mut Frame, args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    let keep: Vec<usize> = (0..frame.row_count())
        .filter(|&row| !frame.row_has_null(row))
        .collect();
    let filtered = frame.select_rows(&keep);
    if args.kw_bool("inplace", false) {
        *frame = filtered;
        Ok(None)
    } else {
        Ok(Some(filtered))
    }
}

/// `fillna(value, inplace=false)`: replace nulls column by column
fn frame_fillna(frame: &mut Frame, args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    let value = args.require(0, "fillna")?.clone();
    if args.kw_bool("inplace", false) {
        frame.fill_nulls(&value);
        Ok(None)
    } else {
        let mut filled = frame.deep_copy();
        filled.fill_nulls(&value);
        Ok(Some(filled))
    }
}

/// `assign(name, value)`: add (or replace) a constant column
fn frame_assign(frame: &mut Frame, args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    let name = args.require_str(0, "assign")?;
    let value = args.require(1, "assign")?;
    let dtype = value.dtype().ok_or_else(|| {
        FrameError::InvalidArgument("assign needs a non-null constant".to_string())
    })?;
    let mut assigned = frame.deep_copy();
    assigned.push_column(Column::new(
        name,
        dtype,
        vec![value.clone(); frame.row_count()],
    ))?;
    Ok(Some(assigned))
}

/// `rename(old, new)`
fn frame_rename(frame: &mut Frame, args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    let old = args.require_str(0, "rename")?;
    let new = args.require_str(1, "rename")?;
    let mut renamed = frame.deep_copy();
    renamed.rename_column(old, new)?;
    Ok(Some(renamed))
}

/// `astype(column, dtype)`
fn frame_astype(frame: &mut Frame, args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    let column = args.require_str(0, "astype")?;
    let dtype_name = args.require_str(1, "astype")?;
    let dtype = DType::parse(dtype_name).ok_or_else(|| {
        FrameError::InvalidArgument(format!("astype does not know dtype `{dtype_name}`"))
    })?;
    let mut cast = frame.deep_copy();
    cast.cast_column(column, dtype)?;
    Ok(Some(cast))
}

/// `sort_values(by, ascending=true, inplace=false)`
fn frame_sort_values(frame: &mut Frame, args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    let by = args.require_str(0, "sort_values")?;
    let ascending = args.kw_bool("ascending", true);
    let order = frame.sorted_indices(by, ascending)?;
    if args.kw_bool("inplace", false) {
        frame.reorder_rows(&order);
        Ok(None)
    } else {
        Ok(Some(frame.select_rows(&order)))
    }
}

/// `head(n=5)`
fn frame_head(frame: &mut Frame, args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    let n = args.window("head", Some(DEFAULT_WINDOW))?;
    let keep: Vec<usize> = (0..frame.row_count().min(n)).collect();
    Ok(Some(frame.select_rows(&keep)))
}

/// `tail(n=5)`
fn frame_tail(frame: &mut Frame, args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    let n = args.window("tail", Some(DEFAULT_WINDOW))?;
    let rows = frame.row_count();
    let keep: Vec<usize> = (rows.saturating_sub(n)..rows).collect();
    Ok(Some(frame.select_rows(&keep)))
}

/// `sample(n, seed=)`: n rows without replacement, order randomized
fn frame_sample(frame: &mut Frame, args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    let n = args.window("sample", None)?;
    let keep = sample_indices(frame.row_count(), n, args.get_kw("seed"));
    Ok(Some(frame.select_rows(&keep)))
}

/// `copy`: full deep copy, recorded only under verbose tracing
fn frame_copy(frame: &mut Frame, _args: &OpArgs) -> Result<Option<Frame>, FrameError> {
    Ok(Some(frame.deep_copy()))
}

// ---- series operations ----

fn series_head(series: &mut Series, args: &OpArgs) -> Result<Option<Series>, FrameError> {
    let n = args.window("head", Some(DEFAULT_WINDOW))?;
    let keep: Vec<usize> = (0..series.len().min(n)).collect();
    Ok(Some(series.select_rows(&keep)))
}

fn series_tail(series: &mut Series, args: &OpArgs) -> Result<Option<Series>, FrameError> {
    let n = args.window("tail", Some(DEFAULT_WINDOW))?;
    let rows = series.len();
    let keep: Vec<usize> = (rows.saturating_sub(n)..rows).collect();
    Ok(Some(series.select_rows(&keep)))
}

fn series_dropna(series: &mut Series, args: &OpArgs) -> Result<Option<Series>, FrameError> {
    let keep: Vec<usize> = series
        .values()
        .iter()
        .enumerate()
        .filter(|(_, value)| !value.is_null())
        .map(|(index, _)| index)
        .collect();
    let filtered = series.select_rows(&keep);
    if args.kw_bool("inplace", false) {
        *series = filtered;
        Ok(None)
    } else {
        Ok(Some(filtered))
    }
}

fn series_fillna(series: &mut Series, args: &OpArgs) -> Result<Option<Series>, FrameError> {
    let value = args.require(0, "fillna")?.clone();
    if args.kw_bool("inplace", false) {
        series.fill_nulls(&value);
        Ok(None)
    } else {
        let mut filled = series.deep_copy();
        filled.fill_nulls(&value);
        Ok(Some(filled))
    }
}

fn series_sort_values(series: &mut Series, args: &OpArgs) -> Result<Option<Series>, FrameError> {
    let ascending = args.kw_bool("ascending", true);
    let order = series.sorted_indices(ascending);
    if args.kw_bool("inplace", false) {
        series.reorder_rows(&order);
        Ok(None)
    } else {
        Ok(Some(series.select_rows(&order)))
    }
}

fn series_copy(series: &mut Series, _args: &OpArgs) -> Result<Option<Series>, FrameError> {
    Ok(Some(series.deep_copy()))
}

/// Shuffle-and-truncate row selection shared by the sample operations
fn sample_indices(rows: usize, n: usize, seed: Option<&Value>) -> Vec<usize> {
    let mut rng = match seed.and_then(Value::as_usize) {
        Some(seed) => StdRng::seed_from_u64(seed as u64),
        None => StdRng::from_entropy(),
    };
    let mut indices: Vec<usize> = (0..rows).collect();
    indices.shuffle(&mut rng);
    indices.truncate(n.min(rows));
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Frame {
        Frame::new()
            .with_column(
                "age",
                DType::Int,
                vec![Value::Int(20), Value::Int(35), Value::Int(50), Value::Null],
            )
            .unwrap()
            .with_column(
                "name",
                DType::Str,
                vec![
                    Value::Str("ana".into()),
                    Value::Str("bo".into()),
                    Value::Str("cy".into()),
                    Value::Str("dee".into()),
                ],
            )
            .unwrap()
    }

    #[test]
    fn test_query_filters_and_skips_nulls() {
        let mut frame = people();
        let args = OpArgs::new().arg("age").arg(">").arg(30);
        let out = frame_query(&mut frame, &args).unwrap().unwrap();
        assert_eq!(out.row_count(), 2);
        // the null age row never matches
        let args = OpArgs::new().arg("age").arg("<=").arg(1000);
        let out = frame_query(&mut frame, &args).unwrap().unwrap();
        assert_eq!(out.row_count(), 3);
    }

    #[test]
    fn test_query_bad_operator() {
        let mut frame = people();
        let args = OpArgs::new().arg("age").arg("~").arg(30);
        assert!(matches!(
            frame_query(&mut frame, &args),
            Err(FrameError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_dropna_inplace_returns_none() {
        let mut frame = people();
        let args = OpArgs::new().kw("inplace", true);
        let out = frame_dropna(&mut frame, &args).unwrap();
        assert!(out.is_none());
        assert_eq!(frame.row_count(), 3);
    }

    #[test]
    fn test_dropna_default_leaves_input_alone() {
        let mut frame = people();
        let out = frame_dropna(&mut frame, &OpArgs::new()).unwrap().unwrap();
        assert_eq!(out.row_count(), 3);
        assert_eq!(frame.row_count(), 4);
    }

    #[test]
    fn test_sort_values_descending() {
        let mut frame = people();
        let args = OpArgs::new().arg("age").kw("ascending", false);
        let out = frame_sort_values(&mut frame, &args).unwrap().unwrap();
        assert_eq!(out.column("age").unwrap().values()[0], Value::Int(50));
        // null age still sorts last
        assert_eq!(out.column("age").unwrap().values()[3], Value::Null);
    }

    #[test]
    fn test_head_tail_window() {
        let mut frame = people();
        let out = frame_head(&mut frame, &OpArgs::new().arg(2)).unwrap().unwrap();
        assert_eq!(out.row_count(), 2);
        let out = frame_tail(&mut frame, &OpArgs::new()).unwrap().unwrap();
        assert_eq!(out.row_count(), 4);
    }

    #[test]
    fn test_sample_is_seed_stable() {
        let mut frame = people();
        let args = OpArgs::new().arg(2).kw("seed", 7);
        let first = frame_sample(&mut frame, &args).unwrap().unwrap();
        let second = frame_sample(&mut frame, &args).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.row_count(), 2);
    }

    #[test]
    fn test_assign_adds_constant_column() {
        let mut frame = people();
        let args = OpArgs::new().arg("country").arg("PE");
        let out = frame_assign(&mut frame, &args).unwrap().unwrap();
        assert_eq!(out.column_count(), 3);
        assert_eq!(out.dtype_of("country"), Some(DType::Str));
        assert_eq!(frame.column_count(), 2);
    }

    #[test]
    fn test_astype_unknown_dtype() {
        let mut frame = people();
        let args = OpArgs::new().arg("age").arg("datetime");
        assert!(matches!(
            frame_astype(&mut frame, &args),
            Err(FrameError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_series_fillna_inplace() {
        let mut series = Series::new("x", DType::Int, vec![Value::Null, Value::Int(2)]);
        let args = OpArgs::new().arg(0).kw("inplace", true);
        assert!(series_fillna(&mut series, &args).unwrap().is_none());
        assert_eq!(series.values()[0], Value::Int(0));
    }

    #[test]
    fn test_render_full_signature() {
        let args = OpArgs::new().arg("age").arg(">").arg(30).kw("inplace", true);
        assert_eq!(
            args.render("query", true),
            "query(\"age\", \">\", 30, inplace=true)"
        );
    }

    #[test]
    fn test_render_short_signature() {
        let args = OpArgs::new().arg("age");
        assert_eq!(args.render("drop", false), "drop(..)");
        assert_eq!(OpArgs::new().render("copy", false), "copy()");
    }

    #[test]
    fn test_cmp_eval_table() {
        assert!(Cmp::Ge.eval(Ordering::Equal));
        assert!(Cmp::Ge.eval(Ordering::Greater));
        assert!(!Cmp::Ge.eval(Ordering::Less));
        assert!(Cmp::Ne.eval(Ordering::Less));
        assert!(!Cmp::Eq.eval(Ordering::Greater));
    }
}
