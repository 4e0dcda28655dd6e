//! Layout: column → tensor dimension assignment.
//!
//! A [`Layout`] is built once per (schema, role) from a fitting pass over
//! representative data and then threaded through every encode and decode
//! call. Each column gets a resolved [`ColumnLayout`]:
//!
//! - **Numeric** (continuous, count): two dimensions, `(value, missing_flag)`,
//!   plus the observed `[min, max]` range.
//! - **Categorical** (categorical, ordinal): one dimension per distinct value
//!   observed at fit time.
//!
//! Indices are assigned in column order, starting at zero, with no gaps or
//! overlaps. The total is [`Layout::dimensions`]. The end-of-sequence flag is
//! not part of the layout; it lives one past the last assigned index.
//!
//! # Example
//!
//! ```rust
//! use seqtensor::kernel::{CellValue, ColumnType, Layout};
//!
//! let columns: Vec<Vec<CellValue>> = vec![
//!     vec![1.0.into(), 4.0.into(), None::<f64>.into()],
//!     vec!["a".into(), "b".into(), "a".into()],
//! ];
//! let layout = Layout::build(&columns, &[ColumnType::Continuous, ColumnType::Categorical]).unwrap();
//!
//! assert_eq!(layout.dimensions(), 4);
//! ```

use crate::error::{Result, SeqTensorError};
use crate::kernel::value::{CellValue, ColumnType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Observed `[min, max]` of a numeric column.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `max - min`.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Single-valued column: every observed value normalizes to 0.0.
    pub fn is_degenerate(&self) -> bool {
        self.span() == 0.0
    }
}

/// Mapping from category value to its assigned dimension.
///
/// Iteration is in ascending dimension order, which is also the order the
/// values were first observed at fit time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "Vec<(CellValue, usize)>",
    try_from = "Vec<(CellValue, usize)>"
)]
pub struct CategoryIndex {
    entries: IndexMap<CellValue, usize>,
}

impl CategoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimension assigned to `value`, if it was seen at fit time.
    pub fn get(&self, value: &CellValue) -> Option<usize> {
        self.entries.get(&value.canonical()).copied()
    }

    /// `(category, dimension)` pairs in ascending dimension order.
    pub fn iter(&self) -> impl Iterator<Item = (&CellValue, usize)> {
        self.entries.iter().map(|(value, &index)| (value, index))
    }

    /// Category values in ascending dimension order.
    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.entries.keys()
    }

    fn push(&mut self, value: CellValue, index: usize) {
        self.entries.insert(value, index);
    }
}

impl From<CategoryIndex> for Vec<(CellValue, usize)> {
    fn from(index: CategoryIndex) -> Self {
        index.entries.into_iter().collect()
    }
}

impl TryFrom<Vec<(CellValue, usize)>> for CategoryIndex {
    type Error = SeqTensorError;

    fn try_from(mut pairs: Vec<(CellValue, usize)>) -> Result<Self> {
        pairs.sort_by_key(|&(_, index)| index);
        let mut entries = IndexMap::with_capacity(pairs.len());
        let mut last_index: Option<usize> = None;
        for (value, index) in pairs {
            if last_index == Some(index) {
                return Err(SeqTensorError::MalformedLayout(format!(
                    "dimension {} assigned to more than one category",
                    index
                )));
            }
            last_index = Some(index);
            let value = value.canonical();
            if entries.insert(value.clone(), index).is_some() {
                return Err(SeqTensorError::MalformedLayout(format!(
                    "category {} listed twice",
                    value
                )));
            }
        }
        Ok(Self { entries })
    }
}

/// Resolved per-column layout entry.
///
/// Dispatch on the column's type happens once, when the layout is built;
/// the codec only ever matches on this variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "lowercase")]
pub enum ColumnLayout {
    /// Continuous or count column.
    Numeric {
        kind: ColumnType,
        range: NumericRange,
        value_index: usize,
        missing_index: usize,
    },
    /// Categorical or ordinal column.
    Categorical {
        kind: ColumnType,
        categories: CategoryIndex,
    },
}

impl ColumnLayout {
    /// Declared type of the column.
    pub fn kind(&self) -> ColumnType {
        match self {
            ColumnLayout::Numeric { kind, .. } | ColumnLayout::Categorical { kind, .. } => *kind,
        }
    }

    /// Number of tensor dimensions the column occupies.
    pub fn width(&self) -> usize {
        match self {
            ColumnLayout::Numeric { .. } => 2,
            ColumnLayout::Categorical { categories, .. } => categories.len(),
        }
    }

    /// All dimensions assigned to the column.
    pub fn indices(&self) -> Vec<usize> {
        match self {
            ColumnLayout::Numeric {
                value_index,
                missing_index,
                ..
            } => vec![*value_index, *missing_index],
            ColumnLayout::Categorical { categories, .. } => {
                categories.iter().map(|(_, index)| index).collect()
            }
        }
    }

    /// Count columns decode to integers.
    pub fn rounds_to_int(&self) -> bool {
        self.kind() == ColumnType::Count
    }
}

/// Immutable dimension assignment for one set of columns.
///
/// Deserialization runs [`Layout::validate`], so a persisted layout with
/// gaps, overlaps or out-of-range indices is rejected on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayoutRecord")]
pub struct Layout {
    columns: Vec<ColumnLayout>,
    dimensions: usize,
}

/// Unchecked wire form of [`Layout`].
#[derive(Deserialize)]
struct LayoutRecord {
    columns: Vec<ColumnLayout>,
    dimensions: usize,
}

impl TryFrom<LayoutRecord> for Layout {
    type Error = SeqTensorError;

    fn try_from(record: LayoutRecord) -> Result<Self> {
        let layout = Self {
            columns: record.columns,
            dimensions: record.dimensions,
        };
        layout.validate()?;
        Ok(layout)
    }
}

impl Layout {
    /// Fit a layout from per-column values and their declared types.
    ///
    /// `columns[i]` holds every observed value of column `i`; `types[i]` is
    /// its declared type. Missing values do not affect numeric ranges.
    ///
    /// # Errors
    /// - [`SeqTensorError::ColumnCountMismatch`] if the slices differ in length
    /// - [`SeqTensorError::EmptyColumn`] if a numeric column has no non-missing
    ///   value or a categorical column has no value at all
    /// - [`SeqTensorError::NonFiniteValue`] on an infinite numeric value
    /// - [`SeqTensorError::NonNumericValue`] on a string in a numeric column
    pub fn build<C: AsRef<[CellValue]>>(columns: &[C], types: &[ColumnType]) -> Result<Self> {
        if columns.len() != types.len() {
            return Err(SeqTensorError::ColumnCountMismatch {
                expected: types.len(),
                got: columns.len(),
            });
        }

        let mut dimensions = 0;
        let mut layouts = Vec::with_capacity(types.len());

        for (column, (values, &kind)) in columns.iter().zip(types).enumerate() {
            let values = values.as_ref();
            let layout = if kind.is_numeric() {
                let range = fit_range(column, values)?;
                let layout = ColumnLayout::Numeric {
                    kind,
                    range,
                    value_index: dimensions,
                    missing_index: dimensions + 1,
                };
                dimensions += 2;
                layout
            } else {
                let mut categories = CategoryIndex::new();
                for value in values {
                    let value = value.canonical();
                    if !categories.entries.contains_key(&value) {
                        categories.push(value, dimensions);
                        dimensions += 1;
                    }
                }
                if categories.is_empty() {
                    return Err(SeqTensorError::EmptyColumn(column));
                }
                ColumnLayout::Categorical { kind, categories }
            };
            layouts.push(layout);
        }

        debug!(
            "Built layout: {} columns, {} dimensions",
            layouts.len(),
            dimensions
        );

        Ok(Self {
            columns: layouts,
            dimensions,
        })
    }

    /// Fit a layout from declaration strings such as `"continuous"`.
    ///
    /// Fails with [`SeqTensorError::UnsupportedColumnType`] on any string
    /// outside the four recognized kinds.
    pub fn from_declared<C: AsRef<[CellValue]>>(columns: &[C], types: &[&str]) -> Result<Self> {
        let types = types
            .iter()
            .map(|t| t.parse::<ColumnType>())
            .collect::<Result<Vec<_>>>()?;
        Self::build(columns, &types)
    }

    /// Assemble a layout from explicit entries and check the index invariant.
    pub fn from_columns(columns: Vec<ColumnLayout>) -> Result<Self> {
        let dimensions = columns.iter().map(ColumnLayout::width).sum();
        let layout = Self {
            columns,
            dimensions,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Total number of dimensions assigned to columns.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnLayout] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnLayout> {
        self.columns.get(index)
    }

    /// Declared types, in column order.
    pub fn types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(ColumnLayout::kind).collect()
    }

    /// Check that `dimensions` equals the summed column widths, that the
    /// assigned indices cover exactly `[0, dimensions)` once each, that
    /// numeric ranges are finite and ordered, and that categorical columns
    /// are non-empty.
    ///
    /// Layouts from [`Layout::build`] always pass; this guards layouts that
    /// were deserialized or assembled by hand.
    pub fn validate(&self) -> Result<()> {
        let assigned: usize = self.columns.iter().map(ColumnLayout::width).sum();
        if assigned != self.dimensions {
            return Err(SeqTensorError::MalformedLayout(format!(
                "dimensions {} do not match the {} assigned by its columns",
                self.dimensions, assigned
            )));
        }

        let mut seen = vec![false; self.dimensions];
        for (column, layout) in self.columns.iter().enumerate() {
            match layout {
                ColumnLayout::Numeric { kind, range, .. } => {
                    if !kind.is_numeric() {
                        return Err(SeqTensorError::MalformedLayout(format!(
                            "column {} declared {} but has a numeric layout",
                            column, kind
                        )));
                    }
                    if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max
                    {
                        return Err(SeqTensorError::MalformedLayout(format!(
                            "column {} has invalid range [{}, {}]",
                            column, range.min, range.max
                        )));
                    }
                }
                ColumnLayout::Categorical { kind, categories } => {
                    if kind.is_numeric() {
                        return Err(SeqTensorError::MalformedLayout(format!(
                            "column {} declared {} but has a categorical layout",
                            column, kind
                        )));
                    }
                    if categories.is_empty() {
                        return Err(SeqTensorError::MalformedLayout(format!(
                            "column {} has no categories",
                            column
                        )));
                    }
                }
            }

            for index in layout.indices() {
                match seen.get_mut(index) {
                    Some(slot) if !*slot => *slot = true,
                    Some(_) => {
                        return Err(SeqTensorError::MalformedLayout(format!(
                            "dimension {} assigned twice",
                            index
                        )))
                    }
                    None => {
                        return Err(SeqTensorError::MalformedLayout(format!(
                            "dimension {} outside [0, {})",
                            index, self.dimensions
                        )))
                    }
                }
            }
        }

        if let Some(gap) = seen.iter().position(|&s| !s) {
            return Err(SeqTensorError::MalformedLayout(format!(
                "dimension {} is not assigned",
                gap
            )));
        }
        Ok(())
    }
}

/// Min and max over the non-missing values of a numeric column.
fn fit_range(column: usize, values: &[CellValue]) -> Result<NumericRange> {
    let mut range: Option<NumericRange> = None;
    for value in values {
        let Some(v) = value.to_finite(column)? else {
            continue;
        };
        range = Some(match range {
            Some(r) => NumericRange::new(r.min.min(v), r.max.max(v)),
            None => NumericRange::new(v, v),
        });
    }
    range.ok_or(SeqTensorError::EmptyColumn(column))
}
