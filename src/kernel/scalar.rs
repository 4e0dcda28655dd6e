//! Scalar codec: one cell ↔ its dimensions in a tensor row.
//!
//! # Numeric columns
//!
//! Values are scaled linearly so that the fitted `[min, max]` maps onto
//! `[-1, 1]`. Out-of-range values are not clamped. A second dimension carries
//! the missing flag:
//!
//! | input     | value dim                    | missing dim |
//! |-----------|------------------------------|-------------|
//! | `v`       | `2 * (v - min) / span - 1`   | `0.0`       |
//! | missing   | `0.0`                        | `1.0`       |
//!
//! A degenerate range (`min == max`) scales every observed value to `0.0` and
//! decodes back to `min`.
//!
//! Encoding rejects infinite values, and values so far outside the range that
//! they overflow `f32`, with [`SeqTensorError::NonFiniteValue`]. On the decode
//! side, model output that does not scale back to a finite number (NaN, `inf`)
//! decodes as missing, as does a count too large for `i64`.
//!
//! # Categorical columns
//!
//! One-hot: `1.0` in the category's dimension. Decoding picks the category
//! with the strictly greatest score, scanning in ascending dimension order,
//! so ties resolve to the lowest dimension.

use crate::error::{Result, SeqTensorError};
use crate::kernel::layout::{CategoryIndex, ColumnLayout, NumericRange};
use crate::kernel::value::CellValue;
use ndarray::{ArrayView1, ArrayViewMut1};

/// Flag dimensions (missing, end of sequence) count as set above this value.
pub const FLAG_THRESHOLD: f32 = 0.5;

/// Scale a numeric value into `[-1, 1]` and compute its missing flag.
///
/// Returns `(scaled, missing_flag)`. `None` and NaN emit `(0.0, 1.0)`.
pub fn normalize(value: Option<f64>, range: NumericRange) -> (f32, f32) {
    match value {
        Some(v) if !v.is_nan() => {
            let scaled = if range.is_degenerate() {
                0.0
            } else {
                2.0 * (v - range.min) / range.span() - 1.0
            };
            (scaled as f32, 0.0)
        }
        _ => (0.0, 1.0),
    }
}

/// Invert [`normalize`].
///
/// Returns `None` when `missing_flag > 0.5` or the result is not finite.
/// Counts round half to even.
pub fn denormalize(
    scaled: f32,
    missing_flag: f32,
    range: NumericRange,
    round_to_int: bool,
) -> Option<f64> {
    if missing_flag > FLAG_THRESHOLD {
        return None;
    }

    let value = (scaled as f64 + 1.0) * range.span() / 2.0 + range.min;
    if !value.is_finite() {
        return None;
    }
    if round_to_int {
        Some(value.round_ties_even())
    } else {
        Some(value)
    }
}

/// Write `1.0` into the dimension assigned to `value`.
///
/// # Errors
/// [`SeqTensorError::UnknownCategory`] if `value` was not seen at fit time.
pub fn one_hot_encode(
    mut row: ArrayViewMut1<'_, f32>,
    column: usize,
    value: &CellValue,
    categories: &CategoryIndex,
) -> Result<()> {
    let index = categories
        .get(value)
        .ok_or_else(|| SeqTensorError::UnknownCategory {
            column,
            value: value.to_string(),
        })?;
    row[index] = 1.0;
    Ok(())
}

/// The category whose dimension holds the greatest score.
///
/// Ties keep the lowest dimension. If no score exceeds `-inf` (all NaN or
/// `-inf`), the lowest-dimension category is returned. `None` only for an
/// empty category set.
pub fn one_hot_decode<'a>(
    row: ArrayView1<'_, f32>,
    categories: &'a CategoryIndex,
) -> Option<&'a CellValue> {
    let mut selected: Option<&CellValue> = None;
    let mut best = f32::NEG_INFINITY;
    for (category, index) in categories.iter() {
        let score = row[index];
        if score > best {
            best = score;
            selected = Some(category);
        }
    }
    selected.or_else(|| categories.values().next())
}

/// Encode one cell into `row` according to its column layout.
///
/// # Errors
/// - [`SeqTensorError::NonFiniteValue`] if a numeric value is infinite or
///   scales outside the `f32` range
/// - [`SeqTensorError::NonNumericValue`] on a string in a numeric column
/// - [`SeqTensorError::UnknownCategory`] on an unseen category
pub fn encode_cell(
    mut row: ArrayViewMut1<'_, f32>,
    column: usize,
    value: &CellValue,
    layout: &ColumnLayout,
) -> Result<()> {
    match layout {
        ColumnLayout::Numeric {
            range,
            value_index,
            missing_index,
            ..
        } => {
            let numeric = value.to_finite(column)?;
            let (scaled, missing) = normalize(numeric, *range);
            if let Some(v) = numeric.filter(|_| !scaled.is_finite()) {
                return Err(SeqTensorError::NonFiniteValue { column, value: v });
            }
            row[*value_index] = scaled;
            row[*missing_index] = missing;
            Ok(())
        }
        ColumnLayout::Categorical { categories, .. } => {
            one_hot_encode(row, column, value, categories)
        }
    }
}

/// Decode one cell from `row` according to its column layout.
///
/// Continuous columns yield `Float`, count columns `Int`, missing numerics
/// `Null`; categorical columns yield the stored category value. A count
/// outside the `i64` range decodes as `Null`.
pub fn decode_cell(row: ArrayView1<'_, f32>, layout: &ColumnLayout) -> Result<CellValue> {
    match layout {
        ColumnLayout::Numeric {
            range,
            value_index,
            missing_index,
            ..
        } => {
            let round = layout.rounds_to_int();
            Ok(
                match denormalize(row[*value_index], row[*missing_index], *range, round) {
                    None => CellValue::Null,
                    Some(v) if round => to_count(v),
                    Some(v) => CellValue::Float(v),
                },
            )
        }
        ColumnLayout::Categorical { categories, .. } => one_hot_decode(row, categories)
            .cloned()
            .ok_or_else(|| SeqTensorError::MalformedLayout("column has no categories".into())),
    }
}

// i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
fn to_count(value: f64) -> CellValue {
    if value >= i64::MIN as f64 && value < i64::MAX as f64 {
        CellValue::Int(value as i64)
    } else {
        CellValue::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::layout::Layout;
    use crate::kernel::value::ColumnType;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};
    use proptest::prelude::*;

    fn categories(values: &[&str]) -> CategoryIndex {
        let columns = vec![values.iter().map(|&v| CellValue::from(v)).collect::<Vec<_>>()];
        let layout = Layout::build(&columns, &[ColumnType::Categorical]).unwrap();
        match &layout.columns()[0] {
            ColumnLayout::Categorical { categories, .. } => categories.clone(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_normalize_bounds() {
        let range = NumericRange::new(0.0, 10.0);
        assert_eq!(normalize(Some(0.0), range), (-1.0, 0.0));
        assert_eq!(normalize(Some(10.0), range), (1.0, 0.0));
        assert_eq!(normalize(Some(5.0), range), (0.0, 0.0));
    }

    #[test]
    fn test_normalize_does_not_clamp() {
        let range = NumericRange::new(0.0, 10.0);
        let (scaled, flag) = normalize(Some(20.0), range);
        assert_abs_diff_eq!(scaled, 3.0);
        assert_eq!(flag, 0.0);
    }

    #[test]
    fn test_missing_sentinel() {
        let range = NumericRange::new(-3.0, 7.0);
        assert_eq!(normalize(None, range), (0.0, 1.0));
        assert_eq!(normalize(Some(f64::NAN), range), (0.0, 1.0));
        assert_eq!(denormalize(0.0, 1.0, range, false), None);
        assert_eq!(denormalize(0.3, 0.51, range, true), None);
    }

    #[test]
    fn test_degenerate_range() {
        let range = NumericRange::new(4.0, 4.0);
        assert_eq!(normalize(Some(4.0), range), (0.0, 0.0));
        assert_eq!(denormalize(0.0, 0.0, range, false), Some(4.0));
        assert_eq!(denormalize(0.9, 0.0, range, false), Some(4.0));
    }

    #[test]
    fn test_count_rounding() {
        let range = NumericRange::new(0.0, 10.0);
        let (scaled, flag) = normalize(Some(7.2), range);
        assert_eq!(denormalize(scaled, flag, range, true), Some(7.0));

        // Half-way values round to even
        let (scaled, flag) = normalize(Some(2.5), range);
        assert_eq!(denormalize(scaled, flag, range, true), Some(2.0));
    }

    #[test]
    fn test_one_hot_round_trip() {
        let cats = categories(&["a", "b", "c"]);
        for value in ["a", "b", "c"] {
            let mut row = Array1::<f32>::zeros(3);
            one_hot_encode(row.view_mut(), 0, &value.into(), &cats).unwrap();
            assert_eq!(row.sum(), 1.0);
            assert_eq!(one_hot_decode(row.view(), &cats), Some(&CellValue::from(value)));
        }
    }

    #[test]
    fn test_unknown_category() {
        let cats = categories(&["a", "b"]);
        let mut row = Array1::<f32>::zeros(2);
        let err = one_hot_encode(row.view_mut(), 4, &"z".into(), &cats).unwrap_err();
        assert!(matches!(err, SeqTensorError::UnknownCategory { column: 4, .. }));
        assert_eq!(row.sum(), 0.0);
    }

    #[test]
    fn test_one_hot_decode_picks_max_of_soft_scores() {
        let cats = categories(&["a", "b", "c"]);
        let row = array![0.2f32, 0.7, 0.1];
        assert_eq!(one_hot_decode(row.view(), &cats), Some(&CellValue::from("b")));
    }

    #[test]
    fn test_one_hot_decode_ties_keep_lowest_dimension() {
        let cats = categories(&["a", "b", "c"]);
        let row = array![0.1f32, 0.6, 0.6];
        assert_eq!(one_hot_decode(row.view(), &cats), Some(&CellValue::from("b")));
    }

    #[test]
    fn test_one_hot_decode_all_nan_falls_back_to_first() {
        let cats = categories(&["a", "b"]);
        let row = array![f32::NAN, f32::NAN];
        assert_eq!(one_hot_decode(row.view(), &cats), Some(&CellValue::from("a")));
    }

    #[test]
    fn test_cell_dispatch() {
        let columns = vec![
            vec![CellValue::Int(0), CellValue::Int(10)],
            vec![CellValue::from("x"), CellValue::from("y")],
        ];
        let layout = Layout::build(&columns, &[ColumnType::Count, ColumnType::Categorical]).unwrap();
        let mut row = Array1::<f32>::zeros(layout.dimensions());

        encode_cell(row.view_mut(), 0, &CellValue::Int(3), &layout.columns()[0]).unwrap();
        encode_cell(row.view_mut(), 1, &"y".into(), &layout.columns()[1]).unwrap();

        assert_eq!(decode_cell(row.view(), &layout.columns()[0]).unwrap(), CellValue::Int(3));
        assert_eq!(decode_cell(row.view(), &layout.columns()[1]).unwrap(), CellValue::from("y"));
    }

    #[test]
    fn test_non_finite_output_decodes_as_missing() {
        let columns = vec![
            vec![CellValue::Int(5), CellValue::Int(10)],
            vec![CellValue::Float(-1.0), CellValue::Float(1.0)],
        ];
        let layout = Layout::build(&columns, &[ColumnType::Count, ColumnType::Continuous]).unwrap();
        let row = array![f32::NAN, 0.0, f32::INFINITY, 0.0];

        assert_eq!(decode_cell(row.view(), &layout.columns()[0]).unwrap(), CellValue::Null);
        assert_eq!(decode_cell(row.view(), &layout.columns()[1]).unwrap(), CellValue::Null);
        assert_eq!(denormalize(f32::NAN, 0.0, NumericRange::new(5.0, 10.0), true), None);
    }

    #[test]
    fn test_count_beyond_i64_decodes_as_missing() {
        let columns = vec![vec![CellValue::Int(0), CellValue::Int(i64::MAX)]];
        let layout = Layout::build(&columns, &[ColumnType::Count]).unwrap();
        let row = array![1.5f32, 0.0];

        assert_eq!(decode_cell(row.view(), &layout.columns()[0]).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_encode_rejects_non_finite() {
        let columns = vec![vec![CellValue::Float(0.0), CellValue::Float(1e-300)]];
        let layout = Layout::build(&columns, &[ColumnType::Continuous]).unwrap();
        let mut row = Array1::<f32>::zeros(2);

        let err = encode_cell(row.view_mut(), 0, &CellValue::Float(f64::INFINITY), &layout.columns()[0])
            .unwrap_err();
        assert!(matches!(err, SeqTensorError::NonFiniteValue { column: 0, .. }));

        // Finite, but far enough outside the range to overflow f32
        let err = encode_cell(row.view_mut(), 0, &CellValue::Float(1.0), &layout.columns()[0])
            .unwrap_err();
        assert!(matches!(err, SeqTensorError::NonFiniteValue { column: 0, .. }));
        assert_eq!(row.sum(), 0.0);
    }

    proptest! {
        #[test]
        fn numeric_round_trip(
            min in -1e4f64..1e4,
            span in 1e-2f64..1e4,
            t in 0.0f64..=1.0,
        ) {
            let range = NumericRange::new(min, min + span);
            let v = min + t * span;
            let (scaled, flag) = normalize(Some(v), range);
            let back = denormalize(scaled, flag, range, false).unwrap();
            prop_assert!((back - v).abs() <= span * 1e-6 + 1e-9, "{} vs {}", back, v);
        }

        #[test]
        fn missing_round_trip(min in -1e4f64..1e4, span in 0.0f64..1e4) {
            let range = NumericRange::new(min, min + span);
            let (scaled, flag) = normalize(None, range);
            prop_assert_eq!(denormalize(scaled, flag, range, false), None);
        }
    }
}
