//! Decoder: model output tensors back to typed values.
//!
//! The decoder reads every row of a single-sequence tensor and does not look
//! at the end-of-sequence flag. Callers sampling variable-length data cut the
//! result with [`sequence_length`] and [`truncate`].

use crate::error::{Result, SeqTensorError};
use crate::kernel::layout::Layout;
use crate::kernel::scalar::{decode_cell, FLAG_THRESHOLD};
use crate::kernel::value::CellValue;
use ndarray::{s, ArrayView2, ArrayView3};

/// Decode a `(T, 1, D)` tensor into column-major values, one list per column.
///
/// # Errors
/// [`SeqTensorError::MalformedTensorShape`] if the batch dimension is not 1 or
/// the rows are narrower than the layout.
pub fn decode_sequence(tensor: ArrayView3<'_, f32>, layout: &Layout) -> Result<Vec<Vec<CellValue>>> {
    let (num_steps, batch, width) = tensor.dim();
    check_single_sequence(batch)?;
    check_width(width, layout)?;

    let mut data: Vec<Vec<CellValue>> = (0..layout.num_columns())
        .map(|_| Vec::with_capacity(num_steps))
        .collect();
    for step in 0..num_steps {
        let row = tensor.slice(s![step, 0, ..]);
        for (values, column_layout) in data.iter_mut().zip(layout.columns()) {
            values.push(decode_cell(row, column_layout)?);
        }
    }
    Ok(data)
}

/// Decode a `(1, C)` context tensor into one value per context column.
pub fn decode_context(tensor: ArrayView2<'_, f32>, layout: &Layout) -> Result<Vec<CellValue>> {
    let (rows, width) = tensor.dim();
    check_single_sequence(rows)?;
    check_width(width, layout)?;

    let row = tensor.row(0);
    layout
        .columns()
        .iter()
        .map(|column_layout| decode_cell(row, column_layout))
        .collect()
}

/// Number of real steps in a `(T, 1, D)` tensor.
///
/// For variable-length data this is one past the first row whose final
/// dimension exceeds 0.5; if no row sets the flag, or the data is fixed
/// length, it is `T`.
pub fn sequence_length(tensor: ArrayView3<'_, f32>, fixed_length: bool) -> Result<usize> {
    let (num_steps, batch, width) = tensor.dim();
    check_single_sequence(batch)?;
    if fixed_length || width == 0 {
        return Ok(num_steps);
    }

    Ok((0..num_steps)
        .find(|&step| tensor[[step, 0, width - 1]] > FLAG_THRESHOLD)
        .map_or(num_steps, |step| step + 1))
}

/// Cut every column list to `length` values.
pub fn truncate(data: &mut [Vec<CellValue>], length: usize) {
    for values in data {
        values.truncate(length);
    }
}

fn check_single_sequence(batch: usize) -> Result<()> {
    if batch != 1 {
        return Err(SeqTensorError::MalformedTensorShape(format!(
            "expected a single sequence (batch dimension 1), got {}",
            batch
        )));
    }
    Ok(())
}

fn check_width(width: usize, layout: &Layout) -> Result<()> {
    if width < layout.dimensions() {
        return Err(SeqTensorError::MalformedTensorShape(format!(
            "row width {} is smaller than layout dimensions {}",
            width,
            layout.dimensions()
        )));
    }
    Ok(())
}
