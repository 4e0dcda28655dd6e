//! Encoder: typed sequences to padded tensors.
//!
//! A sequence is column-major: `data[column][step]`. Each real step becomes
//! one tensor row built by the scalar codec; rows past the end are zero
//! padding. For variable-length data the final dimension of the last real
//! row is set to `1.0`, which lets a consumer tell "no event" padding apart
//! from a real row whose features all sit at the midpoint.
//!
//! ```text
//! step  | column dims ...          | end flag
//! ------+--------------------------+---------
//!   0   | encoded row 0            |   0.0
//!  L-1  | encoded row L-1          |   1.0
//!   L   | 0.0 ...                  |   0.0
//!  T-1  | 0.0 ...                  |   0.0
//! ```

use crate::error::{Result, SeqTensorError};
use crate::kernel::layout::Layout;
use crate::kernel::scalar::encode_cell;
use crate::kernel::value::CellValue;
use ndarray::{concatenate, s, Array2, Array3, ArrayView2, ArrayView3, Axis};

/// Encode one entity's sequence into a `(max_sequence_length, 1, model_data_size)` tensor.
///
/// # Arguments
/// * `data` - column-major values, one slice per layout column
/// * `layout` - the layout fitted for these columns
/// * `model_data_size` - row width; at least `layout.dimensions()`, plus one
///   when `fixed_length` is false
/// * `fixed_length` - when false, the last real row carries the end flag
/// * `max_sequence_length` - number of rows in the output
///
/// # Errors
/// - [`SeqTensorError::MalformedTensorShape`] if `model_data_size` is too small
/// - [`SeqTensorError::ColumnCountMismatch`] if `data` does not match the layout
/// - [`SeqTensorError::RaggedSequence`] if columns differ in length
/// - [`SeqTensorError::SequenceTooLong`] if there are more steps than rows
/// - any codec error ([`SeqTensorError::UnknownCategory`], ...)
pub fn encode_sequence<C: AsRef<[CellValue]>>(
    data: &[C],
    layout: &Layout,
    model_data_size: usize,
    fixed_length: bool,
    max_sequence_length: usize,
) -> Result<Array3<f32>> {
    let required = layout.dimensions() + usize::from(!fixed_length);
    if model_data_size < required {
        return Err(SeqTensorError::MalformedTensorShape(format!(
            "model_data_size {} cannot hold {} dimensions",
            model_data_size, required
        )));
    }

    let num_steps = sequence_steps(data, layout)?;
    if num_steps > max_sequence_length {
        return Err(SeqTensorError::SequenceTooLong {
            length: num_steps,
            max: max_sequence_length,
        });
    }

    let mut tensor = Array3::<f32>::zeros((max_sequence_length, 1, model_data_size));
    for step in 0..num_steps {
        let mut row = tensor.slice_mut(s![step, 0, ..]);
        for (column, column_layout) in layout.columns().iter().enumerate() {
            let value = &data[column].as_ref()[step];
            encode_cell(row.view_mut(), column, value, column_layout)?;
        }
    }

    if !fixed_length && num_steps > 0 {
        tensor[[num_steps - 1, 0, model_data_size - 1]] = 1.0;
    }

    Ok(tensor)
}

/// Encode one entity's context into a `(1, context_size)` tensor.
pub fn encode_context(
    context: &[CellValue],
    layout: &Layout,
    context_size: usize,
) -> Result<Array2<f32>> {
    if context.len() != layout.num_columns() {
        return Err(SeqTensorError::ColumnCountMismatch {
            expected: layout.num_columns(),
            got: context.len(),
        });
    }
    if context_size < layout.dimensions() {
        return Err(SeqTensorError::MalformedTensorShape(format!(
            "context_size {} cannot hold {} dimensions",
            context_size,
            layout.dimensions()
        )));
    }

    let mut tensor = Array2::<f32>::zeros((1, context_size));
    let mut row = tensor.row_mut(0);
    for (column, (value, column_layout)) in context.iter().zip(layout.columns()).enumerate() {
        encode_cell(row.view_mut(), column, value, column_layout)?;
    }
    Ok(tensor)
}

/// Stack single-sequence tensors into a `(T, batch, D)` training batch.
///
/// Members are joined along the batch axis; all must share `T` and `D`.
pub fn stack_sequences(tensors: &[Array3<f32>]) -> Result<Array3<f32>> {
    let first = tensors
        .first()
        .ok_or_else(|| SeqTensorError::EmptyInput("no sequence tensors to stack".into()))?;
    let (steps, _, width) = first.dim();
    for tensor in tensors {
        let (t, _, d) = tensor.dim();
        if t != steps || d != width {
            return Err(SeqTensorError::MalformedTensorShape(format!(
                "cannot stack {:?} with {:?}",
                tensor.shape(),
                first.shape()
            )));
        }
    }

    let views: Vec<ArrayView3<'_, f32>> = tensors.iter().map(|t| t.view()).collect();
    concatenate(Axis(1), &views).map_err(|e| SeqTensorError::MalformedTensorShape(e.to_string()))
}

/// Stack `(1, C)` context tensors into a `(batch, C)` matrix.
pub fn stack_contexts(tensors: &[Array2<f32>]) -> Result<Array2<f32>> {
    let first = tensors
        .first()
        .ok_or_else(|| SeqTensorError::EmptyInput("no context tensors to stack".into()))?;
    if let Some(bad) = tensors.iter().find(|t| t.ncols() != first.ncols()) {
        return Err(SeqTensorError::MalformedTensorShape(format!(
            "cannot stack {:?} with {:?}",
            bad.shape(),
            first.shape()
        )));
    }

    let views: Vec<ArrayView2<'_, f32>> = tensors.iter().map(|t| t.view()).collect();
    concatenate(Axis(0), &views).map_err(|e| SeqTensorError::MalformedTensorShape(e.to_string()))
}

/// Number of steps in a column-major sequence, checking it against the layout.
pub(crate) fn sequence_steps<C: AsRef<[CellValue]>>(data: &[C], layout: &Layout) -> Result<usize> {
    if data.len() != layout.num_columns() {
        return Err(SeqTensorError::ColumnCountMismatch {
            expected: layout.num_columns(),
            got: data.len(),
        });
    }

    let num_steps = data.first().map_or(0, |c| c.as_ref().len());
    for (column, values) in data.iter().enumerate() {
        let got = values.as_ref().len();
        if got != num_steps {
            return Err(SeqTensorError::RaggedSequence {
                column,
                expected: num_steps,
                got,
            });
        }
    }
    Ok(num_steps)
}
