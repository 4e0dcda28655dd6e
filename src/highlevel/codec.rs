//! Persisted encode/decode state for one dataset.
//!
//! [`SequenceCodec`] fits both layouts from a set of [`Sequence`]s, fixes the
//! tensor sizes, and delegates every encode/decode call to the
//! [`kernel`](crate::kernel). A trained model must keep the exact codec it was
//! trained with: decoding with a different layout misaligns indices silently,
//! so the codec serializes to JSON alongside the model weights.

use crate::error::{Result, SeqTensorError};
use crate::highlevel::sequences::Sequence;
use crate::kernel::{
    decode_context, decode_sequence, encode_context, encode_sequence, sequence_length,
    stack_contexts, stack_sequences, truncate, CellValue, ColumnType, Layout,
};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Overrides applied when fitting a [`SequenceCodec`].
///
/// Unset fields are inferred from the fitted sequences.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Tensor rows. Defaults to the longest fitted sequence.
    #[serde(default)]
    pub max_sequence_length: Option<usize>,
    /// Whether to omit the end flag. Defaults to true when every fitted
    /// sequence has the same length.
    ///
    /// Forcing `Some(true)` on data of mixed lengths is allowed; shorter
    /// sequences are then padded without any marker and decode to full length.
    #[serde(default)]
    pub fixed_length: Option<bool>,
}

impl CodecConfig {
    pub fn with_max_sequence_length(mut self, length: usize) -> Self {
        self.max_sequence_length = Some(length);
        self
    }

    pub fn with_fixed_length(mut self, fixed: bool) -> Self {
        self.fixed_length = Some(fixed);
        self
    }
}

/// Fitted layouts plus the scalar sizes every tensor must agree on.
///
/// # Example
///
/// ```rust
/// use seqtensor::highlevel::{CodecConfig, Sequence, SequenceCodec};
/// use seqtensor::kernel::{CellValue, ColumnType};
///
/// let sequences = vec![
///     Sequence::new(vec!["x".into()], vec![vec![1.0.into(), 2.0.into()]]),
///     Sequence::new(vec!["y".into()], vec![vec![3.0.into()]]),
/// ];
/// let codec = SequenceCodec::fit(
///     &sequences,
///     &[ColumnType::Continuous],
///     &[ColumnType::Categorical],
///     &CodecConfig::default(),
/// )
/// .unwrap();
///
/// assert!(!codec.fixed_length());
/// assert_eq!(codec.model_data_size(), 3);
///
/// let tensor = codec.encode_sequence(&sequences[1]).unwrap();
/// let decoded = codec.decode(tensor.view()).unwrap();
/// assert_eq!(decoded[0].len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceCodec {
    data_layout: Layout,
    context_layout: Layout,
    fixed_length: bool,
    max_sequence_length: usize,
    model_data_size: usize,
    context_size: usize,
}

impl SequenceCodec {
    /// Fit layouts and sizes from training sequences.
    ///
    /// Column values are pooled across all sequences before fitting, so
    /// ranges and category sets cover the whole dataset.
    ///
    /// # Errors
    /// - [`SeqTensorError::EmptyInput`] if `sequences` is empty
    /// - [`SeqTensorError::ColumnCountMismatch`] if a sequence does not match the declared types
    /// - [`SeqTensorError::RaggedSequence`] if a sequence's columns differ in length
    /// - [`SeqTensorError::SequenceTooLong`] if the configured maximum is below the longest sequence
    /// - any layout build error
    pub fn fit(
        sequences: &[Sequence],
        data_types: &[ColumnType],
        context_types: &[ColumnType],
        config: &CodecConfig,
    ) -> Result<Self> {
        if sequences.is_empty() {
            return Err(SeqTensorError::EmptyInput("no sequences to fit".into()));
        }

        let mut data_columns: Vec<Vec<CellValue>> = vec![Vec::new(); data_types.len()];
        let mut context_columns: Vec<Vec<CellValue>> = vec![Vec::new(); context_types.len()];
        let mut lengths = Vec::with_capacity(sequences.len());

        for sequence in sequences {
            check_columns(data_types.len(), sequence.data.len())?;
            check_columns(context_types.len(), sequence.context.len())?;

            let length = sequence.len();
            for (column, values) in sequence.data.iter().enumerate() {
                if values.len() != length {
                    return Err(SeqTensorError::RaggedSequence {
                        column,
                        expected: length,
                        got: values.len(),
                    });
                }
                data_columns[column].extend(values.iter().cloned());
            }
            for (column, value) in sequence.context.iter().enumerate() {
                context_columns[column].push(value.clone());
            }
            lengths.push(length);
        }

        let data_layout = Layout::build(&data_columns, data_types)?;
        let context_layout = Layout::build(&context_columns, context_types)?;

        let longest = lengths.iter().copied().max().unwrap_or(0);
        let max_sequence_length = match config.max_sequence_length {
            Some(max) if max < longest => {
                return Err(SeqTensorError::SequenceTooLong {
                    length: longest,
                    max,
                })
            }
            Some(max) => max,
            None => longest,
        };
        let fixed_length = config
            .fixed_length
            .unwrap_or_else(|| lengths.iter().all(|&l| l == longest));

        let model_data_size = data_layout.dimensions() + usize::from(!fixed_length);
        let context_size = context_layout.dimensions();

        debug!(
            "Fitted codec on {} sequences: model_data_size={}, context_size={}, max_sequence_length={}, fixed_length={}",
            sequences.len(),
            model_data_size,
            context_size,
            max_sequence_length,
            fixed_length
        );

        Ok(Self {
            data_layout,
            context_layout,
            fixed_length,
            max_sequence_length,
            model_data_size,
            context_size,
        })
    }

    pub fn data_layout(&self) -> &Layout {
        &self.data_layout
    }

    pub fn context_layout(&self) -> &Layout {
        &self.context_layout
    }

    pub fn fixed_length(&self) -> bool {
        self.fixed_length
    }

    pub fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }

    /// Row width of sequence tensors, including the end flag when present.
    pub fn model_data_size(&self) -> usize {
        self.model_data_size
    }

    pub fn context_size(&self) -> usize {
        self.context_size
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encode one sequence's data into a `(T, 1, model_data_size)` tensor.
    pub fn encode_sequence(&self, sequence: &Sequence) -> Result<Array3<f32>> {
        encode_sequence(
            &sequence.data,
            &self.data_layout,
            self.model_data_size,
            self.fixed_length,
            self.max_sequence_length,
        )
    }

    /// Encode one sequence's context into a `(1, context_size)` tensor.
    pub fn encode_context(&self, sequence: &Sequence) -> Result<Array2<f32>> {
        encode_context(&sequence.context, &self.context_layout, self.context_size)
    }

    /// Encode a training batch: `(T, B, model_data_size)` data and
    /// `(B, context_size)` context, batch members in input order.
    pub fn encode_batch(&self, sequences: &[Sequence]) -> Result<(Array3<f32>, Array2<f32>)> {
        let data = sequences
            .iter()
            .map(|s| self.encode_sequence(s))
            .collect::<Result<Vec<_>>>()?;
        let context = sequences
            .iter()
            .map(|s| self.encode_context(s))
            .collect::<Result<Vec<_>>>()?;
        Ok((stack_sequences(&data)?, stack_contexts(&context)?))
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Decode a `(T, 1, D)` tensor, cut at the end flag for variable-length data.
    ///
    /// `T` must equal [`max_sequence_length`](Self::max_sequence_length) and
    /// `D` must equal [`model_data_size`](Self::model_data_size).
    pub fn decode(&self, tensor: ArrayView3<'_, f32>) -> Result<Vec<Vec<CellValue>>> {
        self.check_model_shape(tensor)?;
        let mut data = decode_sequence(tensor, &self.data_layout)?;
        let length = sequence_length(tensor, self.fixed_length)?;
        truncate(&mut data, length);
        Ok(data)
    }

    /// Decode every row of a `(T, 1, D)` tensor, ignoring the end flag.
    pub fn decode_raw(&self, tensor: ArrayView3<'_, f32>) -> Result<Vec<Vec<CellValue>>> {
        self.check_model_shape(tensor)?;
        decode_sequence(tensor, &self.data_layout)
    }

    pub fn decode_context(&self, tensor: ArrayView2<'_, f32>) -> Result<Vec<CellValue>> {
        decode_context(tensor, &self.context_layout)
    }

    /// Decode a sampled sequence and its conditioning context into a [`Sequence`].
    pub fn decode_entity(
        &self,
        tensor: ArrayView3<'_, f32>,
        context: ArrayView2<'_, f32>,
    ) -> Result<Sequence> {
        Ok(Sequence::new(
            self.decode_context(context)?,
            self.decode(tensor)?,
        ))
    }

    fn check_model_shape(&self, tensor: ArrayView3<'_, f32>) -> Result<()> {
        let (rows, _, width) = tensor.dim();
        if rows != self.max_sequence_length {
            return Err(SeqTensorError::MalformedTensorShape(format!(
                "expected {} rows, got {}",
                self.max_sequence_length, rows
            )));
        }
        if width != self.model_data_size {
            return Err(SeqTensorError::MalformedTensorShape(format!(
                "expected row width {}, got {}",
                self.model_data_size, width
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a codec and check that its layouts and sizes agree.
    pub fn from_json(json: &str) -> Result<Self> {
        let codec: Self = serde_json::from_str(json)?;
        codec.validate()?;
        Ok(codec)
    }

    /// Save to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        info!("Saved codec to {}", path.display());
        Ok(())
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let codec = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!(
            "Loaded codec from {} ({} data dims, {} context dims)",
            path.display(),
            codec.data_layout.dimensions(),
            codec.context_size
        );
        Ok(codec)
    }

    // Layouts validate themselves on deserialization.
    fn validate(&self) -> Result<()> {
        let expected = self.data_layout.dimensions() + usize::from(!self.fixed_length);
        if self.model_data_size != expected {
            return Err(SeqTensorError::MalformedLayout(format!(
                "model_data_size {} does not match layout ({} expected)",
                self.model_data_size, expected
            )));
        }
        if self.context_size != self.context_layout.dimensions() {
            return Err(SeqTensorError::MalformedLayout(format!(
                "context_size {} does not match context layout ({} expected)",
                self.context_size,
                self.context_layout.dimensions()
            )));
        }
        Ok(())
    }
}

fn check_columns(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(SeqTensorError::ColumnCountMismatch { expected, got });
    }
    Ok(())
}
