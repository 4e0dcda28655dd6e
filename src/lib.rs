//! # seqtensor: Typed Sequences to Model Tensors
//!
//! seqtensor turns multi-entity tabular time series into fixed-shape numeric
//! tensors for recurrent sequence models, and turns model output back into
//! typed values.
//!
//! ## Quick Start
//!
//! ```rust
//! use seqtensor::{assemble_sequences, CellValue, CodecConfig, ColumnType, SequenceCodec};
//!
//! # fn main() -> seqtensor::Result<()> {
//! // Rows: entity, region, amount, action
//! let rows: Vec<Vec<CellValue>> = vec![
//!     vec!["u1".into(), "eu".into(), 12.0.into(), "buy".into()],
//!     vec!["u2".into(), "us".into(), 3.5.into(), "view".into()],
//!     vec!["u1".into(), "eu".into(), CellValue::Null, "view".into()],
//! ];
//!
//! let sequences = assemble_sequences(&rows, &[0], &[1], &[2, 3])?;
//! let codec = SequenceCodec::fit(
//!     &sequences,
//!     &[ColumnType::Continuous, ColumnType::Categorical],
//!     &[ColumnType::Categorical],
//!     &CodecConfig::default(),
//! )?;
//!
//! // (T, B, model_data_size) and (B, context_size)
//! let (data, context) = codec.encode_batch(&sequences)?;
//! assert_eq!(data.dim(), (2, 2, 5));
//! assert_eq!(context.dim(), (2, 2));
//!
//! let tensor = codec.encode_sequence(&sequences[1])?;
//! let decoded = codec.decode(tensor.view())?;
//! assert_eq!(decoded[1], vec![CellValue::from("view")]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! - **Layout**: fitted map from each column to its tensor dimensions
//! - **Numeric columns**: two dimensions, a value scaled to `[-1, 1]` and a missing flag
//! - **Categorical columns**: one dimension per category seen at fit time (one-hot)
//! - **End flag**: extra final dimension marking the last real step of variable-length data
//! - **Context**: per-entity static values, encoded once as a `(1, C)` tensor
//!
//! ## Layers
//!
//! - [`kernel`]: stateless layout, codec, encoder and decoder functions
//! - [`highlevel`]: row grouping and the persisted [`SequenceCodec`]

pub mod error;
pub mod highlevel;
pub mod kernel;

// Re-exports for convenience
pub use error::{Result, SeqTensorError};
pub use highlevel::{assemble_sequences, CodecConfig, Sequence, SequenceCodec};
pub use kernel::{CellValue, ColumnLayout, ColumnType, Layout};
