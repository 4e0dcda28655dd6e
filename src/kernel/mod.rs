//! Kernel layer: typed values, layouts, and tensor encode/decode.
//!
//! The kernel provides the stateless foundation for all seqtensor operations:
//! - Cell values and column types ([`CellValue`], [`ColumnType`])
//! - Fitting a dimension plan from observed data ([`Layout`])
//! - Per-cell scaling and one-hot coding ([`encode_cell`], [`decode_cell`])
//! - Sequence and context tensor construction ([`encode_sequence`], [`encode_context`])
//! - Decoding model output back to values ([`decode_sequence`], [`decode_context`])
//!
//! This layer has no dependencies on [`highlevel`](crate::highlevel).
//!
//! # Example
//!
//! ```rust
//! use seqtensor::kernel::{decode_sequence, encode_sequence, CellValue, ColumnType, Layout};
//!
//! let columns = vec![
//!     vec![CellValue::from(0.0), CellValue::from(10.0)],
//!     vec![CellValue::from("a"), CellValue::from("b")],
//! ];
//! let layout = Layout::build(&columns, &[ColumnType::Continuous, ColumnType::Categorical]).unwrap();
//! assert_eq!(layout.dimensions(), 4);
//!
//! let tensor = encode_sequence(&columns, &layout, 5, false, 3).unwrap();
//! assert_eq!(tensor.dim(), (3, 1, 5));
//!
//! let decoded = decode_sequence(tensor.view(), &layout).unwrap();
//! assert_eq!(decoded[1][1], CellValue::from("b"));
//! ```

pub mod decoder;
pub mod encoder;
pub mod layout;
pub mod scalar;
pub mod value;

pub use decoder::{decode_context, decode_sequence, sequence_length, truncate};
pub use encoder::{encode_context, encode_sequence, stack_contexts, stack_sequences};
pub use layout::{CategoryIndex, ColumnLayout, Layout, NumericRange};
pub use scalar::{
    decode_cell, denormalize, encode_cell, normalize, one_hot_decode, one_hot_encode,
    FLAG_THRESHOLD,
};
pub use value::{CellValue, ColumnType};
