//! High-level dataset API.
//!
//! This layer groups raw rows into per-entity [`Sequence`]s and provides
//! [`SequenceCodec`], which fits layouts once and owns the sizes every
//! tensor must agree on. It delegates all encoding and decoding to the
//! [`kernel`](crate::kernel) layer.
//!
//! For custom pipelines, the kernel functions can be used directly.

pub mod codec;
pub mod sequences;

pub use codec::{CodecConfig, SequenceCodec};
pub use sequences::{assemble_sequences, Sequence};
