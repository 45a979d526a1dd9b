#![forbid(unsafe_code)]

//! One-dimensional index tensors with validated metadata.
//!
//! An [`Index`] wraps an integer [`fg_core::Tensor`] and records two claims
//! about it: an upper bound `dim_size` and whether the values are sorted.
//! Claims are checked only by [`Index::validate`]. Sorted indices with a
//! known `dim_size` can cache their compressed offsets (`indptr`) through
//! [`Index::fill_cache`].

mod binding;
mod cache;
mod display;
mod error;
mod index;
mod propagate;
mod validate;

pub use binding::{ArgValue, IndexArgs};
pub use error::{IndexError, IndexErrorKind};
pub use index::{INDEX_DTYPES, Index, IndexOptions, IndexSource};
