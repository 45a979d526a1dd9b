use std::fmt;

use fg_core::{DType, TensorError};
use fg_device::DeviceError;
use fg_kernel_cpu::KernelError;

use crate::index::INDEX_DTYPES;

/// Coarse classification of [`IndexError`], mirroring the error families
/// callers dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexErrorKind {
    Type,
    Shape,
    Argument,
    Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexError {
    UnsupportedDType { dtype: DType },
    NotOneDimensional { dims: usize },
    InvalidCombination { got: Vec<String> },
    InvalidKeywordArguments { names: Vec<String> },
    NegativeIndices { min: i64 },
    ExceedsSize { max: i64, dim_size: usize },
    NotSorted,
    InvalidCache { reason: &'static str },
    DTypeMismatch { expected: DType, actual: DType },
    Tensor(TensorError),
    Kernel(KernelError),
    Device(DeviceError),
}

impl IndexError {
    #[must_use]
    pub fn kind(&self) -> IndexErrorKind {
        match self {
            Self::UnsupportedDType { .. } | Self::DTypeMismatch { .. } => IndexErrorKind::Type,
            Self::NotOneDimensional { .. } | Self::Tensor(TensorError::RaggedNesting { .. }) => {
                IndexErrorKind::Shape
            }
            Self::InvalidCombination { .. } | Self::InvalidKeywordArguments { .. } => {
                IndexErrorKind::Argument
            }
            Self::NegativeIndices { .. }
            | Self::ExceedsSize { .. }
            | Self::NotSorted
            | Self::InvalidCache { .. }
            | Self::Tensor(_)
            | Self::Kernel(_)
            | Self::Device(_) => IndexErrorKind::Value,
        }
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDType { dtype } => {
                let expected = INDEX_DTYPES
                    .iter()
                    .map(|dtype| dtype.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "'Index' holds an unsupported data type (got '{dtype}', but expected one of [{expected}])"
                )
            }
            Self::NotOneDimensional { dims } => write!(
                f,
                "'Index' needs to be one-dimensional (got {dims} dimensions)"
            ),
            Self::InvalidCombination { got } => write!(
                f,
                "new() received an invalid combination of arguments - got ({})",
                got.join(", ")
            ),
            Self::InvalidKeywordArguments { names } => {
                let names = names
                    .iter()
                    .map(|name| format!("'{name}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "new() received invalid keyword arguments - got {{{names}}}"
                )
            }
            Self::NegativeIndices { min } => {
                write!(f, "'Index' contains negative indices (got {min})")
            }
            Self::ExceedsSize { max, dim_size } => write!(
                f,
                "'Index' contains larger indices than its registered size (got {max}, but expected values smaller than {dim_size})"
            ),
            Self::NotSorted => write!(f, "'Index' is not sorted"),
            Self::InvalidCache { reason } => {
                write!(f, "'Index' holds an inconsistent indptr cache: {reason}")
            }
            Self::DTypeMismatch { expected, actual } => write!(
                f,
                "'Index' dtypes do not match (expected {expected}, got {actual})"
            ),
            Self::Tensor(error) => write!(f, "'Index' data intake failed: {error}"),
            Self::Kernel(error) => write!(f, "'Index' kernel failure: {error}"),
            Self::Device(error) => write!(f, "'Index' device failure: {error}"),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tensor(error) => Some(error),
            Self::Kernel(error) => Some(error),
            Self::Device(error) => Some(error),
            _ => None,
        }
    }
}

impl From<TensorError> for IndexError {
    fn from(value: TensorError) -> Self {
        Self::Tensor(value)
    }
}

impl From<KernelError> for IndexError {
    fn from(value: KernelError) -> Self {
        Self::Kernel(value)
    }
}

impl From<DeviceError> for IndexError {
    fn from(value: DeviceError) -> Self {
        Self::Device(value)
    }
}
