use fg_core::{DType, Device, RawData, Tensor};
use fg_kernel_cpu::contiguous;

use crate::error::IndexError;

/// Dtypes an [`Index`] may hold.
pub const INDEX_DTYPES: [DType; 2] = [DType::I32, DType::I64];

/// One-dimensional, non-negative integer tensor carrying index metadata.
///
/// `dim_size` and `is_sorted` are claims: construction never checks them, only
/// [`Index::validate`] does. `indptr` is a cache filled by
/// [`Index::fill_cache`] and dropped whenever the metadata it was derived from
/// changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub(crate) data: Tensor,
    pub(crate) dim_size: Option<usize>,
    pub(crate) is_sorted: bool,
    pub(crate) indptr: Option<Tensor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexSource {
    Raw(RawData),
    Tensor(Tensor),
    Index(Index),
}

impl IndexSource {
    /// Name used when echoing a call signature back in argument errors.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Raw(_) => "list",
            Self::Tensor(_) => "Tensor",
            Self::Index(_) => "Index",
        }
    }

    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

impl From<RawData> for IndexSource {
    fn from(value: RawData) -> Self {
        Self::Raw(value)
    }
}

impl From<Tensor> for IndexSource {
    fn from(value: Tensor) -> Self {
        Self::Tensor(value)
    }
}

impl From<Index> for IndexSource {
    fn from(value: Index) -> Self {
        Self::Index(value)
    }
}

impl From<Vec<i64>> for IndexSource {
    fn from(values: Vec<i64>) -> Self {
        Self::Raw(values.into())
    }
}

impl From<Vec<i32>> for IndexSource {
    fn from(values: Vec<i32>) -> Self {
        Self::Raw(values.into())
    }
}

impl From<&[i64]> for IndexSource {
    fn from(values: &[i64]) -> Self {
        Self::Raw(values.into())
    }
}

impl From<Vec<f64>> for IndexSource {
    fn from(values: Vec<f64>) -> Self {
        Self::Raw(values.into())
    }
}

impl From<Vec<Vec<i64>>> for IndexSource {
    fn from(rows: Vec<Vec<i64>>) -> Self {
        Self::Raw(rows.into())
    }
}

/// Construction options. `dtype` and `device` only apply to raw sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub dtype: Option<DType>,
    pub device: Option<Device>,
    pub dim_size: Option<usize>,
    pub is_sorted: Option<bool>,
}

impl IndexOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dtype: None,
            device: None,
            dim_size: None,
            is_sorted: None,
        }
    }

    #[must_use]
    pub const fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    #[must_use]
    pub const fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    #[must_use]
    pub const fn dim_size(mut self, dim_size: usize) -> Self {
        self.dim_size = Some(dim_size);
        self
    }

    #[must_use]
    pub const fn sorted(mut self, is_sorted: bool) -> Self {
        self.is_sorted = Some(is_sorted);
        self
    }

    fn factory_keywords(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.dtype.is_some() {
            names.push("dtype".to_string());
        }
        if self.device.is_some() {
            names.push("device".to_string());
        }
        names
    }
}

impl Index {
    /// Builds an `Index` from raw values, a tensor, or another `Index`.
    ///
    /// Wrapping another `Index` shares its storage and inherits `dim_size`
    /// and `is_sorted` unless overridden. An inherited sortedness claim is
    /// only ever strengthened: `sorted(false)` does not clear it. The cached
    /// `indptr` survives only when `dim_size` is unchanged.
    pub fn new(source: impl Into<IndexSource>, options: IndexOptions) -> Result<Self, IndexError> {
        match source.into() {
            IndexSource::Raw(raw) => {
                let data = Tensor::from_raw(&raw, options.dtype, options.device)?;
                Self::from_parts(data, options.dim_size, options.is_sorted.unwrap_or(false), None)
            }
            IndexSource::Tensor(tensor) => {
                reject_factory_options(&options)?;
                Self::from_parts(
                    tensor,
                    options.dim_size,
                    options.is_sorted.unwrap_or(false),
                    None,
                )
            }
            IndexSource::Index(source) => {
                reject_factory_options(&options)?;
                let Index {
                    data,
                    dim_size,
                    is_sorted,
                    indptr,
                } = source;
                let next_dim_size = options.dim_size.or(dim_size);
                let next_sorted = is_sorted || options.is_sorted == Some(true);
                // `sorted(false)` never clears the claim, so a kept cache stays consistent.
                let indptr = indptr.filter(|_| next_dim_size == dim_size);
                Self::from_parts(data, next_dim_size, next_sorted, indptr)
            }
        }
    }

    pub(crate) fn from_parts(
        data: Tensor,
        dim_size: Option<usize>,
        is_sorted: bool,
        indptr: Option<Tensor>,
    ) -> Result<Self, IndexError> {
        ensure_index_dtype(data.dtype())?;
        if data.dim() != 1 {
            return Err(IndexError::NotOneDimensional { dims: data.dim() });
        }
        Ok(Self {
            data: contiguous(&data)?,
            dim_size,
            is_sorted,
            indptr,
        })
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    #[must_use]
    pub fn device(&self) -> Device {
        self.data.device()
    }

    #[must_use]
    pub fn dim_size(&self) -> Option<usize> {
        self.dim_size
    }

    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.is_sorted
    }

    /// Plain tensor aliasing the same storage. Metadata does not travel with it.
    #[must_use]
    pub fn as_tensor(&self) -> Tensor {
        self.data.alias()
    }

    #[must_use]
    pub fn storage_id(&self) -> u64 {
        self.data.storage_id()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.numel()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn values(&self) -> &[i64] {
        // Construction keeps `data` contiguous and integer.
        self.data.contiguous_ints().unwrap_or_default()
    }
}

pub(crate) fn ensure_index_dtype(dtype: DType) -> Result<(), IndexError> {
    if INDEX_DTYPES.contains(&dtype) {
        Ok(())
    } else {
        Err(IndexError::UnsupportedDType { dtype })
    }
}

fn reject_factory_options(options: &IndexOptions) -> Result<(), IndexError> {
    let names = options.factory_keywords();
    if names.is_empty() {
        Ok(())
    } else {
        Err(IndexError::InvalidKeywordArguments { names })
    }
}
