#![forbid(unsafe_code)]

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STORAGE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
    I32,
    I64,
}

impl DType {
    /// Dtype picked by raw intake when every element is an integer.
    pub const DEFAULT_INT: Self = Self::I64;
    /// Dtype picked by raw intake when any element is a float.
    pub const DEFAULT_FLOAT: Self = Self::F32;

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::I32 | Self::I64)
    }

    #[must_use]
    pub const fn is_floating(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::I32 => "int32",
            Self::I64 => "int64",
        }
    }

    /// Clamp-free narrowing used by integer kernels: `I32` wraps like a
    /// two's complement 32-bit lane.
    #[must_use]
    pub const fn wrap_int(self, value: i64) -> i64 {
        match self {
            Self::I32 => value as i32 as i64,
            _ => value,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl Device {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Strict,
    Hardened,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorMeta {
    shape: Vec<usize>,
    strides: Vec<usize>,
    storage_offset: usize,
    dtype: DType,
    device: Device,
}

impl TensorMeta {
    #[must_use]
    pub fn from_shape(shape: Vec<usize>, dtype: DType, device: Device) -> Self {
        let strides = contiguous_strides(&shape);
        Self {
            shape,
            strides,
            storage_offset: 0,
            dtype,
            device,
        }
    }

    pub fn from_shape_and_strides(
        shape: Vec<usize>,
        strides: Vec<usize>,
        storage_offset: usize,
        dtype: DType,
        device: Device,
    ) -> Result<Self, TensorMetaError> {
        let meta = Self {
            shape,
            strides,
            storage_offset,
            dtype,
            device,
        };
        meta.validate()?;
        Ok(meta)
    }

    #[must_use]
    pub fn with_storage_offset(mut self, storage_offset: usize) -> Self {
        self.storage_offset = storage_offset;
        self
    }

    pub fn validate(&self) -> Result<(), TensorMetaError> {
        self.max_storage_index().map(|_| ())
    }

    /// Largest storage slot any element of this layout touches, relative to
    /// the start of storage. `None` when the layout has no elements.
    pub fn max_storage_index(&self) -> Result<Option<usize>, TensorMetaError> {
        if self.shape.len() != self.strides.len() {
            return Err(TensorMetaError::RankStrideMismatch {
                rank: self.shape.len(),
                strides: self.strides.len(),
            });
        }

        let mut max_linear_offset = 0usize;
        let mut empty = false;
        for (size, stride) in self.shape.iter().copied().zip(self.strides.iter().copied()) {
            if size == 0 {
                empty = true;
                continue;
            }

            let span = stride
                .checked_mul(size.saturating_sub(1))
                .ok_or(TensorMetaError::StrideOverflow { size, stride })?;
            max_linear_offset = max_linear_offset.checked_add(span).ok_or(
                TensorMetaError::StorageOffsetOverflow {
                    storage_offset: self.storage_offset,
                    max_linear_offset,
                },
            )?;
        }

        let last = self.storage_offset.checked_add(max_linear_offset).ok_or(
            TensorMetaError::StorageOffsetOverflow {
                storage_offset: self.storage_offset,
                max_linear_offset,
            },
        )?;

        Ok((!empty).then_some(last))
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    #[must_use]
    pub fn storage_offset(&self) -> usize {
        self.storage_offset
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn device(&self) -> Device {
        self.device
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.shape.len()
    }

    #[must_use]
    pub fn numel(&self) -> usize {
        if self.shape.is_empty() {
            return 1;
        }
        self.shape.iter().copied().product()
    }

    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        if self.shape.len() != self.strides.len() {
            return false;
        }

        let mut expected_stride = 1usize;
        for (size, stride) in self
            .shape
            .iter()
            .copied()
            .zip(self.strides.iter().copied())
            .rev()
        {
            // Singleton dimensions are contiguous regardless of stride.
            if size == 1 {
                continue;
            }
            if stride != expected_stride {
                return false;
            }
            let Some(next_expected) = expected_stride.checked_mul(size) else {
                return false;
            };
            expected_stride = next_expected;
        }
        true
    }

    pub fn storage_index_for(&self, index: &[usize]) -> Result<usize, TensorMetaError> {
        if index.len() != self.shape.len() {
            return Err(TensorMetaError::IndexRankMismatch {
                expected: self.shape.len(),
                actual: index.len(),
            });
        }

        let mut linear = self.storage_offset;
        for (dim, ((idx, dim_size), stride)) in index
            .iter()
            .copied()
            .zip(self.shape.iter().copied())
            .zip(self.strides.iter().copied())
            .enumerate()
        {
            if idx >= dim_size {
                return Err(TensorMetaError::IndexOutOfBounds {
                    dim,
                    index: idx,
                    size: dim_size,
                });
            }

            let step = idx
                .checked_mul(stride)
                .ok_or(TensorMetaError::StrideOverflow { size: idx, stride })?;
            linear = linear
                .checked_add(step)
                .ok_or(TensorMetaError::StorageOffsetOverflow {
                    storage_offset: self.storage_offset,
                    max_linear_offset: step,
                })?;
        }

        Ok(linear)
    }

    /// Storage slots of every element in row-major logical order.
    pub fn storage_positions(&self) -> Result<Vec<usize>, TensorMetaError> {
        let numel = self.numel();
        if numel == 0 {
            return Ok(Vec::new());
        }
        if self.is_contiguous() {
            return Ok((self.storage_offset..self.storage_offset + numel).collect());
        }

        let mut positions = Vec::with_capacity(numel);
        let mut cursor = vec![0usize; self.shape.len()];
        loop {
            positions.push(self.storage_index_for(&cursor)?);

            let mut dim = self.shape.len();
            loop {
                if dim == 0 {
                    return Ok(positions);
                }
                dim -= 1;
                cursor[dim] += 1;
                if cursor[dim] < self.shape[dim] {
                    break;
                }
                cursor[dim] = 0;
            }
        }
    }

    #[must_use]
    pub fn fingerprint64(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.shape.hash(&mut hasher);
        self.strides.hash(&mut hasher);
        self.storage_offset.hash(&mut hasher);
        self.dtype.hash(&mut hasher);
        self.device.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorMetaError {
    RankStrideMismatch {
        rank: usize,
        strides: usize,
    },
    StrideOverflow {
        size: usize,
        stride: usize,
    },
    StorageOffsetOverflow {
        storage_offset: usize,
        max_linear_offset: usize,
    },
    IndexRankMismatch {
        expected: usize,
        actual: usize,
    },
    IndexOutOfBounds {
        dim: usize,
        index: usize,
        size: usize,
    },
}

impl fmt::Display for TensorMetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RankStrideMismatch { rank, strides } => {
                write!(f, "shape rank {rank} does not match strides rank {strides}")
            }
            Self::StrideOverflow { size, stride } => {
                write!(f, "stride overflow for size={size}, stride={stride}")
            }
            Self::StorageOffsetOverflow {
                storage_offset,
                max_linear_offset,
            } => write!(
                f,
                "storage offset overflow for storage_offset={storage_offset}, max_linear_offset={max_linear_offset}"
            ),
            Self::IndexRankMismatch { expected, actual } => {
                write!(
                    f,
                    "index rank mismatch expected={expected}, actual={actual}"
                )
            }
            Self::IndexOutOfBounds { dim, index, size } => {
                write!(
                    f,
                    "index out of bounds at dim={dim}: index={index}, size={size}"
                )
            }
        }
    }
}

impl std::error::Error for TensorMetaError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorCompatError {
    DTypeMismatch { lhs: DType, rhs: DType },
    DeviceMismatch { lhs: Device, rhs: Device },
}

impl fmt::Display for TensorCompatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DTypeMismatch { lhs, rhs } => {
                write!(f, "dtype mismatch: lhs={lhs}, rhs={rhs}")
            }
            Self::DeviceMismatch { lhs, rhs } => {
                write!(f, "device mismatch: lhs={lhs}, rhs={rhs}")
            }
        }
    }
}

impl std::error::Error for TensorCompatError {}

#[derive(Debug, Clone, PartialEq)]
pub enum TensorError {
    Meta(TensorMetaError),
    ElementCountMismatch { expected: usize, actual: usize },
    ElementKindMismatch { dtype: DType },
    ValueOutOfRange { value: i64, dtype: DType },
    RaggedNesting { depth: usize, expected: usize, actual: usize },
    StorageTooSmall { needed: usize, available: usize },
}

impl fmt::Display for TensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meta(error) => write!(f, "invalid tensor layout: {error}"),
            Self::ElementCountMismatch { expected, actual } => write!(
                f,
                "element count mismatch: shape needs {expected}, got {actual}"
            ),
            Self::ElementKindMismatch { dtype } => {
                write!(f, "storage elements do not match dtype {dtype}")
            }
            Self::ValueOutOfRange { value, dtype } => {
                write!(f, "value {value} is out of range for dtype {dtype}")
            }
            Self::RaggedNesting {
                depth,
                expected,
                actual,
            } => write!(
                f,
                "expected sequence of length {expected} at dim {depth} (got {actual})"
            ),
            Self::StorageTooSmall { needed, available } => write!(
                f,
                "view needs {needed} storage elements, storage holds {available}"
            ),
        }
    }
}

impl std::error::Error for TensorError {}

impl From<TensorMetaError> for TensorError {
    fn from(value: TensorMetaError) -> Self {
        Self::Meta(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Elements {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl Elements {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int(values) => values.len(),
            Self::Float(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matches(&self, dtype: DType) -> bool {
        match self {
            Self::Int(_) => dtype.is_integer(),
            Self::Float(_) => dtype.is_floating(),
        }
    }
}

#[derive(Debug, PartialEq)]
struct Storage {
    id: u64,
    elements: Elements,
}

/// Dense buffer with shared, immutable storage.
///
/// Cloning a `Tensor` or taking an alias view never copies elements; every
/// operation that produces new values allocates fresh storage with a new
/// `storage_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    storage: Arc<Storage>,
    meta: TensorMeta,
}

impl Tensor {
    fn from_parts(elements: Elements, meta: TensorMeta) -> Result<Self, TensorError> {
        if !elements.matches(meta.dtype()) {
            return Err(TensorError::ElementKindMismatch {
                dtype: meta.dtype(),
            });
        }
        if let Some(last) = meta.max_storage_index()? {
            if last >= elements.len() {
                return Err(TensorError::StorageTooSmall {
                    needed: last + 1,
                    available: elements.len(),
                });
            }
        }
        Ok(Self {
            storage: Arc::new(Storage {
                id: NEXT_STORAGE_ID.fetch_add(1, Ordering::Relaxed),
                elements,
            }),
            meta,
        })
    }

    pub fn from_ints(
        values: Vec<i64>,
        shape: Vec<usize>,
        dtype: DType,
        device: Device,
    ) -> Result<Self, TensorError> {
        if !dtype.is_integer() {
            return Err(TensorError::ElementKindMismatch { dtype });
        }
        let meta = TensorMeta::from_shape(shape, dtype, device);
        if meta.numel() != values.len() {
            return Err(TensorError::ElementCountMismatch {
                expected: meta.numel(),
                actual: values.len(),
            });
        }
        if let Some(value) = values.iter().copied().find(|v| dtype.wrap_int(*v) != *v) {
            return Err(TensorError::ValueOutOfRange { value, dtype });
        }
        Self::from_parts(Elements::Int(values), meta)
    }

    pub fn from_floats(
        values: Vec<f64>,
        shape: Vec<usize>,
        dtype: DType,
        device: Device,
    ) -> Result<Self, TensorError> {
        if !dtype.is_floating() {
            return Err(TensorError::ElementKindMismatch { dtype });
        }
        let meta = TensorMeta::from_shape(shape, dtype, device);
        if meta.numel() != values.len() {
            return Err(TensorError::ElementCountMismatch {
                expected: meta.numel(),
                actual: values.len(),
            });
        }
        let values = match dtype {
            DType::F32 => values.into_iter().map(round_f32).collect(),
            _ => values,
        };
        Self::from_parts(Elements::Float(values), meta)
    }

    /// One-dimensional integer tensor.
    pub fn int_vector(values: Vec<i64>, dtype: DType, device: Device) -> Result<Self, TensorError> {
        let len = values.len();
        Self::from_ints(values, vec![len], dtype, device)
    }

    /// Tensor factory over nested raw values.
    ///
    /// The shape follows the nesting. Without an explicit dtype, all-integer
    /// input becomes [`DType::DEFAULT_INT`] and anything holding a float
    /// becomes [`DType::DEFAULT_FLOAT`]. An empty untyped list is float, while
    /// an empty [`RawData::Ints`] row stays integer. Floats cast to an integer
    /// dtype truncate toward zero.
    pub fn from_raw(
        raw: &RawData,
        dtype: Option<DType>,
        device: Option<Device>,
    ) -> Result<Self, TensorError> {
        let shape = raw.shape()?;
        let mut flat = Vec::with_capacity(shape.iter().product());
        raw.flatten_into(&mut flat);
        let any_float = flat.iter().any(|value| matches!(value, RawScalar::Float(_)));
        let dtype = dtype.unwrap_or(if !any_float && raw.declares_ints() {
            DType::DEFAULT_INT
        } else {
            DType::DEFAULT_FLOAT
        });
        let device = device.unwrap_or_default();

        if dtype.is_integer() {
            let values = flat
                .into_iter()
                .map(|value| match value {
                    RawScalar::Int(v) => v,
                    RawScalar::Float(v) => v.trunc() as i64,
                })
                .collect();
            Self::from_ints(values, shape, dtype, device)
        } else {
            let values = flat
                .into_iter()
                .map(|value| match value {
                    RawScalar::Int(v) => v as f64,
                    RawScalar::Float(v) => v,
                })
                .collect();
            Self::from_floats(values, shape, dtype, device)
        }
    }

    /// Out-of-place result over fresh storage, keeping dtype and device.
    pub fn with_ints(&self, values: Vec<i64>, shape: Vec<usize>) -> Result<Self, TensorError> {
        self.with_elements(Elements::Int(values), shape, self.meta.dtype())
    }

    /// Out-of-place result over fresh storage with an explicit dtype.
    pub fn with_elements(
        &self,
        elements: Elements,
        shape: Vec<usize>,
        dtype: DType,
    ) -> Result<Self, TensorError> {
        let meta = TensorMeta::from_shape(shape, dtype, self.meta.device());
        if meta.numel() != elements.len() {
            return Err(TensorError::ElementCountMismatch {
                expected: meta.numel(),
                actual: elements.len(),
            });
        }
        Self::from_parts(elements, meta)
    }

    /// Same storage, same layout.
    #[must_use]
    pub fn alias(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            meta: self.meta.clone(),
        }
    }

    /// Same storage reinterpreted through `meta`. The dtype class and every
    /// touched slot must stay inside the existing storage.
    pub fn alias_view(&self, meta: TensorMeta) -> Result<Self, TensorError> {
        if !self.storage.elements.matches(meta.dtype()) {
            return Err(TensorError::ElementKindMismatch {
                dtype: meta.dtype(),
            });
        }
        if let Some(last) = meta.max_storage_index()? {
            let available = self.storage.elements.len();
            if last >= available {
                return Err(TensorError::StorageTooSmall {
                    needed: last + 1,
                    available,
                });
            }
        }
        Ok(Self {
            storage: Arc::clone(&self.storage),
            meta,
        })
    }

    #[must_use]
    pub fn storage_id(&self) -> u64 {
        self.storage.id
    }

    #[must_use]
    pub fn shares_storage(&self, other: &Self) -> bool {
        self.storage.id == other.storage.id
    }

    #[must_use]
    pub fn meta(&self) -> &TensorMeta {
        &self.meta
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.meta.dtype()
    }

    #[must_use]
    pub fn device(&self) -> Device {
        self.meta.device()
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.meta.shape()
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.meta.dim()
    }

    #[must_use]
    pub fn numel(&self) -> usize {
        self.meta.numel()
    }

    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.meta.is_contiguous()
    }

    #[must_use]
    pub fn elements(&self) -> &Elements {
        &self.storage.elements
    }

    /// Zero-copy window over a contiguous integer tensor.
    #[must_use]
    pub fn contiguous_ints(&self) -> Option<&[i64]> {
        let Elements::Int(values) = &self.storage.elements else {
            return None;
        };
        if !self.meta.is_contiguous() {
            return None;
        }
        let start = self.meta.storage_offset();
        values.get(start..start + self.meta.numel())
    }

    /// Logical integer values in row-major order.
    pub fn to_int_vec(&self) -> Result<Vec<i64>, TensorError> {
        if let Some(window) = self.contiguous_ints() {
            return Ok(window.to_vec());
        }
        let Elements::Int(values) = &self.storage.elements else {
            return Err(TensorError::ElementKindMismatch {
                dtype: self.dtype(),
            });
        };
        Ok(self
            .meta
            .storage_positions()?
            .into_iter()
            .map(|position| values[position])
            .collect())
    }

    /// Logical values widened to `f64` in row-major order.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>, TensorError> {
        let positions = self.meta.storage_positions()?;
        Ok(match &self.storage.elements {
            Elements::Int(values) => positions
                .into_iter()
                .map(|position| values[position] as f64)
                .collect(),
            Elements::Float(values) => positions
                .into_iter()
                .map(|position| values[position])
                .collect(),
        })
    }

    /// Same shape and same logical values. Integer tensors of different
    /// widths compare by value.
    #[must_use]
    pub fn equal(&self, other: &Self) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        if self.dtype().is_integer() && other.dtype().is_integer() {
            return matches!(
                (self.to_int_vec(), other.to_int_vec()),
                (Ok(lhs), Ok(rhs)) if lhs == rhs
            );
        }
        matches!(
            (self.to_f64_vec(), other.to_f64_vec()),
            (Ok(lhs), Ok(rhs)) if lhs == rhs
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RawScalar {
    Int(i64),
    Float(f64),
}

/// Nested raw input accepted by [`Tensor::from_raw`].
///
/// `Ints` is a flat integer row whose element type is known even when it is
/// empty. An empty `List` carries no element type.
#[derive(Debug, Clone, PartialEq)]
pub enum RawData {
    Int(i64),
    Float(f64),
    Ints(Vec<i64>),
    List(Vec<RawData>),
}

impl RawData {
    pub fn shape(&self) -> Result<Vec<usize>, TensorError> {
        let mut shape = Vec::new();
        let mut level = self;
        loop {
            match level {
                Self::List(items) => {
                    shape.push(items.len());
                    match items.first() {
                        Some(first) => level = first,
                        None => break,
                    }
                }
                Self::Ints(values) => {
                    shape.push(values.len());
                    break;
                }
                Self::Int(_) | Self::Float(_) => break,
            }
        }
        self.check_shape(&shape, 0)?;
        Ok(shape)
    }

    fn check_shape(&self, shape: &[usize], depth: usize) -> Result<(), TensorError> {
        match self {
            Self::Int(_) | Self::Float(_) => {
                if depth == shape.len() {
                    Ok(())
                } else {
                    Err(TensorError::RaggedNesting {
                        depth,
                        expected: shape[depth],
                        actual: 0,
                    })
                }
            }
            Self::Ints(values) => match shape.get(depth).copied() {
                Some(expected) if expected == values.len() && depth + 1 == shape.len() => Ok(()),
                Some(expected) if expected != values.len() => Err(TensorError::RaggedNesting {
                    depth,
                    expected,
                    actual: values.len(),
                }),
                Some(_) => Err(TensorError::RaggedNesting {
                    depth: depth + 1,
                    expected: shape[depth + 1],
                    actual: 0,
                }),
                None => Err(TensorError::RaggedNesting {
                    depth,
                    expected: 0,
                    actual: values.len(),
                }),
            },
            Self::List(items) => {
                let Some(expected) = shape.get(depth).copied() else {
                    return Err(TensorError::RaggedNesting {
                        depth,
                        expected: 0,
                        actual: items.len(),
                    });
                };
                if items.len() != expected {
                    return Err(TensorError::RaggedNesting {
                        depth,
                        expected,
                        actual: items.len(),
                    });
                }
                items
                    .iter()
                    .try_for_each(|item| item.check_shape(shape, depth + 1))
            }
        }
    }

    fn flatten_into(&self, out: &mut Vec<RawScalar>) {
        match self {
            Self::Int(value) => out.push(RawScalar::Int(*value)),
            Self::Float(value) => out.push(RawScalar::Float(*value)),
            Self::Ints(values) => out.extend(values.iter().copied().map(RawScalar::Int)),
            Self::List(items) => items.iter().for_each(|item| item.flatten_into(out)),
        }
    }

    /// Whether an integer element type can be read off the input, either
    /// from a value or from a typed row.
    fn declares_ints(&self) -> bool {
        match self {
            Self::Int(_) | Self::Ints(_) => true,
            Self::Float(_) => false,
            Self::List(items) => items.iter().any(Self::declares_ints),
        }
    }
}

impl From<i64> for RawData {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for RawData {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<i64>> for RawData {
    fn from(values: Vec<i64>) -> Self {
        Self::Ints(values)
    }
}

impl From<Vec<i32>> for RawData {
    fn from(values: Vec<i32>) -> Self {
        Self::Ints(values.into_iter().map(i64::from).collect())
    }
}

impl From<&[i64]> for RawData {
    fn from(values: &[i64]) -> Self {
        Self::Ints(values.to_vec())
    }
}

impl From<Vec<f64>> for RawData {
    fn from(values: Vec<f64>) -> Self {
        Self::List(values.into_iter().map(Self::Float).collect())
    }
}

impl From<Vec<Vec<i64>>> for RawData {
    fn from(rows: Vec<Vec<i64>>) -> Self {
        Self::List(rows.into_iter().map(Self::from).collect())
    }
}

pub fn ensure_compatible(lhs: &Tensor, rhs: &Tensor) -> Result<(), TensorCompatError> {
    if lhs.dtype() != rhs.dtype() {
        return Err(TensorCompatError::DTypeMismatch {
            lhs: lhs.dtype(),
            rhs: rhs.dtype(),
        });
    }

    if lhs.device() != rhs.device() {
        return Err(TensorCompatError::DeviceMismatch {
            lhs: lhs.device(),
            rhs: rhs.device(),
        });
    }

    Ok(())
}

#[must_use]
pub fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    if shape.is_empty() {
        return Vec::new();
    }

    let mut strides = vec![1; shape.len()];
    let mut running = 1usize;
    for idx in (0..shape.len()).rev() {
        strides[idx] = running;
        running = running.saturating_mul(shape[idx]);
    }
    strides
}

fn round_f32(value: f64) -> f64 {
    f64::from(value as f32)
}
