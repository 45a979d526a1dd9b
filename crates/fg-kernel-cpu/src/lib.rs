#![forbid(unsafe_code)]

use std::fmt;

use fg_core::{
    DType, Device, Elements, Tensor, TensorCompatError, TensorError, TensorMeta, ensure_compatible,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum KernelError {
    Tensor(TensorError),
    Incompatible(TensorCompatError),
    ShapeMismatch {
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },
    UnsupportedRank {
        op: &'static str,
        expected: usize,
        actual: usize,
    },
    NonIntegerInput {
        op: &'static str,
        dtype: DType,
    },
    IndexOutOfRange {
        op: &'static str,
        index: i64,
        size: usize,
    },
    EmptyInput {
        op: &'static str,
    },
    AllocationTooLarge {
        op: &'static str,
        slots: usize,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tensor(error) => write!(f, "tensor failure: {error}"),
            Self::Incompatible(error) => write!(f, "incompatible tensors: {error}"),
            Self::ShapeMismatch { lhs, rhs } => {
                write!(f, "shape mismatch: lhs={lhs:?}, rhs={rhs:?}")
            }
            Self::UnsupportedRank {
                op,
                expected,
                actual,
            } => write!(f, "{op} expects a {expected}-d tensor, got {actual}-d"),
            Self::NonIntegerInput { op, dtype } => {
                write!(f, "{op} expects integer input, got {dtype}")
            }
            Self::IndexOutOfRange { op, index, size } => {
                write!(f, "{op} index {index} is out of range for size {size}")
            }
            Self::EmptyInput { op } => write!(f, "{op} received no inputs"),
            Self::AllocationTooLarge { op, slots } => {
                write!(f, "{op} cannot allocate {slots} output slots")
            }
        }
    }
}

impl std::error::Error for KernelError {}

impl From<TensorError> for KernelError {
    fn from(value: TensorError) -> Self {
        Self::Tensor(value)
    }
}

impl From<TensorCompatError> for KernelError {
    fn from(value: TensorCompatError) -> Self {
        Self::Incompatible(value)
    }
}

fn ensure_rank(tensor: &Tensor, op: &'static str, expected: usize) -> Result<(), KernelError> {
    if tensor.dim() != expected {
        return Err(KernelError::UnsupportedRank {
            op,
            expected,
            actual: tensor.dim(),
        });
    }
    Ok(())
}

fn int_values(tensor: &Tensor, op: &'static str) -> Result<Vec<i64>, KernelError> {
    if !tensor.dtype().is_integer() {
        return Err(KernelError::NonIntegerInput {
            op,
            dtype: tensor.dtype(),
        });
    }
    Ok(tensor.to_int_vec()?)
}

fn scalar_binary<I, F>(
    tensor: &Tensor,
    scalar: Scalar,
    int_op: I,
    float_op: F,
) -> Result<Tensor, KernelError>
where
    I: Fn(i64, i64) -> i64,
    F: Fn(f64, f64) -> f64,
{
    let dtype = tensor.dtype();
    let shape = tensor.shape().to_vec();
    match (dtype.is_integer(), scalar) {
        (true, Scalar::Int(rhs)) => {
            let values = tensor
                .to_int_vec()?
                .into_iter()
                .map(|lhs| dtype.wrap_int(int_op(lhs, rhs)))
                .collect();
            Ok(tensor.with_elements(Elements::Int(values), shape, dtype)?)
        }
        (true, Scalar::Float(rhs)) => {
            let values = tensor
                .to_f64_vec()?
                .into_iter()
                .map(|lhs| f64::from(float_op(lhs, rhs) as f32))
                .collect();
            Ok(tensor.with_elements(Elements::Float(values), shape, DType::DEFAULT_FLOAT)?)
        }
        (false, scalar) => {
            let rhs = match scalar {
                Scalar::Int(value) => value as f64,
                Scalar::Float(value) => value,
            };
            let values = tensor
                .to_f64_vec()?
                .into_iter()
                .map(|lhs| {
                    let out = float_op(lhs, rhs);
                    if dtype == DType::F32 {
                        f64::from(out as f32)
                    } else {
                        out
                    }
                })
                .collect();
            Ok(tensor.with_elements(Elements::Float(values), shape, dtype)?)
        }
    }
}

pub fn add_scalar(tensor: &Tensor, scalar: Scalar) -> Result<Tensor, KernelError> {
    scalar_binary(tensor, scalar, i64::wrapping_add, |lhs, rhs| lhs + rhs)
}

pub fn sub_scalar(tensor: &Tensor, scalar: Scalar) -> Result<Tensor, KernelError> {
    scalar_binary(tensor, scalar, i64::wrapping_sub, |lhs, rhs| lhs - rhs)
}

pub fn mul_scalar(tensor: &Tensor, scalar: Scalar) -> Result<Tensor, KernelError> {
    scalar_binary(tensor, scalar, i64::wrapping_mul, |lhs, rhs| lhs * rhs)
}

fn elementwise_int<F>(lhs: &Tensor, rhs: &Tensor, op: F) -> Result<Tensor, KernelError>
where
    F: Fn(i64, i64) -> i64,
{
    ensure_compatible(lhs, rhs)?;
    if lhs.shape() != rhs.shape() {
        return Err(KernelError::ShapeMismatch {
            lhs: lhs.shape().to_vec(),
            rhs: rhs.shape().to_vec(),
        });
    }
    let dtype = lhs.dtype();
    let lhs_values = int_values(lhs, "elementwise")?;
    let rhs_values = int_values(rhs, "elementwise")?;
    let values = lhs_values
        .into_iter()
        .zip(rhs_values)
        .map(|(left, right)| dtype.wrap_int(op(left, right)))
        .collect();
    Ok(lhs.with_ints(values, lhs.shape().to_vec())?)
}

pub fn add_tensor(lhs: &Tensor, rhs: &Tensor) -> Result<Tensor, KernelError> {
    elementwise_int(lhs, rhs, i64::wrapping_add)
}

pub fn mul_tensor(lhs: &Tensor, rhs: &Tensor) -> Result<Tensor, KernelError> {
    elementwise_int(lhs, rhs, i64::wrapping_mul)
}

/// Cast to `dtype`. Casting to the current dtype returns an alias.
pub fn to_dtype(tensor: &Tensor, dtype: DType) -> Result<Tensor, KernelError> {
    if tensor.dtype() == dtype {
        return Ok(tensor.alias());
    }
    let shape = tensor.shape().to_vec();
    let elements = if dtype.is_integer() {
        let values = if tensor.dtype().is_integer() {
            tensor
                .to_int_vec()?
                .into_iter()
                .map(|value| dtype.wrap_int(value))
                .collect()
        } else {
            tensor
                .to_f64_vec()?
                .into_iter()
                .map(|value| dtype.wrap_int(value.trunc() as i64))
                .collect()
        };
        Elements::Int(values)
    } else {
        let values = tensor
            .to_f64_vec()?
            .into_iter()
            .map(|value| {
                if dtype == DType::F32 {
                    f64::from(value as f32)
                } else {
                    value
                }
            })
            .collect();
        Elements::Float(values)
    };
    Ok(tensor.with_elements(elements, shape, dtype)?)
}

/// Moves values to `device`. Staying on the same device returns an alias.
pub fn to_device(tensor: &Tensor, device: Device) -> Result<Tensor, KernelError> {
    if tensor.device() == device {
        return Ok(tensor.alias());
    }
    let shape = tensor.shape().to_vec();
    let dtype = tensor.dtype();
    let moved = if dtype.is_integer() {
        Tensor::from_ints(tensor.to_int_vec()?, shape, dtype, device)?
    } else {
        Tensor::from_floats(tensor.to_f64_vec()?, shape, dtype, device)?
    };
    Ok(moved)
}

/// Contiguous layout; already contiguous tensors come back as aliases.
pub fn contiguous(tensor: &Tensor) -> Result<Tensor, KernelError> {
    if tensor.is_contiguous() {
        return Ok(tensor.alias());
    }
    let shape = tensor.shape().to_vec();
    let elements = match tensor.elements() {
        Elements::Int(_) => Elements::Int(tensor.to_int_vec()?),
        Elements::Float(_) => Elements::Float(tensor.to_f64_vec()?),
    };
    Ok(tensor.with_elements(elements, shape, tensor.dtype())?)
}

pub fn reshape(tensor: &Tensor, shape: Vec<usize>) -> Result<Tensor, KernelError> {
    let target = TensorMeta::from_shape(shape.clone(), tensor.dtype(), tensor.device());
    if target.numel() != tensor.numel() {
        return Err(KernelError::ShapeMismatch {
            lhs: tensor.shape().to_vec(),
            rhs: shape,
        });
    }
    let source = contiguous(tensor)?;
    let meta = target.with_storage_offset(source.meta().storage_offset());
    Ok(source.alias_view(meta)?)
}

/// Zero-copy window `[start, start + length)` along the first dimension.
pub fn narrow(tensor: &Tensor, start: usize, length: usize) -> Result<Tensor, KernelError> {
    let Some(&rows) = tensor.shape().first() else {
        return Err(KernelError::UnsupportedRank {
            op: "narrow",
            expected: 1,
            actual: 0,
        });
    };
    let end = start.saturating_add(length);
    if end > rows {
        return Err(KernelError::IndexOutOfRange {
            op: "narrow",
            index: i64::try_from(end).unwrap_or(i64::MAX),
            size: rows,
        });
    }
    let meta = tensor.meta();
    let mut shape = meta.shape().to_vec();
    shape[0] = length;
    let offset = meta.storage_offset() + start * meta.strides()[0];
    let view = TensorMeta::from_shape_and_strides(
        shape,
        meta.strides().to_vec(),
        offset,
        meta.dtype(),
        meta.device(),
    )
    .map_err(TensorError::from)?;
    Ok(tensor.alias_view(view)?)
}

pub fn flip(tensor: &Tensor) -> Result<Tensor, KernelError> {
    ensure_rank(tensor, "flip", 1)?;
    let mut values = int_values(tensor, "flip")?;
    values.reverse();
    Ok(tensor.with_ints(values, tensor.shape().to_vec())?)
}

/// Gathers `source[index[i]]` for a one-dimensional integer source.
pub fn index_select(source: &Tensor, index: &Tensor) -> Result<Tensor, KernelError> {
    ensure_rank(source, "index_select", 1)?;
    ensure_rank(index, "index_select", 1)?;
    let values = int_values(source, "index_select")?;
    let positions = int_values(index, "index_select")?;
    let size = values.len();
    let gathered = positions
        .into_iter()
        .map(|position| {
            usize::try_from(position)
                .ok()
                .and_then(|slot| values.get(slot).copied())
                .ok_or(KernelError::IndexOutOfRange {
                    op: "index_select",
                    index: position,
                    size,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let len = gathered.len();
    Ok(source.with_ints(gathered, vec![len])?)
}

pub fn cat(tensors: &[&Tensor]) -> Result<Tensor, KernelError> {
    let Some(first) = tensors.first() else {
        return Err(KernelError::EmptyInput { op: "cat" });
    };
    let mut values = Vec::with_capacity(tensors.iter().map(|t| t.numel()).sum());
    for tensor in tensors {
        ensure_rank(tensor, "cat", 1)?;
        ensure_compatible(first, tensor)?;
        values.extend(int_values(tensor, "cat")?);
    }
    let len = values.len();
    Ok(first.with_ints(values, vec![len])?)
}

/// Stable ascending sort. Returns the sorted values and the permutation
/// (as `I64`) that produced them.
pub fn sort(tensor: &Tensor) -> Result<(Tensor, Tensor), KernelError> {
    ensure_rank(tensor, "sort", 1)?;
    let values = int_values(tensor, "sort")?;
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by_key(|&slot| values[slot]);

    let sorted = order.iter().map(|&slot| values[slot]).collect();
    let perm = order
        .into_iter()
        .map(|slot| i64::try_from(slot).unwrap_or(i64::MAX))
        .collect::<Vec<_>>();
    let len = values.len();
    let sorted = tensor.with_ints(sorted, vec![len])?;
    let perm = Tensor::int_vector(perm, DType::I64, tensor.device())?;
    Ok((sorted, perm))
}

pub fn min_int(tensor: &Tensor) -> Result<Option<i64>, KernelError> {
    Ok(int_values(tensor, "min")?.into_iter().min())
}

pub fn max_int(tensor: &Tensor) -> Result<Option<i64>, KernelError> {
    Ok(int_values(tensor, "max")?.into_iter().max())
}

#[must_use]
pub fn is_non_decreasing(values: &[i64]) -> bool {
    values.windows(2).all(|pair| pair[0] <= pair[1])
}

/// Sorted-bucket offsets: `out[v]` is the number of elements smaller than
/// `v`, for `v` in `0..=size`. Output keeps the input dtype and device.
pub fn index_to_ptr(index: &Tensor, size: usize) -> Result<Tensor, KernelError> {
    ensure_rank(index, "index_to_ptr", 1)?;
    let values = int_values(index, "index_to_ptr")?;
    let mut ptr = ptr_buffer("index_to_ptr", size)?;
    ptr.resize(size + 1, 0);
    for value in values.iter().copied() {
        let bucket = usize::try_from(value)
            .ok()
            .filter(|bucket| *bucket < size)
            .ok_or(KernelError::IndexOutOfRange {
                op: "index_to_ptr",
                index: value,
                size,
            })?;
        ptr[bucket + 1] += 1;
    }
    for slot in 1..ptr.len() {
        ptr[slot] += ptr[slot - 1];
    }
    Ok(Tensor::int_vector(ptr, index.dtype(), index.device())?)
}

/// Extends offsets produced by [`index_to_ptr`] to cover `size` buckets,
/// repeating the final offset into the new slots.
pub fn pad_ptr(ptr: &Tensor, size: usize) -> Result<Tensor, KernelError> {
    ensure_rank(ptr, "pad_ptr", 1)?;
    let values = int_values(ptr, "pad_ptr")?;
    let last = values.last().copied().ok_or(KernelError::EmptyInput { op: "pad_ptr" })?;
    let mut padded = ptr_buffer("pad_ptr", size)?;
    padded.extend_from_slice(&values);
    padded.resize((size + 1).max(values.len()), last);
    let len = padded.len();
    Ok(ptr.with_ints(padded, vec![len])?)
}

/// Zero-length buffer able to hold `size + 1` offsets without reallocating.
/// Fails instead of aborting when the request cannot be satisfied.
fn ptr_buffer(op: &'static str, size: usize) -> Result<Vec<i64>, KernelError> {
    let slots = size
        .checked_add(1)
        .ok_or(KernelError::AllocationTooLarge { op, slots: size })?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(slots)
        .map_err(|_| KernelError::AllocationTooLarge { op, slots })?;
    Ok(buffer)
}
