//! Which operations keep `Index` metadata.
//!
//! Everything defaults to a plain [`Tensor`]: arithmetic, casts, gathers and
//! reshapes lose the guarantees `dim_size` and `is_sorted` describe. Only
//! the operations implemented here as `Index -> Index` carry metadata over,
//! each with its own rule for `dim_size`, `is_sorted` and the cache.

use std::ops::{Add, Mul, Sub};

use fg_core::{DType, Device, Tensor};
use fg_device::ensure_common_device;
use fg_kernel_cpu::{
    Scalar, add_scalar, add_tensor, cat, flip, index_select, mul_scalar, narrow, reshape, sort,
    sub_scalar, to_device, to_dtype,
};

use crate::error::IndexError;
use crate::index::Index;

impl Mul<i64> for &Index {
    type Output = Result<Tensor, IndexError>;

    fn mul(self, rhs: i64) -> Self::Output {
        Ok(mul_scalar(&self.data, Scalar::Int(rhs))?)
    }
}

impl Add<i64> for &Index {
    type Output = Result<Tensor, IndexError>;

    fn add(self, rhs: i64) -> Self::Output {
        Ok(add_scalar(&self.data, Scalar::Int(rhs))?)
    }
}

impl Sub<i64> for &Index {
    type Output = Result<Tensor, IndexError>;

    fn sub(self, rhs: i64) -> Self::Output {
        Ok(sub_scalar(&self.data, Scalar::Int(rhs))?)
    }
}

impl Add<&Index> for &Index {
    type Output = Result<Tensor, IndexError>;

    fn add(self, rhs: &Index) -> Self::Output {
        Ok(add_tensor(&self.data, &rhs.data)?)
    }
}

impl Index {
    pub fn to_dtype(&self, dtype: DType) -> Result<Tensor, IndexError> {
        Ok(to_dtype(&self.data, dtype)?)
    }

    /// Gathers `self[positions[i]]`.
    pub fn index_select(&self, positions: &Tensor) -> Result<Tensor, IndexError> {
        Ok(index_select(&self.data, positions)?)
    }

    pub fn reshape(&self, shape: Vec<usize>) -> Result<Tensor, IndexError> {
        Ok(reshape(&self.data, shape)?)
    }

    /// Moves data and cache to `device`; all metadata is kept.
    pub fn to_device(&self, device: Device) -> Result<Self, IndexError> {
        let indptr = self
            .indptr
            .as_ref()
            .map(|indptr| to_device(indptr, device))
            .transpose()?;
        Self::from_parts(
            to_device(&self.data, device)?,
            self.dim_size,
            self.is_sorted,
            indptr,
        )
    }

    /// Copy over fresh storage, cache included.
    pub fn deep_clone(&self) -> Result<Self, IndexError> {
        let data = self.data.with_ints(self.values().to_vec(), vec![self.len()])?;
        let indptr = match &self.indptr {
            Some(indptr) => Some(indptr.with_ints(indptr.to_int_vec()?, indptr.shape().to_vec())?),
            None => None,
        };
        Self::from_parts(data, self.dim_size, self.is_sorted, indptr)
    }

    /// Zero-copy window `[start, start + length)`. The cache is dropped.
    pub fn narrow(&self, start: usize, length: usize) -> Result<Self, IndexError> {
        Self::from_parts(
            narrow(&self.data, start, length)?,
            self.dim_size,
            self.is_sorted,
            None,
        )
    }

    /// Reversed copy. Only data of length 0 or 1 stays sorted.
    pub fn flip(&self) -> Result<Self, IndexError> {
        Self::from_parts(flip(&self.data)?, self.dim_size, self.len() <= 1, None)
    }

    /// Stable ascending sort, returning the sorted `Index` and the `I64`
    /// permutation that produced it. Already sorted data is returned as is,
    /// cache included.
    pub fn sort(&self) -> Result<(Self, Tensor), IndexError> {
        if self.is_sorted {
            let len = i64::try_from(self.len()).unwrap_or(i64::MAX);
            let perm = Tensor::int_vector((0..len).collect(), DType::I64, self.device())?;
            return Ok((self.clone(), perm));
        }
        let (sorted, perm) = sort(&self.data)?;
        Ok((Self::from_parts(sorted, self.dim_size, true, None)?, perm))
    }

    /// Concatenates indices sharing one device and one dtype.
    ///
    /// `dim_size` is the largest input `dim_size` when every input has one.
    /// The result is never marked sorted.
    pub fn cat(indices: &[&Index]) -> Result<Self, IndexError> {
        ensure_common_device(indices.iter().map(|index| &index.data))?;
        let tensors: Vec<&Tensor> = indices.iter().map(|index| &index.data).collect();
        if let Some(first) = indices.first() {
            if let Some(other) = indices.iter().find(|index| index.dtype() != first.dtype()) {
                return Err(IndexError::DTypeMismatch {
                    expected: first.dtype(),
                    actual: other.dtype(),
                });
            }
        }
        let dim_size = indices
            .iter()
            .map(|index| index.dim_size)
            .collect::<Option<Vec<_>>>()
            .and_then(|sizes| sizes.into_iter().max());
        Self::from_parts(cat(&tensors)?, dim_size, false, None)
    }
}

#[cfg(test)]
mod tests {
    use fg_core::{DType, Device, Tensor};
    use fg_device::DeviceError;
    use proptest::prelude::*;

    use crate::error::IndexError;
    use crate::index::{Index, IndexOptions};

    fn cached(values: Vec<i64>, dim_size: usize) -> Index {
        let mut index = Index::new(values, IndexOptions::new().dim_size(dim_size).sorted(true))
            .expect("valid index");
        index.fill_cache();
        index
    }

    #[test]
    fn arithmetic_returns_plain_tensors() {
        let index = Index::new(
            vec![0i64, 1, 1, 2],
            IndexOptions::new().dtype(DType::I32).device(Device::Cuda),
        )
        .expect("index");

        let doubled: Tensor = (&index * 2).expect("mul");
        assert_eq!(doubled.to_int_vec().expect("ints"), vec![0, 2, 2, 4]);
        assert_eq!(doubled.dtype(), DType::I32);
        assert_eq!(doubled.device(), Device::Cuda);

        let shifted = (&index + 1).expect("add");
        assert_eq!(shifted.to_int_vec().expect("ints"), vec![1, 2, 2, 3]);
        let lowered = (&index - 1).expect("sub");
        assert_eq!(lowered.to_int_vec().expect("ints"), vec![-1, 0, 0, 1]);
        let summed = (&index + &index).expect("add index");
        assert_eq!(summed.to_int_vec().expect("ints"), vec![0, 2, 2, 4]);
    }

    #[test]
    fn as_tensor_aliases_storage() {
        let index = Index::new(vec![0i64, 1], IndexOptions::new()).expect("index");
        let tensor = index.as_tensor();
        assert_eq!(tensor.storage_id(), index.storage_id());
        assert_eq!(tensor.dtype(), index.dtype());
    }

    #[test]
    fn tensor_valued_operations() {
        let index = Index::new(vec![3i64, 1, 2], IndexOptions::new()).expect("index");
        let cast = index.to_dtype(DType::F64).expect("cast");
        assert_eq!(cast.to_f64_vec().expect("floats"), vec![3.0, 1.0, 2.0]);

        let positions = Tensor::int_vector(vec![2, 0], DType::I64, Device::Cpu).expect("positions");
        let picked = index.index_select(&positions).expect("gather");
        assert_eq!(picked.to_int_vec().expect("ints"), vec![2, 3]);

        let column = index.reshape(vec![3, 1]).expect("reshape");
        assert_eq!(column.shape(), &[3, 1]);
    }

    #[test]
    fn to_device_keeps_everything() {
        let index = cached(vec![0, 1, 1, 2], 3);
        let moved = index.to_device(Device::Cuda).expect("move");
        assert_eq!(moved.device(), Device::Cuda);
        assert_eq!(moved.dim_size(), Some(3));
        assert!(moved.is_sorted());
        let indptr = moved.indptr().expect("cache moved");
        assert_eq!(indptr.device(), Device::Cuda);
        assert_eq!(indptr.to_int_vec().expect("ints"), vec![0, 1, 3, 4]);
    }

    #[test]
    fn deep_clone_allocates_new_storage() {
        let index = cached(vec![0, 1, 1, 2], 3);
        let copy = index.deep_clone().expect("clone");
        assert_ne!(copy.storage_id(), index.storage_id());
        assert_eq!(copy.values(), index.values());
        assert_eq!(copy.dim_size(), Some(3));
        assert!(copy.is_sorted());
        assert_ne!(
            copy.indptr().expect("cache").storage_id(),
            index.indptr().expect("cache").storage_id()
        );
    }

    #[test]
    fn narrow_is_a_view_without_cache() {
        let index = cached(vec![0, 1, 1, 2], 3);
        let window = index.narrow(1, 2).expect("narrow");
        assert_eq!(window.values(), &[1, 1]);
        assert_eq!(window.storage_id(), index.storage_id());
        assert_eq!(window.dim_size(), Some(3));
        assert!(window.is_sorted());
        assert!(window.indptr().is_none());

        assert!(matches!(
            index.narrow(3, 2),
            Err(IndexError::Kernel(_))
        ));
    }

    #[test]
    fn flip_drops_sortedness() {
        let index = cached(vec![0, 1, 2], 3);
        let flipped = index.flip().expect("flip");
        assert_eq!(flipped.values(), &[2, 1, 0]);
        assert!(!flipped.is_sorted());
        assert!(flipped.indptr().is_none());
        assert_eq!(flipped.dim_size(), Some(3));

        let single = cached(vec![1], 3).flip().expect("flip");
        assert!(single.is_sorted());
    }

    #[test]
    fn sort_marks_result_sorted() {
        let index = Index::new(vec![2i64, 0, 1, 0], IndexOptions::new().dim_size(3)).expect("index");
        let (sorted, perm) = index.sort().expect("sort");
        assert_eq!(sorted.values(), &[0, 0, 1, 2]);
        assert_eq!(perm.to_int_vec().expect("perm"), vec![1, 3, 2, 0]);
        assert!(sorted.is_sorted());
        assert_eq!(sorted.dim_size(), Some(3));
    }

    #[test]
    fn sorting_sorted_data_keeps_cache() {
        let index = cached(vec![0, 1, 1, 2], 3);
        let (sorted, perm) = index.sort().expect("sort");
        assert_eq!(sorted.storage_id(), index.storage_id());
        assert!(sorted.indptr().is_some());
        assert_eq!(perm.to_int_vec().expect("perm"), vec![0, 1, 2, 3]);
    }

    #[test]
    fn cat_combines_metadata() {
        let left = cached(vec![0, 1], 2);
        let right = cached(vec![0, 4], 5);
        let joined = Index::cat(&[&left, &right]).expect("cat");
        assert_eq!(joined.values(), &[0, 1, 0, 4]);
        assert_eq!(joined.dim_size(), Some(5));
        assert!(!joined.is_sorted());
        assert!(joined.indptr().is_none());

        let unknown = Index::new(vec![1i64], IndexOptions::new()).expect("index");
        let joined = Index::cat(&[&left, &unknown]).expect("cat");
        assert_eq!(joined.dim_size(), None);
    }

    #[test]
    fn cat_rejects_mixed_inputs() {
        let cpu = Index::new(vec![0i64], IndexOptions::new()).expect("cpu");
        let cuda = Index::new(vec![0i64], IndexOptions::new().device(Device::Cuda)).expect("cuda");
        assert!(matches!(
            Index::cat(&[&cpu, &cuda]),
            Err(IndexError::Device(DeviceError::Mismatch { .. }))
        ));

        let narrow = Index::new(vec![0i64], IndexOptions::new().dtype(DType::I32)).expect("i32");
        assert!(matches!(
            Index::cat(&[&cpu, &narrow]),
            Err(IndexError::DTypeMismatch {
                expected: DType::I64,
                actual: DType::I32
            })
        ));

        assert!(matches!(
            Index::cat(&[]),
            Err(IndexError::Device(DeviceError::NoTensors))
        ));
    }

    proptest! {
        #[test]
        fn prop_sort_output_validates(values in proptest::collection::vec(0i64..20, 0..40)) {
            let index = Index::new(values, IndexOptions::new()).expect("index");
            let (mut sorted, perm) = index.sort().expect("sort");
            prop_assert_eq!(perm.numel(), index.len());
            prop_assert!(sorted.validate().is_ok());
        }

        #[test]
        fn prop_narrow_keeps_values(values in proptest::collection::vec(0i64..20, 1..40), start in 0usize..40) {
            let start = start % values.len();
            let length = values.len() - start;
            let index = Index::new(values.clone(), IndexOptions::new()).expect("index");
            let window = index.narrow(start, length).expect("narrow");
            prop_assert_eq!(window.values(), &values[start..]);
        }
    }
}
