use fg_kernel_cpu::is_non_decreasing;
use tracing::debug;

use crate::error::IndexError;
use crate::index::{Index, ensure_index_dtype};

impl Index {
    /// Checks every claim this `Index` makes about its data.
    ///
    /// Order: dtype, rank, negative values, `dim_size` bound, sortedness,
    /// then the cached `indptr`. On success an unknown `dim_size` is inferred
    /// as `max + 1` (`0` for empty data). On failure nothing changes.
    pub fn validate(&mut self) -> Result<&mut Self, IndexError> {
        let inferred = self.check().inspect_err(|error| {
            debug!(
                target: "fg_index::validate",
                len = self.len(),
                dtype = %self.dtype(),
                %error,
                "index validation failed"
            );
        })?;
        if self.dim_size.is_none() {
            self.dim_size = Some(inferred);
        }
        Ok(self)
    }

    /// Returns the smallest `dim_size` the data admits.
    fn check(&self) -> Result<usize, IndexError> {
        ensure_index_dtype(self.dtype())?;
        if self.data.dim() != 1 {
            return Err(IndexError::NotOneDimensional {
                dims: self.data.dim(),
            });
        }

        let values = self.values();
        let min = values.iter().copied().min();
        let max = values.iter().copied().max();
        if let Some(min) = min.filter(|min| *min < 0) {
            return Err(IndexError::NegativeIndices { min });
        }
        let needed = max.map_or(0, |max| max as usize + 1);
        if let Some(dim_size) = self.dim_size {
            if needed > dim_size {
                return Err(IndexError::ExceedsSize {
                    max: max.unwrap_or_default(),
                    dim_size,
                });
            }
        }
        if self.is_sorted && !is_non_decreasing(values) {
            return Err(IndexError::NotSorted);
        }
        if let Some(indptr) = &self.indptr {
            self.check_indptr(indptr)?;
        }
        Ok(needed)
    }

    fn check_indptr(&self, indptr: &fg_core::Tensor) -> Result<(), IndexError> {
        let invalid = |reason| Err(IndexError::InvalidCache { reason });
        if !self.is_sorted {
            return invalid("cache present on unsorted data");
        }
        let Some(dim_size) = self.dim_size else {
            return invalid("cache present without dim_size");
        };
        if indptr.dtype() != self.dtype() || indptr.device() != self.device() {
            return invalid("cache dtype or device differs from data");
        }
        let ptr = indptr.to_int_vec()?;
        if ptr.len().checked_sub(1) != Some(dim_size) {
            return invalid("cache length is not dim_size + 1");
        }
        if ptr.first() != Some(&0) {
            return invalid("cache does not start at 0");
        }
        if ptr.last().copied() != i64::try_from(self.len()).ok() {
            return invalid("cache does not end at the data length");
        }
        if !is_non_decreasing(&ptr) {
            return invalid("cache is not non-decreasing");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fg_core::{DType, Device, Tensor};
    use proptest::prelude::*;

    use crate::error::{IndexError, IndexErrorKind};
    use crate::index::{Index, IndexOptions};

    fn index(values: Vec<i64>, options: IndexOptions) -> Index {
        Index::new(values, options).expect("valid construction")
    }

    #[test]
    fn negative_values_are_rejected() {
        let mut idx = index(vec![-1, 0], IndexOptions::new());
        let err = idx.validate().expect_err("negative value");
        assert!(matches!(err, IndexError::NegativeIndices { min: -1 }));
        assert_eq!(err.kind(), IndexErrorKind::Value);
        assert!(err.to_string().contains("contains negative indices"));
    }

    #[test]
    fn values_beyond_dim_size_are_rejected() {
        let mut idx = index(vec![0, 10], IndexOptions::new().dim_size(2));
        let err = idx.validate().expect_err("value beyond dim_size");
        assert!(matches!(
            err,
            IndexError::ExceedsSize {
                max: 10,
                dim_size: 2
            }
        ));
        assert!(err.to_string().contains("than its registered size"));
    }

    #[test]
    fn false_sortedness_claim_is_rejected() {
        let mut idx = index(vec![1, 0], IndexOptions::new().sorted(true));
        let err = idx.validate().expect_err("unsorted data");
        assert_eq!(err, IndexError::NotSorted);
        assert!(err.to_string().contains("not sorted"));
    }

    #[test]
    fn failure_leaves_metadata_untouched() {
        let mut idx = index(vec![-3, 1], IndexOptions::new());
        idx.validate().expect_err("negative value");
        assert_eq!(idx.dim_size(), None);
    }

    #[test]
    fn success_infers_dim_size() {
        let mut idx = index(vec![0, 1, 1, 2], IndexOptions::new().sorted(true));
        idx.validate().expect("valid index");
        assert_eq!(idx.dim_size(), Some(3));

        let mut empty = index(Vec::new(), IndexOptions::new());
        empty.validate().expect("empty index is valid");
        assert_eq!(empty.dim_size(), Some(0));
    }

    #[test]
    fn explicit_dim_size_is_kept() {
        let mut idx = index(vec![0, 1], IndexOptions::new().dim_size(7));
        idx.validate().expect("valid index");
        assert_eq!(idx.dim_size(), Some(7));
    }

    #[test]
    fn validate_chains_into_fill_cache() {
        let mut idx = index(vec![0, 1, 1, 2], IndexOptions::new().sorted(true));
        let ptr = idx
            .validate()
            .expect("valid index")
            .fill_cache()
            .indptr()
            .expect("cache filled")
            .to_int_vec()
            .expect("int cache");
        assert_eq!(ptr, vec![0, 1, 3, 4]);
    }

    #[test]
    fn inconsistent_cache_is_rejected() {
        let mut idx = index(vec![0, 1, 1, 2], IndexOptions::new().dim_size(3).sorted(true));
        idx.indptr = Some(
            Tensor::int_vector(vec![0, 1, 3], DType::I64, Device::Cpu).expect("short cache"),
        );
        let err = idx.validate().expect_err("short cache");
        assert!(matches!(err, IndexError::InvalidCache { .. }));

        idx.indptr = Some(
            Tensor::int_vector(vec![0, 1, 3, 4], DType::I32, Device::Cpu).expect("i32 cache"),
        );
        assert!(matches!(
            idx.validate(),
            Err(IndexError::InvalidCache { .. })
        ));

        idx.indptr = Some(
            Tensor::int_vector(vec![0, 1, 3, 4], DType::I64, Device::Cpu).expect("good cache"),
        );
        idx.validate().expect("consistent cache");
    }

    proptest! {
        #[test]
        fn prop_validate_agrees_with_data(values in proptest::collection::vec(-4i64..16, 0..32)) {
            let mut idx = index(values.clone(), IndexOptions::new());
            let result = idx.validate().map(|idx| idx.dim_size());
            if values.iter().any(|value| *value < 0) {
                let is_negative = matches!(result, Err(IndexError::NegativeIndices { .. }));
                prop_assert!(is_negative);
            } else {
                let expected = values.iter().max().map_or(0, |max| *max as usize + 1);
                prop_assert_eq!(result, Ok(Some(expected)));
            }
        }

        #[test]
        fn prop_sorted_input_passes_sorted_claim(mut values in proptest::collection::vec(0i64..64, 0..32)) {
            values.sort_unstable();
            let mut idx = index(values, IndexOptions::new().sorted(true));
            prop_assert!(idx.validate().is_ok());
        }
    }
}
