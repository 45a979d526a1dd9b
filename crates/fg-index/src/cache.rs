use fg_core::Tensor;
use fg_kernel_cpu::{index_to_ptr, narrow, pad_ptr};
use tracing::{debug, trace};

use crate::error::IndexError;
use crate::index::Index;

impl Index {
    #[must_use]
    pub fn indptr(&self) -> Option<&Tensor> {
        self.indptr.as_ref()
    }

    /// Fills the `indptr` cache when the data is sorted and `dim_size` is
    /// known. Otherwise, or when a cache already exists, this does nothing.
    ///
    /// Sorted data that disagrees with `dim_size` (first value negative or
    /// last value out of range) is skipped rather than cached.
    pub fn fill_cache(&mut self) -> &mut Self {
        if self.indptr.is_some() {
            trace!(target: "fg_index::cache", "indptr already cached");
            return self;
        }
        let Some(dim_size) = self.dim_size.filter(|_| self.is_sorted) else {
            trace!(
                target: "fg_index::cache",
                is_sorted = self.is_sorted,
                dim_size = ?self.dim_size,
                "indptr fill skipped"
            );
            return self;
        };
        match self.compute_indptr(dim_size) {
            Ok(indptr) => {
                debug!(target: "fg_index::cache", dim_size, len = self.len(), "indptr filled");
                self.indptr = Some(indptr);
            }
            Err(error) => {
                debug!(target: "fg_index::cache", dim_size, %error, "indptr fill skipped");
            }
        }
        self
    }

    /// Drops the cache without touching any claim.
    pub fn clear_cache(&mut self) -> &mut Self {
        self.indptr = None;
        self
    }

    /// Withdraws the sortedness claim together with the cache built on it.
    pub fn clear_sorted(&mut self) -> &mut Self {
        self.is_sorted = false;
        self.clear_cache()
    }

    /// Returns `dim_size`, inferring and storing `max + 1` when it is unknown.
    pub fn get_dim_size(&mut self) -> usize {
        if let Some(dim_size) = self.dim_size {
            return dim_size;
        }
        let inferred = self
            .values()
            .iter()
            .copied()
            .max()
            .map_or(0, |max| usize::try_from(max).map_or(0, |max| max + 1));
        self.dim_size = Some(inferred);
        inferred
    }

    /// Returns the `indptr` cache, filling it first if needed.
    ///
    /// Unlike [`Index::fill_cache`], data that cannot be cached is an error.
    pub fn get_indptr(&mut self) -> Result<&Tensor, IndexError> {
        if !self.is_sorted {
            return Err(IndexError::NotSorted);
        }
        if self.indptr.is_none() {
            let dim_size = self.get_dim_size();
            let indptr = self.compute_indptr(dim_size)?;
            return Ok(self.indptr.insert(indptr));
        }
        self.indptr.as_ref().ok_or(IndexError::InvalidCache {
            reason: "cache vanished while reading",
        })
    }

    /// Changes `dim_size` of sorted data, keeping a present cache in step.
    ///
    /// `None` forgets both `dim_size` and the cache. Growing pads the cache
    /// with the data length. Shrinking truncates it, and fails when a value
    /// would no longer fit.
    pub fn dim_resize(&mut self, dim_size: Option<usize>) -> Result<&mut Self, IndexError> {
        if !self.is_sorted {
            return Err(IndexError::NotSorted);
        }
        let Some(next) = dim_size else {
            self.dim_size = None;
            self.indptr = None;
            return Ok(self);
        };
        if let Some(max) = self.values().last().copied() {
            if max >= 0 && max as usize >= next {
                return Err(IndexError::ExceedsSize {
                    max,
                    dim_size: next,
                });
            }
        }
        let indptr = match (&self.indptr, self.dim_size) {
            (Some(indptr), Some(current)) if next > current => Some(pad_ptr(indptr, next)?),
            (Some(indptr), Some(_)) => Some(narrow(indptr, 0, next + 1)?),
            _ => None,
        };
        self.dim_size = Some(next);
        self.indptr = indptr;
        Ok(self)
    }

    /// Bucket offsets for sorted data; the data must fit `[0, dim_size)`.
    fn compute_indptr(&self, dim_size: usize) -> Result<Tensor, IndexError> {
        let values = self.values();
        if let Some(first) = values.first().copied().filter(|first| *first < 0) {
            return Err(IndexError::NegativeIndices { min: first });
        }
        if let Some(last) = values.last().copied() {
            if last as usize >= dim_size {
                return Err(IndexError::ExceedsSize {
                    max: last,
                    dim_size,
                });
            }
        }
        Ok(index_to_ptr(&self.data, dim_size)?)
    }
}
