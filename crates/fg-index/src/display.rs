use std::fmt;

use fg_core::{DType, Device};

use crate::index::Index;

impl fmt::Display for Index {
    /// `Index([0, 1, 1, 2], dim_size=3, device='cuda', dtype=int32, is_sorted=True)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index([")?;
        for (slot, value) in self.values().iter().enumerate() {
            if slot > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")?;
        if let Some(dim_size) = self.dim_size {
            write!(f, ", dim_size={dim_size}")?;
        }
        if self.device() != Device::Cpu {
            write!(f, ", device='{}'", self.device())?;
        }
        if self.dtype() != DType::DEFAULT_INT {
            write!(f, ", dtype={}", self.dtype())?;
        }
        if self.is_sorted {
            write!(f, ", is_sorted=True")?;
        }
        write!(f, ")")
    }
}
