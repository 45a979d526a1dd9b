#![forbid(unsafe_code)]

use std::fmt;

use fg_core::{Device, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    Mismatch { expected: Device, actual: Device },
    NoTensors,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch { expected, actual } => {
                write!(f, "device mismatch: expected {expected}, got {actual}")
            }
            Self::NoTensors => write!(f, "device check received no tensors"),
        }
    }
}

impl std::error::Error for DeviceError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGuard {
    device: Device,
}

impl DeviceGuard {
    #[must_use]
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    #[must_use]
    pub fn for_tensor(tensor: &Tensor) -> Self {
        Self::new(tensor.device())
    }

    #[must_use]
    pub fn device(&self) -> Device {
        self.device
    }

    pub fn ensure_tensor_device(&self, tensor: &Tensor) -> Result<(), DeviceError> {
        let actual = tensor.device();
        if actual != self.device {
            return Err(DeviceError::Mismatch {
                expected: self.device,
                actual,
            });
        }
        Ok(())
    }
}

pub fn ensure_same_device(lhs: &Tensor, rhs: &Tensor) -> Result<Device, DeviceError> {
    DeviceGuard::for_tensor(lhs).ensure_tensor_device(rhs)?;
    Ok(lhs.device())
}

/// Common device of a non-empty group of tensors.
pub fn ensure_common_device<'a, I>(tensors: I) -> Result<Device, DeviceError>
where
    I: IntoIterator<Item = &'a Tensor>,
{
    let mut tensors = tensors.into_iter();
    let first = tensors.next().ok_or(DeviceError::NoTensors)?;
    let guard = DeviceGuard::for_tensor(first);
    for tensor in tensors {
        guard.ensure_tensor_device(tensor)?;
    }
    Ok(guard.device())
}
