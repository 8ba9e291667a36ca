//! # Fresnel Compute
//!
//! Compute backend abstraction for the Fresnel framework. This crate
//! provides a [`ComputeBackend`](backend::ComputeBackend) trait that isolates
//! the transform code from execution details.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Status |
//! |---------|-------------|--------|
//! | Serial | always | Implemented |
//! | CPU (Rayon) | `cpu` (default) | Implemented |

use std::sync::Arc;

pub mod backend;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo, SerialBackend};

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;

/// The best backend compiled into this build.
pub fn default_backend() -> Arc<dyn ComputeBackend> {
    #[cfg(feature = "cpu")]
    {
        Arc::new(CpuBackend::new())
    }
    #[cfg(not(feature = "cpu"))]
    {
        Arc::new(SerialBackend)
    }
}
