//! Compute backend trait and device abstraction.
//!
//! The [`ComputeBackend`] trait abstracts over execution environments so that
//! the transform code in `fresnel-core` never touches threads directly. The
//! dominant cost it covers is building dense Fourier matrices (`O(N·M)`
//! complex exponentials) once per transform instance.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Device error: {0}")]
    DeviceError(String),

    #[error("Out of memory: requested {requested} bytes, available {available}")]
    OutOfMemory { requested: usize, available: usize },
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub compute_units: Option<usize>,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Single-threaded evaluation on the calling thread.
    Serial,
    /// Shared-memory parallelism via Rayon.
    Cpu,
}

/// Largest dense matrix (in elements) a backend will allocate.
///
/// 2^28 complex doubles is 4 GiB; anything above that is almost certainly a
/// naive transform requested on a grid that should use the FFT instead.
pub const MAX_MATRIX_ELEMENTS: usize = 1 << 28;

/// Abstraction over compute backends.
///
/// Implementations provide execution for the construction-time hot path
/// (dense matrix fill) and the per-call matrix products of the dense
/// Fourier transforms.
pub trait ComputeBackend: Send + Sync {
    /// Return information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// Fill a `rows × cols` matrix where every entry is independent.
    ///
    /// This is the entry point for building Fourier matrices: each
    /// `exp(-i k_m · x_n)` entry can be computed in isolation.
    fn parallel_matrix_fill(
        &self,
        rows: usize,
        cols: usize,
        fill_fn: &(dyn Fn(usize, usize) -> Complex64 + Send + Sync),
    ) -> Result<Array2<Complex64>, ComputeError>;

    /// Complex matrix-vector product $\mathbf{y} = \mathbf{A}\mathbf{x}$.
    fn matvec(
        &self,
        matrix: &Array2<Complex64>,
        vector: &Array1<Complex64>,
    ) -> Result<Array1<Complex64>, ComputeError> {
        check_dims(matrix.ncols(), vector.len())?;
        Ok(matrix.dot(vector))
    }

    /// Transposed product $\mathbf{y} = \mathbf{A}^T\mathbf{x}$ (no conjugation).
    ///
    /// Lets callers apply the adjoint of a cached matrix without storing a
    /// second copy of it.
    fn matvec_transpose(
        &self,
        matrix: &Array2<Complex64>,
        vector: &Array1<Complex64>,
    ) -> Result<Array1<Complex64>, ComputeError> {
        check_dims(matrix.nrows(), vector.len())?;
        Ok(matrix.t().dot(vector))
    }
}

fn check_dims(expected: usize, found: usize) -> Result<(), ComputeError> {
    if expected != found {
        return Err(ComputeError::DeviceError(format!(
            "dimension mismatch: matrix expects {} elements, vector has {}",
            expected, found
        )));
    }
    Ok(())
}

/// Reject matrix shapes that would exceed [`MAX_MATRIX_ELEMENTS`].
pub fn check_allocation(rows: usize, cols: usize) -> Result<(), ComputeError> {
    let elements = rows.checked_mul(cols).unwrap_or(usize::MAX);
    if elements > MAX_MATRIX_ELEMENTS {
        let size = std::mem::size_of::<Complex64>();
        return Err(ComputeError::OutOfMemory {
            requested: elements.saturating_mul(size),
            available: MAX_MATRIX_ELEMENTS * size,
        });
    }
    Ok(())
}

/// Backend that evaluates everything on the calling thread.
///
/// Deterministic and dependency-free; used when the `cpu` feature is off.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialBackend;

impl ComputeBackend for SerialBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Serial".into(),
            backend_type: BackendType::Serial,
            compute_units: Some(1),
        }
    }

    fn parallel_matrix_fill(
        &self,
        rows: usize,
        cols: usize,
        fill_fn: &(dyn Fn(usize, usize) -> Complex64 + Send + Sync),
    ) -> Result<Array2<Complex64>, ComputeError> {
        check_allocation(rows, cols)?;
        Ok(Array2::from_shape_fn((rows, cols), |(i, j)| fill_fn(i, j)))
    }
}
