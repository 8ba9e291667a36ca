//! CPU compute backend using Rayon for shared-memory parallelism.

use ndarray::Array2;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::backend::{check_allocation, BackendType, ComputeBackend, ComputeError, DeviceInfo};

/// CPU backend that parallelises matrix construction across threads via Rayon.
pub struct CpuBackend {
    num_threads: usize,
    /// Dedicated pool when a thread count was requested; otherwise the
    /// global Rayon pool is used.
    pool: Option<rayon::ThreadPool>,
}

impl CpuBackend {
    /// Create a new CPU backend using all available threads.
    pub fn new() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
            pool: None,
        }
    }

    /// Create a CPU backend with its own pool of `num_threads` workers.
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| ComputeError::Unavailable(e.to_string()))?;
        Ok(Self {
            num_threads: pool.current_num_threads(),
            pool: Some(pool),
        })
    }

    fn fill(
        rows: usize,
        cols: usize,
        fill_fn: &(dyn Fn(usize, usize) -> Complex64 + Send + Sync),
    ) -> Result<Array2<Complex64>, ComputeError> {
        let data: Vec<Complex64> = (0..rows * cols)
            .into_par_iter()
            .map(|idx| fill_fn(idx / cols, idx % cols))
            .collect();

        Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| ComputeError::DeviceError(e.to_string()))
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            backend_type: BackendType::Cpu,
            compute_units: Some(self.num_threads),
        }
    }

    fn parallel_matrix_fill(
        &self,
        rows: usize,
        cols: usize,
        fill_fn: &(dyn Fn(usize, usize) -> Complex64 + Send + Sync),
    ) -> Result<Array2<Complex64>, ComputeError> {
        check_allocation(rows, cols)?;
        if cols == 0 {
            return Ok(Array2::zeros((rows, cols)));
        }
        match &self.pool {
            Some(pool) => pool.install(|| Self::fill(rows, cols, fill_fn)),
            None => Self::fill(rows, cols, fill_fn),
        }
    }
}
