//! Direct Fourier sum via a dense transformation matrix.
//!
//! The matrix $T_{mn} = e^{-i\mathbf{k}_m\cdot\mathbf{x}_n}$ is built once,
//! in parallel, and cached. Cost is $O(MN)$ memory and $O(MN)$ per call,
//! which is acceptable only for small or irregular grids.

use std::sync::Arc;

use fresnel_compute::{default_backend, ComputeBackend};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::{check_field_grid, FourierError, FourierTransform, BACKWARD_SCALE};
use crate::field::Field;
use crate::grid::Grid;

/// Dense-matrix Fourier transform between arbitrary grids.
pub struct NaiveFourierTransform {
    input_grid: Arc<Grid>,
    output_grid: Arc<Grid>,
    /// `M × N` kernel without integration weights.
    matrix: Array2<Complex64>,
    input_weights: Array1<f64>,
    output_weights: Array1<f64>,
    backend: Arc<dyn ComputeBackend>,
}

impl NaiveFourierTransform {
    pub fn new(input_grid: Arc<Grid>, output_grid: Arc<Grid>) -> Result<Self, FourierError> {
        Self::with_backend(input_grid, output_grid, default_backend())
    }

    /// Build the transformation matrix on a specific compute backend.
    pub fn with_backend(
        input_grid: Arc<Grid>,
        output_grid: Arc<Grid>,
        backend: Arc<dyn ComputeBackend>,
    ) -> Result<Self, FourierError> {
        let x = input_grid.points();
        let k = output_grid.points();
        log::debug!(
            "building {}x{} naive Fourier matrix on {}",
            k.len(),
            x.len(),
            backend.device_info().name
        );

        let matrix = backend.parallel_matrix_fill(k.len(), x.len(), &|m, n| {
            Complex64::cis(-(k[m][0] * x[n][0] + k[m][1] * x[n][1]))
        })?;

        Ok(Self {
            input_weights: Array1::from_vec(input_grid.weights()),
            output_weights: Array1::from_vec(output_grid.weights()),
            input_grid,
            output_grid,
            matrix,
            backend,
        })
    }

    /// The cached kernel $e^{-i\mathbf{k}_m\cdot\mathbf{x}_n}$.
    pub fn transformation_matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }
}

impl FourierTransform for NaiveFourierTransform {
    fn input_grid(&self) -> &Arc<Grid> {
        &self.input_grid
    }

    fn output_grid(&self) -> &Arc<Grid> {
        &self.output_grid
    }

    fn forward(&self, field: &Field) -> Result<Field, FourierError> {
        check_field_grid(field, &self.input_grid)?;
        let mut out = Array2::zeros((field.num_components(), self.output_grid.size()));

        for (c, mut row) in out.rows_mut().into_iter().enumerate() {
            let weighted: Array1<Complex64> = field
                .component(c)
                .iter()
                .zip(self.input_weights.iter())
                .map(|(v, w)| *v * *w)
                .collect();
            row.assign(&self.backend.matvec(&self.matrix, &weighted)?);
        }

        Ok(Field::tensor(
            Arc::clone(&self.output_grid),
            field.tensor_shape(),
            out,
        )?)
    }

    fn backward(&self, field: &Field) -> Result<Field, FourierError> {
        check_field_grid(field, &self.output_grid)?;
        let mut out = Array2::zeros((field.num_components(), self.input_grid.size()));

        // conj(Tᵀ · conj(v)) = T^H · v, so the cached matrix serves both ways.
        for (c, mut row) in out.rows_mut().into_iter().enumerate() {
            let weighted: Array1<Complex64> = field
                .component(c)
                .iter()
                .zip(self.output_weights.iter())
                .map(|(v, w)| (*v * *w).conj())
                .collect();
            let y = self.backend.matvec_transpose(&self.matrix, &weighted)?;
            row.assign(&y.mapv(|v| v.conj() * BACKWARD_SCALE));
        }

        Ok(Field::tensor(
            Arc::clone(&self.input_grid),
            field.tensor_shape(),
            out,
        )?)
    }
}
