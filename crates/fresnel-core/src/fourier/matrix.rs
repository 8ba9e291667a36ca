//! Separable matrix Fourier transform.
//!
//! For tensor-product grids the 2D kernel factorises,
//! $e^{-i(k_x x + k_y y)} = e^{-ik_x x}\,e^{-ik_y y}$, so the transform is two
//! small matrix products $F = A_y f A_x^T$ instead of one large one. The
//! output sampling is free: zoomed or non-uniform frequency axes cost the
//! same as the conjugate grid.

use std::f64::consts::PI;
use std::sync::Arc;

use fresnel_compute::default_backend;
use ndarray::{Array2, ArrayView1};
use num_complex::Complex64;

use super::{check_field_grid, FourierError, FourierTransform};
use crate::field::Field;
use crate::grid::Grid;

/// Fourier transform between separable Cartesian grids by axis-wise matrix
/// products.
pub struct MatrixFourierTransform {
    input_grid: Arc<Grid>,
    output_grid: Arc<Grid>,
    /// Forward axis matrices, `M_a × N_a`, input weights folded in.
    forward: [Array2<Complex64>; 2],
    /// Backward axis matrices, `N_a × M_a`, output weights and `1/2π` folded in.
    backward: [Array2<Complex64>; 2],
}

impl MatrixFourierTransform {
    pub fn new(input_grid: Arc<Grid>, output_grid: Arc<Grid>) -> Result<Self, FourierError> {
        for (name, grid) in [("input", &input_grid), ("output", &output_grid)] {
            if !grid.is_separated() || !grid.is_cartesian() {
                return Err(FourierError::InvalidGrid(format!(
                    "matrix transform needs a separable Cartesian {} grid",
                    name
                )));
            }
        }

        let backend = default_backend();
        let mut forward = Vec::with_capacity(2);
        let mut backward = Vec::with_capacity(2);
        for a in 0..2 {
            let axis = |g: &Grid| {
                g.axis(a)
                    .zip(g.axis_weights(a))
                    .ok_or_else(|| FourierError::InvalidGrid(format!("grid has no axis {}", a)))
            };
            let (x, wx) = axis(input_grid.as_ref())?;
            let (k, wk) = axis(output_grid.as_ref())?;

            forward.push(backend.parallel_matrix_fill(k.len(), x.len(), &|m, n| {
                Complex64::cis(-k[m] * x[n]) * wx[n]
            })?);
            backward.push(backend.parallel_matrix_fill(x.len(), k.len(), &|n, m| {
                Complex64::cis(k[m] * x[n]) * (wk[m] / (2.0 * PI))
            })?);
        }
        let [fx, fy]: [Array2<Complex64>; 2] = forward
            .try_into()
            .map_err(|_| FourierError::InvalidGrid("expected two axes".into()))?;
        let [bx, by]: [Array2<Complex64>; 2] = backward
            .try_into()
            .map_err(|_| FourierError::InvalidGrid("expected two axes".into()))?;

        Ok(Self {
            input_grid,
            output_grid,
            forward: [fx, fy],
            backward: [bx, by],
        })
    }

    /// `left · f · rightᵀ` for one component laid out as `(ny, nx)`.
    fn apply(
        values: ArrayView1<'_, Complex64>,
        shape: (usize, usize),
        left: &Array2<Complex64>,
        right: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>, FourierError> {
        let f = Array2::from_shape_vec(shape, values.to_vec())
            .map_err(|e| FourierError::InvalidGrid(e.to_string()))?;
        Ok(left.dot(&f).dot(&right.t()))
    }

    fn transform(
        &self,
        field: &Field,
        from: &Arc<Grid>,
        to: &Arc<Grid>,
        [mx, my]: &[Array2<Complex64>; 2],
    ) -> Result<Field, FourierError> {
        check_field_grid(field, from)?;
        let [nx, ny] = from
            .dims()
            .ok_or_else(|| FourierError::InvalidGrid("grid has no axes".into()))?;

        let mut out = Array2::zeros((field.num_components(), to.size()));
        for (c, mut row) in out.rows_mut().into_iter().enumerate() {
            let t = Self::apply(field.component(c), (ny, nx), my, mx)?;
            // Standard layout of (ny', nx') is the x-fastest sample order.
            for (dst, src) in row.iter_mut().zip(t.iter()) {
                *dst = *src;
            }
        }
        Ok(Field::tensor(Arc::clone(to), field.tensor_shape(), out)?)
    }
}

impl FourierTransform for MatrixFourierTransform {
    fn input_grid(&self) -> &Arc<Grid> {
        &self.input_grid
    }

    fn output_grid(&self) -> &Arc<Grid> {
        &self.output_grid
    }

    fn forward(&self, field: &Field) -> Result<Field, FourierError> {
        self.transform(field, &self.input_grid, &self.output_grid, &self.forward)
    }

    fn backward(&self, field: &Field) -> Result<Field, FourierError> {
        self.transform(field, &self.output_grid, &self.input_grid, &self.backward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fourier::{FastFourierTransform, NaiveFourierTransform};
    use crate::grid::{fft_grid, pupil_grid};

    fn gaussian(grid: &Arc<Grid>) -> Field {
        Field::from_fn(grid, |[x, y]| {
            Complex64::new((-(x * x + 2.0 * y * y)).exp(), 0.3 * x * y)
        })
    }

    #[test]
    fn test_matches_fft_on_conjugate_grid() {
        let input = Arc::new(pupil_grid([8, 6], [4.0, 3.0]).unwrap());
        let output = Arc::new(fft_grid(&input, 2).unwrap());
        let mft = MatrixFourierTransform::new(input.clone(), output).unwrap();
        let fft = FastFourierTransform::new(input.clone(), 2).unwrap();

        let f = gaussian(&input);
        let a = mft.forward(&f).unwrap();
        let b = fft.forward(&f).unwrap();
        assert!(a.max_abs_diff(&b).unwrap() < 1e-10);

        let back = mft.backward(&a).unwrap();
        assert!(back.max_abs_diff(&f).unwrap() < 1e-10);
    }

    #[test]
    fn test_zoomed_non_uniform_output_matches_naive() {
        let input = Arc::new(pupil_grid([7, 5], [3.5, 2.5]).unwrap());
        let output = Arc::new(
            Grid::separated(vec![-1.0, -0.4, 0.0, 0.25, 0.9], vec![-0.5, 0.1, 0.7]).unwrap(),
        );
        let mft = MatrixFourierTransform::new(input.clone(), output.clone()).unwrap();
        let naive = NaiveFourierTransform::new(input.clone(), output).unwrap();

        let f = gaussian(&input);
        let a = mft.forward(&f).unwrap();
        let b = naive.forward(&f).unwrap();
        assert!(a.max_abs_diff(&b).unwrap() < 1e-12);

        let a = mft.backward(&a).unwrap();
        let b = naive.backward(&b).unwrap();
        assert!(a.max_abs_diff(&b).unwrap() < 1e-12);
    }

    #[test]
    fn test_rejects_point_clouds() {
        let input = Arc::new(pupil_grid([4, 4], [2.0, 2.0]).unwrap());
        let cloud = Arc::new(Grid::unstructured(vec![0.0], vec![0.0], vec![1.0]).unwrap());
        assert!(matches!(
            MatrixFourierTransform::new(input, cloud),
            Err(FourierError::InvalidGrid(_))
        ));
    }
}
