//! Discrete Fourier transforms between sampling grids.
//!
//! All transforms implement [`FourierTransform`] and share one normalisation,
//! an approximation of the continuous Fourier transform:
//!
//! $$
//! F(\mathbf{k}_m) = \sum_n f(\mathbf{x}_n)\, e^{-i\mathbf{k}_m\cdot\mathbf{x}_n}\, w_n,
//! \qquad
//! f(\mathbf{x}_n) = \frac{1}{(2\pi)^2} \sum_m F(\mathbf{k}_m)\, e^{i\mathbf{k}_m\cdot\mathbf{x}_n}\, w'_m
//! $$
//!
//! where $w$ and $w'$ are the integration weights of the input and output
//! grids. Between a regular grid and its conjugate [`fft_grid`] the round
//! trip is exact.
//!
//! # Variants
//!
//! - [`naive::NaiveFourierTransform`]: dense `M × N` matrix, any grids.
//! - [`fast::FastFourierTransform`]: FFT with zero padding, regular
//!   Cartesian input only.
//! - [`matrix::MatrixFourierTransform`]: separable matrix products, arbitrary
//!   output sampling of separable grids.

pub mod fast;
pub mod matrix;
pub mod naive;

use std::f64::consts::PI;
use std::sync::Arc;

use fresnel_compute::ComputeError;
use thiserror::Error;

use crate::field::{Field, FieldError};
use crate::grid::{fft_grid, Coords, Grid};

pub use fast::FastFourierTransform;
pub use matrix::MatrixFourierTransform;
pub use naive::NaiveFourierTransform;

/// Scale applied by every backward transform, $1/(2\pi)^2$.
pub const BACKWARD_SCALE: f64 = 1.0 / (4.0 * PI * PI);

/// Errors from Fourier transform construction and application.
#[derive(Debug, Error)]
pub enum FourierError {
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Compute backend error: {0}")]
    Compute(#[from] ComputeError),
}

/// A transform between an input (spatial) grid and an output (frequency)
/// grid.
///
/// Fields of any tensor shape are transformed component by component.
pub trait FourierTransform: Send + Sync {
    /// Grid on which `forward` expects its input.
    fn input_grid(&self) -> &Arc<Grid>;

    /// Grid on which `forward` returns its output.
    fn output_grid(&self) -> &Arc<Grid>;

    /// Transform a field from the input grid to the output grid.
    fn forward(&self, field: &Field) -> Result<Field, FourierError>;

    /// Transform a field from the output grid back to the input grid.
    fn backward(&self, field: &Field) -> Result<Field, FourierError>;
}

/// Fail unless `field` has exactly one sample per point of `grid`.
pub(crate) fn check_field_grid(field: &Field, grid: &Grid) -> Result<(), FieldError> {
    if field.len() != grid.size() {
        return Err(FieldError::GridMismatch {
            expected: grid.size(),
            found: field.len(),
        });
    }
    Ok(())
}

/// Choose the cheapest exact transform between two grids.
///
/// - FFT when `output` is the conjugate frequency grid of a regular Cartesian
///   `input` for some integer oversampling `q`.
/// - Matrix transform when both grids are separable and Cartesian.
/// - Naive transform otherwise.
pub fn make_fourier_transform(
    input: Arc<Grid>,
    output: Arc<Grid>,
) -> Result<Box<dyn FourierTransform>, FourierError> {
    if let Some(q) = detect_fft_oversampling(&input, &output) {
        log::debug!("selected FFT transform (q = {})", q);
        return Ok(Box::new(FastFourierTransform::new(input, q)?));
    }
    if input.is_separated() && output.is_separated() && input.is_cartesian() && output.is_cartesian() {
        log::debug!("selected matrix Fourier transform");
        return Ok(Box::new(MatrixFourierTransform::new(input, output)?));
    }
    log::debug!("selected naive Fourier transform");
    Ok(Box::new(NaiveFourierTransform::new(input, output)?))
}

/// The integer `q` for which `output == fft_grid(input, q)`, if any.
fn detect_fft_oversampling(input: &Grid, output: &Grid) -> Option<usize> {
    if !(input.is_regular() && output.is_regular() && input.is_cartesian() && output.is_cartesian()) {
        return None;
    }
    let (n, delta) = (input.dims()?, input.delta()?);
    let dk = output.delta()?;
    let q = (2.0 * PI / (dk[0] * delta[0] * n[0] as f64)).round();
    if q < 1.0 {
        return None;
    }
    let q = q as usize;
    let out_dims = output.dims()?;
    if out_dims != [n[0].checked_mul(q)?, n[1].checked_mul(q)?] {
        return None;
    }
    let expected = fft_grid(input, q).ok()?;
    let close = |a: f64, b: f64| (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(f64::MIN_POSITIVE);
    match (expected.coords(), output.coords()) {
        (
            Coords::Regular { dims: d1, delta: k1, zero: z1 },
            Coords::Regular { dims: d2, delta: k2, zero: z2 },
        ) if d1 == d2 => {
            let same = (0..2).all(|a| close(k1[a], k2[a]) && (z1[a] - z2[a]).abs() <= 1e-9 * k1[a]);
            same.then_some(q)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::pupil_grid;

    #[test]
    fn test_selects_fft_for_conjugate_grids() {
        let input = Arc::new(pupil_grid([8, 8], [4.0, 4.0]).unwrap());
        let output = Arc::new(fft_grid(&input, 2).unwrap());
        assert_eq!(detect_fft_oversampling(&input, &output), Some(2));
        let ft = make_fourier_transform(input, output.clone()).unwrap();
        assert_eq!(ft.output_grid().size(), output.size());
    }

    #[test]
    fn test_zoomed_output_is_not_an_fft_grid() {
        let input = Arc::new(pupil_grid([8, 8], [4.0, 4.0]).unwrap());
        let zoom = Arc::new(pupil_grid([5, 5], [1.0, 1.0]).unwrap());
        assert_eq!(detect_fft_oversampling(&input, &zoom), None);
        assert!(make_fourier_transform(input, zoom).is_ok());
    }

    #[test]
    fn test_very_fine_output_falls_back_to_matrix() {
        let input = Arc::new(pupil_grid([8, 8], [4.0, 4.0]).unwrap());
        let fine = Arc::new(Grid::regular([8, 8], [1e-300, 1e-300], [0.0, 0.0]).unwrap());
        assert_eq!(detect_fft_oversampling(&input, &fine), None);
        let ft = make_fourier_transform(input, fine).unwrap();
        assert_eq!(ft.output_grid().size(), 64);
    }

    #[test]
    fn test_point_cloud_falls_back_to_naive() {
        let input = Arc::new(
            Grid::unstructured(vec![0.0, 1.0, 0.3], vec![0.0, 0.2, 1.0], vec![1.0; 3]).unwrap(),
        );
        let output = Arc::new(pupil_grid([4, 4], [2.0, 2.0]).unwrap());
        let ft = make_fourier_transform(input, output).unwrap();
        assert_eq!(ft.input_grid().size(), 3);
    }
}
