//! FFT-based Fourier transform on regular Cartesian grids.
//!
//! The input is zero padded to `M = q · N` samples per axis, centred, and
//! transformed with a 2D FFT. Pre- and post-multiplication by linear phase
//! ramps moves the DFT's implicit origins to the physical ones, so the
//! result samples the continuous transform on [`fft_grid`]`(input, q)`.

use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{Array2, ArrayView1};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use super::{check_field_grid, FourierError, FourierTransform, BACKWARD_SCALE};
use crate::field::Field;
use crate::grid::{fft_grid, Grid};

/// Forward and inverse 1D plans for one axis, plus that axis' phase ramps.
struct AxisPlan {
    /// Input samples along the axis.
    n: usize,
    /// Padded length `q · n`.
    m: usize,
    /// Index of the first input sample inside the padded buffer.
    offset: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    /// `exp(-i k₀ n' δ)` for every padded index `n'`.
    pre: Vec<Complex64>,
    /// `exp(-i k_m x₀')` for every output index `m`.
    post: Vec<Complex64>,
}

impl AxisPlan {
    fn new(planner: &mut FftPlanner<f64>, n: usize, q: usize, delta: f64, zero: f64, k0: f64) -> Self {
        let m = n * q;
        let offset = (m - n) / 2;
        let padded_zero = zero - offset as f64 * delta;
        let dk = 2.0 * PI / (m as f64 * delta);

        let pre = (0..m)
            .map(|i| Complex64::cis(-k0 * i as f64 * delta))
            .collect();
        let post = (0..m)
            .map(|i| Complex64::cis(-(k0 + i as f64 * dk) * padded_zero))
            .collect();

        Self {
            n,
            m,
            offset,
            forward: planner.plan_fft_forward(m),
            inverse: planner.plan_fft_inverse(m),
            pre,
            post,
        }
    }
}

/// Fourier transform from a regular Cartesian grid to its oversampled
/// frequency grid, in `O(M log M)`.
pub struct FastFourierTransform {
    input_grid: Arc<Grid>,
    output_grid: Arc<Grid>,
    q: usize,
    axes: [AxisPlan; 2],
    /// Area element of the input grid.
    input_weight: f64,
    /// Area element of the output grid times `1/(2π)²`.
    backward_weight: f64,
}

impl FastFourierTransform {
    /// Plan a transform with oversampling factor `q` (`q = 1` means no
    /// padding).
    pub fn new(input_grid: Arc<Grid>, q: usize) -> Result<Self, FourierError> {
        if q == 0 {
            return Err(FourierError::InvalidParameter(
                "oversampling factor must be at least 1".into(),
            ));
        }
        if !input_grid.is_cartesian() {
            return Err(FourierError::InvalidGrid(
                "FFT transform needs a Cartesian input grid".into(),
            ));
        }
        let (dims, delta, zero) = match (input_grid.dims(), input_grid.delta(), input_grid.zero()) {
            (Some(d), Some(s), Some(z)) => (d, s, z),
            _ => {
                return Err(FourierError::InvalidGrid(
                    "FFT transform needs a regular input grid".into(),
                ))
            }
        };

        let output_grid = Arc::new(fft_grid(&input_grid, q)?);
        let k0 = output_grid.zero().unwrap_or([0.0; 2]);
        let dk = output_grid.delta().unwrap_or([0.0; 2]);

        let mut planner = FftPlanner::<f64>::new();
        let axes = [
            AxisPlan::new(&mut planner, dims[0], q, delta[0], zero[0], k0[0]),
            AxisPlan::new(&mut planner, dims[1], q, delta[1], zero[1], k0[1]),
        ];
        log::debug!(
            "planned {}x{} FFT for {}x{} input (q = {})",
            axes[0].m,
            axes[1].m,
            dims[0],
            dims[1],
            q
        );

        Ok(Self {
            input_weight: delta[0] * delta[1],
            backward_weight: dk[0] * dk[1] * BACKWARD_SCALE,
            input_grid,
            output_grid,
            q,
            axes,
        })
    }

    /// Oversampling factor.
    pub fn oversampling(&self) -> usize {
        self.q
    }

    fn padded_len(&self) -> usize {
        self.axes[0].m * self.axes[1].m
    }

    fn forward_component(&self, values: ArrayView1<'_, Complex64>) -> Vec<Complex64> {
        let [ax, ay] = &self.axes;
        let mut buf = vec![Complex64::new(0.0, 0.0); self.padded_len()];

        for iy in 0..ay.n {
            let py = iy + ay.offset;
            for ix in 0..ax.n {
                let px = ix + ax.offset;
                buf[py * ax.m + px] =
                    values[iy * ax.n + ix] * ax.pre[px] * ay.pre[py] * self.input_weight;
            }
        }

        fft2(&mut buf, ax.m, ay.m, &ax.forward, &ay.forward);

        for my in 0..ay.m {
            for mx in 0..ax.m {
                buf[my * ax.m + mx] *= ax.post[mx] * ay.post[my];
            }
        }
        buf
    }

    fn backward_component(&self, values: ArrayView1<'_, Complex64>) -> Vec<Complex64> {
        let [ax, ay] = &self.axes;
        let mut buf: Vec<Complex64> = values
            .iter()
            .enumerate()
            .map(|(i, v)| *v * (ax.post[i % ax.m] * ay.post[i / ax.m]).conj())
            .collect();

        fft2(&mut buf, ax.m, ay.m, &ax.inverse, &ay.inverse);

        let mut out = Vec::with_capacity(ax.n * ay.n);
        for iy in 0..ay.n {
            let py = iy + ay.offset;
            for ix in 0..ax.n {
                let px = ix + ax.offset;
                let ramp = (ax.pre[px] * ay.pre[py]).conj();
                out.push(buf[py * ax.m + px] * ramp * self.backward_weight);
            }
        }
        out
    }
}

/// In-place 2D FFT of a row-major `ny × nx` buffer: rows first, then
/// gathered columns.
fn fft2(data: &mut [Complex64], nx: usize, ny: usize, fft_x: &Arc<dyn Fft<f64>>, fft_y: &Arc<dyn Fft<f64>>) {
    fft_x.process(data);

    let mut col = vec![Complex64::new(0.0, 0.0); ny];
    for x in 0..nx {
        for y in 0..ny {
            col[y] = data[y * nx + x];
        }
        fft_y.process(&mut col);
        for y in 0..ny {
            data[y * nx + x] = col[y];
        }
    }
}

impl FourierTransform for FastFourierTransform {
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
            for (dst, src) in row.iter_mut().zip(self.forward_component(field.component(c))) {
                *dst = src;
            }
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
        for (c, mut row) in out.rows_mut().into_iter().enumerate() {
            for (dst, src) in row.iter_mut().zip(self.backward_component(field.component(c))) {
                *dst = src;
            }
        }
        Ok(Field::tensor(
            Arc::clone(&self.input_grid),
            field.tensor_shape(),
            out,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fourier::NaiveFourierTransform;
    use crate::grid::pupil_grid;
    use approx::assert_abs_diff_eq;

    fn test_field(grid: &Arc<Grid>) -> Field {
        Field::from_fn(grid, |[x, y]| {
            Complex64::new((-(x * x + y * y) / 4.0).exp(), 0.1 * x - 0.2 * y)
        })
    }

    #[test]
    fn test_matches_naive_transform_on_odd_and_even_grids() {
        for (dims, q) in [([6, 5], 1), ([6, 5], 2), ([5, 4], 3)] {
            let input = Arc::new(pupil_grid(dims, [3.0, 2.5]).unwrap());
            let fast = FastFourierTransform::new(input.clone(), q).unwrap();
            let naive =
                NaiveFourierTransform::new(input.clone(), fast.output_grid().clone()).unwrap();

            let f = test_field(&input);
            let a = fast.forward(&f).unwrap();
            let b = naive.forward(&f).unwrap();
            assert!(a.max_abs_diff(&b).unwrap() < 1e-10, "dims {:?}, q {}", dims, q);

            let a = fast.backward(&a).unwrap();
            let b = naive.backward(&b).unwrap();
            assert!(a.max_abs_diff(&b).unwrap() < 1e-10, "dims {:?}, q {}", dims, q);
        }
    }

    #[test]
    fn test_round_trip_is_exact() {
        let input = Arc::new(pupil_grid([16, 12], [8.0, 6.0]).unwrap());
        for q in [1, 2] {
            let ft = FastFourierTransform::new(input.clone(), q).unwrap();
            assert_eq!(ft.oversampling(), q);
            assert_eq!(ft.output_grid().dims(), Some([16 * q, 12 * q]));
            let f = test_field(&input);
            let back = ft.backward(&ft.forward(&f).unwrap()).unwrap();
            assert!(back.max_abs_diff(&f).unwrap() < 1e-12);
        }
    }

    #[test]
    fn test_off_centre_grid_uses_physical_origin() {
        // A delta at x = 1 transforms to exp(-i kx) times its area.
        let input = Arc::new(Grid::regular([4, 4], [0.5, 0.5], [0.0, -1.0]).unwrap());
        let ft = FastFourierTransform::new(input.clone(), 2).unwrap();
        let f = Field::from_fn(&input, |[x, y]| {
            if (x - 1.0).abs() < 1e-9 && y.abs() < 1e-9 {
                Complex64::new(1.0, 0.0)
            } else {
                Complex64::new(0.0, 0.0)
            }
        });
        let spectrum = ft.forward(&f).unwrap();
        for (k, v) in ft.output_grid().points().iter().zip(spectrum.component(0).iter()) {
            let expected = Complex64::cis(-k[0]) * 0.25;
            assert_abs_diff_eq!(v.re, expected.re, epsilon = 1e-12);
            assert_abs_diff_eq!(v.im, expected.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_vector_fields_transform_per_component() {
        let input = Arc::new(pupil_grid([8, 8], [4.0, 4.0]).unwrap());
        let ft = FastFourierTransform::new(input.clone(), 2).unwrap();
        let f = test_field(&input);
        let v = Field::stack(&[&f, &f.scale(Complex64::new(0.0, 2.0))]).unwrap();
        let spectrum = ft.forward(&v).unwrap();
        assert_eq!(spectrum.tensor_shape(), &[2]);
        let scalar = ft.forward(&f).unwrap();
        for (a, b) in spectrum.component(1).iter().zip(scalar.component(0).iter()) {
            assert_abs_diff_eq!((a - b * Complex64::new(0.0, 2.0)).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rejects_irregular_grids_and_zero_oversampling() {
        let sep = Arc::new(Grid::separated(vec![0.0, 1.0, 3.0], vec![0.0, 1.0]).unwrap());
        assert!(matches!(
            FastFourierTransform::new(sep, 1),
            Err(FourierError::InvalidGrid(_))
        ));
        let polar = Arc::new(Grid::polar([4, 4], [1.0, 0.5], [0.5, 0.0]).unwrap());
        assert!(matches!(
            FastFourierTransform::new(polar, 1),
            Err(FourierError::InvalidGrid(_))
        ));
        let reg = Arc::new(pupil_grid([4, 4], [1.0, 1.0]).unwrap());
        assert!(matches!(
            FastFourierTransform::new(reg, 0),
            Err(FourierError::InvalidParameter(_))
        ));
    }
}
