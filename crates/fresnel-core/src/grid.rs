//! Sampling grids.
//!
//! A [`Grid`] is an immutable description of where a field is sampled. It is
//! shared by reference (`Arc<Grid>`) between every field, transform and
//! propagator defined on it.
//!
//! Samples are ordered with the first axis varying fastest: sample
//! `i = iy * nx + ix` sits at `(x[ix], y[iy])`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::field::FieldError;

/// The coordinate system the grid coordinates are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// `(x, y)` coordinates.
    Cartesian,
    /// `(r, θ)` coordinates.
    Polar,
}

/// Coordinate description of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Coords {
    /// Uniform spacing along each axis: `u_i = zero + i * delta`.
    Regular {
        dims: [usize; 2],
        delta: [f64; 2],
        zero: [f64; 2],
    },
    /// Tensor product of two arbitrary, strictly increasing axes.
    Separated { axes: [Vec<f64>; 2] },
    /// Arbitrary point cloud with explicit integration weights.
    Unstructured {
        u: Vec<f64>,
        v: Vec<f64>,
        weights: Vec<f64>,
    },
}

/// An immutable set of sample positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    system: CoordinateSystem,
    coords: Coords,
}

impl Grid {
    /// Regular Cartesian grid with `dims` samples spaced by `delta`, the first
    /// sample at `zero`.
    pub fn regular(dims: [usize; 2], delta: [f64; 2], zero: [f64; 2]) -> Result<Self, FieldError> {
        Self::regular_in(CoordinateSystem::Cartesian, dims, delta, zero)
    }

    /// Regular polar grid: `dims = [n_r, n_θ]`, `delta = [δr, δθ]`.
    pub fn polar(dims: [usize; 2], delta: [f64; 2], zero: [f64; 2]) -> Result<Self, FieldError> {
        Self::regular_in(CoordinateSystem::Polar, dims, delta, zero)
    }

    fn regular_in(
        system: CoordinateSystem,
        dims: [usize; 2],
        delta: [f64; 2],
        zero: [f64; 2],
    ) -> Result<Self, FieldError> {
        if dims.contains(&0) {
            return Err(FieldError::InvalidGrid(format!("dims must be non-zero, got {:?}", dims)));
        }
        if delta.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(FieldError::InvalidGrid(format!(
                "spacing must be positive and finite, got {:?}",
                delta
            )));
        }
        if zero.iter().any(|z| !z.is_finite()) {
            return Err(FieldError::InvalidGrid(format!("origin must be finite, got {:?}", zero)));
        }
        Ok(Self {
            system,
            coords: Coords::Regular { dims, delta, zero },
        })
    }

    /// Cartesian tensor-product grid from two strictly increasing axes.
    pub fn separated(x: Vec<f64>, y: Vec<f64>) -> Result<Self, FieldError> {
        for (name, axis) in [("x", &x), ("y", &y)] {
            if axis.is_empty() {
                return Err(FieldError::InvalidGrid(format!("{} axis is empty", name)));
            }
            if axis.windows(2).any(|w| !(w[1] > w[0])) {
                return Err(FieldError::InvalidGrid(format!(
                    "{} axis must be strictly increasing",
                    name
                )));
            }
        }
        Ok(Self {
            system: CoordinateSystem::Cartesian,
            coords: Coords::Separated { axes: [x, y] },
        })
    }

    /// Cartesian point cloud with one integration weight per point.
    pub fn unstructured(x: Vec<f64>, y: Vec<f64>, weights: Vec<f64>) -> Result<Self, FieldError> {
        if x.is_empty() || x.len() != y.len() || x.len() != weights.len() {
            return Err(FieldError::InvalidGrid(format!(
                "point cloud needs matching non-empty x/y/weights, got {}/{}/{}",
                x.len(),
                y.len(),
                weights.len()
            )));
        }
        Ok(Self {
            system: CoordinateSystem::Cartesian,
            coords: Coords::Unstructured { u: x, v: y, weights },
        })
    }

    pub fn system(&self) -> CoordinateSystem {
        self.system
    }

    pub fn coords(&self) -> &Coords {
        &self.coords
    }

    /// Total number of samples.
    pub fn size(&self) -> usize {
        match &self.coords {
            Coords::Regular { dims, .. } => dims[0] * dims[1],
            Coords::Separated { axes } => axes[0].len() * axes[1].len(),
            Coords::Unstructured { u, .. } => u.len(),
        }
    }

    /// Per-axis sample counts; `None` for point clouds.
    pub fn dims(&self) -> Option<[usize; 2]> {
        match &self.coords {
            Coords::Regular { dims, .. } => Some(*dims),
            Coords::Separated { axes } => Some([axes[0].len(), axes[1].len()]),
            Coords::Unstructured { .. } => None,
        }
    }

    /// Per-axis spacing; only defined for regular grids.
    pub fn delta(&self) -> Option<[f64; 2]> {
        match &self.coords {
            Coords::Regular { delta, .. } => Some(*delta),
            _ => None,
        }
    }

    /// Position of the first sample; only defined for regular grids.
    pub fn zero(&self) -> Option<[f64; 2]> {
        match &self.coords {
            Coords::Regular { zero, .. } => Some(*zero),
            _ => None,
        }
    }

    /// Physical extent `dims * delta` of a regular grid.
    pub fn extent(&self) -> Option<[f64; 2]> {
        match &self.coords {
            Coords::Regular { dims, delta, .. } => {
                Some([dims[0] as f64 * delta[0], dims[1] as f64 * delta[1]])
            }
            _ => None,
        }
    }

    pub fn is_regular(&self) -> bool {
        matches!(self.coords, Coords::Regular { .. })
    }

    /// Regular or tensor-product grids, i.e. anything with per-axis coordinates.
    pub fn is_separated(&self) -> bool {
        !matches!(self.coords, Coords::Unstructured { .. })
    }

    pub fn is_cartesian(&self) -> bool {
        self.system == CoordinateSystem::Cartesian
    }

    /// One-dimensional coordinates along `axis` (0 or 1) for separable grids.
    pub fn axis(&self, axis: usize) -> Option<Vec<f64>> {
        if axis > 1 {
            return None;
        }
        match &self.coords {
            Coords::Regular { dims, delta, zero } => Some(
                (0..dims[axis])
                    .map(|i| zero[axis] + i as f64 * delta[axis])
                    .collect(),
            ),
            Coords::Separated { axes } => Some(axes[axis].clone()),
            Coords::Unstructured { .. } => None,
        }
    }

    /// Integration widths along `axis` for separable grids.
    ///
    /// Regular axes use `delta`; separated axes use the midpoint rule, with
    /// end samples taking the width of their single neighbour gap.
    pub fn axis_weights(&self, axis: usize) -> Option<Vec<f64>> {
        if axis > 1 {
            return None;
        }
        match &self.coords {
            Coords::Regular { dims, delta, .. } => Some(vec![delta[axis]; dims[axis]]),
            Coords::Separated { axes } => Some(midpoint_widths(&axes[axis])),
            Coords::Unstructured { .. } => None,
        }
    }

    /// Native coordinates `(u, v)` of sample `index`.
    pub fn native(&self, index: usize) -> [f64; 2] {
        match &self.coords {
            Coords::Regular { dims, delta, zero } => {
                let (ix, iy) = (index % dims[0], index / dims[0]);
                [zero[0] + ix as f64 * delta[0], zero[1] + iy as f64 * delta[1]]
            }
            Coords::Separated { axes } => {
                let nx = axes[0].len();
                [axes[0][index % nx], axes[1][index / nx]]
            }
            Coords::Unstructured { u, v, .. } => [u[index], v[index]],
        }
    }

    /// Cartesian positions of every sample. Polar samples are converted with
    /// `x = r cos θ`, `y = r sin θ`.
    pub fn points(&self) -> Vec<[f64; 2]> {
        (0..self.size())
            .map(|i| {
                let [u, v] = self.native(i);
                match self.system {
                    CoordinateSystem::Cartesian => [u, v],
                    CoordinateSystem::Polar => [u * v.cos(), u * v.sin()],
                }
            })
            .collect()
    }

    /// Distance of every sample from the origin.
    pub fn radii(&self) -> Vec<f64> {
        self.points().iter().map(|[x, y]| x.hypot(*y)).collect()
    }

    /// Integration weight (area element) of every sample.
    pub fn weights(&self) -> Vec<f64> {
        match (&self.coords, self.system) {
            (Coords::Regular { dims, delta, zero }, CoordinateSystem::Polar) => (0..dims[0]
                * dims[1])
                .map(|i| {
                    let r = zero[0] + (i % dims[0]) as f64 * delta[0];
                    r.abs() * delta[0] * delta[1]
                })
                .collect(),
            (Coords::Regular { dims, delta, .. }, CoordinateSystem::Cartesian) => {
                vec![delta[0] * delta[1]; dims[0] * dims[1]]
            }
            (Coords::Separated { axes }, _) => {
                let wx = midpoint_widths(&axes[0]);
                let wy = midpoint_widths(&axes[1]);
                wy.iter()
                    .flat_map(|y| wx.iter().map(move |x| x * y))
                    .collect()
            }
            (Coords::Unstructured { weights, .. }, _) => weights.clone(),
        }
    }

    /// The same regular grid translated by `offset`.
    pub fn shifted(&self, offset: [f64; 2]) -> Result<Self, FieldError> {
        match &self.coords {
            Coords::Regular { dims, delta, zero } => Self::regular_in(
                self.system,
                *dims,
                *delta,
                [zero[0] + offset[0], zero[1] + offset[1]],
            ),
            _ => Err(FieldError::InvalidGrid(
                "only regular grids can be shifted".into(),
            )),
        }
    }
}

fn midpoint_widths(axis: &[f64]) -> Vec<f64> {
    let n = axis.len();
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| {
            if i == 0 {
                axis[1] - axis[0]
            } else if i == n - 1 {
                axis[n - 1] - axis[n - 2]
            } else {
                0.5 * (axis[i + 1] - axis[i - 1])
            }
        })
        .collect()
}

/// Regular Cartesian grid centred on the origin covering `extent`.
///
/// `delta = extent / dims`; for an even sample count the origin falls
/// between the two central samples.
pub fn pupil_grid(dims: [usize; 2], extent: [f64; 2]) -> Result<Grid, FieldError> {
    if dims.contains(&0) {
        return Err(FieldError::InvalidGrid(format!("dims must be non-zero, got {:?}", dims)));
    }
    let delta = [extent[0] / dims[0] as f64, extent[1] / dims[1] as f64];
    let zero = [
        -extent[0] / 2.0 + delta[0] / 2.0,
        -extent[1] / 2.0 + delta[1] / 2.0,
    ];
    Grid::regular(dims, delta, zero)
}

/// Spatial-frequency grid conjugate to a regular grid, oversampled by `q`.
///
/// Holds `q * dims` samples spaced `2π / (q · dims · delta)`; the first
/// sample sits at `-(⌊M/2⌋) · Δk` so zero frequency is always sampled.
pub fn fft_grid(input: &Grid, q: usize) -> Result<Grid, FieldError> {
    let (dims, delta) = match input.coords() {
        Coords::Regular { dims, delta, .. } => (*dims, *delta),
        _ => {
            return Err(FieldError::InvalidGrid(
                "a frequency grid needs a regular input grid".into(),
            ))
        }
    };
    if q == 0 {
        return Err(FieldError::InvalidGrid("oversampling factor q must be >= 1".into()));
    }
    let m = match (dims[0].checked_mul(q), dims[1].checked_mul(q)) {
        (Some(mx), Some(my)) => [mx, my],
        _ => {
            return Err(FieldError::InvalidGrid(format!(
                "frequency grid of {:?} x {} samples overflows",
                dims, q
            )))
        }
    };
    let dk = [
        2.0 * PI / (m[0] as f64 * delta[0]),
        2.0 * PI / (m[1] as f64 * delta[1]),
    ];
    let zero = [-((m[0] / 2) as f64) * dk[0], -((m[1] / 2) as f64) * dk[1]];
    Grid::regular(m, dk, zero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pupil_grid_is_centred() {
        let g = pupil_grid([4, 3], [4.0, 3.0]).unwrap();
        assert_eq!(g.size(), 12);
        assert_eq!(g.delta(), Some([1.0, 1.0]));
        let x = g.axis(0).unwrap();
        let y = g.axis(1).unwrap();
        assert_abs_diff_eq!(x[0] + x[3], 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(y[1], 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_sample_order_is_x_fastest() {
        let g = Grid::regular([3, 2], [1.0, 10.0], [0.0, 0.0]).unwrap();
        let p = g.points();
        assert_eq!(p[1], [1.0, 0.0]);
        assert_eq!(p[3], [0.0, 10.0]);
    }

    #[test]
    fn test_fft_grid_contains_zero_frequency() {
        let g = pupil_grid([8, 5], [8.0, 5.0]).unwrap();
        let f = fft_grid(&g, 2).unwrap();
        assert_eq!(f.dims(), Some([16, 10]));
        let kx = f.axis(0).unwrap();
        let ky = f.axis(1).unwrap();
        assert_abs_diff_eq!(kx[8], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ky[5], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(f.delta().unwrap()[0], 2.0 * PI / 16.0, epsilon = 1e-15);
    }

    #[test]
    fn test_fft_grid_rejects_overflowing_oversampling() {
        let g = pupil_grid([8, 8], [4.0, 4.0]).unwrap();
        assert!(matches!(fft_grid(&g, usize::MAX), Err(FieldError::InvalidGrid(_))));
    }

    #[test]
    fn test_polar_points_convert_to_cartesian() {
        let g = Grid::polar([2, 4], [1.0, PI / 2.0], [1.0, 0.0]).unwrap();
        assert!(!g.is_cartesian());
        let p = g.points();
        // r = 1, θ = π/2
        assert_abs_diff_eq!(p[2][0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p[2][1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g.radii()[3], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_separated_weights_match_regular_for_uniform_axes() {
        let reg = Grid::regular([4, 3], [0.5, 2.0], [0.0, 0.0]).unwrap();
        let sep = Grid::separated(reg.axis(0).unwrap(), reg.axis(1).unwrap()).unwrap();
        for (a, b) in reg.weights().iter().zip(sep.weights()) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-15);
        }
        assert!(sep.is_separated());
        assert!(!sep.is_regular());
    }

    #[test]
    fn test_invalid_grids_are_rejected() {
        assert!(Grid::regular([0, 4], [1.0, 1.0], [0.0, 0.0]).is_err());
        assert!(Grid::regular([4, 4], [1.0, -1.0], [0.0, 0.0]).is_err());
        assert!(Grid::separated(vec![0.0, 1.0, 0.5], vec![0.0]).is_err());
        assert!(Grid::unstructured(vec![0.0], vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(fft_grid(&Grid::separated(vec![0.0, 1.0], vec![0.0]).unwrap(), 1).is_err());
    }

    #[test]
    fn test_shift_keeps_dims_and_spacing() {
        let g = pupil_grid([4, 4], [2.0, 2.0]).unwrap();
        let s = g.shifted([0.1, -0.2]).unwrap();
        assert_eq!(s.dims(), g.dims());
        assert_eq!(s.delta(), g.delta());
        let (a, b) = (g.zero().unwrap(), s.zero().unwrap());
        assert_abs_diff_eq!(b[0] - a[0], 0.1, epsilon = 1e-15);
        assert_abs_diff_eq!(b[1] - a[1], -0.2, epsilon = 1e-15);
    }
}
