//! Jones-calculus polarisation elements.
//!
//! A Jones matrix acts on the two-component electric field `(E_x, E_y)` of a
//! wavefront. It is either the same everywhere ([`JonesMatrix::Uniform`]) or
//! varies across the pupil ([`JonesMatrix::Spatial`], a `[2, 2]` tensor
//! field). All retarders derive from one parameterised matrix,
//! [`retarder_matrix`]; the named plates are thin wrappers around it.

use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4, PI};
use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex64;

use crate::field::{Field, FieldError};
use crate::grid::Grid;
use crate::optics::{OpticalElement, OpticsError};
use crate::types::Wavefront;

/// Stack-allocated 2×2 complex matrix.
pub type Matrix2 = [[Complex64; 2]; 2];

/// Real 4×4 Mueller matrix.
pub type Matrix4 = [[f64; 4]; 4];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// A Jones matrix, constant or spatially varying.
#[derive(Debug, Clone)]
pub enum JonesMatrix {
    Uniform(Matrix2),
    /// One matrix per grid sample; tensor shape `[2, 2]`, row-major.
    Spatial(Field),
}

impl JonesMatrix {
    /// Spatially varying matrix from a tensor field of shape `[2, 2]`.
    pub fn spatial(field: Field) -> Result<Self, FieldError> {
        if field.tensor_shape() != [2, 2] {
            return Err(FieldError::ShapeMismatch(format!(
                "a Jones matrix field needs tensor shape [2, 2], got {:?}",
                field.tensor_shape()
            )));
        }
        Ok(Self::Spatial(field))
    }

    /// Spatially varying matrix evaluated at the Cartesian position of every
    /// sample of `grid`.
    pub fn from_fn(grid: &Arc<Grid>, f: impl Fn([f64; 2]) -> Matrix2) -> Self {
        let mut field = Field::zeros_tensor(grid, &[2, 2]);
        let values = field.values_mut();
        for (i, p) in grid.points().into_iter().enumerate() {
            let m = f(p);
            values[[0, i]] = m[0][0];
            values[[1, i]] = m[0][1];
            values[[2, i]] = m[1][0];
            values[[3, i]] = m[1][1];
        }
        Self::Spatial(field)
    }

    pub fn identity() -> Self {
        let one = Complex64::new(1.0, 0.0);
        Self::Uniform([[one, ZERO], [ZERO, one]])
    }

    /// The grid of a spatial matrix.
    pub fn grid(&self) -> Option<&Arc<Grid>> {
        match self {
            Self::Uniform(_) => None,
            Self::Spatial(field) => Some(field.grid()),
        }
    }

    /// The matrix acting on sample `index`.
    pub fn at(&self, index: usize) -> Matrix2 {
        match self {
            Self::Uniform(m) => *m,
            Self::Spatial(field) => {
                let v = field.values();
                [[v[[0, index]], v[[1, index]]], [v[[2, index]], v[[3, index]]]]
            }
        }
    }

    /// Hermitian adjoint $J^\dagger$.
    pub fn conj_transpose(&self) -> Self {
        match self {
            Self::Uniform(m) => Self::Uniform(adjoint(m)),
            Self::Spatial(field) => {
                let mut out = field.conj();
                let values = out.values_mut();
                for i in 0..values.ncols() {
                    values.swap([1, i], [2, i]);
                }
                Self::Spatial(out)
            }
        }
    }

    /// Matrix product `self · other`: `other` acts first.
    pub fn compose(&self, other: &JonesMatrix) -> Result<JonesMatrix, FieldError> {
        if let (Self::Uniform(a), Self::Uniform(b)) = (self, other) {
            return Ok(Self::Uniform(matmul(a, b)));
        }
        let (grid, n) = self.spatial_extent(other)?;
        let mut values = Array2::zeros((4, n));
        for i in 0..n {
            let m = matmul(&self.at(i), &other.at(i));
            values[[0, i]] = m[0][0];
            values[[1, i]] = m[0][1];
            values[[2, i]] = m[1][0];
            values[[3, i]] = m[1][1];
        }
        Ok(Self::Spatial(Field::tensor(grid, &[2, 2], values)?))
    }

    /// Grid and sample count shared by two operands, at least one spatial.
    fn spatial_extent(&self, other: &JonesMatrix) -> Result<(Arc<Grid>, usize), FieldError> {
        match (self, other) {
            (Self::Spatial(a), Self::Spatial(b)) => {
                a.check_grid(b)?;
                Ok((Arc::clone(a.grid()), a.len()))
            }
            (Self::Spatial(f), _) | (_, Self::Spatial(f)) => Ok((Arc::clone(f.grid()), f.len())),
            _ => Err(FieldError::ShapeMismatch("no spatial operand".into())),
        }
    }

    /// Apply the matrix to a Jones-vector field (tensor shape `[2]`).
    pub fn apply(&self, field: &Field) -> Result<Field, FieldError> {
        if field.tensor_shape() != [2] {
            return Err(FieldError::ShapeMismatch(format!(
                "Jones matrices act on fields of tensor shape [2], got {:?}",
                field.tensor_shape()
            )));
        }
        if let Self::Spatial(m) = self {
            m.check_grid(field)?;
        }

        let e = field.values();
        let n = field.len();
        let mut out = Array2::zeros((2, n));
        for i in 0..n {
            let m = self.at(i);
            let (ex, ey) = (e[[0, i]], e[[1, i]]);
            out[[0, i]] = m[0][0] * ex + m[0][1] * ey;
            out[[1, i]] = m[1][0] * ex + m[1][1] * ey;
        }
        Field::tensor(Arc::clone(field.grid()), &[2], out)
    }

    /// Mueller matrix of the same element.
    pub fn to_mueller(&self) -> MuellerMatrix {
        match self {
            Self::Uniform(m) => MuellerMatrix::Uniform(jones_to_mueller(m)),
            Self::Spatial(field) => MuellerMatrix::Spatial {
                grid: Arc::clone(field.grid()),
                values: (0..field.len()).map(|i| jones_to_mueller(&self.at(i))).collect(),
            },
        }
    }
}

fn matmul(a: &Matrix2, b: &Matrix2) -> Matrix2 {
    let mut out = [[ZERO; 2]; 2];
    for i in 0..2 {
        for j in 0..2 {
            out[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j];
        }
    }
    out
}

fn adjoint(m: &Matrix2) -> Matrix2 {
    [
        [m[0][0].conj(), m[1][0].conj()],
        [m[0][1].conj(), m[1][1].conj()],
    ]
}

/// A Mueller matrix, constant or one per grid sample.
#[derive(Debug, Clone)]
pub enum MuellerMatrix {
    Uniform(Matrix4),
    Spatial { grid: Arc<Grid>, values: Vec<Matrix4> },
}

/// Convert a Jones matrix to its Mueller matrix,
/// $M = \mathrm{Re}\left(U (J \otimes J^*) U^\dagger\right)$.
pub fn jones_to_mueller(j: &Matrix2) -> Matrix4 {
    let s = Complex64::new(FRAC_1_SQRT_2, 0.0);
    let i = Complex64::new(0.0, FRAC_1_SQRT_2);
    let u: [[Complex64; 4]; 4] = [
        [s, ZERO, ZERO, s],
        [s, ZERO, ZERO, -s],
        [ZERO, s, s, ZERO],
        [ZERO, i, -i, ZERO],
    ];

    // Kronecker product J ⊗ J*
    let mut kron = [[ZERO; 4]; 4];
    for (r, row) in kron.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = j[r / 2][c / 2] * j[r % 2][c % 2].conj();
        }
    }

    let mut out = [[0.0; 4]; 4];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            let mut acc = ZERO;
            for a in 0..4 {
                for b in 0..4 {
                    acc += u[r][a] * kron[a][b] * u[c][b].conj();
                }
            }
            *v = acc.re;
        }
    }
    out
}

/// Jones matrix of a general elliptical retarder.
///
/// * `retardation` - phase delay of the slow axis relative to the fast axis.
/// * `fast_axis` - fast-axis angle from the x-axis (radians).
/// * `circularity` - 0 for linear retarders, π/2 for circular ones.
pub fn retarder_matrix(retardation: f64, fast_axis: f64, circularity: f64) -> Matrix2 {
    let plus = Complex64::cis(retardation / 2.0);
    let minus = Complex64::cis(-retardation / 2.0);
    let (s, c) = fast_axis.sin_cos();

    let off = (plus - minus) * c * s;
    [
        [plus * c * c + minus * s * s, off * Complex64::cis(-circularity)],
        [off * Complex64::cis(circularity), plus * s * s + minus * c * c],
    ]
}

/// An optical element described by a Jones matrix.
#[derive(Debug, Clone)]
pub struct JonesElement {
    name: String,
    matrix: JonesMatrix,
}

impl JonesElement {
    pub fn new(matrix: JonesMatrix) -> Self {
        Self::named("Jones matrix", matrix)
    }

    pub fn named(name: impl Into<String>, matrix: JonesMatrix) -> Self {
        Self {
            name: name.into(),
            matrix,
        }
    }

    pub fn matrix(&self) -> &JonesMatrix {
        &self.matrix
    }

    /// The element equivalent to passing through `other` and then `self`.
    pub fn compose(&self, other: &JonesElement) -> Result<JonesElement, OpticsError> {
        Ok(Self::new(self.matrix.compose(&other.matrix)?))
    }

    pub fn mueller_matrix(&self) -> MuellerMatrix {
        self.matrix.to_mueller()
    }
}

impl OpticalElement for JonesElement {
    fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront, OpticsError> {
        let field = self.matrix.apply(&wavefront.electric_field)?;
        Ok(wavefront.with_electric_field(field))
    }

    fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront, OpticsError> {
        let field = self
            .matrix
            .conj_transpose()
            .apply(&wavefront.electric_field)?;
        Ok(wavefront.with_electric_field(field))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// General retarder element, see [`retarder_matrix`].
pub fn phase_retarder(retardation: f64, fast_axis: f64, circularity: f64) -> JonesElement {
    JonesElement::named(
        "Phase retarder",
        JonesMatrix::Uniform(retarder_matrix(retardation, fast_axis, circularity)),
    )
}

pub fn linear_retarder(retardation: f64, fast_axis: f64) -> JonesElement {
    JonesElement::named(
        "Linear retarder",
        JonesMatrix::Uniform(retarder_matrix(retardation, fast_axis, 0.0)),
    )
}

/// Retarder whose eigenpolarisations are circular; rotates linear
/// polarisation by `retardation / 2`.
pub fn circular_retarder(retardation: f64) -> JonesElement {
    JonesElement::named(
        "Circular retarder",
        JonesMatrix::Uniform(retarder_matrix(retardation, FRAC_PI_4, FRAC_PI_2)),
    )
}

pub fn quarter_wave_plate(fast_axis: f64) -> JonesElement {
    JonesElement::named(
        "Quarter-wave plate",
        JonesMatrix::Uniform(retarder_matrix(FRAC_PI_2, fast_axis, 0.0)),
    )
}

pub fn half_wave_plate(fast_axis: f64) -> JonesElement {
    JonesElement::named(
        "Half-wave plate",
        JonesMatrix::Uniform(retarder_matrix(PI, fast_axis, 0.0)),
    )
}

/// Ideal linear polariser transmitting light polarised at `angle` from the
/// x-axis.
pub fn linear_polarizer(angle: f64) -> JonesElement {
    let (s, c) = angle.sin_cos();
    let m = |v: f64| Complex64::new(v, 0.0);
    JonesElement::named(
        "Linear polarizer",
        JonesMatrix::Uniform([[m(c * c), m(c * s)], [m(c * s), m(s * s)]]),
    )
}
