//! Sampled fields bound to a grid.
//!
//! A [`Field`] holds complex samples for every point of a shared [`Grid`].
//! Values are stored as a `(components, samples)` array: a scalar field has
//! one component row, a tensor field (Jones vector, Jones matrix) has one row
//! per tensor element in row-major order.

use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use num_complex::Complex64;
use thiserror::Error;

use crate::grid::Grid;

/// Errors from field construction and field arithmetic.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Grid mismatch: expected {expected} samples, found {found}")]
    GridMismatch { expected: usize, found: usize },

    #[error("Tensor shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),
}

/// Complex samples on a grid, scalar or tensor valued.
#[derive(Debug, Clone)]
pub struct Field {
    grid: Arc<Grid>,
    tensor_shape: Vec<usize>,
    values: Array2<Complex64>,
}

impl Field {
    /// Scalar field from one value per grid sample.
    pub fn new(grid: Arc<Grid>, values: Array1<Complex64>) -> Result<Self, FieldError> {
        Self::tensor(grid, &[], values.insert_axis(Axis(0)))
    }

    /// Tensor field; `values` has one row per tensor element.
    pub fn tensor(
        grid: Arc<Grid>,
        tensor_shape: &[usize],
        values: Array2<Complex64>,
    ) -> Result<Self, FieldError> {
        let components: usize = tensor_shape.iter().product();
        if values.nrows() != components {
            return Err(FieldError::ShapeMismatch(format!(
                "tensor shape {:?} needs {} component rows, got {}",
                tensor_shape,
                components,
                values.nrows()
            )));
        }
        if values.ncols() != grid.size() {
            return Err(FieldError::GridMismatch {
                expected: grid.size(),
                found: values.ncols(),
            });
        }
        Ok(Self {
            grid,
            tensor_shape: tensor_shape.to_vec(),
            values,
        })
    }

    /// Scalar field evaluated from the Cartesian position of each sample.
    pub fn from_fn(grid: &Arc<Grid>, f: impl Fn([f64; 2]) -> Complex64) -> Self {
        let values: Array2<Complex64> =
            Array1::from_iter(grid.points().into_iter().map(f)).insert_axis(Axis(0));
        Self {
            grid: Arc::clone(grid),
            tensor_shape: Vec::new(),
            values,
        }
    }

    pub fn zeros(grid: &Arc<Grid>) -> Self {
        Self::zeros_tensor(grid, &[])
    }

    pub fn zeros_tensor(grid: &Arc<Grid>, tensor_shape: &[usize]) -> Self {
        let components: usize = tensor_shape.iter().product();
        Self {
            grid: Arc::clone(grid),
            tensor_shape: tensor_shape.to_vec(),
            values: Array2::zeros((components, grid.size())),
        }
    }

    /// Stack scalar fields into a vector field of tensor shape `[n]`.
    pub fn stack(components: &[&Field]) -> Result<Self, FieldError> {
        let first = components
            .first()
            .ok_or_else(|| FieldError::ShapeMismatch("cannot stack zero fields".into()))?;
        let n = first.len();
        let mut values = Array2::zeros((components.len(), n));
        for (row, c) in components.iter().enumerate() {
            if !c.is_scalar() {
                return Err(FieldError::ShapeMismatch(format!(
                    "only scalar fields can be stacked, got shape {:?}",
                    c.tensor_shape
                )));
            }
            first.check_grid(c)?;
            values.row_mut(row).assign(&c.values.row(0));
        }
        Ok(Self {
            grid: Arc::clone(&first.grid),
            tensor_shape: vec![components.len()],
            values,
        })
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn tensor_shape(&self) -> &[usize] {
        &self.tensor_shape
    }

    pub fn is_scalar(&self) -> bool {
        self.tensor_shape.is_empty()
    }

    pub fn num_components(&self) -> usize {
        self.values.nrows()
    }

    /// Number of samples (the grid size).
    pub fn len(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.values.ncols() == 0
    }

    /// All values, shape `(components, samples)`.
    pub fn values(&self) -> &Array2<Complex64> {
        &self.values
    }

    /// Mutable access to the values; the shape is fixed.
    pub fn values_mut(&mut self) -> &mut Array2<Complex64> {
        &mut self.values
    }

    pub fn into_values(self) -> Array2<Complex64> {
        self.values
    }

    /// Samples of tensor element `index` (row-major).
    pub fn component(&self, index: usize) -> ArrayView1<'_, Complex64> {
        self.values.row(index)
    }

    /// The same samples attached to another grid of equal size.
    pub fn rebind(self, grid: Arc<Grid>) -> Result<Self, FieldError> {
        if grid.size() != self.len() {
            return Err(FieldError::GridMismatch {
                expected: grid.size(),
                found: self.len(),
            });
        }
        Ok(Self { grid, ..self })
    }

    /// Fails unless `other` has as many samples as `self`.
    pub fn check_grid(&self, other: &Field) -> Result<(), FieldError> {
        if self.len() != other.len() {
            return Err(FieldError::GridMismatch {
                expected: self.len(),
                found: other.len(),
            });
        }
        Ok(())
    }

    /// Elementwise product. A scalar operand broadcasts over the tensor
    /// components of the other.
    pub fn multiply(&self, other: &Field) -> Result<Field, FieldError> {
        if self.is_scalar() && !other.is_scalar() {
            self.check_grid(other)?;
            let mut out = Field {
                grid: Arc::clone(&self.grid),
                tensor_shape: other.tensor_shape.clone(),
                values: other.values.clone(),
            };
            out.multiply_in_place(self)?;
            return Ok(out);
        }
        let mut out = self.clone();
        out.multiply_in_place(other)?;
        Ok(out)
    }

    pub fn multiply_in_place(&mut self, other: &Field) -> Result<(), FieldError> {
        self.combine_in_place(other, |a, b| *a *= b)
    }

    /// Multiply by the complex conjugate of `other`.
    pub fn multiply_conj_in_place(&mut self, other: &Field) -> Result<(), FieldError> {
        self.combine_in_place(other, |a, b| *a *= b.conj())
    }

    pub fn add(&self, other: &Field) -> Result<Field, FieldError> {
        let mut out = self.clone();
        out.add_in_place(other)?;
        Ok(out)
    }

    pub fn add_in_place(&mut self, other: &Field) -> Result<(), FieldError> {
        self.combine_in_place(other, |a, b| *a += b)
    }

    fn combine_in_place(
        &mut self,
        other: &Field,
        op: impl Fn(&mut Complex64, Complex64),
    ) -> Result<(), FieldError> {
        self.check_grid(other)?;
        if other.tensor_shape == self.tensor_shape {
            Zip::from(&mut self.values)
                .and(&other.values)
                .for_each(|a, b| op(a, *b));
        } else if other.is_scalar() {
            let scalar = other.values.row(0);
            for row in self.values.rows_mut() {
                Zip::from(row).and(&scalar).for_each(|a, b| op(a, *b));
            }
        } else {
            return Err(FieldError::ShapeMismatch(format!(
                "cannot combine tensor shapes {:?} and {:?}",
                self.tensor_shape, other.tensor_shape
            )));
        }
        Ok(())
    }

    pub fn conj(&self) -> Field {
        Field {
            grid: Arc::clone(&self.grid),
            tensor_shape: self.tensor_shape.clone(),
            values: self.values.mapv(|c| c.conj()),
        }
    }

    pub fn scale(&self, factor: Complex64) -> Field {
        let mut out = self.clone();
        out.scale_in_place(factor);
        out
    }

    pub fn scale_in_place(&mut self, factor: Complex64) {
        self.values.mapv_inplace(|c| c * factor);
    }

    /// Per-sample intensity `Σ_c |E_c|²`.
    pub fn intensity(&self) -> Array1<f64> {
        let mut out = Array1::zeros(self.len());
        for row in self.values.rows() {
            Zip::from(&mut out).and(&row).for_each(|i, c| *i += c.norm_sqr());
        }
        out
    }

    /// Integrated intensity `Σ_i |E_i|² w_i` using the grid weights.
    pub fn power(&self) -> f64 {
        self.intensity()
            .iter()
            .zip(self.grid.weights())
            .map(|(i, w)| i * w)
            .sum()
    }

    /// Largest absolute difference between corresponding samples.
    pub fn max_abs_diff(&self, other: &Field) -> Result<f64, FieldError> {
        self.check_grid(other)?;
        if self.tensor_shape != other.tensor_shape {
            return Err(FieldError::ShapeMismatch(format!(
                "cannot compare tensor shapes {:?} and {:?}",
                self.tensor_shape, other.tensor_shape
            )));
        }
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max))
    }
}
