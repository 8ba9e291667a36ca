//! Supersampled evaluation of rapidly varying functions on regular grids.
//!
//! A transfer function or impulse response sampled once per cell aliases as
//! soon as its phase changes by more than π between samples. Averaging `k²`
//! sub-cell evaluations approximates the cell average instead and suppresses
//! the aliased energy.

use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex64;

use crate::field::{Field, FieldError};
use crate::grid::Grid;
use crate::optics::OpticsError;

/// Above this factor the `k²` evaluations dominate construction time.
const LARGE_OVERSAMPLING: usize = 16;

/// Average `generator` over a `k × k` sub-lattice of every cell of `grid`.
///
/// Sub-samples sit at offsets `((j + ½)/k − ½) · δ` along each axis, so they
/// tile the cell symmetrically about its centre. `k = 1` evaluates the
/// generator once on `grid` itself. The generator must return one sample per
/// grid point.
pub fn evaluate_supersampled<F>(generator: F, grid: &Arc<Grid>, k: usize) -> Result<Field, OpticsError>
where
    F: Fn(&Arc<Grid>) -> Field,
{
    if k == 0 {
        return Err(OpticsError::InvalidParameter(
            "supersampling factor must be at least 1".into(),
        ));
    }
    let delta = grid
        .delta()
        .ok_or_else(|| OpticsError::InvalidGrid("supersampling needs a regular grid".into()))?;
    if k > LARGE_OVERSAMPLING {
        log::warn!(
            "supersampling factor {} requires {} evaluations per sample",
            k,
            k * k
        );
    }

    if k == 1 {
        let field = generator(grid);
        check_len(&field, grid)?;
        return Ok(field);
    }

    let offsets: Vec<[f64; 2]> = (0..k)
        .flat_map(|jy| (0..k).map(move |jx| [jx, jy]))
        .map(|[jx, jy]| {
            [
                ((jx as f64 + 0.5) / k as f64 - 0.5) * delta[0],
                ((jy as f64 + 0.5) / k as f64 - 0.5) * delta[1],
            ]
        })
        .collect();

    let mut total: Option<Field> = None;
    for offset in offsets {
        let shifted = Arc::new(grid.shifted(offset)?);
        let sample = generator(&shifted);
        check_len(&sample, grid)?;
        match total.as_mut() {
            None => total = Some(sample),
            Some(acc) => {
                if acc.tensor_shape() != sample.tensor_shape() {
                    return Err(FieldError::ShapeMismatch(format!(
                        "generator changed tensor shape from {:?} to {:?}",
                        acc.tensor_shape(),
                        sample.tensor_shape()
                    ))
                    .into());
                }
                acc.add_in_place(&sample)?;
            }
        }
    }

    let mut field = total
        .ok_or_else(|| OpticsError::InvalidParameter("no sub-samples evaluated".into()))?;
    field.scale_in_place(Complex64::new(1.0 / (k * k) as f64, 0.0));
    Ok(field.rebind(Arc::clone(grid))?)
}

fn check_len(field: &Field, grid: &Grid) -> Result<(), FieldError> {
    if field.len() != grid.size() {
        return Err(FieldError::GridMismatch {
            expected: grid.size(),
            found: field.len(),
        });
    }
    Ok(())
}

/// Block-average a field sampled on a `k`× finer regular grid.
///
/// The returned field lives on a regular grid with `dims / k` samples spaced
/// `k · δ`, each sample at the centre of its `k × k` block.
pub fn subsample_field(field: &Field, k: usize) -> Result<Field, OpticsError> {
    if k == 0 {
        return Err(OpticsError::InvalidParameter(
            "subsampling factor must be at least 1".into(),
        ));
    }
    let grid = field.grid();
    let (dims, delta, zero) = match (grid.dims(), grid.delta(), grid.zero()) {
        (Some(d), Some(s), Some(z)) if grid.is_regular() && grid.is_cartesian() => (d, s, z),
        _ => {
            return Err(OpticsError::InvalidGrid(
                "subsampling needs a regular Cartesian grid".into(),
            ))
        }
    };
    if dims[0] % k != 0 || dims[1] % k != 0 {
        return Err(OpticsError::InvalidParameter(format!(
            "grid dims {:?} are not divisible by {}",
            dims, k
        )));
    }

    let coarse_dims = [dims[0] / k, dims[1] / k];
    let centre = (k as f64 - 1.0) / 2.0;
    let coarse = Arc::new(Grid::regular(
        coarse_dims,
        [delta[0] * k as f64, delta[1] * k as f64],
        [zero[0] + centre * delta[0], zero[1] + centre * delta[1]],
    )?);

    let norm = 1.0 / (k * k) as f64;
    let mut out = Array2::zeros((field.num_components(), coarse.size()));
    for (c, mut row) in out.rows_mut().into_iter().enumerate() {
        let fine = field.component(c);
        for (i, dst) in row.iter_mut().enumerate() {
            let (cx, cy) = (i % coarse_dims[0], i / coarse_dims[0]);
            let mut sum = Complex64::new(0.0, 0.0);
            for jy in 0..k {
                for jx in 0..k {
                    sum += fine[(cy * k + jy) * dims[0] + cx * k + jx];
                }
            }
            *dst = sum * norm;
        }
    }
    Ok(Field::tensor(coarse, field.tensor_shape(), out)?)
}
