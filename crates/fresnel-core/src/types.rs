//! Core types shared across the Fresnel framework.
//!
//! This module defines the wavefront that flows through every optical
//! element, plus small physical helpers used by the propagators.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::field::{Field, FieldError};

/// A monochromatic wavefront: an electric field plus its wavelength.
///
/// The electric field is either scalar or a Jones vector (tensor shape `[2]`).
/// Optical elements return new wavefronts and never mutate their input.
#[derive(Debug, Clone)]
pub struct Wavefront {
    /// Complex electric field.
    pub electric_field: Field,
    /// Vacuum wavelength (same length unit as the grid).
    pub wavelength: f64,
    /// Stokes vector `[I, Q, U, V]` of the illumination, carried unchanged
    /// through scalar propagation.
    pub input_stokes_vector: Option<[f64; 4]>,
}

impl Wavefront {
    pub fn new(electric_field: Field, wavelength: f64) -> Self {
        Self {
            electric_field,
            wavelength,
            input_stokes_vector: None,
        }
    }

    /// Attach the Stokes vector of the illumination.
    pub fn with_stokes(mut self, stokes: [f64; 4]) -> Self {
        self.input_stokes_vector = Some(stokes);
        self
    }

    /// Jones-vector wavefront from its `x` and `y` components.
    pub fn jones(ex: &Field, ey: &Field, wavelength: f64) -> Result<Self, FieldError> {
        Ok(Self::new(Field::stack(&[ex, ey])?, wavelength))
    }

    /// A new wavefront carrying `electric_field` but this wavefront's
    /// wavelength and polarisation tag.
    pub fn with_electric_field(&self, electric_field: Field) -> Self {
        Self {
            electric_field,
            wavelength: self.wavelength,
            input_stokes_vector: self.input_stokes_vector,
        }
    }

    /// Wavenumber in a medium of refractive index `n`.
    pub fn wavenumber(&self, refractive_index: f64) -> f64 {
        wavenumber(self.wavelength, refractive_index)
    }

    /// Per-sample intensity `Σ_c |E_c|²`.
    pub fn intensity(&self) -> Array1<f64> {
        self.electric_field.intensity()
    }

    /// Total power: intensity integrated with the grid weights.
    pub fn power(&self) -> f64 {
        self.electric_field.power()
    }
}

/// Wavenumber $k = 2\pi n / \lambda$.
pub fn wavenumber(wavelength: f64, refractive_index: f64) -> f64 {
    2.0 * std::f64::consts::PI * refractive_index / wavelength
}

/// Scalar summary of a propagation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationSummary {
    /// Vacuum wavelength.
    pub wavelength: f64,
    /// Propagation distance.
    pub distance: f64,
    /// `"near-field"` or `"far-field"`.
    pub regime: String,
    /// Power entering the propagator.
    pub input_power: f64,
    /// Power leaving the propagator.
    pub output_power: f64,
    /// Peak output intensity.
    pub peak_intensity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::pupil_grid;
    use approx::assert_relative_eq;
    use num_complex::Complex64;
    use std::sync::Arc;

    #[test]
    fn test_wavenumber() {
        assert_relative_eq!(
            wavenumber(500e-9, 1.5),
            2.0 * std::f64::consts::PI * 3e6,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_with_electric_field_keeps_tags() {
        let g = Arc::new(pupil_grid([2, 2], [1.0, 1.0]).unwrap());
        let wf = Wavefront::new(Field::zeros(&g), 0.5).with_stokes([1.0, 0.0, 0.0, 1.0]);
        let next = wf.with_electric_field(Field::from_fn(&g, |_| Complex64::new(1.0, 0.0)));
        assert_eq!(next.wavelength, 0.5);
        assert_eq!(next.input_stokes_vector, Some([1.0, 0.0, 0.0, 1.0]));
        assert_relative_eq!(next.power(), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_jones_wavefront_has_two_components() {
        let g = Arc::new(pupil_grid([3, 3], [1.0, 1.0]).unwrap());
        let ex = Field::from_fn(&g, |_| Complex64::new(1.0, 0.0));
        let ey = Field::zeros(&g);
        let wf = Wavefront::jones(&ex, &ey, 1.0).unwrap();
        assert_eq!(wf.electric_field.tensor_shape(), &[2]);
        assert_relative_eq!(wf.intensity()[4], 1.0);
    }

    #[test]
    fn test_summary_round_trips_through_json() {
        let summary = PropagationSummary {
            wavelength: 1.0,
            distance: 2.0,
            regime: "far-field".into(),
            input_power: 3.0,
            output_power: 2.9,
            peak_intensity: 0.5,
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: PropagationSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.regime, "far-field");
        assert_relative_eq!(back.output_power, 2.9);
    }
}
