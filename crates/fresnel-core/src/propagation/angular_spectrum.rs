//! Angular spectrum propagation between parallel planes.
//!
//! The propagator advances a monochromatic wavefront by a fixed distance:
//! forward-transform the field, multiply by a precomputed transfer function,
//! inverse-transform. How that transfer function is obtained depends on how
//! well the input grid samples it:
//!
//! - **Far field**: when the grid spacing resolves the phase of
//!   $e^{ik_z d}$, it is evaluated directly on the frequency grid.
//! - **Near field**: otherwise the impulse response is evaluated in real
//!   space on a grid twice as large and Fourier transformed once, which gives
//!   an alias-free linear convolution.
//!
//! Both kernels are evaluated with [`evaluate_supersampled`] to suppress
//! aliasing of their rapidly oscillating phase.

use std::fmt;
use std::sync::Arc;

use super::kernels::{impulse_response, transfer_function};
use crate::field::Field;
use crate::fourier::{FastFourierTransform, FourierTransform};
use crate::grid::Grid;
use crate::optics::{OpticalElement, OpticsError};
use crate::supersample::evaluate_supersampled;
use crate::types::{wavenumber, Wavefront};

/// Zero padding of the propagation FFT; doubles the grid so the near-field
/// impulse response convolves without wrap-around.
const FFT_OVERSAMPLING: usize = 2;

/// Relative tolerance when comparing a wavefront's wavelength to the one the
/// propagator was built for.
const WAVELENGTH_RTOL: f64 = 1e-9;

/// Which kernel the transfer function was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationRegime {
    /// Impulse response convolved on an enlarged grid.
    NearField,
    /// Transfer function sampled in the frequency domain.
    FarField,
}

impl fmt::Display for PropagationRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NearField => write!(f, "near-field"),
            Self::FarField => write!(f, "far-field"),
        }
    }
}

/// How the propagator chooses its regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegimeSelection {
    /// Pick from the sampling criterion, see [`select_regime`].
    #[default]
    Auto,
    NearField,
    FarField,
}

/// Construction parameters for an [`AngularSpectrumPropagator`].
#[derive(Debug, Clone)]
pub struct AngularSpectrumParams {
    /// Propagation distance, same length unit as the grid. Must be `>= 0`.
    pub distance: f64,
    /// Supersampling factor used when evaluating the kernels.
    pub num_oversampling: usize,
    /// Vacuum wavelength.
    pub wavelength: f64,
    /// Refractive index of the propagation medium.
    pub refractive_index: f64,
    /// Regime to use; `Auto` applies [`select_regime`].
    pub regime: RegimeSelection,
}

impl Default for AngularSpectrumParams {
    fn default() -> Self {
        Self {
            distance: 0.0,
            num_oversampling: 2,
            wavelength: 1.0,
            refractive_index: 1.0,
            regime: RegimeSelection::Auto,
        }
    }
}

/// A transfer function on the propagator's frequency grid, tagged with the
/// regime that produced it.
#[derive(Debug, Clone)]
pub struct TransferFunction {
    pub regime: PropagationRegime,
    pub values: Field,
}

/// Free-space propagator over a fixed distance.
pub struct AngularSpectrumPropagator {
    input_grid: Arc<Grid>,
    params: AngularSpectrumParams,
    fft: FastFourierTransform,
    transfer: TransferFunction,
}

/// Choose the regime for propagating `distance` on `grid`.
///
/// The far-field transfer function is adequately sampled only if every axis
/// satisfies `delta >= wavelength * distance / L_max`, where `L_max` is the
/// largest physical extent of the grid. Any axis below that threshold
/// selects the near field.
pub fn select_regime(grid: &Grid, distance: f64, wavelength: f64) -> Result<PropagationRegime, OpticsError> {
    let (delta, extent) = grid
        .delta()
        .zip(grid.extent())
        .ok_or_else(|| OpticsError::InvalidGrid("regime selection needs a regular grid".into()))?;
    let l_max = extent[0].max(extent[1]);
    let threshold = wavelength * distance / l_max;

    let regime = if delta.iter().any(|d| *d < threshold) {
        PropagationRegime::NearField
    } else {
        PropagationRegime::FarField
    };
    log::debug!(
        "delta {:?} vs threshold {:.3e} (L_max = {:.3e}): {}",
        delta,
        threshold,
        l_max,
        regime
    );
    Ok(regime)
}

/// Transfer function from the impulse response evaluated on an enlarged grid.
///
/// The enlarged grid keeps the input spacing, has twice the samples, and its
/// lattice contains the origin, so every difference of two input positions
/// is one of its samples. The auxiliary `q = 1` FFT over it lands on the same
/// frequency grid as the `q = 2` propagation FFT.
fn near_field_transfer(
    input_grid: &Grid,
    fft: &FastFourierTransform,
    params: &AngularSpectrumParams,
    k: f64,
) -> Result<TransferFunction, OpticsError> {
    let (dims, delta) = input_grid
        .dims()
        .zip(input_grid.delta())
        .ok_or_else(|| OpticsError::InvalidGrid("near-field path needs a regular grid".into()))?;
    let enlarged = Arc::new(Grid::regular(
        [2 * dims[0], 2 * dims[1]],
        delta,
        [-(dims[0] as f64) * delta[0], -(dims[1] as f64) * delta[1]],
    )?);

    let distance = params.distance;
    let impulse = evaluate_supersampled(
        |g| Field::from_fn(g, |[x, y]| impulse_response(x, y, distance, k)),
        &enlarged,
        params.num_oversampling,
    )?;

    let aux = FastFourierTransform::new(enlarged, 1)?;
    let spectrum = aux.forward(&impulse)?;
    Ok(TransferFunction {
        regime: PropagationRegime::NearField,
        values: spectrum.rebind(Arc::clone(fft.output_grid()))?,
    })
}

/// Transfer function sampled directly on the frequency grid.
fn far_field_transfer(
    fft: &FastFourierTransform,
    params: &AngularSpectrumParams,
    k: f64,
) -> Result<TransferFunction, OpticsError> {
    let distance = params.distance;
    let values = evaluate_supersampled(
        |g| Field::from_fn(g, |[kx, ky]| transfer_function(kx * kx + ky * ky, k, distance)),
        fft.output_grid(),
        params.num_oversampling,
    )?;
    Ok(TransferFunction {
        regime: PropagationRegime::FarField,
        values,
    })
}

impl AngularSpectrumPropagator {
    /// Build a propagator with automatic regime selection.
    pub fn new(
        input_grid: Arc<Grid>,
        distance: f64,
        num_oversampling: usize,
        wavelength: f64,
        refractive_index: f64,
    ) -> Result<Self, OpticsError> {
        Self::with_params(
            input_grid,
            AngularSpectrumParams {
                distance,
                num_oversampling,
                wavelength,
                refractive_index,
                regime: RegimeSelection::Auto,
            },
        )
    }

    pub fn with_params(input_grid: Arc<Grid>, params: AngularSpectrumParams) -> Result<Self, OpticsError> {
        if !input_grid.is_regular() || !input_grid.is_cartesian() {
            return Err(OpticsError::InvalidGrid(
                "angular spectrum propagation needs a regular Cartesian grid".into(),
            ));
        }
        validate(&params)?;

        let k = wavenumber(params.wavelength, params.refractive_index);
        let regime = match params.regime {
            RegimeSelection::Auto => select_regime(&input_grid, params.distance, params.wavelength)?,
            RegimeSelection::NearField => PropagationRegime::NearField,
            RegimeSelection::FarField => PropagationRegime::FarField,
        };
        if regime == PropagationRegime::NearField && params.distance == 0.0 {
            return Err(OpticsError::InvalidParameter(
                "the near-field kernel is singular at zero distance".into(),
            ));
        }

        let fft = FastFourierTransform::new(Arc::clone(&input_grid), FFT_OVERSAMPLING)?;
        let transfer = match regime {
            PropagationRegime::NearField => near_field_transfer(&input_grid, &fft, &params, k)?,
            PropagationRegime::FarField => far_field_transfer(&fft, &params, k)?,
        };
        log::debug!(
            "built {} propagator: d = {:.3e}, k = {:.3e}, {} frequency samples",
            transfer.regime,
            params.distance,
            k,
            transfer.values.len()
        );

        Ok(Self {
            input_grid,
            params,
            fft,
            transfer,
        })
    }

    pub fn regime(&self) -> PropagationRegime {
        self.transfer.regime
    }

    /// The stored transfer function, on [`output_grid`](Self::output_grid)'s
    /// frequency grid.
    pub fn transfer_function(&self) -> &Field {
        &self.transfer.values
    }

    pub fn distance(&self) -> f64 {
        self.params.distance
    }

    pub fn wavelength(&self) -> f64 {
        self.params.wavelength
    }

    pub fn refractive_index(&self) -> f64 {
        self.params.refractive_index
    }

    pub fn params(&self) -> &AngularSpectrumParams {
        &self.params
    }

    pub fn input_grid(&self) -> &Arc<Grid> {
        &self.input_grid
    }

    /// The output plane is sampled like the input plane.
    pub fn output_grid(&self) -> &Arc<Grid> {
        &self.input_grid
    }

    /// Frequency grid the transfer function lives on.
    pub fn frequency_grid(&self) -> &Arc<Grid> {
        self.fft.output_grid()
    }

    fn check_wavelength(&self, wavefront: &Wavefront) -> Result<(), OpticsError> {
        let expected = self.params.wavelength;
        if (wavefront.wavelength - expected).abs() > WAVELENGTH_RTOL * expected {
            return Err(OpticsError::InvalidParameter(format!(
                "wavefront wavelength {} does not match propagator wavelength {}",
                wavefront.wavelength, expected
            )));
        }
        Ok(())
    }

    fn apply(&self, wavefront: &Wavefront, conjugate: bool) -> Result<Wavefront, OpticsError> {
        self.check_wavelength(wavefront)?;
        let mut spectrum = self.fft.forward(&wavefront.electric_field)?;
        if conjugate {
            spectrum.multiply_conj_in_place(&self.transfer.values)?;
        } else {
            spectrum.multiply_in_place(&self.transfer.values)?;
        }
        let field = self.fft.backward(&spectrum)?;
        Ok(wavefront.with_electric_field(field))
    }
}

fn validate(params: &AngularSpectrumParams) -> Result<(), OpticsError> {
    let positive = |name: &str, v: f64| {
        if v.is_finite() && v > 0.0 {
            Ok(())
        } else {
            Err(OpticsError::InvalidParameter(format!("{} must be positive, got {}", name, v)))
        }
    };
    positive("wavelength", params.wavelength)?;
    positive("refractive index", params.refractive_index)?;
    if !params.distance.is_finite() || params.distance < 0.0 {
        return Err(OpticsError::InvalidParameter(format!(
            "distance must be non-negative, got {}; use backward() to propagate back",
            params.distance
        )));
    }
    if params.num_oversampling == 0 {
        return Err(OpticsError::InvalidParameter(
            "oversampling factor must be at least 1".into(),
        ));
    }
    Ok(())
}

impl OpticalElement for AngularSpectrumPropagator {
    /// Propagate by `+distance`.
    fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront, OpticsError> {
        self.apply(wavefront, false)
    }

    /// Adjoint propagation, multiplying by the conjugate transfer function.
    fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront, OpticsError> {
        self.apply(wavefront, true)
    }

    fn name(&self) -> &str {
        "Angular spectrum propagator"
    }
}
