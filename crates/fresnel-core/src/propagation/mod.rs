//! Free-space propagation.

pub mod angular_spectrum;
pub mod kernels;

pub use angular_spectrum::{
    select_regime, AngularSpectrumParams, AngularSpectrumPropagator, PropagationRegime,
    RegimeSelection, TransferFunction,
};
