//! Optical element abstraction.
//!
//! The [`OpticalElement`] trait is the interface shared by every component a
//! wavefront can pass through: free-space propagators and polarisation
//! elements alike. Elements are immutable after construction and return new
//! wavefronts; they never mutate their input.

use thiserror::Error;

use crate::field::FieldError;
use crate::fourier::FourierError;
use crate::types::Wavefront;

/// Errors raised while constructing or applying an optical element.
#[derive(Debug, Error)]
pub enum OpticsError {
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Fourier transform error: {0}")]
    Fourier(#[from] FourierError),
}

/// A component that maps an input wavefront to an output wavefront.
///
/// `backward` is the adjoint of `forward`; for lossless elements it is also
/// the inverse.
pub trait OpticalElement: Send + Sync {
    /// Propagate a wavefront through the element.
    fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront, OpticsError>;

    /// Propagate a wavefront backwards through the element.
    fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront, OpticsError>;

    /// Human-readable name of the element.
    fn name(&self) -> &str;
}
