//! # Fresnel Core
//!
//! The numerical backbone of the Fresnel framework. This crate propagates
//! monochromatic optical wavefronts sampled on two-dimensional grids.
//!
//! ## Architecture
//!
//! Every component a wavefront passes through implements the
//! [`optics::OpticalElement`] trait. The primary implementation is the
//! angular spectrum propagator
//! ([`propagation::AngularSpectrumPropagator`]), which selects between a
//! near-field impulse-response convolution and a far-field transfer function
//! from the sampling of its input grid.
//!
//! ## Modules
//!
//! - [`grid`] — Sampling grids and frequency-grid construction.
//! - [`field`] — Complex scalar and tensor fields on a grid.
//! - [`types`] — Wavefront and run summaries.
//! - [`fourier`] — Naive, FFT and matrix Fourier transforms.
//! - [`supersample`] — Supersampled evaluation against aliasing.
//! - [`optics`] — Optical element trait and errors.
//! - [`propagation`] — Angular spectrum propagation.
//! - [`polarization`] — Jones and Mueller calculus elements.

pub mod field;
pub mod fourier;
pub mod grid;
pub mod optics;
pub mod polarization;
pub mod propagation;
pub mod supersample;
pub mod types;
