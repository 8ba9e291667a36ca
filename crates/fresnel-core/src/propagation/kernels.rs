//! Free-space propagation kernels.
//!
//! The Rayleigh–Sommerfeld impulse response
//!
//! $$
//! h(x, y) = \frac{\cos\theta}{2\pi}\, e^{ikr} \left(\frac{1}{r^2} - \frac{ik}{r}\right),
//! \qquad r = \sqrt{x^2 + y^2 + d^2},\quad \cos\theta = d / r
//! $$
//!
//! and the angular-spectrum transfer function
//!
//! $$
//! H(k_x, k_y) = e^{i k_z d}, \qquad k_z = \sqrt{k^2 - k_x^2 - k_y^2}
//! $$
//!
//! form a Fourier pair. $H$ is evaluated with a complex square root so that
//! evanescent components ($k_x^2 + k_y^2 > k^2$) decay instead of oscillating.

use std::f64::consts::PI;

use num_complex::Complex64;

/// Impulse response of free space at transverse offset `(x, y)` after
/// propagating `distance` in a medium of wavenumber `k`.
///
/// Only defined for `distance > 0`; the kernel is singular at `r = 0`.
pub fn impulse_response(x: f64, y: f64, distance: f64, k: f64) -> Complex64 {
    let r_sq = x * x + y * y + distance * distance;
    let r = r_sq.sqrt();
    let cos_theta = distance / r;
    let radial = Complex64::new(1.0 / r_sq, -k / r);
    Complex64::cis(k * r) * radial * (cos_theta / (2.0 * PI))
}

/// Longitudinal wavenumber $k_z$ for a squared transverse frequency.
///
/// Real for propagating waves, positive imaginary for evanescent ones.
pub fn longitudinal_wavenumber(kt_sq: f64, k: f64) -> Complex64 {
    Complex64::new(k * k - kt_sq, 0.0).sqrt()
}

/// Transfer function $e^{i k_z d}$ at squared transverse frequency `kt_sq`.
pub fn transfer_function(kt_sq: f64, k: f64, distance: f64) -> Complex64 {
    (Complex64::i() * longitudinal_wavenumber(kt_sq, k) * distance).exp()
}
