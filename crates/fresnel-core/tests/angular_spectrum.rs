//! Test angular spectrum propagation against analytic and direct references.
//!
//! Distances and grids are in units of the wavelength (λ = 1) unless noted.

use std::f64::consts::PI;
use std::sync::Arc;

use fresnel_core::field::Field;
use fresnel_core::grid::{pupil_grid, Grid};
use fresnel_core::optics::{OpticalElement, OpticsError};
use fresnel_core::propagation::kernels::impulse_response;
use fresnel_core::propagation::{
    AngularSpectrumParams, AngularSpectrumPropagator, PropagationRegime, RegimeSelection,
};
use fresnel_core::types::Wavefront;
use num_complex::Complex64;

fn gaussian(grid: &Arc<Grid>, waist: f64) -> Field {
    Field::from_fn(grid, |[x, y]| {
        Complex64::new((-(x * x + y * y) / (waist * waist)).exp(), 0.0)
    })
}

fn relative_l2(a: &Field, b: &Field) -> f64 {
    let num: f64 = a
        .values()
        .iter()
        .zip(b.values().iter())
        .map(|(x, y)| (x - y).norm_sqr())
        .sum();
    let den: f64 = b.values().iter().map(|y| y.norm_sqr()).sum();
    (num / den).sqrt()
}

#[test]
fn test_far_field_backward_undoes_forward() {
    let grid = Arc::new(pupil_grid([64, 64], [64.0, 64.0]).unwrap());
    let input = Wavefront::new(gaussian(&grid, 6.0), 1.0);

    for (oversampling, tol) in [(1, 1e-8), (2, 1e-3)] {
        let prop = AngularSpectrumPropagator::new(grid.clone(), 10.0, oversampling, 1.0, 1.0).unwrap();
        assert_eq!(prop.regime(), PropagationRegime::FarField);

        let there = prop.forward(&input).unwrap();
        let back = prop.backward(&there).unwrap();
        let err = back.electric_field.max_abs_diff(&input.electric_field).unwrap();
        eprintln!("oversampling {}: round-trip error {:.3e}", oversampling, err);
        assert!(err < tol, "oversampling {}: error {:.3e}", oversampling, err);
    }
}

#[test]
fn test_near_field_backward_approximately_undoes_forward() {
    // (n, distance, oversampling, round-trip tolerance, power tolerance)
    // |H| is only close to one here, so both checks are loose.
    let cases = [(32, 40.0, 1, 2e-3, 1e-4), (64, 80.0, 2, 2e-2, 1e-2)];
    eprintln!("   n |     d | os | round-trip err | P_out / P_in");
    for (n, distance, oversampling, tol, power_tol) in cases {
        let grid = Arc::new(pupil_grid([n, n], [n as f64, n as f64]).unwrap());
        let input = Wavefront::new(gaussian(&grid, 6.0), 1.0);
        let prop =
            AngularSpectrumPropagator::new(grid, distance, oversampling, 1.0, 1.0).unwrap();
        assert_eq!(prop.regime(), PropagationRegime::NearField);

        let there = prop.forward(&input).unwrap();
        let back = prop.backward(&there).unwrap();
        let err = back.electric_field.max_abs_diff(&input.electric_field).unwrap();
        let ratio = there.power() / input.power();
        eprintln!(
            "{:>4} | {:>5.1} | {:>2} | {:>14.3e} | {:.6}",
            n, distance, oversampling, err, ratio
        );
        assert!(err < tol, "n = {}: round-trip error {:.3e}", n, err);
        assert!((ratio - 1.0).abs() < power_tol, "n = {}: power ratio {}", n, ratio);
    }
}

#[test]
fn test_zero_distance_is_identity() {
    let grid = Arc::new(pupil_grid([32, 24], [16.0, 12.0]).unwrap());
    let input = Wavefront::new(gaussian(&grid, 3.0), 1.0);
    let prop = AngularSpectrumPropagator::new(grid, 0.0, 2, 1.0, 1.0).unwrap();

    let output = prop.forward(&input).unwrap();
    assert!(output.electric_field.max_abs_diff(&input.electric_field).unwrap() < 1e-12);
    assert!((output.power() - input.power()).abs() < 1e-12 * input.power());
}

#[test]
fn test_regime_switches_at_sampling_threshold() {
    // threshold = λ d / L_max = d / 64 against δ = 1
    let grid = Arc::new(pupil_grid([64, 64], [64.0, 64.0]).unwrap());
    let far = AngularSpectrumPropagator::new(grid.clone(), 63.9, 2, 1.0, 1.0).unwrap();
    let near = AngularSpectrumPropagator::new(grid, 64.1, 2, 1.0, 1.0).unwrap();
    assert_eq!(far.regime(), PropagationRegime::FarField);
    assert_eq!(near.regime(), PropagationRegime::NearField);
}

#[test]
fn test_non_regular_grids_are_rejected() {
    let axis: Vec<f64> = (0..8).map(|i| (i as f64).powf(1.1)).collect();
    let grids = [
        Grid::separated(axis.clone(), axis).unwrap(),
        Grid::polar([8, 8], [0.5, PI / 4.0], [0.25, 0.0]).unwrap(),
        Grid::unstructured(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 0.5], vec![1.0; 3]).unwrap(),
    ];
    for grid in grids {
        let result = AngularSpectrumPropagator::new(Arc::new(grid), 1.0, 2, 1.0, 1.0);
        assert!(matches!(result, Err(OpticsError::InvalidGrid(_))));
    }
}

#[test]
fn test_evanescent_components_decay() {
    let grid = Arc::new(pupil_grid([64, 64], [16.0, 16.0]).unwrap());
    let prop = AngularSpectrumPropagator::new(grid, 2.0, 2, 1.0, 1.0).unwrap();
    assert_eq!(prop.regime(), PropagationRegime::FarField);

    let k = 2.0 * PI;
    let h = prop.transfer_function().component(0);
    let mut evanescent = 0;
    for (p, v) in prop.frequency_grid().points().iter().zip(h.iter()) {
        let kt = p[0].hypot(p[1]);
        assert!(v.norm() <= 1.0 + 1e-12);
        if kt > 1.05 * k {
            assert!(v.norm() < 1.0, "|H| = {} at |k| = {}", v.norm(), kt);
            evanescent += 1;
        }
    }
    assert!(evanescent > 0);
}

#[test]
fn test_near_field_is_direct_convolution() {
    let grid = Arc::new(pupil_grid([8, 8], [8.0, 8.0]).unwrap());
    let distance = 20.0;
    let prop = AngularSpectrumPropagator::new(grid.clone(), distance, 1, 1.0, 1.0).unwrap();
    assert_eq!(prop.regime(), PropagationRegime::NearField);

    let input = Field::from_fn(&grid, |[x, y]| Complex64::new(1.0 + 0.1 * x, 0.2 * y));
    let output = prop.forward(&Wavefront::new(input.clone(), 1.0)).unwrap();

    let k = 2.0 * PI;
    let points = grid.points();
    let u = input.component(0);
    let expected = Field::from_fn(&grid, |[x, y]| {
        points
            .iter()
            .zip(u.iter())
            .map(|(s, v)| v * impulse_response(x - s[0], y - s[1], distance, k))
            .sum()
    });
    assert!(output.electric_field.max_abs_diff(&expected).unwrap() < 1e-10);
}

#[test]
fn test_near_and_far_field_agree_when_both_resolve() {
    let grid = Arc::new(pupil_grid([64, 64], [32.0, 32.0]).unwrap());
    let input = Wavefront::new(gaussian(&grid, 4.0), 1.0);

    let near = AngularSpectrumPropagator::new(grid.clone(), 20.0, 2, 1.0, 1.0).unwrap();
    assert_eq!(near.regime(), PropagationRegime::NearField);
    let far = AngularSpectrumPropagator::with_params(
        grid,
        AngularSpectrumParams {
            distance: 20.0,
            regime: RegimeSelection::FarField,
            ..Default::default()
        },
    )
    .unwrap();

    let a = near.forward(&input).unwrap();
    let b = far.forward(&input).unwrap();
    let err = relative_l2(&a.electric_field, &b.electric_field);
    eprintln!("near vs far relative L2: {:.3e}", err);
    assert!(err < 0.05);
}

#[test]
fn test_jones_wavefront_propagates_per_component() {
    let grid = Arc::new(pupil_grid([32, 32], [32.0, 32.0]).unwrap());
    let ex = gaussian(&grid, 4.0);
    let ey = ex.scale(Complex64::new(0.0, 0.5));
    let input = Wavefront::jones(&ex, &ey, 1.0)
        .unwrap()
        .with_stokes([1.0, 0.0, 0.0, 1.0]);
    let prop = AngularSpectrumPropagator::new(grid, 5.0, 2, 1.0, 1.0).unwrap();

    let output = prop.forward(&input).unwrap();
    assert_eq!(output.electric_field.tensor_shape(), &[2]);
    assert_eq!(output.input_stokes_vector, Some([1.0, 0.0, 0.0, 1.0]));

    let scalar = prop.forward(&Wavefront::new(ex, 1.0)).unwrap();
    let ox = output.electric_field.component(0);
    let oy = output.electric_field.component(1);
    for ((x, y), s) in ox.iter().zip(oy.iter()).zip(scalar.electric_field.component(0).iter()) {
        assert!((x - s).norm() < 1e-12);
        assert!((y - s * Complex64::new(0.0, 0.5)).norm() < 1e-12);
    }
}

#[test]
fn test_wavelength_mismatch_is_rejected() {
    let grid = Arc::new(pupil_grid([16, 16], [16.0, 16.0]).unwrap());
    let prop = AngularSpectrumPropagator::new(grid.clone(), 1.0, 2, 1.0, 1.0).unwrap();
    let wf = Wavefront::new(gaussian(&grid, 3.0), 0.5);
    assert!(matches!(prop.forward(&wf), Err(OpticsError::InvalidParameter(_))));
}
