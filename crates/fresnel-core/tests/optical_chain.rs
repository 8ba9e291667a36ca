//! Test chains of propagators and polarisation elements.

use std::f64::consts::FRAC_PI_4;
use std::sync::Arc;

use fresnel_core::field::Field;
use fresnel_core::grid::pupil_grid;
use fresnel_core::optics::OpticalElement;
use fresnel_core::polarization::{linear_polarizer, quarter_wave_plate};
use fresnel_core::propagation::AngularSpectrumPropagator;
use fresnel_core::types::Wavefront;
use num_complex::Complex64;

fn run(chain: &[&dyn OpticalElement], input: &Wavefront) -> Wavefront {
    chain
        .iter()
        .fold(input.clone(), |wf, element| element.forward(&wf).unwrap())
}

#[test]
fn test_uniform_elements_commute_with_propagation() {
    let grid = Arc::new(pupil_grid([32, 32], [32.0, 32.0]).unwrap());
    let ex = Field::from_fn(&grid, |[x, y]| Complex64::new((-(x * x + y * y) / 16.0).exp(), 0.0));
    let ey = Field::zeros(&grid);
    let input = Wavefront::jones(&ex, &ey, 1.0).unwrap();

    let prop = AngularSpectrumPropagator::new(grid, 8.0, 2, 1.0, 1.0).unwrap();
    let qwp = quarter_wave_plate(FRAC_PI_4);

    let a = run(&[&qwp, &prop, &qwp], &input);
    let b = run(&[&prop, &qwp, &qwp], &input);
    assert!(a.electric_field.max_abs_diff(&b.electric_field).unwrap() < 1e-12);

    // Two quarter-wave plates at 45° turn x into y polarisation.
    let scalar = prop.forward(&Wavefront::new(ex, 1.0)).unwrap();
    let ix: f64 = a.electric_field.component(0).iter().map(|c| c.norm_sqr()).sum();
    assert!(ix < 1e-20);
    assert!((a.power() - scalar.power()).abs() < 1e-10 * scalar.power());

    // ...which an x polariser then blocks.
    let blocked = linear_polarizer(0.0).forward(&a).unwrap();
    assert!(blocked.power() < 1e-20);
}

#[test]
fn test_chain_backward_reverses_forward() {
    let grid = Arc::new(pupil_grid([32, 32], [32.0, 32.0]).unwrap());
    let ex = Field::from_fn(&grid, |[x, y]| Complex64::new((-(x * x + y * y) / 9.0).exp(), 0.0));
    let ey = ex.scale(Complex64::new(0.0, 1.0));
    let input = Wavefront::jones(&ex, &ey, 1.0).unwrap();

    let prop = AngularSpectrumPropagator::new(grid, 4.0, 1, 1.0, 1.0).unwrap();
    let qwp = quarter_wave_plate(0.3);

    let there = qwp.forward(&prop.forward(&input).unwrap()).unwrap();
    let back = prop.backward(&qwp.backward(&there).unwrap()).unwrap();
    let err = back.electric_field.max_abs_diff(&input.electric_field).unwrap();
    eprintln!("chain round-trip error: {:.3e}", err);
    assert!(err < 1e-6);
}
