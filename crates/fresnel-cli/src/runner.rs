//! Job runner: ties together the source field, grid and propagator.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use num_complex::Complex64;

use fresnel_core::field::Field;
use fresnel_core::grid::{pupil_grid, Grid};
use fresnel_core::optics::OpticalElement;
use fresnel_core::propagation::{AngularSpectrumParams, AngularSpectrumPropagator};
use fresnel_core::types::{PropagationSummary, Wavefront};

use crate::config::{JobConfig, SourceConfig};

/// Results from a propagation run.
pub struct RunOutput {
    pub output: Wavefront,
    pub summary: PropagationSummary,
}

/// Build the sampling grid and propagator described by a job.
pub fn build_propagator(job: &JobConfig) -> Result<AngularSpectrumPropagator> {
    let grid = Arc::new(
        pupil_grid(job.grid.dims, job.grid.extent).context("invalid [grid] section")?,
    );
    let p = &job.propagation;
    let params = AngularSpectrumParams {
        distance: p.distance,
        num_oversampling: p.num_oversampling,
        wavelength: p.wavelength,
        refractive_index: p.refractive_index,
        regime: p.regime.into(),
    };
    AngularSpectrumPropagator::with_params(grid, params).context("invalid [propagation] section")
}

/// Sample the configured source on `grid`.
pub fn source_field(grid: &Arc<Grid>, source: &SourceConfig) -> Result<Field> {
    match *source {
        SourceConfig::CircularAperture { diameter } => {
            if diameter <= 0.0 {
                anyhow::bail!("aperture diameter must be positive, got {}", diameter);
            }
            let radius = diameter / 2.0;
            Ok(Field::from_fn(grid, |[x, y]| {
                let inside = x.hypot(y) <= radius;
                Complex64::new(if inside { 1.0 } else { 0.0 }, 0.0)
            }))
        }
        SourceConfig::Gaussian { diameter } => {
            if diameter <= 0.0 {
                anyhow::bail!("Gaussian diameter must be positive, got {}", diameter);
            }
            let waist = diameter / 2.0;
            Ok(Field::from_fn(grid, |[x, y]| {
                Complex64::new((-(x * x + y * y) / (waist * waist)).exp(), 0.0)
            }))
        }
    }
}

/// Run a full propagation from a parsed job configuration.
pub fn run_propagation(job: &JobConfig) -> Result<RunOutput> {
    let propagator = build_propagator(job)?;
    let grid = propagator.input_grid();
    println!(
        "Grid: {}x{} samples over {:.3e} x {:.3e}",
        job.grid.dims[0], job.grid.dims[1], job.grid.extent[0], job.grid.extent[1]
    );
    println!("Regime: {}", propagator.regime());

    let field = source_field(grid, &job.source)?;
    let input = Wavefront::new(field, job.propagation.wavelength);
    let output = propagator
        .forward(&input)
        .map_err(|e| anyhow::anyhow!("Propagation failed: {}", e))?;

    let peak_intensity = output.intensity().iter().cloned().fold(0.0, f64::max);
    let summary = PropagationSummary {
        wavelength: propagator.wavelength(),
        distance: propagator.distance(),
        regime: propagator.regime().to_string(),
        input_power: input.power(),
        output_power: output.power(),
        peak_intensity,
    };
    println!(
        "  P_in={:.4e}, P_out={:.4e}, I_peak={:.4e}",
        summary.input_power, summary.output_power, summary.peak_intensity
    );
    log::info!("propagated {} samples by {}", grid.size(), summary.distance);

    Ok(RunOutput { output, summary })
}

/// Write the output intensity to a CSV file with a metadata header.
pub fn write_intensity_csv(wavefront: &Wavefront, path: &Path, summary: &PropagationSummary) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writeln!(file, "# Fresnel angular spectrum propagation: output intensity")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# wavelength: {}", summary.wavelength)?;
    writeln!(file, "# distance: {}", summary.distance)?;
    writeln!(file, "# regime: {}", summary.regime)?;
    writeln!(file, "#")?;
    writeln!(file, "x,y,intensity")?;

    let grid = wavefront.electric_field.grid();
    for (p, i) in grid.points().iter().zip(wavefront.intensity().iter()) {
        writeln!(file, "{:.6e},{:.6e},{:.6e}", p[0], p[1], i)?;
    }

    println!("Intensity written to: {}", path.display());
    Ok(())
}

/// Write the run summary to a JSON file.
pub fn write_summary_json(summary: &PropagationSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Summary (JSON) written to: {}", path.display());
    Ok(())
}
