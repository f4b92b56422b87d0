//! Initial-condition projections.
//!
//! Both projections are [`UpdateOperator`]s with no inputs and one output,
//! so the deck builds them, binds them, and runs them once before the
//! first step exactly like any other operator.
//!
//! - [`MaxwellianProjection`]: drifting Maxwellian with a cosine density
//!   perturbation, `n(x) = n0 (1 + alpha cos(k x))`.
//! - [`EmPerturbation`]: uniform background field plus seeded Gaussian
//!   noise on selected components. Uses a ChaCha8 RNG seeded from the
//!   configured seed, so identical seeds give identical fields.
//!
//! Constructed via builders: [`MaxwellianProjection::builder`],
//! [`EmPerturbation::builder`].

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;
use vlasov_core::{FieldShape, OperatorError};
use vlasov_operator::{AdvanceContext, ShapeRequirement, Signature, StepOutcome, UpdateOperator};

use crate::grid::PhaseGrid;
use crate::maxwell::EM_COMPONENTS;

// ── Maxwellian ─────────────────────────────────────────────────────

/// Projects a drifting Maxwellian onto a distribution field.
#[derive(Debug)]
pub struct MaxwellianProjection {
    name: String,
    grid: PhaseGrid,
    density: f64,
    drift: [f64; 3],
    thermal_speed: f64,
    amplitude: f64,
    wavenumber: f64,
}

/// Builder for [`MaxwellianProjection`].
///
/// Required fields: `grid` and `thermal_speed`.
pub struct MaxwellianProjectionBuilder {
    species: String,
    grid: Option<PhaseGrid>,
    density: f64,
    drift: [f64; 3],
    thermal_speed: Option<f64>,
    amplitude: f64,
    mode: u32,
}

impl MaxwellianProjection {
    /// Create a new builder for configuring a `MaxwellianProjection`.
    pub fn builder() -> MaxwellianProjectionBuilder {
        MaxwellianProjectionBuilder {
            species: "species".to_string(),
            grid: None,
            density: 1.0,
            drift: [0.0; 3],
            thermal_speed: None,
            amplitude: 0.0,
            mode: 1,
        }
    }

    /// Value of the distribution at position `x` and velocity `v`.
    pub fn evaluate(&self, x: f64, v: [f64; 3]) -> f64 {
        let vt2 = self.thermal_speed * self.thermal_speed;
        let n = self.density * (1.0 + self.amplitude * (self.wavenumber * x).cos());
        let dv2: f64 = (0..3).map(|i| (v[i] - self.drift[i]).powi(2)).sum();
        let norm = (2.0 * std::f64::consts::PI * vt2).powf(1.5);
        n / norm * (-dv2 / (2.0 * vt2)).exp()
    }
}

impl MaxwellianProjectionBuilder {
    /// Species name, used in the operator name (default: `"species"`).
    pub fn species(mut self, species: impl Into<String>) -> Self {
        self.species = species.into();
        self
    }

    /// Set the grid to project onto.
    pub fn grid(mut self, grid: &PhaseGrid) -> Self {
        self.grid = Some(grid.clone());
        self
    }

    /// Background number density (default: 1.0). Must be >= 0.
    pub fn density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Drift velocity (default: zero).
    pub fn drift(mut self, drift: [f64; 3]) -> Self {
        self.drift = drift;
        self
    }

    /// Thermal speed `sqrt(T / m)`. Must be > 0.
    pub fn thermal_speed(mut self, vt: f64) -> Self {
        self.thermal_speed = Some(vt);
        self
    }

    /// Thermal speed from a temperature and mass.
    pub fn temperature(self, temperature: f64, mass: f64) -> Self {
        self.thermal_speed((temperature / mass).sqrt())
    }

    /// Relative density perturbation `alpha` (default: 0.0). Must be in `[0, 1)`.
    pub fn perturbation(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Perturbation mode number over the x domain (default: 1).
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Build the projection, validating all configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - `grid` or `thermal_speed` is not set
    /// - `thermal_speed` is not finite and > 0
    /// - `density` is negative or NaN
    /// - the drift is not finite
    /// - the perturbation is outside `[0, 1)`
    pub fn build(self) -> Result<MaxwellianProjection, String> {
        let grid = self.grid.ok_or_else(|| "grid is required".to_string())?;
        let thermal_speed = self
            .thermal_speed
            .ok_or_else(|| "thermal_speed is required".to_string())?;
        if !(thermal_speed > 0.0 && thermal_speed.is_finite()) {
            return Err(format!(
                "thermal_speed must be finite and > 0, got {thermal_speed}"
            ));
        }
        if !(self.density >= 0.0 && self.density.is_finite()) {
            return Err(format!(
                "density must be finite and >= 0, got {}",
                self.density
            ));
        }
        if !self.drift.iter().all(|d| d.is_finite()) {
            return Err(format!("drift must be finite, got {:?}", self.drift));
        }
        if !(0.0..1.0).contains(&self.amplitude) {
            return Err(format!(
                "perturbation must be in [0, 1), got {}",
                self.amplitude
            ));
        }
        let wavenumber = 2.0 * std::f64::consts::PI * self.mode as f64 / grid.x().length();

        Ok(MaxwellianProjection {
            name: format!("MaxwellianProjection[{}]", self.species),
            grid,
            density: self.density,
            drift: self.drift,
            thermal_speed,
            amplitude: self.amplitude,
            wavenumber,
        })
    }
}

impl UpdateOperator for MaxwellianProjection {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Signature {
        Signature::new(
            std::iter::empty::<ShapeRequirement>(),
            [ShapeRequirement::Exact(self.grid.distribution_shape().clone())],
        )
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        let out = ctx.output(0)?;
        out.fill(0.0);
        let shape = self.grid.distribution_shape();
        let strides = shape.cell_strides();
        let g = shape.ghost()[0] as usize;
        let ext = shape.extents();
        let dst = out.as_mut_slice();

        for ix in 0..ext[0] as usize {
            let x = self.grid.x().center(ix);
            for j0 in 0..ext[1] as usize {
                for j1 in 0..ext[2] as usize {
                    for j2 in 0..ext[3] as usize {
                        let v = [
                            self.grid.v(0).center(j0),
                            self.grid.v(1).center(j1),
                            self.grid.v(2).center(j2),
                        ];
                        let c = (ix + g) * strides[0]
                            + (j0 + g) * strides[1]
                            + (j1 + g) * strides[2]
                            + (j2 + g) * strides[3];
                        dst[c] = self.evaluate(x, v);
                    }
                }
            }
        }
        Ok(StepOutcome::unconstrained())
    }
}

// ── Electromagnetic perturbation ───────────────────────────────────

/// Sets the EM field to a uniform background plus seeded Gaussian noise.
#[derive(Debug)]
pub struct EmPerturbation {
    shape: FieldShape,
    background: [f64; EM_COMPONENTS as usize],
    noisy: SmallVec<[usize; 8]>,
    amplitude: f64,
    seed: u64,
}

/// Builder for [`EmPerturbation`].
///
/// Required field: `grid`.
pub struct EmPerturbationBuilder {
    grid: Option<PhaseGrid>,
    background: SmallVec<[(usize, f64); 8]>,
    noisy: SmallVec<[usize; 8]>,
    amplitude: f64,
    seed: u64,
}

impl EmPerturbation {
    /// Create a new builder for configuring an `EmPerturbation`.
    pub fn builder() -> EmPerturbationBuilder {
        EmPerturbationBuilder {
            grid: None,
            background: SmallVec::new(),
            noisy: SmallVec::new(),
            amplitude: 0.0,
            seed: 0,
        }
    }

    /// Generate a Gaussian sample using the Box-Muller transform.
    fn box_muller(rng: &mut ChaCha8Rng) -> f64 {
        let u1: f64 = rng.random::<f64>().max(1e-300); // avoid ln(0)
        let u2: f64 = rng.random();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

impl EmPerturbationBuilder {
    /// Set the grid the field lives on.
    pub fn grid(mut self, grid: &PhaseGrid) -> Self {
        self.grid = Some(grid.clone());
        self
    }

    /// Uniform value of one component (default: all zero).
    pub fn background(mut self, component: usize, value: f64) -> Self {
        self.background.push((component, value));
        self
    }

    /// Add Gaussian noise to `component`.
    pub fn noise_on(mut self, component: usize) -> Self {
        self.noisy.push(component);
        self
    }

    /// Standard deviation of the noise (default: 0.0). Must be >= 0.
    pub fn amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// RNG seed (default: 0).
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Build the projection, validating all configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - `grid` is not set
    /// - a component index is `>= 8`
    /// - `amplitude` is negative or NaN
    /// - a background value is not finite
    pub fn build(self) -> Result<EmPerturbation, String> {
        let grid = self.grid.ok_or_else(|| "grid is required".to_string())?;
        let components = self
            .noisy
            .iter()
            .copied()
            .chain(self.background.iter().map(|&(c, _)| c));
        for c in components {
            if c >= EM_COMPONENTS as usize {
                return Err(format!(
                    "component {c} out of range for {EM_COMPONENTS} EM components"
                ));
            }
        }
        if !(self.amplitude >= 0.0 && self.amplitude.is_finite()) {
            return Err(format!(
                "amplitude must be finite and >= 0, got {}",
                self.amplitude
            ));
        }
        let mut background = [0.0; EM_COMPONENTS as usize];
        for &(c, value) in &self.background {
            if !value.is_finite() {
                return Err(format!("background of component {c} must be finite, got {value}"));
            }
            background[c] = value;
        }
        Ok(EmPerturbation {
            shape: grid.em_shape().clone(),
            background,
            noisy: self.noisy,
            amplitude: self.amplitude,
            seed: self.seed,
        })
    }
}

impl UpdateOperator for EmPerturbation {
    fn name(&self) -> &str {
        "EmPerturbation"
    }

    fn signature(&self) -> Signature {
        Signature::new(
            std::iter::empty::<ShapeRequirement>(),
            [ShapeRequirement::Exact(self.shape.clone())],
        )
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        let out = ctx.output(0)?;
        out.fill(0.0);
        let nc = EM_COMPONENTS as usize;
        let g = self.shape.ghost()[0] as usize;
        let nx = self.shape.extents()[0] as usize;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        for cell in out.as_mut_slice().chunks_exact_mut(nc).skip(g).take(nx) {
            cell.copy_from_slice(&self.background);
            for &c in &self.noisy {
                cell[c] += self.amplitude * EmPerturbation::box_muller(&mut rng);
            }
        }
        Ok(StepOutcome::unconstrained())
    }
}
