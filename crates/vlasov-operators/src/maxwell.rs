//! One-dimensional Maxwell solver with a Rusanov (local Lax-Friedrichs) flux.
//!
//! The electromagnetic field carries eight components per cell:
//!
//! ```text
//! [Ex, Ey, Ez, Bx, By, Bz, phi, psi]
//! ```
//!
//! `phi` and `psi` are divergence-cleaning potentials. With the cleaning
//! factors `chi` (electric) and `gamma` (magnetic) the flux along x is
//!
//! ```text
//! F = (chi c² phi, c² Bz, -c² By, gamma psi, -Ez, Ey, chi Ex, gamma c² Bx)
//! ```
//!
//! and each stage writes `out = in - dt/dx (F[i+1/2] - F[i-1/2])` on
//! interior cells. The current source is added by the stage executor, not
//! here.
//!
//! Constructed via the builder pattern: [`MaxwellRusanov::builder`].

use vlasov_core::{FieldShape, OperatorError};
use vlasov_operator::{AdvanceContext, ShapeRequirement, Signature, StepOutcome, UpdateOperator};

use crate::cfl;
use crate::grid::PhaseGrid;

/// Components per electromagnetic cell.
pub const EM_COMPONENTS: u32 = 8;

/// Component slots of the electromagnetic field.
pub mod component {
    /// Electric field, x.
    pub const EX: usize = 0;
    /// Electric field, y.
    pub const EY: usize = 1;
    /// Electric field, z.
    pub const EZ: usize = 2;
    /// Magnetic field, x.
    pub const BX: usize = 3;
    /// Magnetic field, y.
    pub const BY: usize = 4;
    /// Magnetic field, z.
    pub const BZ: usize = 5;
    /// Electric divergence-cleaning potential.
    pub const PHI: usize = 6;
    /// Magnetic divergence-cleaning potential.
    pub const PSI: usize = 7;
}

use component::*;

/// Rusanov finite-volume update of the 1D Maxwell equations.
///
/// # CFL stability
///
/// The fastest signal is `c * max(1, chi, gamma)` with
/// `c = 1 / sqrt(epsilon0 * mu0)`; the suggested step is
/// `cfl * dx / speed`.
#[derive(Debug)]
pub struct MaxwellRusanov {
    shape: FieldShape,
    dx: f64,
    light_speed: f64,
    chi: f64,
    gamma: f64,
    cfl: f64,
    max_cfl: f64,
}

/// Builder for [`MaxwellRusanov`].
///
/// Required field: `grid`.
pub struct MaxwellRusanovBuilder {
    grid: Option<PhaseGrid>,
    epsilon0: f64,
    mu0: f64,
    chi: f64,
    gamma: f64,
    cfl: f64,
    max_cfl: f64,
}

impl MaxwellRusanov {
    /// Create a new builder for configuring a `MaxwellRusanov` operator.
    pub fn builder() -> MaxwellRusanovBuilder {
        MaxwellRusanovBuilder {
            grid: None,
            epsilon0: 1.0,
            mu0: 1.0,
            chi: 0.0,
            gamma: 0.0,
            cfl: cfl::DEFAULT_CFL,
            max_cfl: cfl::DEFAULT_MAX_CFL,
        }
    }

    /// Speed of light implied by the configured constants.
    pub fn light_speed(&self) -> f64 {
        self.light_speed
    }

    fn max_speed(&self) -> f64 {
        self.light_speed * 1.0f64.max(self.chi).max(self.gamma)
    }

    fn flux(&self, q: &[f64]) -> [f64; EM_COMPONENTS as usize] {
        let c2 = self.light_speed * self.light_speed;
        [
            self.chi * c2 * q[PHI],
            c2 * q[BZ],
            -c2 * q[BY],
            self.gamma * q[PSI],
            -q[EZ],
            q[EY],
            self.chi * q[EX],
            self.gamma * c2 * q[BX],
        ]
    }

    /// Rusanov flux across the face between `left` and `right`.
    fn face_flux(&self, left: &[f64], right: &[f64], smax: f64) -> [f64; EM_COMPONENTS as usize] {
        let fl = self.flux(left);
        let fr = self.flux(right);
        let mut out = [0.0; EM_COMPONENTS as usize];
        for k in 0..EM_COMPONENTS as usize {
            out[k] = 0.5 * (fl[k] + fr[k]) - 0.5 * smax * (right[k] - left[k]);
        }
        out
    }
}

impl MaxwellRusanovBuilder {
    /// Set the grid the operator works on.
    pub fn grid(mut self, grid: &PhaseGrid) -> Self {
        self.grid = Some(grid.clone());
        self
    }

    /// Vacuum permittivity (default: 1.0). Must be > 0.
    pub fn epsilon0(mut self, epsilon0: f64) -> Self {
        self.epsilon0 = epsilon0;
        self
    }

    /// Vacuum permeability (default: 1.0). Must be > 0.
    pub fn mu0(mut self, mu0: f64) -> Self {
        self.mu0 = mu0;
        self
    }

    /// Electric-error propagation speed as a multiple of `c` (default: 0.0).
    pub fn electric_cleaning(mut self, chi: f64) -> Self {
        self.chi = chi;
        self
    }

    /// Magnetic-error propagation speed as a multiple of `c` (default: 0.0).
    pub fn magnetic_cleaning(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Target Courant number for suggested steps (default: 0.9).
    pub fn cfl(mut self, cfl: f64) -> Self {
        self.cfl = cfl;
        self
    }

    /// Courant number above which a step is rejected (default: 1.0).
    pub fn max_cfl(mut self, max_cfl: f64) -> Self {
        self.max_cfl = max_cfl;
        self
    }

    /// Build the operator, validating all configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - `grid` is not set
    /// - `epsilon0` or `mu0` is not finite and > 0
    /// - a cleaning factor is negative or NaN
    /// - `cfl` is not in `(0, max_cfl]`
    pub fn build(self) -> Result<MaxwellRusanov, String> {
        let grid = self.grid.ok_or_else(|| "grid is required".to_string())?;
        if !(self.epsilon0 > 0.0 && self.epsilon0.is_finite()) {
            return Err(format!("epsilon0 must be finite and > 0, got {}", self.epsilon0));
        }
        if !(self.mu0 > 0.0 && self.mu0.is_finite()) {
            return Err(format!("mu0 must be finite and > 0, got {}", self.mu0));
        }
        if !(self.chi >= 0.0 && self.chi.is_finite()) {
            return Err(format!("electric_cleaning must be finite and >= 0, got {}", self.chi));
        }
        if !(self.gamma >= 0.0 && self.gamma.is_finite()) {
            return Err(format!("magnetic_cleaning must be finite and >= 0, got {}", self.gamma));
        }
        cfl::check(self.cfl, self.max_cfl)?;

        Ok(MaxwellRusanov {
            shape: grid.em_shape().clone(),
            dx: grid.x().width(),
            light_speed: 1.0 / (self.epsilon0 * self.mu0).sqrt(),
            chi: self.chi,
            gamma: self.gamma,
            cfl: self.cfl,
            max_cfl: self.max_cfl,
        })
    }
}

impl UpdateOperator for MaxwellRusanov {
    fn name(&self) -> &str {
        "MaxwellRusanov"
    }

    fn signature(&self) -> Signature {
        Signature::new(
            [ShapeRequirement::Exact(self.shape.clone())],
            [ShapeRequirement::Exact(self.shape.clone())],
        )
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        let dt = ctx.dt();
        let input = ctx.input(0)?;
        let out = ctx.output(0)?;
        out.copy_from(input)?;

        let nc = EM_COMPONENTS as usize;
        let nx = self.shape.extents()[0] as usize;
        let g = self.shape.ghost()[0] as usize;
        let q = input.as_slice();
        let smax = self.max_speed();
        let cell = |i: usize| &q[i * nc..(i + 1) * nc];

        let dst = out.as_mut_slice();
        let mut left_flux = self.face_flux(cell(g - 1), cell(g), smax);
        for i in g..g + nx {
            let right_flux = self.face_flux(cell(i), cell(i + 1), smax);
            for k in 0..nc {
                dst[i * nc + k] -= dt / self.dx * (right_flux[k] - left_flux[k]);
            }
            left_flux = right_flux;
        }

        Ok(cfl::outcome(dt, smax / self.dx, self.cfl, self.max_cfl))
    }
}
