//! First-order upwind Vlasov operator for one species.
//!
//! Advances the distribution `f(x, vx, vy, vz)` under
//!
//! ```text
//! df/dt + vx df/dx + a . grad_v f = 0,   a = (q/m) (E + v x B)
//! ```
//!
//! in conservative finite-volume form. Each stage writes
//! `out = in - dt * div(flux)` on interior cells, with upwind face values
//! in every direction. Configuration-space faces read the ghost cells
//! (filled by the boundary pass); velocity-domain edges carry zero flux so
//! particles never leave velocity space.
//!
//! Component `i` of `v x B` does not depend on `v_i`, so the acceleration
//! across a velocity face equals its value at the adjacent cell centers.
//!
//! Constructed via the builder pattern: [`VlasovUpwind::builder`].

use vlasov_core::{Field, FieldShape, OperatorError};
use vlasov_operator::{AdvanceContext, ShapeRequirement, Signature, StepOutcome, UpdateOperator};

use crate::cfl;
use crate::grid::PhaseGrid;
use crate::maxwell::component::{BX, BY, BZ, EX, EY, EZ};
use crate::maxwell::EM_COMPONENTS;

/// Upwind finite-volume Vlasov update for one species.
///
/// Inputs: `[distribution, em]`. Output: `[distribution]`.
///
/// # CFL stability
///
/// `rate = max|vx| / dx + sum_i max|a_i| / dv_i` over the current state;
/// the suggested step is `cfl / rate`.
#[derive(Debug)]
pub struct VlasovUpwind {
    name: String,
    grid: PhaseGrid,
    charge_over_mass: f64,
    cfl: f64,
    max_cfl: f64,
}

/// Builder for [`VlasovUpwind`].
///
/// Required fields: `grid`, `charge`, and `mass`.
pub struct VlasovUpwindBuilder {
    species: String,
    grid: Option<PhaseGrid>,
    charge: Option<f64>,
    mass: Option<f64>,
    cfl: f64,
    max_cfl: f64,
}

impl VlasovUpwind {
    /// Create a new builder for configuring a `VlasovUpwind` operator.
    pub fn builder() -> VlasovUpwindBuilder {
        VlasovUpwindBuilder {
            species: "species".to_string(),
            grid: None,
            charge: None,
            mass: None,
            cfl: cfl::DEFAULT_CFL,
            max_cfl: cfl::DEFAULT_MAX_CFL,
        }
    }

    /// Charge-to-mass ratio of the species.
    pub fn charge_over_mass(&self) -> f64 {
        self.charge_over_mass
    }

    /// Lorentz acceleration at velocity `v` in the fields of `em_cell`.
    fn acceleration(&self, em_cell: &[f64], v: [f64; 3]) -> [f64; 3] {
        let (e, b) = (
            [em_cell[EX], em_cell[EY], em_cell[EZ]],
            [em_cell[BX], em_cell[BY], em_cell[BZ]],
        );
        let qm = self.charge_over_mass;
        [
            qm * (e[0] + v[1] * b[2] - v[2] * b[1]),
            qm * (e[1] + v[2] * b[0] - v[0] * b[2]),
            qm * (e[2] + v[0] * b[1] - v[1] * b[0]),
        ]
    }

    fn update(&self, dist: &Field, em: &Field, out: &mut [f64], dt: f64) -> f64 {
        let shape = self.grid.distribution_shape();
        let strides = shape.cell_strides();
        let ext: [usize; 4] = [
            shape.extents()[0] as usize,
            shape.extents()[1] as usize,
            shape.extents()[2] as usize,
            shape.extents()[3] as usize,
        ];
        let g = shape.ghost()[0] as usize;
        let f = dist.as_slice();
        let q = em.as_slice();
        let nc = EM_COMPONENTS as usize;

        let dx = self.grid.x().width();
        let dv = [
            self.grid.v(0).width(),
            self.grid.v(1).width(),
            self.grid.v(2).width(),
        ];
        let mut max_accel = [0.0f64; 3];

        for ix in 0..ext[0] {
            let em_cell = &q[(ix + g) * nc..(ix + g + 1) * nc];
            for j0 in 0..ext[1] {
                let vx = self.grid.v(0).center(j0);
                for j1 in 0..ext[2] {
                    let vy = self.grid.v(1).center(j1);
                    for j2 in 0..ext[3] {
                        let vz = self.grid.v(2).center(j2);
                        let c = (ix + g) * strides[0]
                            + (j0 + g) * strides[1]
                            + (j1 + g) * strides[2]
                            + (j2 + g) * strides[3];

                        // x: upwind on the sign of vx, ghosts supply the neighbours
                        let sx = strides[0];
                        let mut div = if vx >= 0.0 {
                            vx * (f[c] - f[c - sx]) / dx
                        } else {
                            vx * (f[c + sx] - f[c]) / dx
                        };

                        let a = self.acceleration(em_cell, [vx, vy, vz]);
                        for (d, idx) in [j0, j1, j2].into_iter().enumerate() {
                            max_accel[d] = max_accel[d].max(a[d].abs());
                            let s = strides[d + 1];
                            let n = ext[d + 1];
                            let upwind = |lo: usize, hi: usize| {
                                if a[d] >= 0.0 {
                                    a[d] * f[lo]
                                } else {
                                    a[d] * f[hi]
                                }
                            };
                            let lower = if idx == 0 { 0.0 } else { upwind(c - s, c) };
                            let upper = if idx + 1 == n { 0.0 } else { upwind(c, c + s) };
                            div += (upper - lower) / dv[d];
                        }

                        out[c] = f[c] - dt * div;
                    }
                }
            }
        }

        let max_vx = self.grid.v(0).max_abs_center();
        max_vx / dx + (0..3).map(|d| max_accel[d] / dv[d]).sum::<f64>()
    }
}

impl VlasovUpwindBuilder {
    /// Species name, used in the operator name (default: `"species"`).
    pub fn species(mut self, species: impl Into<String>) -> Self {
        self.species = species.into();
        self
    }

    /// Set the grid the operator works on.
    pub fn grid(mut self, grid: &PhaseGrid) -> Self {
        self.grid = Some(grid.clone());
        self
    }

    /// Species charge.
    pub fn charge(mut self, charge: f64) -> Self {
        self.charge = Some(charge);
        self
    }

    /// Species mass. Must be > 0.
    pub fn mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
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
    /// - `grid`, `charge`, or `mass` is not set
    /// - `charge` is not finite
    /// - `mass` is not finite and > 0
    /// - `cfl` is not in `(0, max_cfl]`
    pub fn build(self) -> Result<VlasovUpwind, String> {
        let grid = self.grid.ok_or_else(|| "grid is required".to_string())?;
        let charge = self.charge.ok_or_else(|| "charge is required".to_string())?;
        let mass = self.mass.ok_or_else(|| "mass is required".to_string())?;
        if !charge.is_finite() {
            return Err(format!("charge must be finite, got {charge}"));
        }
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(format!("mass must be finite and > 0, got {mass}"));
        }
        cfl::check(self.cfl, self.max_cfl)?;

        Ok(VlasovUpwind {
            name: format!("VlasovUpwind[{}]", self.species),
            grid,
            charge_over_mass: charge / mass,
            cfl: self.cfl,
            max_cfl: self.max_cfl,
        })
    }
}

impl UpdateOperator for VlasovUpwind {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Signature {
        let dist: FieldShape = self.grid.distribution_shape().clone();
        Signature::new(
            [
                ShapeRequirement::Exact(dist.clone()),
                ShapeRequirement::Exact(self.grid.em_shape().clone()),
            ],
            [ShapeRequirement::Exact(dist)],
        )
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        let dt = ctx.dt();
        let dist = ctx.input(0)?;
        let em = ctx.input(1)?;
        let out = ctx.output(0)?;
        out.copy_from(dist)?;
        let rate = self.update(dist, em, out.as_mut_slice(), dt);
        Ok(cfl::outcome(dt, rate, self.cfl, self.max_cfl))
    }
}
