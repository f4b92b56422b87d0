//! Benchmark profiles for the Vlasov-Maxwell driver.
//!
//! Provides pre-built two-species [`Model`]s on the reference operators:
//!
//! - [`landau_profile`]: 32 x 8³ phase grid, weak Landau damping setup
//! - [`stress_profile`]: 64 x 12³ phase grid with the same physics
//! - [`project`]: run a no-input initial-condition operator into a field

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::f64::consts::PI;

use vlasov_core::{Field, FieldGroup, FieldId, OperatorError};
use vlasov_engine::{BoundaryPass, Diagnostics, Model, Species};
use vlasov_operator::{AdvanceContext, StepOutcome, UpdateOperator};
use vlasov_operators::{
    component, Axis, EmPerturbation, MaxwellRusanov, MaxwellianProjection, MomentKind,
    PhaseGrid, VelocityMoment, VlasovUpwind,
};

/// Ion to electron mass ratio used by every profile.
pub const MASS_RATIO: f64 = 1836.0;

/// Grid of `nx` spatial cells over one wavelength of mode 1 and `nv`
/// cells per velocity axis on `[-6, 6]`.
pub fn phase_grid(nx: u32, nv: u32) -> Result<PhaseGrid, String> {
    let err = |e: vlasov_core::FieldError| e.to_string();
    let x = Axis::new(0.0, 4.0 * PI, nx).map_err(err)?;
    let v = Axis::new(-6.0, 6.0, nv).map_err(err)?;
    PhaseGrid::new(x, [v, v, v]).map_err(err)
}

/// Run a projection with no inputs into `out`.
pub fn project(op: &dyn UpdateOperator, out: &mut Field) -> Result<StepOutcome, OperatorError> {
    let mut outputs = [out];
    let mut ctx = AdvanceContext::new(op.name(), 0.0, 0.0, &[], &mut outputs);
    op.advance(&mut ctx)
}

fn species(grid: &PhaseGrid, name: &str, field: u32, charge: f64, mass: f64) -> Result<Species, String> {
    Ok(Species {
        name: name.to_string(),
        field: FieldId(field),
        charge,
        kinetic: Box::new(
            VlasovUpwind::builder()
                .species(name)
                .grid(grid)
                .charge(charge)
                .mass(mass)
                .build()?,
        ),
        momentum: Box::new(VelocityMoment::new(grid, MomentKind::Momentum)?),
    })
}

fn distribution(grid: &PhaseGrid, name: &str, vt: f64, amplitude: f64) -> Result<Field, String> {
    let init = MaxwellianProjection::builder()
        .species(name)
        .grid(grid)
        .thermal_speed(vt)
        .perturbation(amplitude)
        .mode(1)
        .build()?;
    let mut f = Field::zeros(name, grid.distribution_shape().clone());
    project(&init, &mut f).map_err(|e| e.to_string())?;
    Ok(f)
}

/// Two-species model on `grid`: perturbed electrons over a warm uniform
/// ion background, a small seeded `Ex` perturbation, periodic ghosts.
pub fn two_species_model(grid: &PhaseGrid) -> Result<Model, String> {
    let elc = distribution(grid, "elc", 1.0, 0.01)?;
    let ion = distribution(grid, "ion", 0.5, 0.0)?;

    let noise = EmPerturbation::builder()
        .grid(grid)
        .noise_on(component::EX)
        .amplitude(1e-6)
        .seed(42)
        .build()?;
    let mut em = Field::zeros("em", grid.em_shape().clone());
    project(&noise, &mut em).map_err(|e| e.to_string())?;

    let state = FieldGroup::new(vec![elc, ion, em]).map_err(|e| e.to_string())?;
    Ok(Model {
        boundary: BoundaryPass::periodic_all(&state),
        state,
        em: FieldId(2),
        maxwell: Box::new(MaxwellRusanov::builder().grid(grid).build()?),
        species: vec![
            species(grid, "elc", 0, -1.0, 1.0)?,
            species(grid, "ion", 1, 1.0, MASS_RATIO)?,
        ],
        diagnostics: Diagnostics::disabled(),
    })
}

/// 32 x 8³ two-species profile (~16K phase-space cells).
pub fn landau_profile() -> Result<Model, String> {
    two_species_model(&phase_grid(32, 8)?)
}

/// 64 x 12³ two-species profile (~110K phase-space cells).
pub fn stress_profile() -> Result<Model, String> {
    two_species_model(&phase_grid(64, 12)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landau_profile_is_populated() {
        let model = landau_profile().unwrap();
        assert_eq!(model.species.len(), 2);
        let elc = model.state.field(FieldId(0)).unwrap();
        assert!(elc.as_slice().iter().any(|&v| v > 0.0));
        assert!(elc.first_non_finite().is_none());
        let em = model.state.field(FieldId(2)).unwrap();
        assert!(em.as_slice().iter().any(|&v| v != 0.0));
    }
}
