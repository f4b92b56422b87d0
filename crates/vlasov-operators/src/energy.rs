//! Integrated electromagnetic field energy.
//!
//! [`FieldEnergy`] reduces the EM field to a single two-component cell:
//! `[sum eps0/2 |E|^2 dx, sum |B|^2 / (2 mu0) dx]` over interior cells.

use vlasov_core::{FieldShape, OperatorError};
use vlasov_operator::{AdvanceContext, ShapeRequirement, Signature, StepOutcome, UpdateOperator};

use crate::grid::PhaseGrid;
use crate::maxwell::component::{BX, BY, BZ, EX, EY, EZ};
use crate::maxwell::EM_COMPONENTS;

/// Electric and magnetic energy integral. Input: `[em]`. Output: `[energy]`.
#[derive(Debug)]
pub struct FieldEnergy {
    em: FieldShape,
    output: FieldShape,
    dx: f64,
    epsilon0: f64,
    mu0: f64,
}

impl FieldEnergy {
    /// An energy integral on `grid` with the given vacuum constants.
    pub fn new(grid: &PhaseGrid, epsilon0: f64, mu0: f64) -> Result<Self, String> {
        if !(epsilon0 > 0.0 && epsilon0.is_finite()) {
            return Err(format!("epsilon0 must be finite and > 0, got {epsilon0}"));
        }
        if !(mu0 > 0.0 && mu0.is_finite()) {
            return Err(format!("mu0 must be finite and > 0, got {mu0}"));
        }
        let output = PhaseGrid::energy_shape().map_err(|e| e.to_string())?;
        Ok(Self {
            em: grid.em_shape().clone(),
            output,
            dx: grid.x().width(),
            epsilon0,
            mu0,
        })
    }

    /// Shape of the field this operator writes.
    pub fn output_shape(&self) -> &FieldShape {
        &self.output
    }
}

impl UpdateOperator for FieldEnergy {
    fn name(&self) -> &str {
        "FieldEnergy"
    }

    fn signature(&self) -> Signature {
        Signature::new(
            [ShapeRequirement::Exact(self.em.clone())],
            [ShapeRequirement::Exact(self.output.clone())],
        )
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        let em = ctx.input(0)?;
        let nc = EM_COMPONENTS as usize;
        let g = self.em.ghost()[0] as usize;
        let nx = self.em.extents()[0] as usize;

        let (mut electric, mut magnetic) = (0.0, 0.0);
        for cell in em.as_slice().chunks_exact(nc).skip(g).take(nx) {
            electric += cell[EX] * cell[EX] + cell[EY] * cell[EY] + cell[EZ] * cell[EZ];
            magnetic += cell[BX] * cell[BX] + cell[BY] * cell[BY] + cell[BZ] * cell[BZ];
        }

        let out = ctx.output(0)?.as_mut_slice();
        out[0] = 0.5 * self.epsilon0 * electric * self.dx;
        out[1] = 0.5 / self.mu0 * magnetic * self.dx;
        Ok(StepOutcome::unconstrained())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Axis;
    use approx::assert_relative_eq;
    use vlasov_core::Field;

    #[test]
    fn integrates_interior_only() {
        let x = Axis::new(0.0, 2.0, 4).unwrap();
        let v = Axis::new(-1.0, 1.0, 2).unwrap();
        let g = PhaseGrid::new(x, [v, v, v]).unwrap();
        let op = FieldEnergy::new(&g, 2.0, 0.5).unwrap();

        let mut em = Field::zeros("em", g.em_shape().clone());
        for cell in em.as_mut_slice().chunks_mut(8) {
            cell[EY] = 1.0;
            cell[BZ] = 2.0;
        }
        // ghost cells carry junk that must not count
        em.as_mut_slice()[EY] = 100.0;

        let mut out = Field::zeros("energy", op.output_shape().clone());
        let inputs = [&em];
        let mut outputs = [&mut out];
        let mut ctx = AdvanceContext::new(op.name(), 0.0, 0.0, &inputs, &mut outputs);
        op.advance(&mut ctx).unwrap();

        // dx = 0.5, four cells
        assert_relative_eq!(out.as_slice()[0], 0.5 * 2.0 * 1.0 * 0.5 * 4.0);
        assert_relative_eq!(out.as_slice()[1], 0.5 / 0.5 * 4.0 * 0.5 * 4.0);
    }

    #[test]
    fn rejects_nonpositive_constants() {
        let x = Axis::new(0.0, 1.0, 2).unwrap();
        let g = PhaseGrid::new(x, [x, x, x]).unwrap();
        assert!(FieldEnergy::new(&g, 0.0, 1.0).unwrap_err().contains("epsilon0"));
        assert!(FieldEnergy::new(&g, 1.0, -1.0).unwrap_err().contains("mu0"));
    }
}
