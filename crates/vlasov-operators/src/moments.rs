//! Velocity moments of a distribution function.
//!
//! [`VelocityMoment`] reduces a distribution over the velocity axes into a
//! configuration-space field:
//!
//! - [`MomentKind::Density`]: `M0(x) = sum_v f dv`  (1 component)
//! - [`MomentKind::Momentum`]: `M1_i(x) = sum_v v_i f dv`  (3 components)
//!
//! Only interior velocity cells contribute. Ghost cells of the output are
//! zeroed.

use vlasov_core::{FieldShape, OperatorError};
use vlasov_operator::{AdvanceContext, ShapeRequirement, Signature, StepOutcome, UpdateOperator};

use crate::grid::PhaseGrid;

/// Which moment a [`VelocityMoment`] computes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MomentKind {
    /// Number density, one component.
    Density,
    /// First velocity moment (particle flux), three components.
    Momentum,
}

impl MomentKind {
    /// Output components.
    pub fn components(self) -> u32 {
        match self {
            Self::Density => 1,
            Self::Momentum => 3,
        }
    }

    /// Short tag used in field and operator names (`M0`, `M1i`).
    pub fn tag(self) -> &'static str {
        match self {
            Self::Density => "M0",
            Self::Momentum => "M1i",
        }
    }
}

/// Velocity-moment reduction. Input: `[distribution]`. Output: `[moment]`.
///
/// Imposes no step-size constraint.
#[derive(Debug)]
pub struct VelocityMoment {
    name: String,
    kind: MomentKind,
    grid: PhaseGrid,
    output: FieldShape,
}

impl VelocityMoment {
    /// A moment operator on `grid`.
    pub fn new(grid: &PhaseGrid, kind: MomentKind) -> Result<Self, String> {
        let output = grid
            .moment_shape(kind.components())
            .map_err(|e| e.to_string())?;
        Ok(Self {
            name: format!("VelocityMoment[{}]", kind.tag()),
            kind,
            grid: grid.clone(),
            output,
        })
    }

    /// The moment computed.
    pub fn kind(&self) -> MomentKind {
        self.kind
    }

    /// Shape of the field this operator writes.
    pub fn output_shape(&self) -> &FieldShape {
        &self.output
    }
}

impl UpdateOperator for VelocityMoment {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Signature {
        Signature::new(
            [ShapeRequirement::Exact(self.grid.distribution_shape().clone())],
            [ShapeRequirement::Exact(self.output.clone())],
        )
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        let dist = ctx.input(0)?;
        let out = ctx.output(0)?;
        out.fill(0.0);

        let shape = self.grid.distribution_shape();
        let strides = shape.cell_strides();
        let g = shape.ghost()[0] as usize;
        let ext = shape.extents();
        let f = dist.as_slice();
        let dv = self.grid.velocity_cell_volume();
        let nc = self.kind.components() as usize;
        let dst = out.as_mut_slice();

        for ix in 0..ext[0] as usize {
            let mut acc = [0.0f64; 3];
            for j0 in 0..ext[1] as usize {
                let vx = self.grid.v(0).center(j0);
                for j1 in 0..ext[2] as usize {
                    let vy = self.grid.v(1).center(j1);
                    for j2 in 0..ext[3] as usize {
                        let vz = self.grid.v(2).center(j2);
                        let c = (ix + g) * strides[0]
                            + (j0 + g) * strides[1]
                            + (j1 + g) * strides[2]
                            + (j2 + g) * strides[3];
                        match self.kind {
                            MomentKind::Density => acc[0] += f[c],
                            MomentKind::Momentum => {
                                acc[0] += vx * f[c];
                                acc[1] += vy * f[c];
                                acc[2] += vz * f[c];
                            }
                        }
                    }
                }
            }
            let base = (ix + g) * nc;
            for k in 0..nc {
                dst[base + k] = acc[k] * dv;
            }
        }

        Ok(StepOutcome::unconstrained())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Axis;
    use approx::assert_relative_eq;
    use vlasov_core::Field;

    fn grid() -> PhaseGrid {
        let x = Axis::new(0.0, 1.0, 3).unwrap();
        let v = Axis::new(-1.0, 1.0, 2).unwrap();
        PhaseGrid::new(x, [v, v, v]).unwrap()
    }

    fn reduce(g: &PhaseGrid, kind: MomentKind, dist: &Field) -> Field {
        let op = VelocityMoment::new(g, kind).unwrap();
        let mut out = Field::zeros("m", op.output_shape().clone());
        let inputs = [dist];
        let mut outputs = [&mut out];
        let mut ctx = AdvanceContext::new(op.name(), 0.0, 0.0, &inputs, &mut outputs);
        assert_eq!(op.advance(&mut ctx).unwrap(), StepOutcome::unconstrained());
        out
    }

    #[test]
    fn density_of_uniform_distribution() {
        let g = grid();
        let mut dist = Field::zeros("f", g.distribution_shape().clone());
        dist.fill(2.0);
        let m0 = reduce(&g, MomentKind::Density, &dist);
        // 8 velocity cells of volume 1 each, ghosts excluded
        assert_eq!(m0.as_slice(), &[0.0, 16.0, 16.0, 16.0, 0.0]);
    }

    #[test]
    fn symmetric_distribution_has_no_momentum() {
        let g = grid();
        let mut dist = Field::zeros("f", g.distribution_shape().clone());
        dist.fill(1.0);
        let m1 = reduce(&g, MomentKind::Momentum, &dist);
        assert!(m1.as_slice().iter().all(|v| v.abs() < 1e-15));
    }

    #[test]
    fn beam_momentum_matches_velocity() {
        let g = grid();
        let mut dist = Field::zeros("f", g.distribution_shape().clone());
        // particles only in the +vx, +vy, -vz cell (interior indices 1, 1, 0)
        for ix in 1..=3 {
            let idx = g.distribution_shape().offset(&[ix, 2, 2, 1]);
            dist.as_mut_slice()[idx] = 4.0;
        }
        let m1 = reduce(&g, MomentKind::Momentum, &dist);
        let cell = m1.cell(&[2]);
        assert_relative_eq!(cell[0], 2.0);
        assert_relative_eq!(cell[1], 2.0);
        assert_relative_eq!(cell[2], -2.0);
    }

    #[test]
    fn names_and_shapes() {
        let g = grid();
        let op = VelocityMoment::new(&g, MomentKind::Momentum).unwrap();
        assert_eq!(op.name(), "VelocityMoment[M1i]");
        assert_eq!(op.output_shape().components(), 3);
        assert_eq!(op.kind(), MomentKind::Momentum);
    }
}
