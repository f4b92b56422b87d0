//! Uniform phase-space grid: one configuration axis, three velocity axes.
//!
//! The grid fixes the layout of every field the reference operators touch:
//!
//! | Field            | Axes                 | Ghost | Components |
//! |------------------|----------------------|-------|------------|
//! | distribution     | `x, vx, vy, vz`      | 1     | 1          |
//! | electromagnetic  | `x`                  | 1     | 8          |
//! | moment           | `x`                  | 1     | 1 or 3     |
//! | energy           | single cell          | 0     | 2          |

use vlasov_core::{FieldError, FieldShape};

/// Ghost width on every axis of every grid-backed field.
pub const GHOST: u32 = 1;

/// One uniform axis `[lower, upper]` split into `cells` cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Axis {
    lower: f64,
    upper: f64,
    cells: u32,
}

impl Axis {
    /// A uniform axis.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::InvalidShape`] unless both bounds are finite,
    /// `lower < upper`, and `cells >= 1`.
    pub fn new(lower: f64, upper: f64, cells: u32) -> Result<Self, FieldError> {
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(FieldError::InvalidShape {
                reason: format!("axis bounds must be finite with lower < upper, got [{lower}, {upper}]"),
            });
        }
        if cells == 0 {
            return Err(FieldError::InvalidShape {
                reason: "axis needs at least one cell".into(),
            });
        }
        Ok(Self {
            lower,
            upper,
            cells,
        })
    }

    /// Lower bound.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Upper bound.
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Interior cell count.
    pub fn cells(&self) -> u32 {
        self.cells
    }

    /// Domain length.
    pub fn length(&self) -> f64 {
        self.upper - self.lower
    }

    /// Cell width.
    pub fn width(&self) -> f64 {
        self.length() / self.cells as f64
    }

    /// Center of interior cell `i` (0-based, no ghost offset).
    pub fn center(&self, i: usize) -> f64 {
        self.lower + (i as f64 + 0.5) * self.width()
    }

    /// Largest `|center|` over the interior cells.
    pub fn max_abs_center(&self) -> f64 {
        let first = self.center(0).abs();
        let last = self.center(self.cells as usize - 1).abs();
        first.max(last)
    }
}

/// 1x3v phase-space grid and the field shapes derived from it.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseGrid {
    x: Axis,
    v: [Axis; 3],
    distribution: FieldShape,
    em: FieldShape,
}

impl PhaseGrid {
    /// Build a grid from its configuration axis and three velocity axes.
    pub fn new(x: Axis, v: [Axis; 3]) -> Result<Self, FieldError> {
        let distribution = FieldShape::uniform(
            &[x.cells(), v[0].cells(), v[1].cells(), v[2].cells()],
            GHOST,
            1,
        )?;
        let em = FieldShape::uniform(&[x.cells()], GHOST, crate::maxwell::EM_COMPONENTS)?;
        Ok(Self {
            x,
            v,
            distribution,
            em,
        })
    }

    /// Configuration axis.
    pub fn x(&self) -> &Axis {
        &self.x
    }

    /// Velocity axis `i` (0 = vx, 1 = vy, 2 = vz).
    pub fn v(&self, i: usize) -> &Axis {
        &self.v[i]
    }

    /// Volume of one velocity cell.
    pub fn velocity_cell_volume(&self) -> f64 {
        self.v.iter().map(Axis::width).product()
    }

    /// Shape of a species distribution function.
    pub fn distribution_shape(&self) -> &FieldShape {
        &self.distribution
    }

    /// Shape of the electromagnetic field.
    pub fn em_shape(&self) -> &FieldShape {
        &self.em
    }

    /// Shape of a configuration-space moment with `components` components.
    pub fn moment_shape(&self, components: u32) -> Result<FieldShape, FieldError> {
        self.em.with_components(components)
    }

    /// Shape of the two-component field-energy integral.
    pub fn energy_shape() -> Result<FieldShape, FieldError> {
        FieldShape::new(&[1], &[0], 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> PhaseGrid {
        let x = Axis::new(0.0, 2.0, 8).unwrap();
        let v = Axis::new(-3.0, 3.0, 6).unwrap();
        PhaseGrid::new(x, [v, v, v]).unwrap()
    }

    #[test]
    fn axis_geometry() {
        let a = Axis::new(-1.0, 1.0, 4).unwrap();
        assert_relative_eq!(a.width(), 0.5);
        assert_relative_eq!(a.center(0), -0.75);
        assert_relative_eq!(a.center(3), 0.75);
        assert_relative_eq!(a.max_abs_center(), 0.75);
    }

    #[test]
    fn axis_rejects_bad_bounds() {
        assert!(Axis::new(1.0, 1.0, 4).is_err());
        assert!(Axis::new(0.0, f64::NAN, 4).is_err());
        assert!(Axis::new(0.0, 1.0, 0).is_err());
    }

    #[test]
    fn derived_shapes() {
        let g = grid();
        assert_eq!(g.distribution_shape().extents(), &[8, 6, 6, 6]);
        assert_eq!(g.distribution_shape().ghost(), &[1, 1, 1, 1]);
        assert_eq!(g.em_shape().components(), 8);
        let m1 = g.moment_shape(3).unwrap();
        assert!(m1.same_grid(g.em_shape()));
        assert_eq!(m1.components(), 3);
        assert_eq!(PhaseGrid::energy_shape().unwrap().len(), 2);
        assert_relative_eq!(g.velocity_cell_volume(), 1.0);
    }
}
