//! Field storage: [`FieldShape`] and the [`Field`] buffer.
//!
//! A field is a flat `f64` buffer over a padded Cartesian grid. Every axis
//! carries `ghost` halo cells on each side of its `extent` interior cells.
//! Cells are stored row-major (axis 0 slowest) with the components of a
//! cell stored contiguously:
//!
//! ```text
//! offset(i0, .., iN, c) = (i0 * s0 + .. + iN * sN) * components + c
//! ```
//!
//! where `iK` are *padded* indices (`0..extent + 2 * ghost`) and `sK` are
//! the cell strides of the padded grid.

use std::fmt;

use smallvec::SmallVec;

use crate::error::FieldError;

/// Which end of an axis a boundary operation addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The low-index end.
    Lower,
    /// The high-index end.
    Upper,
}

/// Immutable description of a field buffer's layout.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldShape {
    extents: SmallVec<[u32; 4]>,
    ghost: SmallVec<[u32; 4]>,
    components: u32,
}

impl FieldShape {
    /// Build a shape from per-axis interior extents, per-axis ghost widths,
    /// and a component count.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::InvalidShape`] if there are no axes, the two
    /// slices differ in length, any extent or the component count is zero,
    /// or a ghost width exceeds its axis extent (periodic fills copy whole
    /// ghost slabs from the interior).
    pub fn new(extents: &[u32], ghost: &[u32], components: u32) -> Result<Self, FieldError> {
        if extents.is_empty() {
            return Err(FieldError::InvalidShape {
                reason: "a field needs at least one axis".into(),
            });
        }
        if extents.len() != ghost.len() {
            return Err(FieldError::InvalidShape {
                reason: format!(
                    "{} extents but {} ghost widths",
                    extents.len(),
                    ghost.len()
                ),
            });
        }
        if components == 0 {
            return Err(FieldError::InvalidShape {
                reason: "component count must be at least 1".into(),
            });
        }
        for (axis, (&n, &g)) in extents.iter().zip(ghost).enumerate() {
            if n == 0 {
                return Err(FieldError::InvalidShape {
                    reason: format!("axis {axis} has zero cells"),
                });
            }
            if g > n {
                return Err(FieldError::InvalidShape {
                    reason: format!("axis {axis}: ghost width {g} exceeds extent {n}"),
                });
            }
        }
        Ok(Self {
            extents: SmallVec::from_slice(extents),
            ghost: SmallVec::from_slice(ghost),
            components,
        })
    }

    /// Same as [`new`](Self::new) with one ghost width for every axis.
    pub fn uniform(extents: &[u32], ghost: u32, components: u32) -> Result<Self, FieldError> {
        let ghosts: SmallVec<[u32; 4]> = extents.iter().map(|_| ghost).collect();
        Self::new(extents, &ghosts, components)
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.extents.len()
    }

    /// Interior cell counts per axis.
    pub fn extents(&self) -> &[u32] {
        &self.extents
    }

    /// Ghost widths per axis.
    pub fn ghost(&self) -> &[u32] {
        &self.ghost
    }

    /// Components stored per cell.
    pub fn components(&self) -> u32 {
        self.components
    }

    /// Cells along `axis` including both halos.
    pub fn padded_extent(&self, axis: usize) -> usize {
        (self.extents[axis] + 2 * self.ghost[axis]) as usize
    }

    /// Number of interior cells.
    pub fn interior_cells(&self) -> usize {
        self.extents.iter().map(|&n| n as usize).product()
    }

    /// Number of cells including halos.
    pub fn padded_cells(&self) -> usize {
        (0..self.ndim()).map(|a| self.padded_extent(a)).product()
    }

    /// Buffer length in `f64` elements.
    pub fn len(&self) -> usize {
        self.padded_cells() * self.components as usize
    }

    /// Always `false`: a valid shape has at least one cell and one component.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Cell strides of the padded grid, one per axis.
    pub fn cell_strides(&self) -> SmallVec<[usize; 4]> {
        let n = self.ndim();
        let mut strides: SmallVec<[usize; 4]> = SmallVec::from_elem(1, n);
        for axis in (0..n.saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.padded_extent(axis + 1);
        }
        strides
    }

    /// Flat index of the first component of the cell at padded index `idx`.
    pub fn offset(&self, idx: &[usize]) -> usize {
        let strides = self.cell_strides();
        let cell: usize = idx.iter().zip(&strides).map(|(i, s)| i * s).sum();
        cell * self.components as usize
    }

    /// Whether `other` covers the same grid, ignoring component count.
    pub fn same_grid(&self, other: &Self) -> bool {
        self.extents == other.extents && self.ghost == other.ghost
    }

    /// This grid with a different component count.
    pub fn with_components(&self, components: u32) -> Result<Self, FieldError> {
        Self::new(&self.extents, &self.ghost, components)
    }
}

impl fmt::Display for FieldShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (n, g)) in self.extents.iter().zip(&self.ghost).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{n}+{g}")?;
        }
        write!(f, "]x{}", self.components)
    }
}

/// A named numerical buffer for one physical quantity.
///
/// The shape never changes after construction. Every mutating call bumps
/// [`version`](Field::version), which lets callers detect writes without
/// comparing contents.
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    shape: FieldShape,
    data: Vec<f64>,
    version: u64,
}

impl Field {
    /// A zero-filled field.
    pub fn zeros(name: impl Into<String>, shape: FieldShape) -> Self {
        let data = vec![0.0; shape.len()];
        Self {
            name: name.into(),
            shape,
            data,
            version: 0,
        }
    }

    /// Wrap existing data.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::InvalidShape`] if `data.len()` does not match
    /// the shape.
    pub fn from_data(
        name: impl Into<String>,
        shape: FieldShape,
        data: Vec<f64>,
    ) -> Result<Self, FieldError> {
        if data.len() != shape.len() {
            return Err(FieldError::InvalidShape {
                reason: format!(
                    "buffer of {} elements does not fit shape {shape} ({} elements)",
                    data.len(),
                    shape.len()
                ),
            });
        }
        Ok(Self {
            name: name.into(),
            shape,
            data,
            version: 0,
        })
    }

    /// Quantity name, used for logging and output file names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Buffer layout.
    pub fn shape(&self) -> &FieldShape {
        &self.shape
    }

    /// Number of mutations applied since construction.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Read-only view of the whole padded buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable view of the whole padded buffer.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.version += 1;
        &mut self.data
    }

    /// Components of the cell at padded index `idx`.
    pub fn cell(&self, idx: &[usize]) -> &[f64] {
        let start = self.shape.offset(idx);
        &self.data[start..start + self.shape.components as usize]
    }

    /// An independent copy with the same name, shape, and contents.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Set every element, halos included, to `value`.
    pub fn fill(&mut self, value: f64) {
        self.version += 1;
        self.data.fill(value);
    }

    /// Multiply every element by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.version += 1;
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Overwrite contents with those of `other`.
    pub fn copy_from(&mut self, other: &Field) -> Result<(), FieldError> {
        self.check_same_shape(other)?;
        self.version += 1;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// `self = w1 * f1 + w2 * f2`, element by element.
    pub fn combine(&mut self, w1: f64, f1: &Field, w2: f64, f2: &Field) -> Result<(), FieldError> {
        self.check_same_shape(f1)?;
        self.check_same_shape(f2)?;
        self.version += 1;
        for ((out, a), b) in self.data.iter_mut().zip(&f1.data).zip(&f2.data) {
            *out = w1 * a + w2 * b;
        }
        Ok(())
    }

    /// `self += scale * other`, element by element.
    pub fn accumulate(&mut self, scale: f64, other: &Field) -> Result<(), FieldError> {
        self.check_same_shape(other)?;
        self.version += 1;
        for (out, v) in self.data.iter_mut().zip(&other.data) {
            *out += scale * v;
        }
        Ok(())
    }

    /// Add `scale * other` into components `offset..offset + other.components`
    /// of every cell.
    ///
    /// `other` must cover the same grid; it may carry fewer components.
    pub fn accumulate_components(
        &mut self,
        scale: f64,
        other: &Field,
        offset: u32,
    ) -> Result<(), FieldError> {
        if !self.shape.same_grid(&other.shape) {
            return Err(self.shape_mismatch(other));
        }
        let dst_nc = self.shape.components;
        let src_nc = other.shape.components;
        if offset + src_nc > dst_nc {
            return Err(FieldError::ComponentOverflow {
                field: self.name.clone(),
                offset,
                source_components: src_nc,
                components: dst_nc,
            });
        }
        self.version += 1;
        let (dst_nc, src_nc, offset) = (dst_nc as usize, src_nc as usize, offset as usize);
        for (dst, src) in self
            .data
            .chunks_exact_mut(dst_nc)
            .zip(other.data.chunks_exact(src_nc))
        {
            for (d, s) in dst[offset..offset + src_nc].iter_mut().zip(src) {
                *d += scale * s;
            }
        }
        Ok(())
    }

    /// Bit-for-bit equality of shape and contents (`NaN` payloads included).
    pub fn bit_eq(&self, other: &Field) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    /// Index of the first non-finite element, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.data.iter().position(|v| !v.is_finite())
    }

    /// Fill both halos of `axis` from the opposite end of the interior.
    ///
    /// Fills the full padded cross-section, so calling this for every axis
    /// in turn also fills corner halos.
    pub fn sync_periodic(&mut self, axis: usize) -> Result<(), FieldError> {
        self.check_axis(axis)?;
        let n = self.shape.extents[axis] as usize;
        let g = self.shape.ghost[axis] as usize;
        if g == 0 {
            return Ok(());
        }
        self.version += 1;
        let (outer, padded, slab) = self.slab_geometry(axis);
        for o in 0..outer {
            let base = o * padded * slab;
            for p in 0..g {
                // lower halo p mirrors interior cell p + n, upper halo g + n + p mirrors g + p
                let src = base + (p + n) * slab;
                self.data.copy_within(src..src + slab, base + p * slab);
                let src = base + (g + p) * slab;
                self.data
                    .copy_within(src..src + slab, base + (g + n + p) * slab);
            }
        }
        Ok(())
    }

    /// Fill one halo of `axis` by repeating the adjacent interior slab.
    pub fn copy_edge(&mut self, axis: usize, side: Side) -> Result<(), FieldError> {
        self.check_axis(axis)?;
        let n = self.shape.extents[axis] as usize;
        let g = self.shape.ghost[axis] as usize;
        if g == 0 {
            return Ok(());
        }
        self.version += 1;
        let (outer, padded, slab) = self.slab_geometry(axis);
        let (edge, halo) = match side {
            Side::Lower => (g, 0..g),
            Side::Upper => (g + n - 1, g + n..g + n + g),
        };
        for o in 0..outer {
            let base = o * padded * slab;
            let src = base + edge * slab;
            for p in halo.clone() {
                self.data.copy_within(src..src + slab, base + p * slab);
            }
        }
        Ok(())
    }

    /// `(outer blocks, padded extent, slab length in elements)` for `axis`.
    fn slab_geometry(&self, axis: usize) -> (usize, usize, usize) {
        let outer: usize = (0..axis).map(|a| self.shape.padded_extent(a)).product();
        let slab: usize = (axis + 1..self.shape.ndim())
            .map(|a| self.shape.padded_extent(a))
            .product::<usize>()
            * self.shape.components as usize;
        (outer, self.shape.padded_extent(axis), slab)
    }

    fn check_axis(&self, axis: usize) -> Result<(), FieldError> {
        if axis >= self.shape.ndim() {
            return Err(FieldError::AxisOutOfRange {
                axis,
                ndim: self.shape.ndim(),
            });
        }
        Ok(())
    }

    fn check_same_shape(&self, other: &Field) -> Result<(), FieldError> {
        if self.shape != other.shape {
            return Err(self.shape_mismatch(other));
        }
        Ok(())
    }

    fn shape_mismatch(&self, other: &Field) -> FieldError {
        FieldError::ShapeMismatch {
            field: self.name.clone(),
            expected: self.shape.clone(),
            found: other.shape.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn line(n: u32, ghost: u32, components: u32) -> FieldShape {
        FieldShape::uniform(&[n], ghost, components).unwrap()
    }

    fn ramp(name: &str, shape: FieldShape) -> Field {
        let data = (0..shape.len()).map(|i| i as f64).collect();
        Field::from_data(name, shape, data).unwrap()
    }

    #[test]
    fn shape_rejects_bad_input() {
        assert!(FieldShape::new(&[], &[], 1).is_err());
        assert!(FieldShape::new(&[4, 4], &[1], 1).is_err());
        assert!(FieldShape::new(&[4], &[1], 0).is_err());
        assert!(FieldShape::new(&[0], &[0], 1).is_err());
        assert!(FieldShape::new(&[2], &[3], 1).is_err());
    }

    #[test]
    fn shape_sizes_and_strides() {
        let shape = FieldShape::new(&[4, 3], &[1, 2], 2).unwrap();
        assert_eq!(shape.padded_extent(0), 6);
        assert_eq!(shape.padded_extent(1), 7);
        assert_eq!(shape.interior_cells(), 12);
        assert_eq!(shape.padded_cells(), 42);
        assert_eq!(shape.len(), 84);
        assert_eq!(shape.cell_strides().as_slice(), &[7, 1]);
        assert_eq!(shape.offset(&[1, 2]), (7 + 2) * 2);
        assert_eq!(shape.to_string(), "[4+1, 3+2]x2");
    }

    #[test]
    fn from_data_checks_length() {
        let err = Field::from_data("f", line(4, 1, 1), vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, FieldError::InvalidShape { .. }));
    }

    #[test]
    fn mutations_bump_version() {
        let mut f = Field::zeros("f", line(4, 1, 1));
        let other = f.duplicate();
        assert_eq!(f.version(), 0);
        f.fill(1.0);
        f.scale(2.0);
        f.copy_from(&other).unwrap();
        f.accumulate(1.0, &other).unwrap();
        assert_eq!(f.version(), 4);
    }

    #[test]
    fn copy_from_rejects_shape_mismatch() {
        let mut a = Field::zeros("a", line(4, 1, 1));
        let b = Field::zeros("b", line(5, 1, 1));
        match a.copy_from(&b) {
            Err(FieldError::ShapeMismatch { field, .. }) => assert_eq!(field, "a"),
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
        assert_eq!(a.version(), 0, "failed copy must not touch the field");
    }

    #[test]
    fn combine_is_affine() {
        let shape = line(3, 1, 1);
        let a = Field::from_data("a", shape.clone(), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let b = Field::from_data("b", shape.clone(), vec![5.0, 4.0, 3.0, 2.0, 1.0]).unwrap();
        let mut out = Field::zeros("out", shape);
        out.combine(0.75, &a, 0.25, &b).unwrap();
        let expected = [2.0, 2.5, 3.0, 3.5, 4.0];
        for (v, e) in out.as_slice().iter().zip(expected) {
            assert_relative_eq!(*v, e);
        }
    }

    #[test]
    fn accumulate_components_places_source_slots() {
        let em_shape = line(2, 1, 8);
        let j_shape = line(2, 1, 3);
        let mut em = Field::zeros("em", em_shape);
        let mut j = Field::zeros("current", j_shape);
        j.fill(2.0);
        em.accumulate_components(-0.5, &j, 0).unwrap();
        for cell in em.as_slice().chunks(8) {
            assert_eq!(&cell[..3], &[-1.0, -1.0, -1.0]);
            assert!(cell[3..].iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn accumulate_components_checks_grid_and_overflow() {
        let mut em = Field::zeros("em", line(2, 1, 8));
        let wrong_grid = Field::zeros("j", line(3, 1, 3));
        assert!(matches!(
            em.accumulate_components(1.0, &wrong_grid, 0),
            Err(FieldError::ShapeMismatch { .. })
        ));
        let j = Field::zeros("j", line(2, 1, 3));
        assert!(matches!(
            em.accumulate_components(1.0, &j, 6),
            Err(FieldError::ComponentOverflow { .. })
        ));
    }

    #[test]
    fn periodic_sync_wraps_interior() {
        // padded layout: [g0 | 1 2 3 4 | g1]
        let mut f =
            Field::from_data("f", line(4, 1, 1), vec![0.0, 1.0, 2.0, 3.0, 4.0, 0.0]).unwrap();
        f.sync_periodic(0).unwrap();
        assert_eq!(f.as_slice(), &[4.0, 1.0, 2.0, 3.0, 4.0, 1.0]);
    }

    #[test]
    fn periodic_sync_on_inner_axis_keeps_components_together() {
        let shape = FieldShape::new(&[1, 3], &[0, 1], 2).unwrap();
        let mut f = ramp("f", shape);
        f.sync_periodic(1).unwrap();
        // interior cells are padded 1..=3 → elements [2,3] [4,5] [6,7]
        assert_eq!(f.as_slice(), &[6.0, 7.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 2.0, 3.0]);
    }

    #[test]
    fn copy_edge_repeats_boundary_cell() {
        let mut f =
            Field::from_data("f", line(3, 2, 1), vec![9.0, 9.0, 1.0, 2.0, 3.0, 9.0, 9.0]).unwrap();
        f.copy_edge(0, Side::Lower).unwrap();
        assert_eq!(f.as_slice(), &[1.0, 1.0, 1.0, 2.0, 3.0, 9.0, 9.0]);
        f.copy_edge(0, Side::Upper).unwrap();
        assert_eq!(f.as_slice(), &[1.0, 1.0, 1.0, 2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn boundary_ops_reject_bad_axis() {
        let mut f = Field::zeros("f", line(3, 1, 1));
        assert!(matches!(
            f.sync_periodic(1),
            Err(FieldError::AxisOutOfRange { axis: 1, ndim: 1 })
        ));
        assert!(f.copy_edge(2, Side::Upper).is_err());
    }

    #[test]
    fn bit_eq_sees_single_ulp_changes() {
        let a = ramp("a", line(4, 1, 2));
        let mut b = a.duplicate();
        assert!(a.bit_eq(&b));
        let v = b.as_mut_slice();
        v[3] = f64::from_bits(v[3].to_bits() + 1);
        assert!(!a.bit_eq(&b));
    }

    #[test]
    fn first_non_finite_reports_index() {
        let mut f = Field::zeros("f", line(4, 0, 1));
        assert_eq!(f.first_non_finite(), None);
        f.as_mut_slice()[2] = f64::NAN;
        assert_eq!(f.first_non_finite(), Some(2));
    }

    proptest! {
        #[test]
        fn combine_preserves_constant_field(
            value in -1.0e6f64..1.0e6,
            w1 in 0.0f64..=1.0,
        ) {
            let w2 = 1.0 - w1;
            let shape = FieldShape::new(&[5, 3], &[1, 1], 2).unwrap();
            let mut c = Field::zeros("c", shape.clone());
            c.fill(value);
            let mut out = Field::zeros("out", shape);
            out.combine(w1, &c, w2, &c).unwrap();
            for &v in out.as_slice() {
                prop_assert!((v - value).abs() <= 4.0 * f64::EPSILON * value.abs().max(1.0));
            }
        }

        #[test]
        fn periodic_sync_is_idempotent(n in 2u32..8, g in 1u32..2, nc in 1u32..4) {
            let shape = FieldShape::uniform(&[n, 3], g, nc).unwrap();
            let mut f = ramp("f", shape);
            f.sync_periodic(0).unwrap();
            f.sync_periodic(1).unwrap();
            let once = f.duplicate();
            f.sync_periodic(0).unwrap();
            f.sync_periodic(1).unwrap();
            prop_assert!(f.bit_eq(&once));
        }
    }
}
