//! Ghost-cell fill applied between RK stages.

use vlasov_core::{FieldError, FieldGroup, FieldId, Side};

/// How the ghost layers on one axis of one field are filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Ghosts take the interior values from the opposite end.
    Periodic,
    /// Ghosts repeat the nearest interior layer (zero-gradient).
    Copy,
}

/// One `(field, axis, kind)` rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundaryRule {
    /// Field the rule applies to.
    pub field: FieldId,
    /// Padded axis of that field.
    pub axis: usize,
    /// Fill method.
    pub kind: BoundaryKind,
}

/// Ordered list of ghost-fill rules.
///
/// Rules run in insertion order. Fields or axes with no rule keep
/// whatever their ghosts already hold.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoundaryPass {
    rules: Vec<BoundaryRule>,
}

impl BoundaryPass {
    /// A pass with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Periodic on every axis of every field in `group`.
    pub fn periodic_all(group: &FieldGroup) -> Self {
        let mut pass = Self::new();
        for (id, field) in group.iter() {
            for axis in 0..field.shape().ndim() {
                pass = pass.with(id, axis, BoundaryKind::Periodic);
            }
        }
        pass
    }

    /// Append a rule.
    pub fn with(mut self, field: FieldId, axis: usize, kind: BoundaryKind) -> Self {
        self.rules.push(BoundaryRule { field, axis, kind });
        self
    }

    /// The rules, in application order.
    pub fn rules(&self) -> &[BoundaryRule] {
        &self.rules
    }

    /// Check every rule against the members of `group`.
    pub fn validate(&self, group: &FieldGroup) -> Result<(), FieldError> {
        for rule in &self.rules {
            let ndim = group.field(rule.field)?.shape().ndim();
            if rule.axis >= ndim {
                return Err(FieldError::AxisOutOfRange {
                    axis: rule.axis,
                    ndim,
                });
            }
        }
        Ok(())
    }

    /// Fill ghosts in `group`.
    pub fn apply(&self, group: &mut FieldGroup) -> Result<(), FieldError> {
        for rule in &self.rules {
            let field = group.field_mut(rule.field)?;
            match rule.kind {
                BoundaryKind::Periodic => field.sync_periodic(rule.axis)?,
                BoundaryKind::Copy => {
                    field.copy_edge(rule.axis, Side::Lower)?;
                    field.copy_edge(rule.axis, Side::Upper)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlasov_core::{Field, FieldShape};

    fn group() -> FieldGroup {
        let a = Field::from_data(
            "a",
            FieldShape::uniform(&[3], 1, 1).unwrap(),
            vec![0.0, 1.0, 2.0, 3.0, 0.0],
        )
        .unwrap();
        let b = Field::from_data(
            "b",
            FieldShape::uniform(&[3], 1, 1).unwrap(),
            vec![0.0, 1.0, 2.0, 3.0, 0.0],
        )
        .unwrap();
        FieldGroup::new(vec![a, b]).unwrap()
    }

    #[test]
    fn periodic_and_copy_rules() {
        let mut g = group();
        let pass = BoundaryPass::new()
            .with(FieldId(0), 0, BoundaryKind::Periodic)
            .with(FieldId(1), 0, BoundaryKind::Copy);
        pass.validate(&g).unwrap();
        pass.apply(&mut g).unwrap();

        assert_eq!(g.field(FieldId(0)).unwrap().as_slice(), &[3.0, 1.0, 2.0, 3.0, 1.0]);
        assert_eq!(g.field(FieldId(1)).unwrap().as_slice(), &[1.0, 1.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn periodic_all_covers_every_axis() {
        let g = group();
        let pass = BoundaryPass::periodic_all(&g);
        assert_eq!(pass.rules().len(), 2);
        assert!(pass
            .rules()
            .iter()
            .all(|r| r.kind == BoundaryKind::Periodic));
    }

    #[test]
    fn unknown_field_or_axis_rejected() {
        let g = group();
        let bad_field = BoundaryPass::new().with(FieldId(7), 0, BoundaryKind::Copy);
        assert_eq!(
            bad_field.validate(&g),
            Err(FieldError::UnknownField(FieldId(7)))
        );
        let bad_axis = BoundaryPass::new().with(FieldId(0), 2, BoundaryKind::Copy);
        assert!(matches!(
            bad_axis.validate(&g),
            Err(FieldError::AxisOutOfRange { axis: 2, ndim: 1 })
        ));
    }

    #[test]
    fn empty_pass_leaves_ghosts_alone() {
        let mut g = group();
        let before = g.duplicate();
        BoundaryPass::new().apply(&mut g).unwrap();
        assert!(g.bit_eq(&before));
    }
}
