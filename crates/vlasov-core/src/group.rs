//! [`FieldGroup`]: the set of fields advanced and rolled back together.

use indexmap::IndexMap;

use crate::error::FieldError;
use crate::field::Field;
use crate::id::FieldId;

/// An ordered, fixed-size set of fields sharing one simulation time.
///
/// Members are registered once at construction and addressed by
/// [`FieldId`], which is the registration index. Duplicates of a group
/// (stage scratch, snapshots) keep the same ids and names, so a whole-group
/// operation such as [`combine`](FieldGroup::combine) pairs members by id.
#[derive(Clone, Debug)]
pub struct FieldGroup {
    fields: IndexMap<String, Field>,
}

impl FieldGroup {
    /// Build a group from its members, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::GroupMismatch`] for an empty list and
    /// [`FieldError::DuplicateName`] when two members share a name.
    pub fn new(fields: Vec<Field>) -> Result<Self, FieldError> {
        if fields.is_empty() {
            return Err(FieldError::GroupMismatch {
                reason: "a field group needs at least one member".into(),
            });
        }
        let mut map = IndexMap::with_capacity(fields.len());
        for field in fields {
            let name = field.name().to_string();
            if map.contains_key(&name) {
                return Err(FieldError::DuplicateName(name));
            }
            map.insert(name, field);
        }
        Ok(Self { fields: map })
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always `false`; construction rejects empty groups.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Ids of all members, in order.
    pub fn ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        (0..self.fields.len() as u32).map(FieldId)
    }

    /// Id of the member called `name`.
    pub fn id_of(&self, name: &str) -> Option<FieldId> {
        self.fields.get_index_of(name).map(|i| FieldId(i as u32))
    }

    /// Borrow a member.
    pub fn field(&self, id: FieldId) -> Result<&Field, FieldError> {
        self.fields
            .get_index(id.index())
            .map(|(_, f)| f)
            .ok_or(FieldError::UnknownField(id))
    }

    /// Mutably borrow a member.
    pub fn field_mut(&mut self, id: FieldId) -> Result<&mut Field, FieldError> {
        self.fields
            .get_index_mut(id.index())
            .map(|(_, f)| f)
            .ok_or(FieldError::UnknownField(id))
    }

    /// Iterate over `(id, field)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &Field)> {
        self.fields
            .values()
            .enumerate()
            .map(|(i, f)| (FieldId(i as u32), f))
    }

    /// Mutably iterate over `(id, field)` pairs in order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (FieldId, &mut Field)> {
        self.fields
            .values_mut()
            .enumerate()
            .map(|(i, f)| (FieldId(i as u32), f))
    }

    /// An independent copy of every member.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Overwrite every member from the matching member of `other`.
    ///
    /// Nothing is written unless the groups are compatible.
    pub fn copy_from(&mut self, other: &FieldGroup) -> Result<(), FieldError> {
        self.check_compatible(other)?;
        for (dst, src) in self.fields.values_mut().zip(other.fields.values()) {
            dst.copy_from(src)?;
        }
        Ok(())
    }

    /// `self = w1 * g1 + w2 * g2`, member by member.
    pub fn combine(
        &mut self,
        w1: f64,
        g1: &FieldGroup,
        w2: f64,
        g2: &FieldGroup,
    ) -> Result<(), FieldError> {
        self.check_compatible(g1)?;
        self.check_compatible(g2)?;
        for ((dst, a), b) in self
            .fields
            .values_mut()
            .zip(g1.fields.values())
            .zip(g2.fields.values())
        {
            dst.combine(w1, a, w2, b)?;
        }
        Ok(())
    }

    /// Bit-for-bit equality of every member.
    pub fn bit_eq(&self, other: &FieldGroup) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|((na, a), (nb, b))| na == nb && a.bit_eq(b))
    }

    /// Check that `other` has the same members, in the same order, with
    /// the same shapes.
    pub fn check_compatible(&self, other: &FieldGroup) -> Result<(), FieldError> {
        if self.fields.len() != other.fields.len() {
            return Err(FieldError::GroupMismatch {
                reason: format!(
                    "{} members vs {} members",
                    self.fields.len(),
                    other.fields.len()
                ),
            });
        }
        for ((na, a), (nb, b)) in self.fields.iter().zip(&other.fields) {
            if na != nb {
                return Err(FieldError::GroupMismatch {
                    reason: format!("member '{na}' vs '{nb}'"),
                });
            }
            if a.shape() != b.shape() {
                return Err(FieldError::ShapeMismatch {
                    field: na.clone(),
                    expected: a.shape().clone(),
                    found: b.shape().clone(),
                });
            }
        }
        Ok(())
    }
}
