//! Operator signatures and binding validation.
//!
//! [`validate_binding`] runs once when an operator is wired to fields, so
//! a shape mismatch or a missing slot is reported at construction rather
//! than inside the time loop.

use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;
use vlasov_core::FieldShape;

use crate::operator::UpdateOperator;

// ── Requirements ───────────────────────────────────────────────────

/// What an operator accepts at one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeRequirement {
    /// Any field.
    Any,
    /// Any grid, with exactly this many components.
    Components(u32),
    /// Exactly this shape.
    Exact(FieldShape),
}

impl ShapeRequirement {
    /// Whether `shape` satisfies the requirement.
    pub fn admits(&self, shape: &FieldShape) -> bool {
        match self {
            Self::Any => true,
            Self::Components(n) => shape.components() == *n,
            Self::Exact(expected) => expected == shape,
        }
    }
}

impl fmt::Display for ShapeRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any shape"),
            Self::Components(n) => write!(f, "{n} components"),
            Self::Exact(shape) => write!(f, "{shape}"),
        }
    }
}

/// Input and output slot requirements of an operator, in slot order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    /// One requirement per input slot.
    pub inputs: SmallVec<[ShapeRequirement; 4]>,
    /// One requirement per output slot.
    pub outputs: SmallVec<[ShapeRequirement; 2]>,
}

impl Signature {
    /// A signature with explicit slot requirements.
    pub fn new(
        inputs: impl IntoIterator<Item = ShapeRequirement>,
        outputs: impl IntoIterator<Item = ShapeRequirement>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
        }
    }

    /// `inputs` input slots and `outputs` output slots of any shape.
    pub fn any(inputs: usize, outputs: usize) -> Self {
        Self::new(
            std::iter::repeat_n(ShapeRequirement::Any, inputs),
            std::iter::repeat_n(ShapeRequirement::Any, outputs),
        )
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Which side of an operator a binding error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    /// An input slot.
    Input,
    /// An output slot.
    Output,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// A field binding that does not match an operator's [`Signature`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BindingError {
    /// Wrong number of fields bound on one side.
    #[error("operator '{operator}' expects {expected} {kind} field(s), {found} bound")]
    Count {
        /// Operator name.
        operator: String,
        /// Input or output side.
        kind: SlotKind,
        /// Slots declared by the signature.
        expected: usize,
        /// Fields bound.
        found: usize,
    },
    /// A bound field has the wrong shape.
    #[error("operator '{operator}' {kind} slot {slot} expects {expected}, found {found}")]
    Shape {
        /// Operator name.
        operator: String,
        /// Input or output side.
        kind: SlotKind,
        /// Slot index.
        slot: usize,
        /// The slot's requirement, rendered.
        expected: String,
        /// Shape of the bound field.
        found: FieldShape,
    },
}

/// Check that `inputs` and `outputs` fit `op`'s signature.
///
/// Slots are matched positionally. The first mismatch is reported, inputs
/// before outputs.
pub fn validate_binding(
    op: &dyn UpdateOperator,
    inputs: &[&FieldShape],
    outputs: &[&FieldShape],
) -> Result<(), BindingError> {
    let sig = op.signature();
    check_side(op.name(), SlotKind::Input, &sig.inputs, inputs)?;
    check_side(op.name(), SlotKind::Output, &sig.outputs, outputs)?;
    Ok(())
}

fn check_side(
    operator: &str,
    kind: SlotKind,
    required: &[ShapeRequirement],
    bound: &[&FieldShape],
) -> Result<(), BindingError> {
    if required.len() != bound.len() {
        return Err(BindingError::Count {
            operator: operator.to_string(),
            kind,
            expected: required.len(),
            found: bound.len(),
        });
    }
    for (slot, (req, shape)) in required.iter().zip(bound).enumerate() {
        if !req.admits(shape) {
            return Err(BindingError::Shape {
                operator: operator.to_string(),
                kind,
                slot,
                expected: req.to_string(),
                found: (*shape).clone(),
            });
        }
    }
    Ok(())
}
