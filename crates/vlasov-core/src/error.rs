//! Error types shared across the workspace.
//!
//! [`FieldError`] covers contract violations on field storage (shape
//! mismatches, bad axes, unknown members). [`OperatorError`] is what an
//! update operator returns when it cannot run at all. A stability
//! rejection is *not* an error: it travels as a `StepOutcome` with
//! `accepted == false`.

use thiserror::Error;

use crate::field::FieldShape;
use crate::id::FieldId;

/// Contract violations on [`Field`](crate::Field) and
/// [`FieldGroup`](crate::FieldGroup) operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Two fields that must share a shape do not.
    #[error("shape mismatch on '{field}': expected {expected}, found {found}")]
    ShapeMismatch {
        /// Name of the field being written.
        field: String,
        /// Shape of the destination.
        expected: FieldShape,
        /// Shape of the offending source.
        found: FieldShape,
    },
    /// A component-offset accumulation would run past the destination's components.
    #[error(
        "cannot place {source_components} components at offset {offset} \
         in '{field}' with {components} components"
    )]
    ComponentOverflow {
        /// Name of the destination field.
        field: String,
        /// Component offset requested.
        offset: u32,
        /// Components in the source.
        source_components: u32,
        /// Components in the destination.
        components: u32,
    },
    /// An axis index beyond the field's dimensionality.
    #[error("axis {axis} out of range for a {ndim}-dimensional field")]
    AxisOutOfRange {
        /// Requested axis.
        axis: usize,
        /// Dimensionality of the field.
        ndim: usize,
    },
    /// A field id that is not a member of the group.
    #[error("field {0} is not a member of this group")]
    UnknownField(FieldId),
    /// The same field was requested twice where distinct members are needed.
    #[error("field {0} requested more than once")]
    DuplicateField(FieldId),
    /// Two group members share a name.
    #[error("duplicate field name '{0}'")]
    DuplicateName(String),
    /// Two groups do not have the same members.
    #[error("field groups differ: {reason}")]
    GroupMismatch {
        /// Which member or count differed.
        reason: String,
    },
    /// A shape or buffer could not be constructed.
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Description of the problem.
        reason: String,
    },
}

/// Errors from running an update operator.
///
/// Any of these is fatal to the run. Operators report an unstable `dt`
/// through their outcome, never through this type.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum OperatorError {
    /// An input slot the operator requires was not bound.
    #[error("operator '{operator}' has no input bound at slot {slot}")]
    MissingInput {
        /// Operator name.
        operator: String,
        /// Input slot index.
        slot: usize,
    },
    /// An output slot the operator requires was not bound.
    #[error("operator '{operator}' has no output bound at slot {slot}")]
    MissingOutput {
        /// Operator name.
        operator: String,
        /// Output slot index.
        slot: usize,
    },
    /// The operator produced a non-finite value.
    #[error("non-finite value in '{field}' at element {index}")]
    NonFinite {
        /// Field containing the value.
        field: String,
        /// Flat buffer index of the first bad element.
        index: usize,
    },
    /// Any other failure inside the kernel.
    #[error("execution failed: {reason}")]
    ExecutionFailed {
        /// Human-readable description.
        reason: String,
    },
    /// A field operation inside the operator violated its contract.
    #[error(transparent)]
    Field(#[from] FieldError),
}
