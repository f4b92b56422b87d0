//! Whole-group snapshot used to roll back a rejected attempt.

use vlasov_core::{FieldError, FieldGroup};

/// A copy of the state captured before each step attempt.
///
/// The buffer is allocated once and overwritten on every capture, so an
/// accepted attempt simply leaves it to be recycled by the next one.
#[derive(Clone, Debug)]
pub struct Snapshot {
    saved: FieldGroup,
    captures: u64,
    restores: u64,
}

impl Snapshot {
    /// A snapshot buffer shaped like `layout`, holding a copy of it.
    pub fn new(layout: &FieldGroup) -> Self {
        Self {
            saved: layout.duplicate(),
            captures: 0,
            restores: 0,
        }
    }

    /// Overwrite the buffer with `state`.
    pub fn capture(&mut self, state: &FieldGroup) -> Result<(), FieldError> {
        self.saved.copy_from(state)?;
        self.captures += 1;
        Ok(())
    }

    /// Overwrite `state` with the last capture.
    pub fn restore(&mut self, state: &mut FieldGroup) -> Result<(), FieldError> {
        state.copy_from(&self.saved)?;
        self.restores += 1;
        Ok(())
    }

    /// The captured group.
    pub fn saved(&self) -> &FieldGroup {
        &self.saved
    }

    /// Number of captures taken.
    pub fn captures(&self) -> u64 {
        self.captures
    }

    /// Number of rollbacks performed.
    pub fn restores(&self) -> u64 {
        self.restores
    }
}
