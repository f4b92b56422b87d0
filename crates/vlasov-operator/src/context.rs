//! Execution context passed to operators on each call.
//!
//! [`AdvanceContext`] binds the time interval plus the input and output
//! fields of one [`UpdateOperator::advance`](crate::UpdateOperator::advance)
//! call. Inputs are shared borrows and outputs exclusive ones, so an
//! operator cannot write what it reads.

use vlasov_core::{Field, OperatorError};

/// Time interval and field bindings for one operator call.
///
/// `'f` is the lifetime of the bound fields, `'a` the lifetime of the
/// slot arrays holding them. [`input`](Self::input) returns `&'f Field`,
/// not tied to the borrow of the context, so an operator can hold an
/// input while writing an output.
pub struct AdvanceContext<'a, 'f> {
    operator: &'a str,
    current_time: f64,
    target_time: f64,
    inputs: &'a [&'f Field],
    outputs: &'a mut [&'f mut Field],
}

impl<'a, 'f> AdvanceContext<'a, 'f> {
    /// Construct a context.
    ///
    /// Typically called by the engine. `operator` names the callee in
    /// binding errors.
    pub fn new(
        operator: &'a str,
        current_time: f64,
        target_time: f64,
        inputs: &'a [&'f Field],
        outputs: &'a mut [&'f mut Field],
    ) -> Self {
        Self {
            operator,
            current_time,
            target_time,
            inputs,
            outputs,
        }
    }

    /// Start of the interval.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// End of the interval.
    pub fn target_time(&self) -> f64 {
        self.target_time
    }

    /// Attempted step, `target_time - current_time`.
    pub fn dt(&self) -> f64 {
        self.target_time - self.current_time
    }

    /// Number of bound inputs.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of bound outputs.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// The input bound at `slot`.
    pub fn input(&self, slot: usize) -> Result<&'f Field, OperatorError> {
        self.inputs
            .get(slot)
            .copied()
            .ok_or_else(|| OperatorError::MissingInput {
                operator: self.operator.to_string(),
                slot,
            })
    }

    /// The output bound at `slot`.
    pub fn output(&mut self, slot: usize) -> Result<&mut Field, OperatorError> {
        let operator = self.operator;
        self.outputs
            .get_mut(slot)
            .map(|f| &mut **f)
            .ok_or_else(|| OperatorError::MissingOutput {
                operator: operator.to_string(),
                slot,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlasov_core::FieldShape;

    fn field(name: &str, value: f64) -> Field {
        let mut f = Field::zeros(name, FieldShape::uniform(&[3], 1, 1).unwrap());
        f.fill(value);
        f
    }

    #[test]
    fn exposes_interval() {
        let inputs: [&Field; 0] = [];
        let mut outputs: [&mut Field; 0] = [];
        let ctx = AdvanceContext::new("op", 1.0, 1.25, &inputs, &mut outputs);
        assert_eq!(ctx.current_time(), 1.0);
        assert_eq!(ctx.target_time(), 1.25);
        assert_eq!(ctx.dt(), 0.25);
    }

    #[test]
    fn input_outlives_output_borrow() {
        let a = field("a", 3.0);
        let mut b = field("b", 0.0);
        let inputs = [&a];
        let mut outputs = [&mut b];
        let mut ctx = AdvanceContext::new("op", 0.0, 0.1, &inputs, &mut outputs);
        let src = ctx.input(0).unwrap();
        ctx.output(0).unwrap().copy_from(src).unwrap();
        assert_eq!(ctx.input_count(), 1);
        assert_eq!(ctx.output_count(), 1);
        drop(ctx);
        assert!(b.as_slice().iter().all(|&v| v == 3.0));
    }

    #[test]
    fn missing_slots_name_the_operator() {
        let a = field("a", 0.0);
        let inputs = [&a];
        let mut outputs: [&mut Field; 0] = [];
        let mut ctx = AdvanceContext::new("kinetic", 0.0, 0.1, &inputs, &mut outputs);
        assert_eq!(
            ctx.input(1).unwrap_err(),
            OperatorError::MissingInput {
                operator: "kinetic".into(),
                slot: 1
            }
        );
        assert_eq!(
            ctx.output(0).unwrap_err(),
            OperatorError::MissingOutput {
                operator: "kinetic".into(),
                slot: 0
            }
        );
    }
}
