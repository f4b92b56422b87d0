//! Frame output: state fields, derived moments and scalar time series.
//!
//! [`Diagnostics`] runs its operators on the committed state whenever the
//! frame schedule fires and hands the results to a [`FrameSink`]. The
//! sink decides how frames are persisted; the engine never touches files.

use std::time::Instant;

use thiserror::Error;
use vlasov_core::{Field, FieldGroup, FieldId, FieldShape, FrameIndex, OperatorError};
use vlasov_operator::{validate_binding, AdvanceContext, UpdateOperator};

use crate::config::ConfigError;
use crate::metrics::OperatorTimings;

/// Errors raised while producing or persisting a frame.
#[derive(Debug, Error)]
pub enum DiagnosticsError {
    /// The sink could not store a quantity.
    #[error("failed to persist '{quantity}': {source}")]
    Sink {
        /// Quantity being written.
        quantity: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A diagnostic operator failed.
    #[error(transparent)]
    Operator(#[from] OperatorError),
}

/// Destination for frames and time series.
pub trait FrameSink: Send {
    /// Store one field of one frame.
    fn write_field(
        &mut self,
        quantity: &str,
        frame: FrameIndex,
        time: f64,
        field: &Field,
    ) -> Result<(), DiagnosticsError>;

    /// Append one sample to a scalar time series.
    fn append_series(
        &mut self,
        quantity: &str,
        frame: FrameIndex,
        time: f64,
        values: &[f64],
    ) -> Result<(), DiagnosticsError>;

    /// Flush buffered output. Called after every frame.
    fn flush(&mut self) -> Result<(), DiagnosticsError> {
        Ok(())
    }
}

/// A sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn write_field(&mut self, _: &str, _: FrameIndex, _: f64, _: &Field) -> Result<(), DiagnosticsError> {
        Ok(())
    }

    fn append_series(&mut self, _: &str, _: FrameIndex, _: f64, _: &[f64]) -> Result<(), DiagnosticsError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Output {
    Field,
    Series,
}

struct Derived {
    source: FieldId,
    operator: Box<dyn UpdateOperator>,
    output: Field,
    kind: Output,
}

/// The per-frame diagnostic pipeline.
pub struct Diagnostics {
    sink: Box<dyn FrameSink>,
    persist_state: bool,
    derived: Vec<Derived>,
}

impl Diagnostics {
    /// Diagnostics writing to `sink`. State fields are persisted by default.
    pub fn new(sink: Box<dyn FrameSink>) -> Self {
        Self {
            sink,
            persist_state: true,
            derived: Vec::new(),
        }
    }

    /// Diagnostics that compute nothing and write nowhere.
    pub fn disabled() -> Self {
        Self::new(Box::new(NullSink)).persist_state(false)
    }

    /// Whether every state member is written under its own name.
    pub fn persist_state(mut self, enabled: bool) -> Self {
        self.persist_state = enabled;
        self
    }

    /// Add a derived field: `operator` reads `source` and writes a field
    /// of `shape` persisted as `quantity`.
    pub fn with_field(
        self,
        quantity: impl Into<String>,
        source: FieldId,
        operator: Box<dyn UpdateOperator>,
        shape: FieldShape,
    ) -> Self {
        self.with(quantity.into(), source, operator, shape, Output::Field)
    }

    /// Add a scalar series: `operator` reads `source` and every element of
    /// its output is appended to the series `quantity`.
    pub fn with_series(
        self,
        quantity: impl Into<String>,
        source: FieldId,
        operator: Box<dyn UpdateOperator>,
        shape: FieldShape,
    ) -> Self {
        self.with(quantity.into(), source, operator, shape, Output::Series)
    }

    fn with(
        mut self,
        quantity: String,
        source: FieldId,
        operator: Box<dyn UpdateOperator>,
        shape: FieldShape,
        kind: Output,
    ) -> Self {
        self.derived.push(Derived {
            source,
            operator,
            output: Field::zeros(quantity, shape),
            kind,
        });
        self
    }

    /// Names of the derived quantities, in computation order.
    pub fn quantities(&self) -> impl Iterator<Item = &str> {
        self.derived.iter().map(|d| d.output.name())
    }

    /// Check every derived operator against the fields it will read.
    pub fn bind(&self, state: &FieldGroup) -> Result<(), ConfigError> {
        for d in &self.derived {
            let input = state.field(d.source)?.shape();
            validate_binding(d.operator.as_ref(), &[input], &[d.output.shape()])?;
        }
        Ok(())
    }

    /// Compute and persist one frame of `state` at `time`.
    pub fn write_frame(
        &mut self,
        frame: FrameIndex,
        time: f64,
        state: &FieldGroup,
        timings: &mut OperatorTimings,
    ) -> Result<(), DiagnosticsError> {
        if self.persist_state {
            for (_, field) in state.iter() {
                self.sink.write_field(field.name(), frame, time, field)?;
            }
        }
        for d in &mut self.derived {
            let inputs = [state.field(d.source).map_err(OperatorError::from)?];
            let start = Instant::now();
            let mut outputs = [&mut d.output];
            let mut ctx = AdvanceContext::new(d.operator.name(), time, time, &inputs, &mut outputs);
            let result = d.operator.advance(&mut ctx);
            timings.record(d.operator.name(), start.elapsed());
            result?;

            match d.kind {
                Output::Field => self.sink.write_field(d.output.name(), frame, time, &d.output)?,
                Output::Series => {
                    self.sink
                        .append_series(d.output.name(), frame, time, d.output.as_slice())?
                }
            }
        }
        self.sink.flush()
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("persist_state", &self.persist_state)
            .field("quantities", &self.quantities().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
