//! Test utilities and mock types for Vlasov driver development.
//!
//! Provides mock [`UpdateOperator`](vlasov_operator::UpdateOperator)
//! implementations (see [`fixtures`]), an in-memory frame sink
//! ([`MemorySink`]) and a [`ToyModelBuilder`] that wires mocks into an
//! engine [`Model`] on a small 1D grid.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod sink;

pub use fixtures::{
    BroadcastMoment, CallLog, ConstOperator, CopyOperator, FailingOperator, ScriptedOperator,
    StableLimitOperator,
};
pub use sink::{FieldRecord, MemorySink, SeriesRecord};

use vlasov_core::{Field, FieldGroup, FieldId, FieldShape};
use vlasov_engine::{BoundaryPass, Diagnostics, Model, Species};
use vlasov_operator::UpdateOperator;

/// Components of the toy EM field.
pub const EM_COMPONENTS: u32 = 8;

/// `[cells]`, ghost 1, one component.
pub fn distribution_shape(cells: u32) -> FieldShape {
    FieldShape::uniform(&[cells.max(1)], 1, 1).expect("valid toy layout")
}

/// `[cells]`, ghost 1, [`EM_COMPONENTS`] components.
pub fn em_shape(cells: u32) -> FieldShape {
    FieldShape::uniform(&[cells.max(1)], 1, EM_COMPONENTS).expect("valid toy layout")
}

struct ToySpecies {
    name: String,
    charge: f64,
    kinetic: Box<dyn UpdateOperator>,
    momentum: Box<dyn UpdateOperator>,
}

/// Builds a [`Model`] on a 1D grid from mock operators.
///
/// The state holds one distribution per species, in the order added,
/// followed by `"em"`. Distributions start as the ramp
/// `0.25, 0.5, 0.75, ...` over interior cells; the EM field starts at
/// zero. Unset operators default to [`CopyOperator`] and
/// [`BroadcastMoment`].
pub struct ToyModelBuilder {
    cells: u32,
    species: Vec<ToySpecies>,
    maxwell: Option<Box<dyn UpdateOperator>>,
    diagnostics: Option<Diagnostics>,
}

impl ToyModelBuilder {
    pub fn new(cells: u32) -> Self {
        Self {
            cells,
            species: Vec::new(),
            maxwell: None,
            diagnostics: None,
        }
    }

    /// Add a species with a copying kinetic operator.
    pub fn species(self, name: &str, charge: f64) -> Self {
        self.species_with(name, charge, Box::new(CopyOperator::new(format!("kinetic[{name}]"), 2)))
    }

    /// Add a species with the given kinetic operator.
    pub fn species_with(
        mut self,
        name: &str,
        charge: f64,
        kinetic: Box<dyn UpdateOperator>,
    ) -> Self {
        self.species.push(ToySpecies {
            name: name.to_string(),
            charge,
            kinetic,
            momentum: Box::new(BroadcastMoment),
        });
        self
    }

    pub fn maxwell(mut self, op: Box<dyn UpdateOperator>) -> Self {
        self.maxwell = Some(op);
        self
    }

    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Id the EM field will get.
    pub fn em_id(&self) -> FieldId {
        FieldId(self.species.len() as u32)
    }

    pub fn build(self) -> Model {
        let mut fields = Vec::with_capacity(self.species.len() + 1);
        for sp in &self.species {
            let mut f = Field::zeros(sp.name.clone(), distribution_shape(self.cells));
            let data = f.as_mut_slice();
            for (i, v) in data.iter_mut().enumerate().skip(1).take(self.cells as usize) {
                *v = 0.25 * i as f64;
            }
            fields.push(f);
        }
        fields.push(Field::zeros("em", em_shape(self.cells)));
        let state = FieldGroup::new(fields).expect("valid toy layout");

        let em = FieldId(self.species.len() as u32);
        let species = self
            .species
            .into_iter()
            .enumerate()
            .map(|(i, sp)| Species {
                name: sp.name,
                field: FieldId(i as u32),
                charge: sp.charge,
                kinetic: sp.kinetic,
                momentum: sp.momentum,
            })
            .collect();

        Model {
            boundary: BoundaryPass::periodic_all(&state),
            state,
            em,
            maxwell: self
                .maxwell
                .unwrap_or_else(|| Box::new(CopyOperator::new("maxwell", 1))),
            species,
            diagnostics: self.diagnostics.unwrap_or_else(Diagnostics::disabled),
        }
    }
}
