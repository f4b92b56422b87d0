//! Integration tests: plasma current coupling and end-to-end runs with the
//! reference operators.

use approx::assert_relative_eq;
use proptest::prelude::*;
use vlasov_core::{Field, FieldGroup, FieldId, FrameIndex};
use vlasov_engine::{
    BoundaryPass, Diagnostics, Model, Simulation, SimulationConfig, Species,
};
use vlasov_operator::{AdvanceContext, UpdateOperator};
use vlasov_operators::{
    component, Axis, EmPerturbation, FieldEnergy, MaxwellRusanov, MomentKind, PhaseGrid,
    VelocityMoment, VlasovUpwind,
};
use vlasov_test_utils::{MemorySink, ToyModelBuilder, EM_COMPONENTS};

// ---------------------------------------------------------------
// Current coupling with mock operators
// ---------------------------------------------------------------

proptest! {
    #[test]
    fn opposite_charges_inject_no_current(
        charge in 1.0e-3f64..1.0e3,
        scale in 1.0e-6f64..1.0e6,
    ) {
        let mut model = ToyModelBuilder::new(8)
            .species("elc", -charge)
            .species("ion", charge)
            .build();
        for id in [FieldId(0), FieldId(1)] {
            model.state.field_mut(id).unwrap().scale(scale);
        }
        let em = FieldId(2);
        let cfg = SimulationConfig {
            t_end: 0.5,
            initial_dt: 0.05,
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::new(cfg, model).unwrap();
        for _ in 0..5 {
            sim.attempt_step().unwrap();
        }
        prop_assert!(sim.current().as_slice().iter().all(|&j| j == 0.0));
        prop_assert!(sim
            .state()
            .field(em)
            .unwrap()
            .as_slice()
            .iter()
            .all(|&e| e == 0.0));
        // the moments themselves were not zero
        let elc = sim.state().field(FieldId(0)).unwrap();
        prop_assert!(elc.as_slice().iter().any(|&f| f != 0.0));
    }
}

#[test]
fn single_species_current_drives_electric_field() {
    let model = ToyModelBuilder::new(4).species("elc", 2.0).build();
    let cfg = SimulationConfig {
        initial_dt: 0.1,
        epsilon0: 0.5,
        ..SimulationConfig::default()
    };
    let mut sim = Simulation::new(cfg, model).unwrap();
    let dist = sim.state().field(FieldId(0)).unwrap().duplicate();
    assert!(sim.attempt_step().unwrap().accepted);

    // constant source: after one RK3 step E = -dt * q * M1 / eps0
    let em = sim.state().field(FieldId(1)).unwrap();
    for cell in 1..=4 {
        let m = dist.cell(&[cell])[0];
        let e = em.cell(&[cell]);
        for k in 0..3 {
            assert_relative_eq!(e[k], -0.1 * 2.0 * m / 0.5, max_relative = 1e-12);
        }
        assert!(e[3..EM_COMPONENTS as usize].iter().all(|&v| v == 0.0));
    }
}

// ---------------------------------------------------------------
// Reference operators end to end
// ---------------------------------------------------------------

fn grid() -> PhaseGrid {
    let x = Axis::new(0.0, 2.0 * std::f64::consts::PI, 8).unwrap();
    let v = Axis::new(-3.0, 3.0, 4).unwrap();
    PhaseGrid::new(x, [v, v, v]).unwrap()
}

fn species(g: &PhaseGrid, name: &str, field: u32, charge: f64, mass: f64) -> Species {
    Species {
        name: name.to_string(),
        field: FieldId(field),
        charge,
        kinetic: Box::new(
            VlasovUpwind::builder()
                .species(name)
                .grid(g)
                .charge(charge)
                .mass(mass)
                .build()
                .unwrap(),
        ),
        momentum: Box::new(VelocityMoment::new(g, MomentKind::Momentum).unwrap()),
    }
}

fn reference_model(g: &PhaseGrid, em: Field, diagnostics: Diagnostics) -> Model {
    let state = FieldGroup::new(vec![
        Field::zeros("elc", g.distribution_shape().clone()),
        Field::zeros("ion", g.distribution_shape().clone()),
        em,
    ])
    .unwrap();
    Model {
        boundary: BoundaryPass::periodic_all(&state),
        state,
        em: FieldId(2),
        maxwell: Box::new(MaxwellRusanov::builder().grid(g).build().unwrap()),
        species: vec![
            species(g, "elc", 0, -1.0, 1.0),
            species(g, "ion", 1, 1.0, 1836.0),
        ],
        diagnostics,
    }
}

#[test]
fn null_perturbation_stays_exactly_zero() {
    let g = grid();
    let model = reference_model(
        &g,
        Field::zeros("em", g.em_shape().clone()),
        Diagnostics::disabled(),
    );
    let cfg = SimulationConfig {
        t_end: 1.0,
        n_frames: 2,
        initial_dt: 0.05,
        ..SimulationConfig::default()
    };
    let mut sim = Simulation::new(cfg, model).unwrap();
    sim.run().unwrap();
    for (_, field) in sim.state().iter() {
        assert!(
            field.as_slice().iter().all(|&v| v == 0.0),
            "{} drifted from zero",
            field.name()
        );
    }
}

#[test]
fn uniform_field_energy_series_is_constant() {
    let g = grid();
    let mut em = Field::zeros("em", g.em_shape().clone());
    let init = EmPerturbation::builder()
        .grid(&g)
        .background(component::EY, 2.0)
        .build()
        .unwrap();
    {
        let mut outputs = [&mut em];
        let mut ctx = AdvanceContext::new(init.name(), 0.0, 0.0, &[], &mut outputs);
        init.advance(&mut ctx).unwrap();
    }

    let energy = FieldEnergy::new(&g, 1.0, 1.0).unwrap();
    let energy_shape = energy.output_shape().clone();
    let density = VelocityMoment::new(&g, MomentKind::Density).unwrap();
    let density_shape = density.output_shape().clone();
    let sink = MemorySink::new();
    let diagnostics = Diagnostics::new(Box::new(sink.clone()))
        .with_field("elc_M0", FieldId(0), Box::new(density), density_shape)
        .with_series("field_energy", FieldId(2), Box::new(energy), energy_shape);

    let cfg = SimulationConfig {
        t_end: 0.5,
        n_frames: 4,
        initial_dt: 0.05,
        max_dt: Some(0.05),
        ..SimulationConfig::default()
    };
    let mut sim = Simulation::new(cfg, reference_model(&g, em, diagnostics)).unwrap();
    let summary = sim.run().unwrap();
    assert_eq!(summary.frames_written, 5);

    let series = sink.series_of("field_energy");
    assert_eq!(series.len(), 5);
    let expected = 0.5 * 4.0 * g.x().length();
    for sample in &series {
        assert_relative_eq!(sample.values[0], expected, max_relative = 1e-12);
        assert_eq!(sample.values[1], 0.0);
    }
    assert_eq!(series[0].time, 0.0);
    assert_eq!(series[4].time, 0.5);
    assert!(sink.field("elc_M0", FrameIndex(4)).is_some());
    assert!(sink.field("ion", FrameIndex(0)).is_some());
}
