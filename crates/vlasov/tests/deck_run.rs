//! Integration tests: decks run end to end through the file sink.

use approx::assert_relative_eq;
use tempfile::tempdir;
use vlasov::deck::FIELD_ENERGY_SERIES;
use vlasov::io::{field_path, read_field_file, read_series, series_path};
use vlasov::prelude::*;
use vlasov_test_utils::MemorySink;

const SMALL: &str = r#"
[run]
t_end = 0.5
frames = 2

[grid.x]
lower = 0.0
upper = 6.283185307179586
cells = 8

[grid.vx]
lower = -4.0
upper = 4.0
cells = 4

[grid.vy]
lower = -4.0
upper = 4.0
cells = 4

[grid.vz]
lower = -4.0
upper = 4.0
cells = 4
"#;

#[test]
fn small_deck_writes_every_frame() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("small");
    let mut deck = DeckConfig::from_toml_str(SMALL).unwrap();
    deck.output.dir = dir.clone();

    let mut sim = deck.build().unwrap();
    let summary = sim.run().unwrap();
    assert_eq!(summary.final_time, 0.5);
    assert_eq!(summary.frames_written, 3);

    for k in 0..3 {
        let frame = FrameIndex(k);
        for quantity in ["elc", "ion", "em", "elc_M0", "ion_M1i"] {
            assert!(
                field_path(&dir, quantity, frame).exists(),
                "{quantity} missing at frame {k}"
            );
        }
    }
    let last = read_field_file(field_path(&dir, "em", FrameIndex(2))).unwrap();
    assert_eq!(last.time, 0.5);

    let energy = read_series(series_path(&dir, FIELD_ENERGY_SERIES)).unwrap();
    assert_eq!(energy.width, 2);
    let times = energy.times();
    assert_eq!(times.len(), 3);
    assert_eq!((times[0], times[2]), (0.0, 0.5));
    assert!(times[1] >= 0.25 - 1e-9 && times[1] < 0.5);
    assert!(energy.column(0).iter().all(|e| e.is_finite() && *e >= 0.0));

}

#[test]
fn quiet_deck_conserves_zero_field_energy() {
    let mut deck = DeckConfig::from_toml_str(SMALL).unwrap();
    deck.field.noise.clear();
    for sp in &mut deck.species {
        sp.perturbation = 0.0;
    }

    let sink = MemorySink::new();
    let model = deck.build_model(Box::new(sink.clone())).unwrap();
    let mut sim = Simulation::new(deck.simulation_config(), model).unwrap();
    sim.run().unwrap();

    let energy = sink.series_of(FIELD_ENERGY_SERIES);
    assert_eq!(energy.len(), 3);
    for sample in &energy {
        assert_relative_eq!(sample.values[0], 0.0, epsilon = 1e-24);
    }
}

#[test]
fn missing_deck_file_is_reported() {
    let tmp = tempdir().unwrap();
    let err = DeckConfig::load(tmp.path().join("deck.toml")).unwrap_err();
    assert!(matches!(err, DeckError::Read { .. }));
    assert!(err.to_string().contains("deck.toml"));
}
