//! Integration tests: a toy run persisted through `FileSink` and read back.

use tempfile::tempdir;
use vlasov_core::{Field, FieldId, FieldShape, FrameIndex};
use vlasov_engine::{Diagnostics, Simulation, SimulationConfig};
use vlasov_io::{
    field_path, read_field_file, read_series, series_path, write_field_file, FileSink, IoError,
};
use vlasov_test_utils::{distribution_shape, BroadcastMoment, ToyModelBuilder};

#[test]
fn toy_run_round_trips_through_directory() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("out");
    let sink = FileSink::new(&dir).unwrap();
    let moment = distribution_shape(4).with_components(3).unwrap();
    let diagnostics = Diagnostics::new(Box::new(sink))
        .with_field("elc_M1", FieldId(0), Box::new(BroadcastMoment), moment.clone())
        .with_series("elc_M1_series", FieldId(0), Box::new(BroadcastMoment), moment.clone());
    let model = ToyModelBuilder::new(4)
        .species("elc", -1.0)
        .diagnostics(diagnostics)
        .build();
    let cfg = SimulationConfig {
        t_end: 0.5,
        n_frames: 5,
        initial_dt: 0.1,
        ..SimulationConfig::default()
    };
    let mut sim = Simulation::new(cfg, model).unwrap();
    let summary = sim.run().unwrap();
    assert_eq!(summary.frames_written, 6);

    for k in 0..6 {
        let frame = FrameIndex(k);
        let em = read_field_file(field_path(&dir, "em", frame)).unwrap();
        assert_eq!(em.frame, frame);
        assert_eq!(em.field.name(), "em");
        assert!(field_path(&dir, "elc", frame).exists());
        assert!(field_path(&dir, "elc_M1", frame).exists());
    }

    let last = read_field_file(field_path(&dir, "elc", FrameIndex(5))).unwrap();
    assert_eq!(last.time, 0.5);
    assert!(last.field.bit_eq(sim.state().field(FieldId(0)).unwrap()));

    let series = read_series(series_path(&dir, "elc_M1_series")).unwrap();
    assert_eq!(series.width as usize, moment.len());
    assert_eq!(series.samples.len(), 6);
    let frames: Vec<_> = series.samples.iter().map(|s| s.frame.0).collect();
    assert_eq!(frames, [0, 1, 2, 3, 4, 5]);
    // copy operators leave the distribution at its initial ramp
    assert_eq!(series.samples[3].values[3], 0.25);

}

#[test]
fn series_width_is_fixed_by_first_sample() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("out");
    let mut sink = FileSink::new(&dir).unwrap();
    sink.store_sample("energy", FrameIndex(0), 0.0, &[1.0, 2.0]).unwrap();
    let err = sink
        .store_sample("energy", FrameIndex(1), 0.1, &[1.0])
        .unwrap_err();
    assert!(matches!(
        err,
        IoError::WidthMismatch { expected: 2, found: 1, .. }
    ));
    sink.flush_all().unwrap();

    let series = read_series(series_path(&dir, "energy")).unwrap();
    assert_eq!(series.samples.len(), 1);
}

#[test]
fn a_new_sink_truncates_old_series() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("out");
    for run in 0..2 {
        let mut sink = FileSink::new(&dir).unwrap();
        sink.store_sample("energy", FrameIndex(0), 0.0, &[f64::from(run)])
            .unwrap();
        sink.flush_all().unwrap();
    }
    let series = read_series(series_path(&dir, "energy")).unwrap();
    assert_eq!(series.samples.len(), 1);
    assert_eq!(series.samples[0].values, vec![1.0]);
}

#[test]
fn reading_a_series_as_a_field_fails() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("out");
    let mut sink = FileSink::new(&dir).unwrap();
    sink.store_sample("energy", FrameIndex(0), 0.0, &[1.0]).unwrap();
    sink.flush_all().unwrap();
    let err = read_field_file(series_path(&dir, "energy")).unwrap_err();
    assert!(matches!(err, IoError::WrongKind { .. }));

    let shape = FieldShape::uniform(&[2, 2], 1, 1).unwrap();
    let path = dir.join("direct.vfld");
    write_field_file(&path, "direct", FrameIndex(9), 3.0, &Field::zeros("x", shape)).unwrap();
    let back = read_field_file(&path).unwrap();
    assert_eq!(back.field.name(), "direct");
    assert_eq!(back.frame, FrameIndex(9));
    assert!(read_series(&path).is_err());
}
