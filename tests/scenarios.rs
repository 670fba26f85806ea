//! End-to-end scenarios through the public API.

use matrix_slice::{
    register_builtin, AnchorMode, DimensionRange, ElementType, Interval, Matrix, Registry,
    SliceStage, StageConfig, StageEvent, StageState, ENTRY_INPUT, MATRIX_INPUT,
};
use ndarray::{Array1, Array2, Array3, ArrayD, IxDyn};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

fn plane(rows: usize, cols: usize) -> Arc<Matrix> {
    let array = Array2::from_shape_fn((rows, cols), |(i, j)| (i * cols + j) as i32);
    Arc::new(Matrix::from(array.into_dyn()))
}

#[test]
fn test_registered_stage_slices_plane() {
    let mut registry = Registry::new();
    register_builtin(&mut registry);
    let mut stage = registry.instantiate("MatrixSlice").unwrap();

    stage
        .input_connection_changed(MATRIX_INPUT, Some(plane(20, 30)))
        .unwrap();
    stage
        .set_ranges(&[DimensionRange::new(2, 10), DimensionRange::new(5, 25)])
        .unwrap();

    let slice = stage.tick().unwrap().unwrap();
    let out = slice.as_array::<i32>().unwrap();
    assert_eq!(out.shape(), &[8, 20]);
    assert_eq!(out[[0, 0]], (2 * 30 + 5) as i32);
    assert_eq!(out[[7, 19]], (9 * 30 + 24) as i32);
}

#[test]
fn test_centered_window_on_plane() {
    let mut stage = SliceStage::new();
    stage.connect_matrix(plane(20, 20)).unwrap();
    stage
        .update_config(|batch| {
            batch.set_anchor(AnchorMode::Center);
            batch.set_ranges(&[DimensionRange::new(0, 10), DimensionRange::new(0, 10)])
        })
        .unwrap();

    assert_eq!(
        stage.resolved_ranges().unwrap().intervals(),
        &[Interval::new(5, 15), Interval::new(5, 15)]
    );
}

#[test]
fn test_degenerate_range_on_last_index() {
    let mut stage = SliceStage::new();
    stage.connect_matrix(plane(10, 10)).unwrap();
    stage
        .set_ranges(&[DimensionRange::new(9, 9), DimensionRange::new(0, 10)])
        .unwrap();

    assert_eq!(stage.resolved_ranges().unwrap().get(0), Some(Interval::new(8, 9)));
}

#[test]
fn test_vectors_are_sliced_along_their_long_axis() {
    let mut stage = SliceStage::new();

    let column = Array1::from((0..12).map(|v| v as f64).collect::<Vec<_>>());
    stage
        .connect_matrix(Arc::new(Matrix::from(column.into_dyn())))
        .unwrap();
    assert_eq!(stage.config().len(), 1);
    stage.set_ranges(&[DimensionRange::new(3, 7)]).unwrap();

    let slice = stage.tick().unwrap().unwrap();
    assert_eq!(slice.shape(), &[4, 1]);
    assert_eq!(slice.values_f64().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0, 6.0]);

    let row = Array2::from_shape_fn((1, 12), |(_, j)| j as u8);
    stage
        .connect_matrix(Arc::new(Matrix::from(row.into_dyn())))
        .unwrap();
    let slice = stage.tick().unwrap().unwrap();
    assert_eq!(slice.shape(), &[1, 4]);
    assert_eq!(slice.element_type(), ElementType::U8);
}

#[test]
fn test_entry_signal_tracks_threshold_crossings() {
    let mut stage = SliceStage::new();
    let volume = Array3::<f32>::zeros((6, 10, 10));
    stage
        .connect_matrix(Arc::new(Matrix::from(volume.into_dyn())))
        .unwrap();
    stage
        .set_ranges(&[
            DimensionRange::new(1, 3),
            DimensionRange::new(0, 10),
            DimensionRange::new(0, 10),
        ])
        .unwrap();

    let signal = Array1::from(vec![0.0f32, 0.0, 0.5, 0.2, 0.0, 0.9, 0.0]);
    stage
        .input_connection_changed(ENTRY_INPUT, Some(Arc::new(Matrix::from(signal.into_dyn()))))
        .unwrap();
    stage.tick().unwrap();

    assert_eq!(stage.entry_state().lower, 2);
    assert_eq!(stage.entry_state().upper, 5);
    assert_eq!(
        stage.resolved_ranges().unwrap().intervals(),
        &[Interval::new(1, 3), Interval::new(2, 5), Interval::new(2, 5)]
    );
}

#[test]
fn test_scalar_entry_signal() {
    let mut stage = SliceStage::new();
    stage.connect_matrix(plane(10, 10)).unwrap();

    let scalar = ArrayD::from_elem(IxDyn(&[]), 0.7f64);
    stage
        .connect_entry(Arc::new(Matrix::from(scalar)))
        .unwrap();
    stage.tick().unwrap();

    assert_eq!(stage.entry_state().lower, 0);
    assert_eq!(stage.entry_state().upper, 0);
    // zero-width pair widened to a single column
    assert_eq!(stage.resolved_ranges().unwrap().get(1), Some(Interval::new(0, 1)));
}

#[test]
fn test_events_in_order() {
    let mut stage = SliceStage::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    stage.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    stage.connect_matrix(plane(20, 20)).unwrap();
    stage
        .set_ranges(&[DimensionRange::new(0, 4), DimensionRange::new(0, 4)])
        .unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            StageEvent::OutputPropertiesChanged {
                shape: vec![5, 5],
                element_type: ElementType::I32,
            },
            StageEvent::ConfigurationChanged,
            StageEvent::OutputPropertiesChanged {
                shape: vec![4, 4],
                element_type: ElementType::I32,
            },
        ]
    );
}

#[test]
fn test_config_file_round_trip_with_limits() {
    let mut stage = SliceStage::new();
    let volume = Arc::new(Matrix::from(Array3::<f32>::zeros((8, 8, 8)).into_dyn()));
    stage.connect_matrix(Arc::clone(&volume)).unwrap();
    stage
        .update_config(|batch| batch.set_range(2, DimensionRange::new(2, 6)))
        .unwrap();
    stage.connect_matrix(plane(8, 8)).unwrap();

    let path = std::env::temp_dir().join(format!(
        "matrix_slice_scenario_{}.json",
        std::process::id()
    ));
    stage.snapshot().save(&path).unwrap();
    let stored = StageConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let mut restored = SliceStage::from_config(stored);
    assert_eq!(restored.config().len(), 2);
    restored.connect_matrix(volume).unwrap();

    assert_eq!(restored.range(2).unwrap(), DimensionRange::new(2, 6));
    assert_eq!(restored.state(), StageState::Configured);
}

#[test]
fn test_disconnect_returns_to_unconfigured() {
    let mut stage = SliceStage::new();
    stage.connect_matrix(plane(20, 20)).unwrap();
    stage.tick().unwrap();

    stage.disconnect_matrix();

    assert_eq!(stage.state(), StageState::Unconfigured);
    assert!(stage.tick().unwrap().is_none());
    // the last slice stays available to readers
    assert!(stage.output().is_some());
}
