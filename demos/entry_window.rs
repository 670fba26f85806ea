//! Entry-Driven Windowing: a Slice That Follows the Signal
//!
//! A 64x48 frame is sliced on every tick. The primary axis keeps a fixed
//! band of rows while the column window follows a pulse travelling along a
//! 48-sample entry signal. When the pulse disappears the window holds its
//! last position. A config file round-trip closes the run.
//!
//! Run: RUST_LOG=matrix_slice=debug cargo run --example entry_window

use matrix_slice::{
    register_builtin, AnchorMode, DimensionRange, Matrix, Registry, Result, StageConfig,
    StageEvent, MATRIX_INPUT,
};
use ndarray::{Array1, Array2};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// =============================================================================
// Inputs
// =============================================================================

fn frame() -> Arc<Matrix> {
    let array = Array2::from_shape_fn((64, 48), |(i, j)| (i * 48 + j) as f32);
    Arc::new(Matrix::from(array.into_dyn()))
}

/// A pulse of `width` samples starting at `start`; `None` gives silence.
fn pulse(start: Option<usize>, width: usize) -> Arc<Matrix> {
    let array = Array1::from_shape_fn(48, |i| match start {
        Some(s) if (s..s + width).contains(&i) => 1.0f32,
        _ => 0.0,
    });
    Arc::new(Matrix::from(array.into_dyn()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut registry = Registry::new();
    register_builtin(&mut registry);
    for name in registry.names() {
        let declaration = registry.get(name).expect("listed name");
        println!("{} [{}]: {}", name, declaration.category, declaration.description);
    }

    let mut stage = registry.instantiate("MatrixSlice").expect("registered");
    stage.subscribe(|event| match event {
        StageEvent::OutputPropertiesChanged { shape, element_type } => {
            println!("  output is now {}{:?}", element_type, shape)
        }
        other => println!("  {:?}", other),
    });

    println!("\nConnecting a 64x48 frame");
    stage.input_connection_changed(MATRIX_INPUT, Some(frame()))?;
    stage.set_ranges(&[DimensionRange::new(16, 48), DimensionRange::new(0, 48)])?;

    println!("\nFollowing the pulse");
    let positions = [Some(2), Some(10), Some(20), None, Some(36)];
    for (tick, position) in positions.iter().enumerate() {
        stage.connect_entry(pulse(*position, 6))?;
        let Some(shape) = stage.tick()?.map(|slice| slice.shape().to_vec()) else {
            continue;
        };
        let columns = stage
            .resolved_ranges()
            .and_then(|r| r.get(1))
            .map(|i| i.to_string())
            .unwrap_or_default();
        println!(
            "  tick {}: pulse {:?} -> columns {} shape {:?}",
            tick,
            position,
            columns,
            shape
        );
    }

    println!("\nSwitching to centered windows");
    stage.disconnect_entry()?;
    stage.update_config(|batch| {
        batch.set_anchor(AnchorMode::Center);
        batch.set_ranges(&[DimensionRange::new(0, 8), DimensionRange::new(0, 12)])
    })?;
    if let Some(ranges) = stage.resolved_ranges() {
        let rendered: Vec<String> = ranges.intervals().iter().map(|i| i.to_string()).collect();
        println!("  resolved {}", rendered.join(" x "));
    }

    let path = std::env::temp_dir().join("matrix_slice_entry_window.json");
    stage.snapshot().save(&path)?;
    let stored = StageConfig::load(&path)?;
    println!("\nSaved and reloaded {}: {:?}", path.display(), stored.range_config());
    std::fs::remove_file(&path)?;

    Ok(())
}
