//! Grid scan orchestration.
//!
//! Home the stage, then sweep the grid row by row (ascending y, ascending x
//! within each row), moving and measuring at every point. The first failure
//! of any step aborts the whole scan — no partial grid leaves this module
//! and nothing is retried.

use relief_devices::gatt::GattTransport;
use relief_devices::rangefinder::{DeviceError, Rangefinder};
use relief_devices::stage::{MotionStage, MoveTarget, StageError};

use crate::grid::{BoundsError, Sample, SampleGrid, ScanBounds};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    InvalidBounds(#[from] BoundsError),

    #[error("auto-home failed")]
    Homing(#[source] StageError),

    #[error("move to grid point ({ix}, {iy}) failed")]
    Motion {
        ix: usize,
        iy: usize,
        #[source]
        source: StageError,
    },

    #[error("measurement at grid point ({ix}, {iy}) failed")]
    Measure {
        ix: usize,
        iy: usize,
        #[source]
        source: DeviceError,
    },
}

/// Sweep `bounds` and return the completed sample grid.
///
/// Iteration order and the coordinate formulas are load-bearing: the mesh
/// builder assumes cell (ix, iy) sits at
/// `(ix * step + x_min, iy * step + y_min)`.
pub async fn run_scan<T, S>(
    rangefinder: &mut Rangefinder<T>,
    stage: &mut S,
    bounds: ScanBounds,
    feed_rate: f64,
) -> Result<SampleGrid, ScanError>
where
    T: GattTransport,
    S: MotionStage,
{
    bounds.validate()?;

    stage.home().await.map_err(ScanError::Homing)?;

    let steps_x = bounds.steps_x() as usize;
    let steps_y = bounds.steps_y() as usize;
    let mut grid = SampleGrid::with_dimensions(steps_x, steps_y);

    tracing::info!(steps_x, steps_y, step = bounds.step, "scan starting");

    for iy in 0..steps_y {
        for ix in 0..steps_x {
            let x_pos = ix as f64 * bounds.step + bounds.x_min;
            let y_pos = iy as f64 * bounds.step + bounds.y_min;

            stage
                .move_to(MoveTarget::xy(x_pos, y_pos, feed_rate))
                .await
                .map_err(|source| ScanError::Motion { ix, iy, source })?;

            let z = rangefinder
                .measure_distance()
                .await
                .map_err(|source| ScanError::Measure { ix, iy, source })?;

            tracing::info!(ix, iy, x = x_pos, y = y_pos, z, "sample");
            grid.push(Sample {
                x: x_pos,
                y: y_pos,
                z,
            });
        }
    }

    Ok(grid)
}
