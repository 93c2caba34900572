//! End-to-end scans over the simulated bench.

use relief_devices::rangefinder::Rangefinder;
use relief_devices::sim::{SimBench, SimFaults};
use relief_scan::{build_mesh, run_scan, ScanError};

use crate::{bench_bounds, sim_link};

#[tokio::test]
async fn full_scan_yields_grid_and_mesh() {
    // A sloped surface: distance falls off with x, so height rises with x.
    let bench = SimBench::new(|x, y| 45.0 - 0.1 * x + 0.02 * y);
    let mut stage = bench.stage();
    let mut rangefinder = Rangefinder::new(bench.transport(), sim_link());

    rangefinder.connect().await.unwrap();
    rangefinder.turn_laser_on().await.unwrap();

    let grid = run_scan(&mut rangefinder, &mut stage, bench_bounds(), 1500.0)
        .await
        .expect("scan should complete");
    rangefinder.disconnect();

    assert_eq!(grid.steps_x(), 3);
    assert_eq!(grid.steps_y(), 3);
    assert_eq!(grid.len(), 9);

    // The stage swept y-major: a full x row before y advances.
    assert_eq!(
        bench.visited(),
        vec![
            (100.0, 100.0),
            (110.0, 100.0),
            (120.0, 100.0),
            (100.0, 110.0),
            (110.0, 110.0),
            (120.0, 110.0),
            (100.0, 120.0),
            (110.0, 120.0),
            (120.0, 120.0),
        ]
    );

    // One laser-on exchange plus one measurement per grid point.
    assert_eq!(bench.measurements(), 9);
    assert_eq!(bench.written_frames().len(), 10);

    let mesh = build_mesh(&grid);
    assert_eq!(mesh.len(), 2 * 2 * 2);

    // The origin vertex comes out at (0, 0, 0).
    let first_cell_v00 = mesh[0].v3;
    assert_eq!((first_cell_v00.x, first_cell_v00.y, first_cell_v00.z), (0.0, 0.0, 0.0));
    // The sample at (120, 100) read the surface there: 45 − 12 + 2 mm.
    let far = grid.get(2, 0);
    assert!((far.z - 35.0).abs() < 1e-9);
}

#[tokio::test]
async fn measurement_failure_aborts_the_scan() {
    let bench = SimBench::with_faults(
        |_, _| 30.0,
        SimFaults {
            fail_measure_at: Some(5),
            measure_status: 0x02,
            ..SimFaults::default()
        },
    );
    let mut stage = bench.stage();
    let mut rangefinder = Rangefinder::new(bench.transport(), sim_link());
    rangefinder.connect().await.unwrap();

    // Point 5 in acquisition order is (ix 2, iy 1) on a 3-wide grid.
    match run_scan(&mut rangefinder, &mut stage, bench_bounds(), 1500.0).await {
        Err(ScanError::Measure { ix: 2, iy: 1, .. }) => {}
        other => panic!("expected Measure at (2, 1), got {other:?}"),
    }

    // The sweep stopped at the failed point; nothing downstream ever sees
    // a partial grid.
    assert_eq!(bench.visited().len(), 6);
}

#[tokio::test]
async fn write_rejection_aborts_the_scan() {
    let bench = SimBench::with_faults(
        |_, _| 30.0,
        SimFaults {
            reject_writes: true,
            ..SimFaults::default()
        },
    );
    let mut stage = bench.stage();
    let mut rangefinder = Rangefinder::new(bench.transport(), sim_link());
    rangefinder.connect().await.unwrap();

    assert!(matches!(
        run_scan(&mut rangefinder, &mut stage, bench_bounds(), 1500.0).await,
        Err(ScanError::Measure { ix: 0, iy: 0, .. })
    ));
    assert_eq!(bench.measurements(), 0);
}

#[tokio::test]
async fn homing_failure_aborts_before_any_point() {
    let bench = SimBench::with_faults(
        |_, _| 30.0,
        SimFaults {
            fail_home: true,
            ..SimFaults::default()
        },
    );
    let mut stage = bench.stage();
    let mut rangefinder = Rangefinder::new(bench.transport(), sim_link());
    rangefinder.connect().await.unwrap();

    assert!(matches!(
        run_scan(&mut rangefinder, &mut stage, bench_bounds(), 1500.0).await,
        Err(ScanError::Homing(_))
    ));
    assert!(bench.visited().is_empty());
    assert!(bench.written_frames().is_empty());
}
