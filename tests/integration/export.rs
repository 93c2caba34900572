//! Exports produced from a full simulated scan.

use relief_devices::rangefinder::Rangefinder;
use relief_devices::sim::SimBench;
use relief_scan::export::{write_mesh, write_table};
use relief_scan::{build_mesh, run_scan};

use crate::{bench_bounds, sim_link, temp_path};

#[tokio::test]
async fn scan_exports_table_and_surface() {
    let bench = SimBench::new(|x, y| 50.0 - 0.05 * x - 0.025 * y);
    let mut stage = bench.stage();
    let mut rangefinder = Rangefinder::new(bench.transport(), sim_link());
    rangefinder.connect().await.unwrap();

    let grid = run_scan(&mut rangefinder, &mut stage, bench_bounds(), 1500.0)
        .await
        .unwrap();
    rangefinder.disconnect();

    let table = temp_path("scan.xlsx");
    let surface = temp_path("scan.stl");
    write_table(&grid, &table).unwrap();

    let mesh = build_mesh(&grid);
    write_mesh(&mesh, &surface).unwrap();

    // 3 × 3 grid → 8 triangles → 84 header bytes + 8 × 50 byte records.
    let stl = std::fs::read(&surface).unwrap();
    assert_eq!(stl.len(), 84 + 50 * 8);
    assert_eq!(u32::from_le_bytes([stl[80], stl[81], stl[82], stl[83]]), 8);

    // XLSX containers start with the PK zip magic.
    let xlsx = std::fs::read(&table).unwrap();
    assert!(xlsx.len() > 4);
    assert_eq!(&xlsx[..2], b"PK");

    let _ = std::fs::remove_file(&table);
    let _ = std::fs::remove_file(&surface);
}

#[tokio::test]
async fn vertices_in_the_file_are_origin_normalized() {
    let bench = SimBench::new(|_, _| 40.0);
    let mut stage = bench.stage();
    let mut rangefinder = Rangefinder::new(bench.transport(), sim_link());
    rangefinder.connect().await.unwrap();

    let grid = run_scan(&mut rangefinder, &mut stage, bench_bounds(), 1500.0)
        .await
        .unwrap();
    let mesh = build_mesh(&grid);

    let surface = temp_path("origin.stl");
    write_mesh(&mesh, &surface).unwrap();
    let stl = std::fs::read(&surface).unwrap();

    // Record 0 holds triangle (v11, v01, v00) of the first interior cell;
    // v00 is the grid origin, so the last vertex is (0, 0, 0).
    let v00_offset = 84 + 12 + 2 * 12;
    for i in 0..3 {
        let field = &stl[v00_offset + 4 * i..v00_offset + 4 * (i + 1)];
        assert_eq!(field, &0.0_f32.to_le_bytes());
    }

    let _ = std::fs::remove_file(&surface);
}
