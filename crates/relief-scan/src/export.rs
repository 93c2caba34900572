//! Export sinks: the sample table as an XLSX workbook and the surface as
//! binary STL.

use std::io::Write;
use std::path::Path;

use rust_xlsxwriter::Workbook;

use crate::grid::SampleGrid;
use crate::mesh::{Triangle, Vertex};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("grid is not fully populated")]
    IncompleteGrid,
}

/// Column headers of the sample table.
const TABLE_HEADER: [&str; 5] = ["#x", "#y", "x", "y", "z"];

/// Write the sample table: a header row, then one row per sample in
/// acquisition order.
pub fn write_table(grid: &SampleGrid, path: &Path) -> Result<(), ExportError> {
    if !grid.is_complete() {
        return Err(ExportError::IncompleteGrid);
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("measurements")?;

    for (col, title) in TABLE_HEADER.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }

    let mut row = 1u32;
    for (ix, iy, sample) in grid.samples() {
        sheet.write_number(row, 0, ix as f64)?;
        sheet.write_number(row, 1, iy as f64)?;
        sheet.write_number(row, 2, sample.x)?;
        sheet.write_number(row, 3, sample.y)?;
        sheet.write_number(row, 4, sample.z)?;
        row += 1;
    }

    workbook.save(path)?;
    tracing::info!(path = %path.display(), rows = row - 1, "sample table written");
    Ok(())
}

/// Write the surface as binary STL: an 80-byte zeroed header, a u32 LE
/// triangle count, then 50 bytes per triangle — normal and three vertices
/// as f32 LE, closed by a zero attribute word.
pub fn write_mesh(triangles: &[Triangle], path: &Path) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    let mut out = std::io::BufWriter::new(file);

    out.write_all(&[0u8; 80])?;
    out.write_all(&(triangles.len() as u32).to_le_bytes())?;

    for triangle in triangles {
        write_vertex(&mut out, &triangle.normal)?;
        write_vertex(&mut out, &triangle.v1)?;
        write_vertex(&mut out, &triangle.v2)?;
        write_vertex(&mut out, &triangle.v3)?;
        out.write_all(&0u16.to_le_bytes())?;
    }

    out.flush()?;
    tracing::info!(path = %path.display(), triangles = triangles.len(), "surface written");
    Ok(())
}

fn write_vertex<W: Write>(out: &mut W, v: &Vertex) -> std::io::Result<()> {
    out.write_all(&(v.x as f32).to_le_bytes())?;
    out.write_all(&(v.y as f32).to_le_bytes())?;
    out.write_all(&(v.z as f32).to_le_bytes())
}
