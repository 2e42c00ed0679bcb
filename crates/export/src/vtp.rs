//! VTK XML PolyData (`.vtp`) output for porkchop meshes.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::guard::OutputGuard;
use crate::mesh::PorkchopMesh;
use crate::ExportError;

/// Write `mesh` as ASCII PolyData through `guard`.
pub fn write_vtp<P: AsRef<Path>>(
    path: P,
    mesh: &PorkchopMesh,
    guard: &OutputGuard,
) -> Result<PathBuf, ExportError> {
    guard.write_atomic(path, "vtp", |writer| write_vtp_to(writer, mesh))
}

/// Serialize `mesh` as PolyData with `MorphedValue` and `NormalizedUV` point data.
pub fn write_vtp_to(writer: &mut dyn Write, mesh: &PorkchopMesh) -> Result<(), ExportError> {
    let points = mesh.vertices().len();
    let polys = mesh.triangles().len();

    writeln!(writer, r#"<?xml version="1.0"?>"#)?;
    writeln!(
        writer,
        r#"<VTKFile type="PolyData" version="0.1" byte_order="LittleEndian">"#
    )?;
    writeln!(writer, "  <PolyData>")?;
    writeln!(
        writer,
        r#"    <Piece NumberOfPoints="{points}" NumberOfPolys="{polys}">"#
    )?;

    writeln!(writer, "      <Points>")?;
    writeln!(
        writer,
        r#"        <DataArray type="Float64" Name="Points" NumberOfComponents="3" format="ascii">"#
    )?;
    for [x, y, z] in mesh.vertices() {
        writeln!(writer, "{x:.6} {y:.6} {z:.6}")?;
    }
    writeln!(writer, "        </DataArray>")?;
    writeln!(writer, "      </Points>")?;

    writeln!(writer, "      <Polys>")?;
    writeln!(
        writer,
        r#"        <DataArray type="Int64" Name="connectivity" format="ascii">"#
    )?;
    for [a, b, c] in mesh.triangles() {
        writeln!(writer, "{a} {b} {c}")?;
    }
    writeln!(writer, "        </DataArray>")?;
    writeln!(
        writer,
        r#"        <DataArray type="Int64" Name="offsets" format="ascii">"#
    )?;
    write_joined(writer, (1..=polys).map(|k| (3 * k).to_string()))?;
    writeln!(writer, "        </DataArray>")?;
    writeln!(writer, "      </Polys>")?;

    writeln!(writer, r#"      <PointData Scalars="MorphedValue">"#)?;
    for (name, values) in [
        ("MorphedValue", mesh.scalars()),
        ("NormalizedUV", mesh.normalized()),
    ] {
        writeln!(
            writer,
            r#"        <DataArray type="Float32" Name="{name}" format="ascii">"#
        )?;
        write_joined(writer, values.iter().map(|v| format!("{v:.6}")))?;
        writeln!(writer, "        </DataArray>")?;
    }
    writeln!(writer, "      </PointData>")?;

    writeln!(writer, "    </Piece>")?;
    writeln!(writer, "  </PolyData>")?;
    writeln!(writer, "</VTKFile>")?;
    Ok(())
}

fn write_joined(
    writer: &mut dyn Write,
    items: impl Iterator<Item = String>,
) -> Result<(), ExportError> {
    for (k, item) in items.enumerate() {
        if k > 0 {
            write!(writer, " ")?;
        }
        write!(writer, "{item}")?;
    }
    writeln!(writer)?;
    Ok(())
}
