// src/ovf.rs
//
// OOMMF OVF reader and writers for OMF magnetisation snapshots.
// Reads OVF 1.0 and OVF 2.0 rectangular meshes:
//  - text data
//  - binary4 / binary8 data (OVF 2.0 little-endian, OVF 1.0 big-endian)
// Writes OVF 2.0 text and binary4 (used for synthetic seeds and tests).
//
// Binary data starts with a check value: 1234567.0 (4 bytes) or
// 123456789012345.0 (8 bytes). Only the first segment of a file is read.

use std::collections::HashMap;
use std::fs::{self, create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::error::{Result, ViewError};
use crate::field::{Field3D, Mesh};

const CHECK_B4: f32 = 1234567.0;
const CHECK_B8: f64 = 123456789012345.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OvfVersion {
    V1,
    V2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DataKind {
    Text,
    Binary4,
    Binary8,
}

#[derive(Clone, Debug, Default)]
pub struct OvfMeta {
    pub title: String,
    pub desc_lines: Vec<String>,
    pub valuelabels: [String; 3],
    pub valueunits: [String; 3],
}

impl OvfMeta {
    pub fn magnetization() -> Self {
        Self {
            title: "m".to_string(),
            desc_lines: vec![],
            valuelabels: ["m_x".into(), "m_y".into(), "m_z".into()],
            valueunits: ["1".into(), "1".into(), "1".into()],
        }
    }

    pub fn push_desc_line<S: Into<String>>(&mut self, s: S) {
        self.desc_lines.push(s.into());
    }
}

/// Read an OMF/OVF file from disk.
pub fn read_ovf(path: &Path) -> Result<Field3D> {
    let bytes = fs::read(path)?;
    let field = parse_ovf(&bytes)?;
    debug!(
        "read {} ({}x{}x{} cells)",
        path.display(),
        field.mesh.n[0],
        field.mesh.n[1],
        field.mesh.n[2]
    );
    Ok(field)
}

/// Parse the bytes of an OVF file.
pub fn parse_ovf(bytes: &[u8]) -> Result<Field3D> {
    let mut version: Option<OvfVersion> = None;
    let mut header: HashMap<String, String> = HashMap::new();
    let mut pos = 0usize;
    let mut line_no = 0usize;

    while pos < bytes.len() {
        let end = bytes[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |p| pos + p);
        let line = String::from_utf8_lossy(&bytes[pos..end]);
        let line = line.trim();
        line_no += 1;
        pos = (end + 1).min(bytes.len());

        if line.is_empty() {
            continue;
        }
        let Some(body) = line.strip_prefix('#') else {
            return Err(ViewError::format(line_no, "data found before '# Begin: Data'"));
        };
        if body.starts_with('#') {
            continue; // "##" comment
        }
        let body = body.trim();

        if version.is_none() {
            let lower = body.to_ascii_lowercase();
            if lower.starts_with("oommf") {
                version = if lower.contains("ovf 2.0") {
                    Some(OvfVersion::V2)
                } else if lower.contains("v1.0") || lower.contains("ovf 1.0") {
                    Some(OvfVersion::V1)
                } else {
                    return Err(ViewError::format(
                        line_no,
                        format!("unsupported OVF version line '{}'", line),
                    ));
                };
                continue;
            }
            return Err(ViewError::format(line_no, "missing '# OOMMF' version line"));
        }

        let Some((key, value)) = body.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        if key == "begin" && value.to_ascii_lowercase().starts_with("data") {
            let kind = match value.to_ascii_lowercase().split_whitespace().collect::<Vec<_>>()[..] {
                ["data", "text"] => DataKind::Text,
                ["data", "binary", "4"] => DataKind::Binary4,
                ["data", "binary", "8"] => DataKind::Binary8,
                _ => {
                    return Err(ViewError::format(
                        line_no,
                        format!("unsupported data block '{}'", value),
                    ))
                }
            };
            let version = version.unwrap_or(OvfVersion::V2);
            let mesh = mesh_from_header(&header, line_no)?;
            let multiplier = match header.get("valuemultiplier") {
                Some(v) => parse_num(v, "valuemultiplier", line_no)?,
                None => 1.0,
            };
            let n_values = value_count(&mesh, line_no)?;
            let mut values = match kind {
                DataKind::Text => read_text_values(&bytes[pos..], n_values, line_no)?,
                DataKind::Binary4 | DataKind::Binary8 => {
                    read_binary_values(&bytes[pos..], n_values, kind, version, line_no)?
                }
            };
            if multiplier != 1.0 {
                for v in &mut values {
                    *v *= multiplier;
                }
            }
            let data = values.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
            return Field3D::new(mesh, data);
        }

        header.entry(key).or_insert_with(|| value.to_string());
    }

    Err(ViewError::format(line_no, "no data block found"))
}

fn parse_num(s: &str, key: &str, line: usize) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| ViewError::format(line, format!("invalid value for '{}': '{}'", key, s)))
}

fn mesh_from_header(header: &HashMap<String, String>, line: usize) -> Result<Mesh> {
    if let Some(t) = header.get("meshtype") {
        if !t.eq_ignore_ascii_case("rectangular") {
            return Err(ViewError::format(
                line,
                format!("only rectangular meshes are supported, got '{}'", t),
            ));
        }
    }
    if let Some(dim) = header.get("valuedim") {
        if dim.trim() != "3" {
            return Err(ViewError::format(
                line,
                format!("expected a vector field (valuedim 3), got valuedim {}", dim),
            ));
        }
    }

    let get = |key: &str| -> Result<f64> {
        let v = header
            .get(key)
            .ok_or_else(|| ViewError::format(line, format!("header is missing '{}'", key)))?;
        parse_num(v, key, line)
    };

    let mut n = [0usize; 3];
    for (a, key) in ["xnodes", "ynodes", "znodes"].iter().enumerate() {
        let v = get(key)?;
        if v < 1.0 || v.fract() != 0.0 {
            return Err(ViewError::format(line, format!("'{}' must be a positive integer", key)));
        }
        n[a] = v as usize;
    }
    let p1 = [get("xmin")?, get("ymin")?, get("zmin")?];
    let p2 = [get("xmax")?, get("ymax")?, get("zmax")?];
    for a in 0..3 {
        if !(p2[a] > p1[a]) {
            return Err(ViewError::format(line, "mesh max must exceed min on every axis"));
        }
    }
    Ok(Mesh::new(p1, p2, n))
}

/// nx*ny*nz*3, or `Format` if the header's node counts overflow.
fn value_count(mesh: &Mesh, line: usize) -> Result<usize> {
    mesh.n
        .iter()
        .try_fold(3usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| {
            ViewError::format(
                line,
                format!("node counts {:?} are too large", mesh.n),
            )
        })
}

fn read_text_values(bytes: &[u8], n_values: usize, line: usize) -> Result<Vec<f64>> {
    let text = String::from_utf8_lossy(bytes);
    // every value takes at least two bytes ("0 "), so the block bounds the count
    let mut values = Vec::with_capacity(n_values.min(bytes.len() / 2 + 1));
    for (offset, l) in text.lines().enumerate() {
        let l = l.trim();
        if l.starts_with('#') {
            break;
        }
        for tok in l.split_whitespace() {
            let v = tok.parse::<f64>().map_err(|_| {
                ViewError::format(line + offset + 1, format!("invalid number '{}'", tok))
            })?;
            values.push(v);
        }
    }
    if values.len() != n_values {
        return Err(ViewError::format(
            line,
            format!("expected {} data values, found {}", n_values, values.len()),
        ));
    }
    Ok(values)
}

fn read_binary_values(
    bytes: &[u8],
    n_values: usize,
    kind: DataKind,
    version: OvfVersion,
    line: usize,
) -> Result<Vec<f64>> {
    let width = if kind == DataKind::Binary4 { 4 } else { 8 };
    let needed = n_values.checked_add(1).and_then(|n| n.checked_mul(width));
    if needed.map_or(true, |needed| bytes.len() < needed) {
        return Err(ViewError::format(
            line,
            format!(
                "binary block truncated: need {} values of {} bytes, have {} bytes",
                n_values.saturating_add(1),
                width,
                bytes.len()
            ),
        ));
    }

    let little = version == OvfVersion::V2;
    let value_at = |k: usize| -> f64 {
        let b = &bytes[k * width..(k + 1) * width];
        if width == 4 {
            let arr = [b[0], b[1], b[2], b[3]];
            if little {
                f32::from_le_bytes(arr) as f64
            } else {
                f32::from_be_bytes(arr) as f64
            }
        } else {
            let arr = [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
            if little {
                f64::from_le_bytes(arr)
            } else {
                f64::from_be_bytes(arr)
            }
        }
    };

    let check = value_at(0);
    let expected = if width == 4 { CHECK_B4 as f64 } else { CHECK_B8 };
    if check != expected {
        return Err(ViewError::format(
            line,
            format!("bad binary check value {} (expected {})", check, expected),
        ));
    }
    Ok((1..=n_values).map(value_at).collect())
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(())
}

fn write_header<W: Write>(w: &mut W, field: &Field3D, meta: &OvfMeta) -> std::io::Result<()> {
    let mesh = &field.mesh;
    let cell = mesh.cell();

    writeln!(w, "# OOMMF OVF 2.0")?;
    writeln!(w, "# Segment count: 1")?;
    writeln!(w, "# Begin: Segment")?;
    writeln!(w, "# Begin: Header")?;
    writeln!(w, "# Title: {}", meta.title)?;
    for d in &meta.desc_lines {
        writeln!(w, "# Desc: {}", d)?;
    }
    writeln!(w, "# meshtype: rectangular")?;
    writeln!(w, "# meshunit: m")?;

    for (a, c) in ["x", "y", "z"].iter().enumerate() {
        writeln!(w, "# {}min: {:.17e}", c, mesh.p1[a])?;
        writeln!(w, "# {}max: {:.17e}", c, mesh.p2[a])?;
    }

    writeln!(w, "# valuedim: 3")?;
    writeln!(
        w,
        "# valuelabels: {} {} {}",
        meta.valuelabels[0], meta.valuelabels[1], meta.valuelabels[2]
    )?;
    writeln!(
        w,
        "# valueunits: {} {} {}",
        meta.valueunits[0], meta.valueunits[1], meta.valueunits[2]
    )?;

    for (a, c) in ["x", "y", "z"].iter().enumerate() {
        writeln!(w, "# {}base: {:.17e}", c, mesh.p1[a] + 0.5 * cell[a])?;
    }
    for (a, c) in ["x", "y", "z"].iter().enumerate() {
        writeln!(w, "# {}nodes: {}", c, mesh.n[a])?;
    }
    for (a, c) in ["x", "y", "z"].iter().enumerate() {
        writeln!(w, "# {}stepsize: {:.17e}", c, cell[a])?;
    }

    writeln!(w, "# End: Header")?;
    Ok(())
}

pub fn write_ovf2_text(path: &Path, field: &Field3D, meta: &OvfMeta) -> std::io::Result<()> {
    ensure_parent_dir(path)?;
    let mut w = BufWriter::new(File::create(path)?);

    write_header(&mut w, field, meta)?;
    writeln!(w, "# Begin: Data Text")?;
    // x fastest, then y, then z
    for v in &field.data {
        writeln!(w, "{:.16e} {:.16e} {:.16e}", v[0], v[1], v[2])?;
    }
    writeln!(w, "# End: Data Text")?;
    writeln!(w, "# End: Segment")?;
    w.flush()?;
    Ok(())
}

pub fn write_ovf2_binary4(path: &Path, field: &Field3D, meta: &OvfMeta) -> std::io::Result<()> {
    ensure_parent_dir(path)?;
    let mut f = BufWriter::new(File::create(path)?);

    write_header(&mut f, field, meta)?;
    writeln!(f, "# Begin: Data Binary 4")?;

    f.write_all(&CHECK_B4.to_le_bytes())?;
    for v in &field.data {
        for c in v {
            f.write_all(&(*c as f32).to_le_bytes())?;
        }
    }

    writeln!(f)?;
    writeln!(f, "# End: Data Binary 4")?;
    writeln!(f, "# End: Segment")?;
    f.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_field() -> Field3D {
        let mesh = Mesh::new([-2e-9, 0.0, 0.0], [2e-9, 3e-9, 1e-9], [2, 3, 1]);
        let data = (0..6)
            .map(|k| [k as f64 * 0.125, -0.5, 1.0 - k as f64 * 0.25])
            .collect();
        Field3D::new(mesh, data).unwrap()
    }

    #[test]
    fn text_file_written_then_read_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.omf");
        let f = sample_field();
        write_ovf2_text(&path, &f, &OvfMeta::magnetization()).unwrap();
        let back = read_ovf(&path).unwrap();
        assert_eq!(back.mesh.n, [2, 3, 1]);
        for a in 0..3 {
            assert!((back.mesh.p1[a] - f.mesh.p1[a]).abs() < 1e-24);
            assert!((back.mesh.p2[a] - f.mesh.p2[a]).abs() < 1e-24);
        }
        assert_eq!(back.data, f.data);
    }

    #[test]
    fn binary4_file_written_then_read_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/m.ovf");
        let f = sample_field();
        write_ovf2_binary4(&path, &f, &OvfMeta::magnetization()).unwrap();
        let back = read_ovf(&path).unwrap();
        // all sample values are exactly representable as f32
        assert_eq!(back.data, f.data);
    }

    #[test]
    fn ovf1_big_endian_binary8_with_multiplier() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(
            b"# OOMMF: rectangular mesh v1.0\n# Segment count: 1\n# Begin: Segment\n# Begin: Header\n\
# meshtype: rectangular\n# xmin: 0\n# ymin: 0\n# zmin: 0\n# xmax: 2\n# ymax: 1\n# zmax: 1\n\
# xnodes: 2\n# ynodes: 1\n# znodes: 1\n# valuemultiplier: 2\n# End: Header\n# Begin: Data Binary 8\n",
        );
        bytes.extend_from_slice(&CHECK_B8.to_be_bytes());
        for v in [0.5f64, 0.0, 0.0, 0.0, 0.0, -0.5] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        bytes.extend_from_slice(b"\n# End: Data Binary 8\n# End: Segment\n");

        let f = parse_ovf(&bytes).unwrap();
        assert_eq!(f.data, vec![[1.0, 0.0, 0.0], [0.0, 0.0, -1.0]]);
    }

    #[test]
    fn rejects_bad_check_value_and_irregular_mesh() {
        let mut bytes = b"# OOMMF OVF 2.0\n# xmin: 0\n# ymin: 0\n# zmin: 0\n# xmax: 1\n# ymax: 1\n# zmax: 1\n\
# xnodes: 1\n# ynodes: 1\n# znodes: 1\n# Begin: Data Binary 4\n"
            .to_vec();
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 12]);
        assert!(matches!(parse_ovf(&bytes), Err(ViewError::Format { .. })));

        let irregular = b"# OOMMF OVF 2.0\n# meshtype: irregular\n# Begin: Data Text\n0 0 1\n";
        assert!(matches!(parse_ovf(irregular), Err(ViewError::Format { .. })));
    }

    #[test]
    fn short_text_block_is_an_error() {
        let text = b"# OOMMF OVF 2.0\n# xmin: 0\n# ymin: 0\n# zmin: 0\n# xmax: 2\n# ymax: 1\n# zmax: 1\n\
# xnodes: 2\n# ynodes: 1\n# znodes: 1\n# Begin: Data Text\n0 0 1\n# End: Data Text\n";
        let err = parse_ovf(text).unwrap_err();
        assert!(err.to_string().contains("expected 6 data values, found 3"));
    }

    fn header(nodes: &str, data: &str) -> Vec<u8> {
        format!(
            "# OOMMF OVF 2.0\n# xmin: 0\n# ymin: 0\n# zmin: 0\n# xmax: 1\n# ymax: 1\n# zmax: 1\n\
# xnodes: {n}\n# ynodes: {n}\n# znodes: {n}\n# Begin: Data {d}\n",
            n = nodes,
            d = data
        )
        .into_bytes()
    }

    #[test]
    fn huge_text_node_count_is_a_format_error() {
        let mut bytes = header("1000000", "Text");
        bytes.extend_from_slice(b"0 0 1\n# End: Data Text\n");
        let err = parse_ovf(&bytes).unwrap_err();
        assert!(matches!(err, ViewError::Format { .. }), "{}", err);
    }

    #[test]
    fn overflowing_node_count_is_a_format_error() {
        let mut bytes = header("10000000", "Binary 4");
        bytes.extend_from_slice(&CHECK_B4.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 12]);
        let err = parse_ovf(&bytes).unwrap_err();
        assert!(matches!(err, ViewError::Format { .. }), "{}", err);
        assert!(err.to_string().contains("too large"), "{}", err);
    }
}
