use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use bevy::math::Vec3;
use indicatif::{ProgressBar, ProgressStyle};

use crate::engine::point_cloud::{Point, PointCloud};

/// Vertex counts above this get a progress bar during parsing.
const PROGRESS_THRESHOLD: usize = 100_000;

/// Body encoding declared by a PLY header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
}

/// Scalar type of a vertex property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl ScalarType {
    fn parse(token: &str) -> Result<Self, Box<dyn Error>> {
        Ok(match token {
            "char" | "int8" => ScalarType::Char,
            "uchar" | "uint8" => ScalarType::UChar,
            "short" | "int16" => ScalarType::Short,
            "ushort" | "uint16" => ScalarType::UShort,
            "int" | "int32" => ScalarType::Int,
            "uint" | "uint32" => ScalarType::UInt,
            "float" | "float32" => ScalarType::Float,
            "double" | "float64" => ScalarType::Double,
            other => return Err(format!("unsupported PLY property type: {other}").into()),
        })
    }

    fn byte_size(self) -> usize {
        match self {
            ScalarType::Char | ScalarType::UChar => 1,
            ScalarType::Short | ScalarType::UShort => 2,
            ScalarType::Int | ScalarType::UInt | ScalarType::Float => 4,
            ScalarType::Double => 8,
        }
    }
}

/// One vertex property in declaration order.
#[derive(Debug, Clone)]
struct PlyProperty {
    name: String,
    kind: ScalarType,
}

#[derive(Debug)]
struct PlyHeader {
    format: PlyFormat,
    vertex_count: usize,
    properties: Vec<PlyProperty>,
}

impl PlyHeader {
    fn has_normals(&self) -> bool {
        ["nx", "ny", "nz"]
            .iter()
            .all(|name| self.properties.iter().any(|p| p.name == *name))
    }
}

/// Attribute scratch filled property by property while decoding one vertex.
struct VertexScratch {
    position: Vec3,
    normal: Option<Vec3>,
    colour: Vec3,
}

impl VertexScratch {
    fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: None,
            colour: Vec3::ONE,
        }
    }

    fn apply(&mut self, property: &PlyProperty, value: f64) {
        // Colour channels scale by their declared storage range.
        let colour_value = match property.kind {
            ScalarType::UChar | ScalarType::Char => value as f32 / 255.0,
            ScalarType::UShort | ScalarType::Short => value as f32 / 65535.0,
            _ => value as f32,
        };

        match property.name.as_str() {
            "x" => self.position.x = value as f32,
            "y" => self.position.y = value as f32,
            "z" => self.position.z = value as f32,
            "nx" => self.normal.get_or_insert(Vec3::ZERO).x = value as f32,
            "ny" => self.normal.get_or_insert(Vec3::ZERO).y = value as f32,
            "nz" => self.normal.get_or_insert(Vec3::ZERO).z = value as f32,
            "red" => self.colour.x = colour_value,
            "green" => self.colour.y = colour_value,
            "blue" => self.colour.z = colour_value,
            _ => {}
        }
    }

    fn into_point(self) -> Point {
        let point = Point::new(self.position).with_colour(self.colour);
        match self.normal {
            Some(normal) => point.with_normal(normal),
            None => point,
        }
    }
}

/// Load a PLY cloud from disk.
pub fn load_ply(path: &Path) -> Result<PointCloud, Box<dyn Error>> {
    let file = File::open(path)
        .map_err(|e| format!("could not open {}: {e}", path.display()))?;
    let cloud = parse_ply(BufReader::new(file))?;
    println!(
        "Loaded {} points from {} (normals: {})",
        cloud.points_amount(),
        path.display(),
        if cloud.has_normals() { "supplied" } else { "absent" }
    );
    Ok(cloud)
}

/// Parse a complete PLY stream: header, then the vertex payload.
pub fn parse_ply<R: BufRead>(mut reader: R) -> Result<PointCloud, Box<dyn Error>> {
    let header = parse_header(&mut reader)?;

    let mut cloud = match header.format {
        PlyFormat::Ascii => read_ascii_body(&mut reader, &header)?,
        PlyFormat::BinaryLittleEndian => read_binary_body(&mut reader, &header)?,
    };

    cloud.set_has_normals(header.has_normals());
    Ok(cloud)
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, Box<dyn Error>> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim() != "ply" {
        return Err("not a PLY file (missing magic line)".into());
    }

    let mut format = None;
    let mut vertex_count = None;
    let mut properties = Vec::new();
    let mut current_element = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err("PLY header ended without end_header".into());
        }

        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        match keyword {
            "format" => {
                format = Some(match tokens.next() {
                    Some("ascii") => PlyFormat::Ascii,
                    Some("binary_little_endian") => PlyFormat::BinaryLittleEndian,
                    Some(other) => {
                        return Err(format!("unsupported PLY format: {other}").into());
                    }
                    None => return Err("PLY format line is incomplete".into()),
                });
            }
            "element" => {
                let name = tokens.next().ok_or("PLY element line is incomplete")?;
                current_element = name.to_string();
                if name == "vertex" {
                    let count = tokens.next().ok_or("PLY vertex element has no count")?;
                    vertex_count = Some(count.parse::<usize>()?);
                }
            }
            "property" if current_element == "vertex" => {
                let kind = tokens.next().ok_or("PLY property line is incomplete")?;
                if kind == "list" {
                    return Err("list properties are not supported on vertices".into());
                }
                let name = tokens.next().ok_or("PLY property line has no name")?;
                properties.push(PlyProperty {
                    name: name.to_string(),
                    kind: ScalarType::parse(kind)?,
                });
            }
            "end_header" => break,
            _ => {}
        }
    }

    let format = format.ok_or("PLY header declares no format")?;
    let vertex_count = vertex_count.ok_or("PLY header has no vertex element")?;

    Ok(PlyHeader {
        format,
        vertex_count,
        properties,
    })
}

fn vertex_progress(count: usize) -> Option<ProgressBar> {
    if count < PROGRESS_THRESHOLD {
        return None;
    }
    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} vertices ({percent}%) {msg}")
            .unwrap()
            .progress_chars("▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Parsing vertices");
    Some(pb)
}

fn read_ascii_body<R: BufRead>(
    reader: &mut R,
    header: &PlyHeader,
) -> Result<PointCloud, Box<dyn Error>> {
    let mut cloud = PointCloud::new();
    let pb = vertex_progress(header.vertex_count);
    let mut lines = reader.lines();

    for index in 0..header.vertex_count {
        let line = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => {
                    return Err(format!(
                        "PLY body ended after {index} of {} vertices",
                        header.vertex_count
                    )
                    .into());
                }
            }
        };

        let mut values = line.split_whitespace();
        let mut scratch = VertexScratch::new();
        for property in &header.properties {
            let token = values
                .next()
                .ok_or_else(|| format!("vertex {index} is missing a {} value", property.name))?;
            let value: f64 = token
                .parse()
                .map_err(|_| format!("vertex {index}: cannot parse {token:?} as a number"))?;
            scratch.apply(property, value);
        }
        cloud.push(scratch.into_point());

        if let Some(pb) = &pb {
            if index % 50_000 == 0 {
                pb.set_position(index as u64);
            }
        }
    }

    if let Some(pb) = &pb {
        pb.finish_with_message("Vertices parsed");
    }
    Ok(cloud)
}

fn read_binary_body<R: Read>(
    reader: &mut R,
    header: &PlyHeader,
) -> Result<PointCloud, Box<dyn Error>> {
    let stride: usize = header.properties.iter().map(|p| p.kind.byte_size()).sum();
    if stride == 0 {
        return Err("PLY vertex element declares no properties".into());
    }

    let mut cloud = PointCloud::new();
    let pb = vertex_progress(header.vertex_count);
    let mut buffer = vec![0u8; stride];

    for index in 0..header.vertex_count {
        reader.read_exact(&mut buffer).map_err(|_| {
            format!(
                "PLY body ended after {index} of {} vertices",
                header.vertex_count
            )
        })?;

        let mut scratch = VertexScratch::new();
        let mut offset = 0;
        for property in &header.properties {
            let value = decode_scalar(&buffer[offset..offset + property.kind.byte_size()], property.kind);
            scratch.apply(property, value);
            offset += property.kind.byte_size();
        }
        cloud.push(scratch.into_point());

        if let Some(pb) = &pb {
            if index % 50_000 == 0 {
                pb.set_position(index as u64);
            }
        }
    }

    if let Some(pb) = &pb {
        pb.finish_with_message("Vertices parsed");
    }
    Ok(cloud)
}

/// Decode one little-endian scalar into a value wide enough for every type.
fn decode_scalar(bytes: &[u8], kind: ScalarType) -> f64 {
    match kind {
        ScalarType::Char => bytes[0] as i8 as f64,
        ScalarType::UChar => bytes[0] as f64,
        ScalarType::Short => bytemuck::pod_read_unaligned::<i16>(bytes) as f64,
        ScalarType::UShort => bytemuck::pod_read_unaligned::<u16>(bytes) as f64,
        ScalarType::Int => bytemuck::pod_read_unaligned::<i32>(bytes) as f64,
        ScalarType::UInt => bytemuck::pod_read_unaligned::<u32>(bytes) as f64,
        ScalarType::Float => bytemuck::pod_read_unaligned::<f32>(bytes) as f64,
        ScalarType::Double => bytemuck::pod_read_unaligned::<f64>(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_ascii_positions_in_property_order() {
        let data = "\
ply
format ascii 1.0
element vertex 2
property float z
property float x
property float y
end_header
3.0 1.0 2.0
6.0 4.0 5.0
";
        let cloud = parse_ply(Cursor::new(data)).unwrap();
        assert_eq!(cloud.points_amount(), 2);
        assert!(!cloud.has_normals());
        assert_eq!(cloud.get_by_id(0).unwrap().position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(cloud.get_by_id(1).unwrap().position, Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn detects_supplied_normals() {
        let data = "\
ply
format ascii 1.0
element vertex 1
property float x
property float y
property float z
property float nx
property float ny
property float nz
end_header
0.0 0.0 0.0 0.0 1.0 0.0
";
        let cloud = parse_ply(Cursor::new(data)).unwrap();
        assert!(cloud.has_normals());
        assert_eq!(cloud.get_by_id(0).unwrap().normal, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn scales_uchar_colours() {
        let data = "\
ply
format ascii 1.0
element vertex 1
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
end_header
0.0 0.0 0.0 255 0 51
";
        let cloud = parse_ply(Cursor::new(data)).unwrap();
        let colour = cloud.get_by_id(0).unwrap().colour;
        assert!((colour.x - 1.0).abs() < 1e-6);
        assert!((colour.y - 0.0).abs() < 1e-6);
        assert!((colour.z - 0.2).abs() < 1e-6);
    }

    #[test]
    fn parses_binary_little_endian_bodies() {
        let header = "\
ply
format binary_little_endian 1.0
element vertex 2
property float x
property float y
property float z
end_header
";
        let mut data = header.as_bytes().to_vec();
        for value in [1.0f32, 2.0, 3.0, -4.0, -5.0, -6.0] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        let cloud = parse_ply(Cursor::new(data)).unwrap();
        assert_eq!(cloud.points_amount(), 2);
        assert_eq!(cloud.get_by_id(0).unwrap().position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(cloud.get_by_id(1).unwrap().position, Vec3::new(-4.0, -5.0, -6.0));
    }

    #[test]
    fn rejects_missing_magic() {
        assert!(parse_ply(Cursor::new("not a ply\n")).is_err());
    }

    #[test]
    fn rejects_unsupported_format() {
        let data = "\
ply
format binary_big_endian 1.0
element vertex 0
end_header
";
        assert!(parse_ply(Cursor::new(data)).is_err());
    }

    #[test]
    fn rejects_truncated_body() {
        let data = "\
ply
format ascii 1.0
element vertex 2
property float x
property float y
property float z
end_header
0.0 0.0 0.0
";
        assert!(parse_ply(Cursor::new(data)).is_err());
    }

    #[test]
    fn zero_vertices_is_an_empty_cloud() {
        let data = "\
ply
format ascii 1.0
element vertex 0
property float x
property float y
property float z
end_header
";
        let cloud = parse_ply(Cursor::new(data)).unwrap();
        assert!(cloud.is_empty());
    }
}
