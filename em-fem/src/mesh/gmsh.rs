//! Gmsh `.msh` reader (ASCII 2.2 and 4.1)
//!
//! Linear tetrahedra become volume elements carrying their physical volume
//! group; linear triangles become boundary faces whose marker is their
//! physical surface group. Points and lines are skipped. Any other element
//! type is rejected.

use super::{Mesh, MeshError, Point};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

const GMSH_POINT: i32 = 15;
const GMSH_LINE: i32 = 1;
const GMSH_TRIANGLE: i32 = 2;
const GMSH_TETRAHEDRON: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MshVersion {
    V2,
    V4,
}

/// Line cursor that skips blank lines and tracks 1-based line numbers
struct Cursor<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    last_line: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            last_line: 0,
        }
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        for (idx, line) in self.lines.by_ref() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                self.last_line = idx + 1;
                return Some((idx + 1, trimmed));
            }
        }
        None
    }

    fn expect_line(&mut self, what: &str) -> Result<(usize, &'a str), MeshError> {
        self.next_line().ok_or_else(|| {
            MeshError::parse(
                self.last_line,
                format!("unexpected end of file, expected {what}"),
            )
        })
    }

    fn expect_end(&mut self, section: &str) -> Result<(), MeshError> {
        let end = format!("$End{section}");
        let (line_no, line) = self.expect_line(&end)?;
        if line != end {
            return Err(MeshError::parse(line_no, format!("expected {end}, found {line:?}")));
        }
        Ok(())
    }

    fn skip_section(&mut self, header: &str) -> Result<(), MeshError> {
        let end = format!("$End{}", &header[1..]);
        loop {
            let (_, line) = self.expect_line(&end)?;
            if line == end {
                return Ok(());
            }
        }
    }
}

fn fields<T: FromStr>(line_no: usize, line: &str) -> Result<Vec<T>, MeshError> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<T>()
                .map_err(|_| MeshError::parse(line_no, format!("invalid number {tok:?}")))
        })
        .collect()
}

fn field_count(line_no: usize, values: &[usize], min: usize) -> Result<(), MeshError> {
    if values.len() < min {
        return Err(MeshError::parse(
            line_no,
            format!("expected at least {min} fields, found {}", values.len()),
        ));
    }
    Ok(())
}

/// Mesh entities before node tags are resolved to indices
#[derive(Default)]
struct RawMesh {
    node_index: HashMap<usize, usize>,
    points: Vec<Point>,
    tets: Vec<([usize; 4], Option<i32>)>,
    triangles: Vec<([usize; 3], i32)>,
}

impl RawMesh {
    fn add_node(&mut self, line_no: usize, tag: usize, point: Point) -> Result<(), MeshError> {
        if self.node_index.insert(tag, self.points.len()).is_some() {
            return Err(MeshError::parse(line_no, format!("duplicate node tag {tag}")));
        }
        self.points.push(point);
        Ok(())
    }

    fn add_element(
        &mut self,
        element_id: usize,
        element_type: i32,
        node_tags: &[usize],
        physical: Option<i32>,
        line_no: usize,
    ) -> Result<(), MeshError> {
        let needed = match element_type {
            GMSH_POINT | GMSH_LINE => return Ok(()),
            GMSH_TRIANGLE => 3,
            GMSH_TETRAHEDRON => 4,
            other => {
                return Err(MeshError::UnsupportedElement {
                    element_type: other,
                    element_id,
                });
            }
        };
        if node_tags.len() < needed {
            return Err(MeshError::parse(
                line_no,
                format!("element {element_id} lists {} nodes, expected {needed}", node_tags.len()),
            ));
        }
        if element_type == GMSH_TRIANGLE {
            self.triangles
                .push(([node_tags[0], node_tags[1], node_tags[2]], physical.unwrap_or(0)));
        } else {
            self.tets.push((
                [node_tags[0], node_tags[1], node_tags[2], node_tags[3]],
                physical,
            ));
        }
        Ok(())
    }

    fn into_mesh(self) -> Result<Mesh, MeshError> {
        let index = |tag: usize| -> Result<usize, MeshError> {
            self.node_index
                .get(&tag)
                .copied()
                .ok_or(MeshError::UnknownNode { node: tag })
        };

        let mut mesh = Mesh::new();
        mesh.nodes = self.points.clone();
        for (tags, physical) in &self.tets {
            let nodes = [index(tags[0])?, index(tags[1])?, index(tags[2])?, index(tags[3])?];
            mesh.add_element(nodes, *physical);
        }
        let mut faces = Vec::with_capacity(self.triangles.len());
        for (tags, marker) in &self.triangles {
            faces.push(([index(tags[0])?, index(tags[1])?, index(tags[2])?], *marker));
        }
        mesh.validate()?;
        mesh.resolve_boundary_owners(faces)?;
        Ok(mesh)
    }
}

/// Read and parse a mesh file
pub fn read_msh(path: impl AsRef<Path>) -> Result<Mesh, MeshError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mesh = parse_msh(&text)?;
    log::info!(
        "Loaded {}: {} nodes, {} tetrahedra, {} boundary faces, markers {:?}",
        path.display(),
        mesh.num_nodes(),
        mesh.num_elements(),
        mesh.boundaries.len(),
        mesh.markers()
    );
    Ok(mesh)
}

/// Parse the contents of an ASCII `.msh` file
pub fn parse_msh(text: &str) -> Result<Mesh, MeshError> {
    let mut cursor = Cursor::new(text);
    let mut version = None;
    let mut entities: HashMap<(usize, i32), i32> = HashMap::new();
    let mut raw = RawMesh::default();

    while let Some((line_no, line)) = cursor.next_line() {
        match line {
            "$MeshFormat" => {
                version = Some(parse_format(&mut cursor)?);
            }
            "$Entities" => {
                entities = parse_entities(&mut cursor)?;
            }
            "$Nodes" => match version {
                Some(MshVersion::V2) => parse_nodes_v2(&mut cursor, &mut raw)?,
                Some(MshVersion::V4) => parse_nodes_v4(&mut cursor, &mut raw)?,
                None => return Err(MeshError::parse(line_no, "$Nodes before $MeshFormat")),
            },
            "$Elements" => match version {
                Some(MshVersion::V2) => parse_elements_v2(&mut cursor, &mut raw)?,
                Some(MshVersion::V4) => parse_elements_v4(&mut cursor, &mut raw, &entities)?,
                None => return Err(MeshError::parse(line_no, "$Elements before $MeshFormat")),
            },
            header if header.starts_with('$') => cursor.skip_section(header)?,
            other => {
                return Err(MeshError::parse(
                    line_no,
                    format!("unexpected content outside a section: {other:?}"),
                ));
            }
        }
    }

    if version.is_none() {
        return Err(MeshError::parse(cursor.last_line, "missing $MeshFormat section"));
    }
    raw.into_mesh()
}

fn parse_format(cursor: &mut Cursor) -> Result<MshVersion, MeshError> {
    let (line_no, line) = cursor.expect_line("format line")?;
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(MeshError::parse(line_no, "format line needs version, file type and data size"));
    }
    if parts[1] != "0" {
        return Err(MeshError::UnsupportedVersion(format!("{} (binary)", parts[0])));
    }
    let version = match parts[0] {
        v if v.starts_with("2.") => MshVersion::V2,
        "4.1" => MshVersion::V4,
        v => return Err(MeshError::UnsupportedVersion(v.to_string())),
    };
    cursor.expect_end("MeshFormat")?;
    Ok(version)
}

/// Physical group of each entity `(dim, tag)`, first group wins
fn parse_entities(cursor: &mut Cursor) -> Result<HashMap<(usize, i32), i32>, MeshError> {
    let (line_no, line) = cursor.expect_line("entity counts")?;
    let counts: Vec<usize> = fields(line_no, line)?;
    field_count(line_no, &counts, 4)?;

    let mut physical = HashMap::new();
    for (dim, &count) in counts.iter().take(4).enumerate() {
        // points: tag x y z; higher dims: tag and a 6-value bounding box
        let phys_count_at = if dim == 0 { 4 } else { 7 };
        for _ in 0..count {
            let (line_no, line) = cursor.expect_line("entity")?;
            let values: Vec<f64> = fields(line_no, line)?;
            if values.len() <= phys_count_at {
                return Err(MeshError::parse(line_no, "truncated entity record"));
            }
            let tag = values[0] as i32;
            let num_phys = values[phys_count_at] as usize;
            if num_phys > 0 {
                let first = values
                    .get(phys_count_at + 1)
                    .ok_or_else(|| MeshError::parse(line_no, "missing physical tag"))?;
                physical.insert((dim, tag), *first as i32);
            }
        }
    }
    cursor.expect_end("Entities")?;
    Ok(physical)
}

fn parse_nodes_v2(cursor: &mut Cursor, raw: &mut RawMesh) -> Result<(), MeshError> {
    let (line_no, line) = cursor.expect_line("node count")?;
    let count: usize = line
        .parse()
        .map_err(|_| MeshError::parse(line_no, "invalid node count"))?;
    for _ in 0..count {
        let (line_no, line) = cursor.expect_line("node")?;
        let values: Vec<f64> = fields(line_no, line)?;
        if values.len() < 4 {
            return Err(MeshError::parse(line_no, "node needs a tag and three coordinates"));
        }
        raw.add_node(
            line_no,
            values[0] as usize,
            Point::new(values[1], values[2], values[3]),
        )?;
    }
    cursor.expect_end("Nodes")
}

fn parse_nodes_v4(cursor: &mut Cursor, raw: &mut RawMesh) -> Result<(), MeshError> {
    let (line_no, line) = cursor.expect_line("node header")?;
    let header: Vec<usize> = fields(line_no, line)?;
    field_count(line_no, &header, 4)?;

    for _ in 0..header[0] {
        let (line_no, line) = cursor.expect_line("node block header")?;
        let block: Vec<usize> = fields(line_no, line)?;
        field_count(line_no, &block, 4)?;
        let in_block = block[3];

        let mut tags = Vec::with_capacity(in_block);
        for _ in 0..in_block {
            let (line_no, line) = cursor.expect_line("node tag")?;
            let tag: usize = line
                .parse()
                .map_err(|_| MeshError::parse(line_no, "invalid node tag"))?;
            tags.push(tag);
        }
        for tag in tags {
            let (line_no, line) = cursor.expect_line("node coordinates")?;
            let xyz: Vec<f64> = fields(line_no, line)?;
            if xyz.len() < 3 {
                return Err(MeshError::parse(line_no, "node needs three coordinates"));
            }
            raw.add_node(line_no, tag, Point::new(xyz[0], xyz[1], xyz[2]))?;
        }
    }
    cursor.expect_end("Nodes")
}

fn parse_elements_v2(cursor: &mut Cursor, raw: &mut RawMesh) -> Result<(), MeshError> {
    let (line_no, line) = cursor.expect_line("element count")?;
    let count: usize = line
        .parse()
        .map_err(|_| MeshError::parse(line_no, "invalid element count"))?;
    for _ in 0..count {
        let (line_no, line) = cursor.expect_line("element")?;
        let values: Vec<i64> = fields(line_no, line)?;
        if values.len() < 3 {
            return Err(MeshError::parse(line_no, "truncated element record"));
        }
        let num_tags = values[2] as usize;
        let nodes_at = 3 + num_tags;
        if values.len() < nodes_at {
            return Err(MeshError::parse(line_no, "element tag list is truncated"));
        }
        let physical = (num_tags > 0 && values[3] != 0).then_some(values[3] as i32);
        let node_tags: Vec<usize> = values[nodes_at..].iter().map(|&v| v as usize).collect();
        raw.add_element(values[0] as usize, values[1] as i32, &node_tags, physical, line_no)?;
    }
    cursor.expect_end("Elements")
}

fn parse_elements_v4(
    cursor: &mut Cursor,
    raw: &mut RawMesh,
    entities: &HashMap<(usize, i32), i32>,
) -> Result<(), MeshError> {
    let (line_no, line) = cursor.expect_line("element header")?;
    let header: Vec<usize> = fields(line_no, line)?;
    field_count(line_no, &header, 4)?;

    for _ in 0..header[0] {
        let (line_no, line) = cursor.expect_line("element block header")?;
        let block: Vec<i64> = fields(line_no, line)?;
        if block.len() < 4 {
            return Err(MeshError::parse(line_no, "truncated element block header"));
        }
        let dim = block[0] as usize;
        let physical = entities.get(&(dim, block[1] as i32)).copied();
        let element_type = block[2] as i32;

        for _ in 0..block[3] {
            let (line_no, line) = cursor.expect_line("element")?;
            let values: Vec<usize> = fields(line_no, line)?;
            field_count(line_no, &values, 1)?;
            raw.add_element(values[0], element_type, &values[1..], physical, line_no)?;
        }
    }
    cursor.expect_end("Elements")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TETS_V2: &str = "\
$MeshFormat
2.2 0 8
$EndMeshFormat
$PhysicalNames
2
2 11 \"PhaseA\"
3 1 \"Air\"
$EndPhysicalNames
$Nodes
5
1 0 0 0
2 1 0 0
3 0 1 0
4 0 0 1
5 1 1 1
$EndNodes
$Elements
4
1 15 2 0 1 1
2 2 2 11 1 1 2 3
3 4 2 1 1 1 2 3 4
4 4 2 9 2 2 3 4 5
$EndElements
";

    #[test]
    fn test_parse_v2() {
        let mesh = parse_msh(TWO_TETS_V2).unwrap();
        assert_eq!(mesh.num_nodes(), 5);
        assert_eq!(mesh.num_elements(), 2);
        assert_eq!(mesh.elements[0].physical_tag, Some(1));
        assert_eq!(mesh.elements[1].physical_tag, Some(9));
        assert_eq!(mesh.boundaries.len(), 1);
        assert_eq!(mesh.boundaries[0].marker, 11);
        assert_eq!(mesh.boundaries[0].element_idx, 0);
        assert_eq!(mesh.boundaries[0].local_idx, 3);
    }

    #[test]
    fn test_rejects_unsupported_element() {
        let text = TWO_TETS_V2.replace("3 4 2 1 1 1 2 3 4", "3 11 2 1 1 1 2 3 4");
        let err = parse_msh(&text).unwrap_err();
        assert!(matches!(
            err,
            MeshError::UnsupportedElement {
                element_type: 11,
                element_id: 3
            }
        ));
    }

    #[test]
    fn test_unknown_node_reference() {
        let text = TWO_TETS_V2.replace("4 4 2 9 2 2 3 4 5", "4 4 2 9 2 2 3 4 42");
        assert!(matches!(
            parse_msh(&text).unwrap_err(),
            MeshError::UnknownNode { node: 42 }
        ));
    }

    #[test]
    fn test_parse_error_carries_line() {
        let text = TWO_TETS_V2.replace("3 0 1 0", "3 0 x 0");
        match parse_msh(&text).unwrap_err() {
            MeshError::Parse { line, .. } => assert_eq!(line, 13),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_binary_rejected() {
        let text = TWO_TETS_V2.replace("2.2 0 8", "2.2 1 8");
        assert!(matches!(
            parse_msh(&text).unwrap_err(),
            MeshError::UnsupportedVersion(_)
        ));
    }
}
