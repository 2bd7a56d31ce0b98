//! STL decoding, both the binary layout and the `solid`/`facet`/`endsolid`
//! text layout. Colour and attribute data is ignored.

use crate::geometry::LoadError;
use crate::math::Vec3f;

const HEADER_LEN: usize = 80;
const PREAMBLE_LEN: usize = HEADER_LEN + 4;
const RECORD_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Facet normal as stored in the file. May be zero.
    pub normal: Vec3f,
    pub vertices: [Vec3f; 3],
}

pub fn parse_stl(bytes: &[u8]) -> Result<Vec<Triangle>, LoadError> {
    if is_binary(bytes) {
        parse_binary(bytes)
    } else if starts_with_solid(bytes) {
        parse_ascii(bytes)
    } else {
        Err(LoadError::parse("unrecognized data, expected binary or text STL"))
    }
}

fn declared_triangles(bytes: &[u8]) -> usize {
    u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize
}

fn starts_with_solid(bytes: &[u8]) -> bool {
    let trimmed = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|start| &bytes[start..])
        .unwrap_or(&[]);
    trimmed.len() >= 5 && trimmed[..5].eq_ignore_ascii_case(b"solid")
}

// Binary files may also start their header with "solid", so an exact size
// match takes priority over the keyword.
fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < PREAMBLE_LEN {
        return false;
    }
    let expected = (declared_triangles(bytes) as u64) * RECORD_LEN as u64 + PREAMBLE_LEN as u64;
    if expected == bytes.len() as u64 {
        return true;
    }
    !starts_with_solid(bytes)
}

fn read_vec3(record: &[u8], offset: usize) -> Vec3f {
    let f = |i: usize| {
        let at = offset + i * 4;
        f32::from_le_bytes([record[at], record[at + 1], record[at + 2], record[at + 3]])
    };
    Vec3f::new(f(0), f(1), f(2))
}

fn parse_binary(bytes: &[u8]) -> Result<Vec<Triangle>, LoadError> {
    let count = declared_triangles(bytes);
    let available = (bytes.len() - PREAMBLE_LEN) / RECORD_LEN;
    if count > available {
        return Err(LoadError::parse(format!(
            "binary STL declares {} triangles but only {} are present",
            count, available
        )));
    }

    let mut triangles = Vec::with_capacity(count);
    for record in bytes[PREAMBLE_LEN..].chunks_exact(RECORD_LEN).take(count) {
        let triangle = Triangle {
            normal: read_vec3(record, 0),
            vertices: [read_vec3(record, 12), read_vec3(record, 24), read_vec3(record, 36)],
        };
        if !triangle.vertices.iter().all(|v| v.iter().all(|c| c.is_finite())) {
            return Err(LoadError::parse(format!(
                "triangle {} has non-finite coordinates",
                triangles.len()
            )));
        }
        triangles.push(triangle);
    }
    Ok(triangles)
}

struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    peeked: Option<(usize, &'a str)>,
    last_line: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        let inner = text
            .lines()
            .enumerate()
            .flat_map(|(i, line)| line.split_whitespace().map(move |tok| (i + 1, tok)));
        Self {
            inner: Box::new(inner),
            peeked: None,
            last_line: 1,
        }
    }

    fn next(&mut self) -> Option<(usize, &'a str)> {
        let tok = self.peeked.take().or_else(|| self.inner.next());
        if let Some((line, _)) = tok {
            self.last_line = line;
        }
        tok
    }

    fn peek(&mut self) -> Option<(usize, &'a str)> {
        if self.peeked.is_none() {
            self.peeked = self.inner.next();
        }
        self.peeked
    }

    /// Drops the remaining tokens of `line` (solid names).
    fn skip_line(&mut self, line: usize) {
        while matches!(self.peek(), Some((l, _)) if l == line) {
            self.next();
        }
    }

    fn keyword(&mut self, expected: &str) -> Result<(), LoadError> {
        match self.next() {
            Some((_, tok)) if tok.eq_ignore_ascii_case(expected) => Ok(()),
            Some((line, tok)) => Err(LoadError::parse_at(
                line,
                format!("expected '{}', found '{}'", expected, tok),
            )),
            None => Err(LoadError::parse_at(
                self.last_line,
                format!("expected '{}', found end of file", expected),
            )),
        }
    }

    fn float(&mut self) -> Result<f32, LoadError> {
        let (line, tok) = self.next().ok_or_else(|| {
            LoadError::parse_at(self.last_line, "expected a number, found end of file")
        })?;
        match tok.parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(LoadError::parse_at(line, format!("invalid number '{}'", tok))),
        }
    }

    fn vec3(&mut self) -> Result<Vec3f, LoadError> {
        Ok(Vec3f::new(self.float()?, self.float()?, self.float()?))
    }
}

fn parse_facet(tokens: &mut Tokens) -> Result<Triangle, LoadError> {
    tokens.keyword("normal")?;
    let normal = tokens.vec3()?;
    tokens.keyword("outer")?;
    tokens.keyword("loop")?;
    let mut vertices = [Vec3f::zeros(); 3];
    for vertex in vertices.iter_mut() {
        tokens.keyword("vertex")?;
        *vertex = tokens.vec3()?;
    }
    tokens.keyword("endloop")?;
    tokens.keyword("endfacet")?;
    Ok(Triangle { normal, vertices })
}

fn parse_ascii(bytes: &[u8]) -> Result<Vec<Triangle>, LoadError> {
    // Only the ASCII keywords and numbers matter; names may be in any encoding.
    let text = String::from_utf8_lossy(bytes);

    let mut tokens = Tokens::new(&text);
    let mut triangles = Vec::new();
    let mut in_solid = false;

    while let Some((line, tok)) = tokens.next() {
        if tok.eq_ignore_ascii_case("solid") && !in_solid {
            in_solid = true;
            tokens.skip_line(line);
        } else if tok.eq_ignore_ascii_case("facet") && in_solid {
            triangles.push(parse_facet(&mut tokens)?);
        } else if tok.eq_ignore_ascii_case("endsolid") && in_solid {
            in_solid = false;
            tokens.skip_line(line);
        } else {
            return Err(LoadError::parse_at(line, format!("unexpected '{}'", tok)));
        }
    }

    if in_solid {
        log::debug!("text STL ends without 'endsolid'");
    }
    Ok(triangles)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn binary_stl(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            bytes.extend(std::iter::repeat(0u8).take(12));
            for v in tri {
                for c in v {
                    bytes.extend_from_slice(&c.to_le_bytes());
                }
            }
            bytes.extend_from_slice(&0u16.to_le_bytes());
        }
        bytes
    }

    const TETRA_ASCII: &str = "solid tetra
  facet normal 0 0 -1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
  facet normal 0 -1 0
    outer loop
      vertex 0 0 0
      vertex 0 0 1
      vertex 1 0 0
    endloop
  endfacet
endsolid tetra
";

    #[test]
    fn parses_text_facets() {
        let tris = parse_stl(TETRA_ASCII.as_bytes()).unwrap();
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[0].normal, Vec3f::new(0.0, 0.0, -1.0));
        assert_eq!(tris[1].vertices[1], Vec3f::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn parses_binary_records() {
        let bytes = binary_stl(&[[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 3.0, 0.0]]]);
        let tris = parse_stl(&bytes).unwrap();
        assert_eq!(tris.len(), 1);
        assert_eq!(tris[0].vertices[2], Vec3f::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn binary_header_starting_with_solid_is_still_binary() {
        let mut bytes = binary_stl(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        bytes[..5].copy_from_slice(b"solid");
        assert_eq!(parse_stl(&bytes).unwrap().len(), 1);
    }

    #[test]
    fn truncated_binary_is_a_parse_error() {
        let mut bytes = binary_stl(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        bytes[80..84].copy_from_slice(&5u32.to_le_bytes());
        assert!(matches!(parse_stl(&bytes), Err(LoadError::Parse { .. })));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_stl(b"<html>not found</html>"),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn bad_number_reports_its_line() {
        let broken = TETRA_ASCII.replace("vertex 1 0 0\n      vertex 0 1 0", "vertex 1 x 0\n      vertex 0 1 0");
        match parse_stl(broken.as_bytes()) {
            Err(LoadError::Parse { line, .. }) => assert_eq!(line, Some(5)),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn facet_with_two_vertices_is_rejected() {
        let broken = "solid s\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nendloop\nendfacet\nendsolid s\n";
        assert!(matches!(parse_stl(broken.as_bytes()), Err(LoadError::Parse { .. })));
    }

    #[test]
    fn latin1_solid_name_is_accepted() {
        let mut bytes = b"solid Halterung \xe4u\xdfen\n".to_vec();
        bytes.extend_from_slice(TETRA_ASCII.split_once('\n').unwrap().1.as_bytes());
        assert!(std::str::from_utf8(&bytes).is_err());
        assert_eq!(parse_stl(&bytes).unwrap().len(), 2);
    }

    #[test]
    fn empty_solid_parses_to_no_triangles() {
        assert!(parse_stl(b"solid empty\nendsolid empty\n").unwrap().is_empty());
    }
}
