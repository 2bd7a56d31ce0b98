use std::fmt;

use rapier3d::parry::query::{Ray, RayCast};
use rapier3d::parry::shape::TriMesh;

use crate::geometry::{LoadError, Triangle};
use crate::math::{Isometry3f, Point3f, Vec3f};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Normalized triangle soup ready for upload: centred on the origin and
/// uniformly scaled so its longest side equals the target size.
pub struct RenderableMesh {
    vertices: Vec<MeshVertex>,
    collider: TriMesh,
    /// Bounding-box centre of the source data, in source units.
    center_offset: Vec3f,
    /// Bounding-box size of the source data, in source units.
    source_extent: Vec3f,
    scale: f32,
    highlighted: bool,
}

fn face_normal(tri: &Triangle) -> Vec3f {
    let [a, b, c] = tri.vertices;
    (b - a)
        .cross(&(c - a))
        .try_normalize(f32::EPSILON)
        .or_else(|| tri.normal.try_normalize(f32::EPSILON))
        .unwrap_or_else(Vec3f::zeros)
}

impl RenderableMesh {
    pub fn from_triangles(triangles: &[Triangle], target_size: f32) -> Result<Self, LoadError> {
        if triangles.is_empty() {
            return Err(LoadError::EmptyGeometry);
        }

        let mut min = Vec3f::repeat(f32::INFINITY);
        let mut max = Vec3f::repeat(f32::NEG_INFINITY);
        for v in triangles.iter().flat_map(|t| t.vertices.iter()) {
            min = min.inf(v);
            max = max.sup(v);
        }
        let source_extent = max - min;
        let longest = source_extent.max();
        if !(longest > 0.0) || !longest.is_finite() {
            return Err(LoadError::EmptyGeometry);
        }

        let center_offset = (min + max) * 0.5;
        let scale = target_size / longest;

        let mut vertices = Vec::with_capacity(triangles.len() * 3);
        let mut points = Vec::with_capacity(triangles.len() * 3);
        for tri in triangles {
            // Uniform scaling keeps face normals valid.
            let normal = face_normal(tri);
            for v in tri.vertices.iter() {
                let p = (v - center_offset) * scale;
                vertices.push(MeshVertex {
                    position: p.into(),
                    normal: normal.into(),
                });
                points.push(Point3f::from(p));
            }
        }
        let indices = (0..triangles.len() as u32)
            .map(|i| [3 * i, 3 * i + 1, 3 * i + 2])
            .collect();

        Ok(Self {
            vertices,
            collider: TriMesh::new(points, indices),
            center_offset,
            source_extent,
            scale,
            highlighted: false,
        })
    }

    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn center_offset(&self) -> Vec3f {
        self.center_offset
    }

    pub fn source_extent(&self) -> Vec3f {
        self.source_extent
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Axis-aligned bounds of the normalized vertices as (min, max).
    pub fn bounds(&self) -> (Vec3f, Vec3f) {
        let mut min = Vec3f::repeat(f32::INFINITY);
        let mut max = Vec3f::repeat(f32::NEG_INFINITY);
        for v in &self.vertices {
            let p = Vec3f::from(v.position);
            min = min.inf(&p);
            max = max.sup(&p);
        }
        (min, max)
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }

    /// Emissive term for the renderer: the highlight colour while grabbed.
    pub fn emissive(&self, highlight: [f32; 3]) -> [f32; 3] {
        if self.highlighted {
            highlight
        } else {
            [0.0; 3]
        }
    }

    /// Distance along `ray` to the nearest hit with the mesh placed at `placement`.
    pub fn intersect_ray(&self, ray: &Ray, placement: &Isometry3f, max_distance: f32) -> Option<f32> {
        // Not solid: rays starting inside the model report the surface they exit through.
        self.collider.cast_ray(placement, ray, max_distance, false)
    }
}

impl fmt::Debug for RenderableMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderableMesh")
            .field("triangles", &self.triangle_count())
            .field("center_offset", &self.center_offset)
            .field("source_extent", &self.source_extent)
            .field("scale", &self.scale)
            .field("highlighted", &self.highlighted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Point3f, Vec3f};

    fn tri(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> Triangle {
        Triangle {
            normal: Vec3f::zeros(),
            vertices: [Vec3f::from(a), Vec3f::from(b), Vec3f::from(c)],
        }
    }

    // Two triangles spanning a 10 x 4 x 6 box offset far from the origin.
    fn offset_box_triangles() -> Vec<Triangle> {
        vec![
            tri([100.0, 50.0, -20.0], [110.0, 50.0, -20.0], [100.0, 54.0, -20.0]),
            tri([110.0, 54.0, -14.0], [100.0, 54.0, -14.0], [110.0, 50.0, -14.0]),
        ]
    }

    #[test]
    fn normalizes_to_target_size_and_centres() {
        let mesh = RenderableMesh::from_triangles(&offset_box_triangles(), 2.0).unwrap();
        let (min, max) = mesh.bounds();
        let size = max - min;
        assert!((size.max() - 2.0).abs() < 1e-5);
        assert!(((min + max) * 0.5).norm() < 1e-5);
        assert!((mesh.scale() - 0.2).abs() < 1e-6);
        assert_eq!(mesh.center_offset(), Vec3f::new(105.0, 52.0, -17.0));
        assert_eq!(mesh.source_extent(), Vec3f::new(10.0, 4.0, 6.0));
    }

    #[test]
    fn computes_flat_normals() {
        let mesh = RenderableMesh::from_triangles(&offset_box_triangles(), 2.0).unwrap();
        for v in &mesh.vertices()[..3] {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn degenerate_triangle_falls_back_to_file_normal() {
        let mut t = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        t.normal = Vec3f::new(0.0, 2.0, 0.0);
        let mesh = RenderableMesh::from_triangles(&[t], 2.0).unwrap();
        assert_eq!(mesh.vertices()[0].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn no_triangles_is_empty_geometry() {
        assert!(matches!(
            RenderableMesh::from_triangles(&[], 2.0),
            Err(LoadError::EmptyGeometry)
        ));
    }

    #[test]
    fn collapsed_geometry_is_empty_geometry() {
        let t = tri([1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]);
        assert!(matches!(
            RenderableMesh::from_triangles(&[t], 2.0),
            Err(LoadError::EmptyGeometry)
        ));
    }

    #[test]
    fn vertex_bytes_cover_every_vertex() {
        let mesh = RenderableMesh::from_triangles(&offset_box_triangles(), 2.0).unwrap();
        assert_eq!(mesh.vertex_bytes().len(), 6 * std::mem::size_of::<MeshVertex>());
    }

    #[test]
    fn ray_hits_placed_mesh() {
        let mesh = RenderableMesh::from_triangles(&offset_box_triangles(), 2.0).unwrap();
        let placement = Isometry3f::translation(0.0, 1.0, 0.0);
        // Normalized mesh spans z in [-0.6, 0.6]; the upper-right face lies on z = 0.6.
        let ray = Ray::new(Point3f::new(0.5, 1.1, 5.0), -Vec3f::z());
        let toi = mesh.intersect_ray(&ray, &placement, f32::MAX).unwrap();
        assert!((toi - 4.4).abs() < 1e-4);

        let miss = Ray::new(Point3f::new(0.0, 3.0, 5.0), -Vec3f::z());
        assert!(mesh.intersect_ray(&miss, &placement, f32::MAX).is_none());
    }

    #[test]
    fn highlight_drives_emissive() {
        let mut mesh = RenderableMesh::from_triangles(&offset_box_triangles(), 2.0).unwrap();
        assert_eq!(mesh.emissive([0.5; 3]), [0.0; 3]);
        mesh.set_highlighted(true);
        assert_eq!(mesh.emissive([0.5; 3]), [0.5; 3]);
    }
}
