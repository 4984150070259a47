use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;
use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Append `other`, rebasing its indices.
    pub fn append(&mut self, other: Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    pub fn bounds(&self) -> Option<Aabb> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from_array(v.pos));
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Aabb { min, max })
    }

    /// Nearest ray parameter `t` at which the ray hits this mesh placed by
    /// `transform`. `dir` need not be normalised; `t` is in units of `dir`.
    pub fn ray_hit(&self, transform: &Mat4, origin: Vec3, dir: Vec3) -> Option<f32> {
        let world = |i: u32| {
            self.vertices
                .get(i as usize)
                .map(|v| transform.transform_point3(Vec3::from_array(v.pos)))
        };

        let mut nearest: Option<f32> = None;
        for tri in self.indices.chunks_exact(3) {
            let (Some(a), Some(b), Some(c)) = (world(tri[0]), world(tri[1]), world(tri[2])) else {
                continue;
            };
            if let Some(t) = ray_triangle(origin, dir, a, b, c) {
                if nearest.map_or(true, |n| t < n) {
                    nearest = Some(t);
                }
            }
        }
        nearest
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Möller–Trumbore ray/triangle test, both faces count as hits.
pub fn ray_triangle(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    const EPS: f32 = 1e-7;
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPS {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    (t > EPS).then_some(t)
}

/// Solid cube of edge `size` centred on the origin, used for the debug marker.
pub fn create_marker_mesh(size: f32, color: [f32; 4]) -> Mesh {
    let h = size * 0.5;
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([1.0, 0.0, 0.0], [[h, -h, -h], [h, h, -h], [h, h, h], [h, -h, h]]),
        ([-1.0, 0.0, 0.0], [[-h, -h, h], [-h, h, h], [-h, h, -h], [-h, -h, -h]]),
        ([0.0, 1.0, 0.0], [[-h, h, -h], [-h, h, h], [h, h, h], [h, h, -h]]),
        ([0.0, -1.0, 0.0], [[-h, -h, h], [-h, -h, -h], [h, -h, -h], [h, -h, h]]),
        ([0.0, 0.0, 1.0], [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]]),
        ([0.0, 0.0, -1.0], [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]]),
    ];

    let mut mesh = Mesh::empty();
    for (normal, corners) in faces {
        let base = mesh.vertices.len() as u32;
        mesh.vertices.extend(corners.iter().map(|&pos| Vertex { pos, normal, color }));
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_triangle_front_and_back() {
        let (a, b, c) = (Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        let t = ray_triangle(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, a, b, c).unwrap();
        assert!((t - 5.0).abs() < 1e-5);
        let t = ray_triangle(Vec3::new(0.0, 0.0, -2.0), Vec3::Z, a, b, c).unwrap();
        assert!((t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn ray_misses_triangle_behind_or_beside() {
        let (a, b, c) = (Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        assert!(ray_triangle(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, a, b, c).is_none());
        assert!(ray_triangle(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z, a, b, c).is_none());
        // parallel
        assert!(ray_triangle(Vec3::new(0.0, 0.0, 5.0), Vec3::X, a, b, c).is_none());
    }

    #[test]
    fn marker_cube_bounds_and_nearest_hit() {
        let cube = create_marker_mesh(0.2, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        let bounds = cube.bounds().unwrap();
        assert!((bounds.size() - Vec3::splat(0.2)).length() < 1e-6);
        assert!(bounds.center().length() < 1e-6);

        let transform = Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0));
        let t = cube.ray_hit(&transform, Vec3::ZERO, Vec3::NEG_Z).unwrap();
        assert!((t - 2.9).abs() < 1e-5, "front face should be hit first, got {t}");
    }

    #[test]
    fn append_rebases_indices() {
        let mut a = create_marker_mesh(1.0, [1.0; 4]);
        let b = create_marker_mesh(1.0, [1.0; 4]);
        a.append(b);
        assert_eq!(a.vertices.len(), 48);
        assert_eq!(*a.indices.iter().max().unwrap(), 47);
        assert!(Mesh::empty().bounds().is_none());
    }
}
