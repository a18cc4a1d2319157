//! Mesh validation utilities.
//!
//! `MeshValidator` checks triangulation integrity of a [`SurfaceMesh`]:
//! index stride and range, counter-clockwise faces in plan view, the
//! empty-circumcircle property and coverage of the convex hull.

use glam::DVec2;

use crate::surface::SurfaceMesh;

/// Validator for `SurfaceMesh` integrity checks.
pub struct MeshValidator<'a> {
    mesh: &'a SurfaceMesh,
}

impl<'a> MeshValidator<'a> {
    pub fn new(mesh: &'a SurfaceMesh) -> Self {
        Self { mesh }
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.indices.len() / 3
    }

    pub fn is_index_stride_valid(&self) -> bool {
        self.mesh.indices.len() % 3 == 0
    }

    pub fn are_indices_in_range(&self) -> bool {
        let max_idx = self.vertex_count() as u32;
        self.mesh.indices.iter().all(|&i| i < max_idx)
    }

    pub fn scalars_match_vertices(&self) -> bool {
        self.mesh.scalars.len() == self.vertex_count()
    }

    fn plan(&self, i: u32) -> DVec2 {
        self.mesh.positions[i as usize].truncate()
    }

    fn triangles(&self) -> impl Iterator<Item = [DVec2; 3]> + '_ {
        self.mesh
            .indices
            .chunks_exact(3)
            .map(|t| [self.plan(t[0]), self.plan(t[1]), self.plan(t[2])])
    }

    /// Every face has positive signed area seen from +z.
    pub fn are_faces_ccw(&self) -> bool {
        self.triangles().all(|[a, b, c]| (b - a).perp_dot(c - a) > 0.0)
    }

    /// No vertex lies strictly inside the circumcircle of any face.
    /// Quadratic; meant for test-sized meshes.
    pub fn is_delaunay(&self, tolerance: f64) -> bool {
        let verts: Vec<DVec2> = self.mesh.positions.iter().map(|p| p.truncate()).collect();
        self.triangles().all(|[a, b, c]| {
            let Some((center, radius)) = circumcircle(a, b, c) else {
                return false;
            };
            verts
                .iter()
                .all(|p| p.distance(center) >= radius * (1.0 - tolerance))
        })
    }

    /// Faces add up to the area of the vertices' convex hull, so no boundary
    /// triangle is missing. `tolerance` is relative to the hull area.
    pub fn covers_hull(&self, tolerance: f64) -> bool {
        let verts: Vec<DVec2> = self.mesh.positions.iter().map(|p| p.truncate()).collect();
        let hull = hull_area(&verts);
        let faces: f64 = self
            .triangles()
            .map(|[a, b, c]| 0.5 * (b - a).perp_dot(c - a))
            .sum();
        (faces - hull).abs() <= tolerance * hull.max(f64::MIN_POSITIVE)
    }

    /// Run all validation checks and return a list of error messages.
    /// An empty list means the mesh is valid.
    pub fn validate_all(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.is_index_stride_valid() {
            errors.push(format!(
                "Index buffer length {} is not a multiple of 3",
                self.mesh.indices.len()
            ));
            return errors;
        }

        if !self.are_indices_in_range() {
            let max_idx = self.vertex_count() as u32;
            let out_of_range: Vec<_> = self
                .mesh
                .indices
                .iter()
                .filter(|&&i| i >= max_idx)
                .take(5)
                .collect();
            errors.push(format!(
                "Indices out of range (vertex_count={}): {:?}",
                max_idx, out_of_range
            ));
            return errors;
        }

        if !self.scalars_match_vertices() {
            errors.push(format!(
                "{} scalars for {} vertices",
                self.mesh.scalars.len(),
                self.vertex_count()
            ));
        }

        if !self.are_faces_ccw() {
            errors.push("Some faces are clockwise or degenerate".to_string());
        }

        if !self.is_delaunay(1e-9) {
            errors.push("A vertex lies inside a face circumcircle".to_string());
        }

        if !self.covers_hull(1e-9) {
            errors.push("Faces do not cover the convex hull".to_string());
        }

        errors
    }
}

fn circumcircle(a: DVec2, b: DVec2, c: DVec2) -> Option<(DVec2, f64)> {
    let ab = b - a;
    let ac = c - a;
    let d = 2.0 * ab.perp_dot(ac);
    if d.abs() < f64::EPSILON {
        return None;
    }
    let ux = (ac.y * ab.length_squared() - ab.y * ac.length_squared()) / d;
    let uy = (ab.x * ac.length_squared() - ac.x * ab.length_squared()) / d;
    let offset = DVec2::new(ux, uy);
    Some((a + offset, offset.length()))
}

/// Area of the convex hull (monotone chain).
fn hull_area(points: &[DVec2]) -> f64 {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return 0.0;
    }
    let mut hull: Vec<DVec2> = Vec::with_capacity(pts.len() + 1);
    let push = |hull: &mut Vec<DVec2>, floor: usize, p: DVec2| {
        while hull.len() >= floor + 2 {
            let (a, b) = (hull[hull.len() - 2], hull[hull.len() - 1]);
            if (b - a).perp_dot(p - a) > 0.0 {
                break;
            }
            hull.pop();
        }
        hull.push(p);
    };
    for &p in &pts {
        push(&mut hull, 0, p);
    }
    let floor = hull.len() - 1;
    for &p in pts.iter().rev().skip(1) {
        push(&mut hull, floor, p);
    }
    hull.windows(2).map(|w| w[0].perp_dot(w[1])).sum::<f64>() * 0.5
}
