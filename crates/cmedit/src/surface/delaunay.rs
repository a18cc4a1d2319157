//! Sweep-hull Delaunay triangulation in the xy plane.
//!
//! Points are inserted in x-then-y order, so each new point lies outside the
//! current convex hull. It is joined to every hull edge it sees, and the edge
//! opposite it in each new triangle is flipped until locally Delaunay.
//! Adjacency lives in a directed-edge map: the triangle on the other side of
//! edge `(a, b)` owns `(b, a)`.

use std::collections::HashMap;

use glam::DVec2;

use crate::error::MeshError;

/// Triangles thinner than this (normalized units) are dropped
const DEGENERATE_AREA: f64 = 1e-14;

fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Positive when `p` lies strictly inside the circumcircle of CCW `(a, b, c)`.
fn in_circle(a: DVec2, b: DVec2, c: DVec2, p: DVec2) -> f64 {
    let (ad, bd, cd) = (a - p, b - p, c - p);
    let (al, bl, cl) = (ad.length_squared(), bd.length_squared(), cd.length_squared());
    ad.x * (bd.y * cl - bl * cd.y) - ad.y * (bd.x * cl - bl * cd.x) + al * (bd.x * cd.y - bd.y * cd.x)
}

#[derive(Debug, Clone, Copy)]
struct Tri {
    v: [usize; 3],
    alive: bool,
}

impl Tri {
    fn apex(&self, a: usize, b: usize) -> usize {
        self.v
            .iter()
            .copied()
            .find(|&v| v != a && v != b)
            .unwrap_or(a)
    }
}

struct Builder {
    pts: Vec<DVec2>,
    tris: Vec<Tri>,
    edges: HashMap<(usize, usize), usize>,
    /// Convex hull, counter-clockwise
    hull: Vec<usize>,
}

impl Builder {
    fn new(pts: Vec<DVec2>) -> Self {
        Self {
            pts,
            tris: Vec::new(),
            edges: HashMap::new(),
            hull: Vec::new(),
        }
    }

    fn add_tri(&mut self, v: [usize; 3]) -> usize {
        let id = self.tris.len();
        self.tris.push(Tri { v, alive: true });
        for k in 0..3 {
            self.edges.insert((v[k], v[(k + 1) % 3]), id);
        }
        id
    }

    fn kill_tri(&mut self, id: usize) {
        let v = self.tris[id].v;
        self.tris[id].alive = false;
        for k in 0..3 {
            let key = (v[k], v[(k + 1) % 3]);
            if self.edges.get(&key) == Some(&id) {
                self.edges.remove(&key);
            }
        }
    }

    /// Fan the first non-collinear point `k` over the collinear run `0..k`.
    fn seed(&mut self, k: usize) {
        let (p0, p1, pk) = (self.pts[0], self.pts[1], self.pts[k]);
        if orient(p0, p1, pk) > 0.0 {
            for i in 0..k - 1 {
                self.add_tri([i, i + 1, k]);
            }
            self.hull = (0..=k).collect();
        } else {
            for i in 0..k - 1 {
                self.add_tri([i + 1, i, k]);
            }
            self.hull = (0..k).rev().chain(std::iter::once(k)).collect();
        }
    }

    /// Flip edges until every triangle around the pending edges is locally
    /// Delaunay. Each pending `(a, b)` is owned by a triangle whose apex is the
    /// point just inserted.
    fn legalize(&mut self, a: usize, b: usize) {
        let mut pending = vec![(a, b)];
        while let Some((a, b)) = pending.pop() {
            let (Some(&t), Some(&n)) = (self.edges.get(&(a, b)), self.edges.get(&(b, a))) else {
                continue;
            };
            let p = self.tris[t].apex(a, b);
            let d = self.tris[n].apex(b, a);
            let (pa, pb, pp, pd) = (self.pts[a], self.pts[b], self.pts[p], self.pts[d]);
            if in_circle(pa, pb, pp, pd) <= 0.0 {
                continue;
            }
            // a flip must leave two proper triangles
            if orient(pa, pd, pp) <= 0.0 || orient(pd, pb, pp) <= 0.0 {
                continue;
            }
            self.kill_tri(t);
            self.kill_tri(n);
            self.add_tri([a, d, p]);
            self.add_tri([d, b, p]);
            pending.push((a, d));
            pending.push((d, b));
        }
    }

    fn insert(&mut self, pi: usize) {
        let p = self.pts[pi];
        let h = self.hull.len();
        let visible = |e: usize| {
            let (a, b) = (self.hull[e], self.hull[(e + 1) % h]);
            orient(self.pts[a], self.pts[b], p) < 0.0
        };
        let Some(start) = (0..h).find(|&e| visible(e) && !visible((e + h - 1) % h)) else {
            tracing::warn!("delaunay: point {pi} sees no hull edge, skipped");
            return;
        };
        let mut count = 0;
        while count < h && visible((start + count) % h) {
            count += 1;
        }

        for j in 0..count {
            let a = self.hull[(start + j) % h];
            let b = self.hull[(start + j + 1) % h];
            self.add_tri([a, pi, b]);
            self.legalize(b, a);
        }

        let mut hull: Vec<usize> = (0..=h - count)
            .map(|j| self.hull[(start + count + j) % h])
            .collect();
        hull.push(pi);
        self.hull = hull;
    }
}

/// Triangulate plan-view points. Returned triangles index into `points`,
/// are counter-clockwise, cover the convex hull and never touch a duplicate
/// position twice.
pub fn triangulate(points: &[DVec2]) -> Result<Vec<[u32; 3]>, MeshError> {
    // distinct positions in x-then-y order, remembering the first original index
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&i, &j| {
        points[i]
            .x
            .total_cmp(&points[j].x)
            .then(points[i].y.total_cmp(&points[j].y))
    });
    order.dedup_by(|j, i| points[*i] == points[*j]);

    if order.len() < 3 {
        return Err(MeshError::TooFewPoints { count: order.len() });
    }

    let lo = order.iter().fold(DVec2::splat(f64::MAX), |m, &i| m.min(points[i]));
    let hi = order.iter().fold(DVec2::splat(f64::MIN), |m, &i| m.max(points[i]));
    let center = (lo + hi) * 0.5;
    let span = (hi - lo).max_element().max(f64::MIN_POSITIVE);
    let pts: Vec<DVec2> = order.iter().map(|&i| (points[i] - center) / span).collect();

    let a = pts[0];
    let b = pts[1..]
        .iter()
        .copied()
        .max_by(|p, q| p.distance_squared(a).total_cmp(&q.distance_squared(a)))
        .unwrap_or(a);
    if pts.iter().all(|&p| orient(a, b, p).abs() <= DEGENERATE_AREA) {
        return Err(MeshError::Collinear);
    }
    let Some(k) = (2..pts.len()).find(|&k| orient(pts[0], pts[1], pts[k]) != 0.0) else {
        return Err(MeshError::Collinear);
    };

    let n = pts.len();
    let mut builder = Builder::new(pts);
    builder.seed(k);
    for i in k + 1..n {
        builder.insert(i);
    }

    let Builder { pts, tris, .. } = builder;
    Ok(tris
        .iter()
        .filter(|t| t.alive)
        .filter(|t| orient(pts[t.v[0]], pts[t.v[1]], pts[t.v[2]]) > DEGENERATE_AREA)
        .map(|t| t.v.map(|v| order[v] as u32))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> DVec2 {
        DVec2::new(x, y)
    }

    /// Deterministic uniform points in `[0, w) x [0, h)`.
    fn scatter(n: usize, w: f64, h: f64, seed: u64) -> Vec<DVec2> {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut next = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        (0..n).map(|_| p(next() * w, next() * h)).collect()
    }

    /// Strict convex hull vertex count (monotone chain).
    fn hull_size(points: &[DVec2]) -> usize {
        let mut pts = points.to_vec();
        pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        let mut chain: Vec<DVec2> = Vec::new();
        for pass in [pts.clone(), pts.into_iter().rev().collect()] {
            let base = chain.len();
            for q in pass {
                while chain.len() >= base + 2
                    && orient(chain[chain.len() - 2], chain[chain.len() - 1], q) <= 0.0
                {
                    chain.pop();
                }
                chain.push(q);
            }
            chain.pop();
        }
        chain.len()
    }

    fn assert_delaunay(points: &[DVec2], tris: &[[u32; 3]]) {
        for t in tris {
            let [a, b, c] = t.map(|i| points[i as usize]);
            assert!(orient(a, b, c) > 0.0, "clockwise triangle {t:?}");
            let scale = (b - a).length_squared().max((c - a).length_squared());
            for (i, &q) in points.iter().enumerate() {
                if t.contains(&(i as u32)) {
                    continue;
                }
                assert!(
                    in_circle(a, b, c, q) <= 1e-9 * scale * scale,
                    "point {i} inside circumcircle of {t:?}"
                );
            }
        }
    }

    #[test]
    fn test_square_gives_two_triangles() {
        let tris = triangulate(&[p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]).unwrap();
        assert_eq!(tris.len(), 2);
    }

    #[test]
    fn test_too_few_points() {
        assert_eq!(
            triangulate(&[p(0.0, 0.0), p(1.0, 1.0)]),
            Err(MeshError::TooFewPoints { count: 2 })
        );
        // duplicates collapse
        assert_eq!(
            triangulate(&[p(0.0, 0.0), p(0.0, 0.0), p(1.0, 1.0)]),
            Err(MeshError::TooFewPoints { count: 2 })
        );
    }

    #[test]
    fn test_collinear_rejected() {
        let pts: Vec<_> = (0..5).map(|i| p(i as f64, 2.0 * i as f64)).collect();
        assert_eq!(triangulate(&pts), Err(MeshError::Collinear));
    }

    #[test]
    fn test_collinear_run_then_apex() {
        // four points on a line, then one off it on either side
        for y in [1.0, -1.0] {
            let mut pts: Vec<_> = (0..4).map(|i| p(0.0, i as f64)).collect();
            pts.push(p(2.0, y));
            let tris = triangulate(&pts).unwrap();
            assert_eq!(tris.len(), 3);
            assert_delaunay(&pts, &tris);
        }
    }

    #[test]
    fn test_indices_refer_to_input() {
        // a duplicate of index 0 at the end must never be referenced
        let pts = vec![p(0.0, 0.0), p(2.0, 0.0), p(1.0, 2.0), p(1.0, 0.5), p(0.0, 0.0)];
        let tris = triangulate(&pts).unwrap();
        assert_eq!(tris.len(), 3);
        assert!(tris.iter().flatten().all(|&i| i < 4));
    }

    #[test]
    fn test_grid_triangle_count() {
        // n x n grid: 2 (n-1)^2 triangles in a convex hull
        let n = 6;
        let pts: Vec<_> = (0..n * n)
            .map(|i| p((i % n) as f64 + 0.001 * (i / n) as f64, (i / n) as f64))
            .collect();
        let tris = triangulate(&pts).unwrap();
        assert_eq!(tris.len(), 2 * (n - 1) * (n - 1));
    }

    #[test]
    fn test_random_points_fill_hull() {
        for seed in 0..30u64 {
            for (n, w, h) in [(20, 100.0, 0.5), (150, 100.0, 100.0), (60, 0.5, 100.0)] {
                let pts = scatter(n, w, h, seed);
                let tris = triangulate(&pts).unwrap();
                let hull = hull_size(&pts);
                assert_eq!(
                    tris.len(),
                    2 * n - 2 - hull,
                    "seed {seed}, n {n}, extent {w} x {h}"
                );
                assert_delaunay(&pts, &tris);
            }
        }
    }
}
