use glam::Vec3;

/// Axis-aligned bounding box in f32 world space.
///
/// Invariant: `min.x <= max.x`, `min.y <= max.y`, `min.z <= max.z`.
/// The constructor enforces this by swapping components if needed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from two corners. Automatically sorts
    /// components so that min <= max on every axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create an AABB from its minimum corner and a non-negative extent.
    pub fn from_origin_extent(origin: Vec3, extent: Vec3) -> Self {
        Self::new(origin, origin + extent)
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Returns true if `other` lies entirely inside this box (shared faces allowed).
    pub fn contains(&self, other: &Aabb) -> bool {
        other.min.cmpge(self.min).all() && other.max.cmple(self.max).all()
    }

    /// Returns true if this AABB overlaps with other
    /// (including touching edges/faces).
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Returns the smallest AABB enclosing both self and other.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns the center point of the AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the half-extents (half-size along each axis).
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Returns the size along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corner points, min corner first.
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Shortest Euclidean distance from `p` to any point of the box.
    ///
    /// Zero when `p` is inside the box or on its surface.
    pub fn distance_to_point(&self, p: Vec3) -> f32 {
        let d = (self.min - p).max(p - self.max).max(Vec3::ZERO);
        d.length()
    }

    /// Returns true if the box lies within `radius` of `p` (inclusive).
    pub fn is_within(&self, p: Vec3, radius: f32) -> bool {
        self.distance_to_point(p) <= radius
    }

    /// Returns true if the AABB has zero volume
    /// (degenerate on at least one axis).
    pub fn is_degenerate(&self) -> bool {
        self.min.cmpeq(self.max).any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::splat(10.0))
    }

    #[test]
    fn test_constructor_auto_sorts() {
        let aabb = Aabb::new(Vec3::splat(10.0), Vec3::ZERO);
        assert_eq!(aabb.min, Vec3::ZERO);
        assert_eq!(aabb.max, Vec3::splat(10.0));
    }

    #[test]
    fn test_contains_point_on_edge() {
        let aabb = unit_box();
        assert!(aabb.contains_point(Vec3::ZERO));
        assert!(aabb.contains_point(Vec3::splat(10.0)));
        assert!(aabb.contains_point(Vec3::new(10.0, 5.0, 5.0)));
        assert!(!aabb.contains_point(Vec3::new(11.0, 5.0, 5.0)));
    }

    #[test]
    fn test_contains_box_with_shared_face() {
        let outer = unit_box();
        let inner = Aabb::new(Vec3::ZERO, Vec3::new(5.0, 10.0, 3.0));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn test_intersects_touching() {
        let a = unit_box();
        let b = Aabb::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(20.0, 10.0, 10.0));
        assert!(a.intersects(&b));
        let c = Aabb::new(Vec3::splat(20.0), Vec3::splat(30.0));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_union_encloses_both() {
        let a = Aabb::new(Vec3::ZERO, Vec3::splat(5.0));
        let b = Aabb::new(Vec3::splat(3.0), Vec3::splat(10.0));
        let u = a.union(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert_eq!(u, unit_box());
    }

    #[test]
    fn test_distance_inside_and_on_surface_is_zero() {
        let aabb = unit_box();
        assert_eq!(aabb.distance_to_point(Vec3::splat(5.0)), 0.0);
        assert_eq!(aabb.distance_to_point(Vec3::new(10.0, 5.0, 5.0)), 0.0);
        assert_eq!(aabb.distance_to_point(Vec3::ZERO), 0.0);
        assert!(aabb.is_within(Vec3::new(0.0, 10.0, 5.0), 0.0));
    }

    #[test]
    fn test_distance_to_face_edge_and_corner() {
        let aabb = unit_box();
        // Face
        assert_eq!(aabb.distance_to_point(Vec3::new(15.0, 5.0, 5.0)), 5.0);
        // Edge
        let d = aabb.distance_to_point(Vec3::new(13.0, 14.0, 5.0));
        assert!((d - 5.0).abs() < 1e-5);
        // Corner
        let d = aabb.distance_to_point(Vec3::new(-1.0, -2.0, -2.0));
        assert!((d - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_distance_never_exceeds_nearest_corner() {
        let aabb = Aabb::new(Vec3::new(-4.0, 2.0, 0.0), Vec3::new(6.0, 9.0, 3.0));
        let p = Vec3::new(20.0, -7.0, 11.0);
        let nearest_corner = aabb
            .corners()
            .iter()
            .map(|c| c.distance(p))
            .fold(f32::INFINITY, f32::min);
        assert!(aabb.distance_to_point(p) <= nearest_corner + 1e-4);
    }

    #[test]
    fn test_center_extents_size() {
        let aabb = Aabb::from_origin_extent(Vec3::new(-2.0, -3.0, -4.0), Vec3::new(4.0, 6.0, 8.0));
        assert_eq!(aabb.center(), Vec3::ZERO);
        assert_eq!(aabb.extents(), Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(aabb.size(), Vec3::new(4.0, 6.0, 8.0));
    }

    #[test]
    fn test_is_degenerate() {
        assert!(!unit_box().is_degenerate());
        let flat = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 10.0, 0.0));
        assert!(flat.is_degenerate());
    }
}
