use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Absolute coordinate in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Displacement between two points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Per-side padding.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Thickness {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (other - self).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn dot(self, other: Vector) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z-component of the 3D cross product.
    pub fn cross(self, other: Vector) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    pub fn normalized(self) -> Vector {
        let len = self.length();
        if len <= f64::EPSILON {
            Vector::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Counter-clockwise perpendicular.
    pub fn perpendicular(self) -> Vector {
        Vector::new(-self.y, self.x)
    }
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn half_diagonal(self) -> f64 {
        (self.width * self.width + self.height * self.height).sqrt() * 0.5
    }
}

impl Thickness {
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn horizontal(self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(self) -> f64 {
        self.top + self.bottom
    }
}

impl Rect {
    /// Canonical empty rectangle; never intersects anything and is the
    /// identity for [`Rect::union`].
    pub const EMPTY: Rect = Rect {
        x: f64::INFINITY,
        y: f64::INFINITY,
        width: f64::NEG_INFINITY,
        height: f64::NEG_INFINITY,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_position(position: Point, size: Size) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width < 0.0 || self.height < 0.0
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn contains(&self, point: Point) -> bool {
        !self.is_empty()
            && point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    /// Grows the rectangle by `dx` on the left and right and `dy` on the top
    /// and bottom.
    pub fn inflate(&self, dx: f64, dy: f64) -> Rect {
        if self.is_empty() {
            return *self;
        }
        Rect::new(
            self.x - dx,
            self.y - dy,
            self.width + dx * 2.0,
            self.height + dy * 2.0,
        )
    }

    pub fn inflate_by(&self, padding: Thickness) -> Rect {
        if self.is_empty() {
            return *self;
        }
        Rect::new(
            self.x - padding.left,
            self.y - padding.top,
            self.width + padding.horizontal(),
            self.height + padding.vertical(),
        )
    }

    pub fn translate(&self, offset: Vector) -> Rect {
        Rect::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Horizontal and vertical penetration depth, both positive when the
    /// rectangles overlap.
    pub fn overlap_extent(&self, other: &Rect) -> (f64, f64) {
        let ox = self.right().min(other.right()) - self.x.max(other.x);
        let oy = self.bottom().min(other.bottom()) - self.y.max(other.y);
        (ox, oy)
    }

    /// True when the rectangles share interior area. Touching edges and
    /// overlaps thinner than `tolerance` do not count.
    pub fn intersects_with_tolerance(&self, other: &Rect, tolerance: f64) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let (ox, oy) = self.overlap_extent(other);
        ox > tolerance && oy > tolerance
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersects_with_tolerance(other, 0.0)
    }

    /// Whether the segment `a`-`b` passes through the interior of the
    /// rectangle.
    pub fn intersects_segment(&self, a: Point, b: Point) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.strictly_contains(a) || self.strictly_contains(b) {
            return true;
        }
        // Liang-Barsky clipping against the open rectangle.
        let d = b - a;
        let mut t0 = 0.0f64;
        let mut t1 = 1.0f64;
        let checks = [
            (-d.x, a.x - self.x),
            (d.x, self.right() - a.x),
            (-d.y, a.y - self.y),
            (d.y, self.bottom() - a.y),
        ];
        for (p, q) in checks {
            if p.abs() <= f64::EPSILON {
                if q <= 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return false;
                }
                t1 = t1.min(r);
            }
        }
        t1 - t0 > 1e-9
    }

    fn strictly_contains(&self, point: Point) -> bool {
        point.x > self.x && point.x < self.right() && point.y > self.y && point.y < self.bottom()
    }
}

impl Default for Rect {
    fn default() -> Self {
        Rect::EMPTY
    }
}

impl Add<Vector> for Point {
    type Output = Point;
    fn add(self, rhs: Vector) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign<Vector> for Point {
    fn add_assign(&mut self, rhs: Vector) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub<Vector> for Point {
    type Output = Point;
    fn sub(self, rhs: Vector) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign<Vector> for Point {
    fn sub_assign(&mut self, rhs: Vector) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Sub for Point {
    type Output = Vector;
    fn sub(self, rhs: Point) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, rhs: Vector) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vector {
    fn sub_assign(&mut self, rhs: Vector) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, rhs: f64) -> Vector {
        Vector::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y)
    }
}

impl From<Size> for Vector {
    fn from(size: Size) -> Vector {
        Vector::new(size.width, size.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_vector_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);
        let d = b - a;
        assert_eq!(d, Vector::new(3.0, 4.0));
        assert_eq!(d.length(), 5.0);
        assert_eq!(a + d, b);
        assert_eq!(b - d * 0.5, Point::new(2.5, 4.0));
    }

    #[test]
    fn empty_rect_is_union_identity() {
        let r = Rect::new(0.0, 0.0, 10.0, 5.0);
        assert!(Rect::EMPTY.is_empty());
        assert_eq!(Rect::EMPTY.union(&r), r);
        assert_eq!(r.union(&Rect::EMPTY), r);
        assert!(!Rect::EMPTY.intersects(&r));
        assert_eq!(Rect::EMPTY.inflate(5.0, 5.0), Rect::EMPTY);
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        let c = Rect::new(9.0, 9.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
    }

    #[test]
    fn segment_clipping() {
        let r = Rect::new(10.0, 10.0, 10.0, 10.0);
        assert!(r.intersects_segment(Point::new(0.0, 15.0), Point::new(30.0, 15.0)));
        assert!(!r.intersects_segment(Point::new(0.0, 0.0), Point::new(30.0, 0.0)));
        assert!(!r.intersects_segment(Point::new(0.0, 10.0), Point::new(30.0, 10.0)));
        assert!(r.intersects_segment(Point::new(15.0, 15.0), Point::new(40.0, 40.0)));
    }

    #[test]
    fn inflate_by_thickness() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0).inflate_by(Thickness::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(r, Rect::new(-1.0, -2.0, 14.0, 16.0));
    }
}
