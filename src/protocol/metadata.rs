//! Optional device-reported tool metadata.

use crate::geometry::Point;

/// Affine transform from antenna index space into metadata physical space.
///
/// `x' = xx * x + yx * y + tx`, `y' = xy * x + yy * y + ty`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Weight of x in x'.
    pub xx: f64,
    /// Weight of y in x'.
    pub yx: f64,
    /// Horizontal offset.
    pub tx: f64,
    /// Weight of x in y'.
    pub xy: f64,
    /// Weight of y in y'.
    pub yy: f64,
    /// Vertical offset.
    pub ty: f64,
}

impl Transform {
    /// Leaves points unchanged.
    pub const IDENTITY: Transform = Transform {
        xx: 1.0,
        yx: 0.0,
        tx: 0.0,
        xy: 0.0,
        yy: 1.0,
        ty: 0.0,
    };

    /// Builds a transform from `[xx, yx, tx, xy, yy, ty]`.
    pub fn from_coefficients(c: [f64; 6]) -> Self {
        Self {
            xx: c[0],
            yx: c[1],
            tx: c[2],
            xy: c[3],
            yy: c[4],
            ty: c[5],
        }
    }

    /// Coefficients as `[xx, yx, tx, xy, yy, ty]`.
    pub fn coefficients(&self) -> [f64; 6] {
        [self.xx, self.yx, self.tx, self.xy, self.yy, self.ty]
    }

    /// Maps `p` into metadata physical space.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.xx * p.x + self.yx * p.y + self.tx,
            self.xy * p.x + self.yy * p.y + self.ty,
        )
    }
}

/// Sensor geometry and calibration reported by some devices.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolMetadata {
    /// Row antenna count.
    pub rows: u32,
    /// Column antenna count.
    pub columns: u32,
    /// Sensor width in transform units.
    pub width: u32,
    /// Sensor height in transform units.
    pub height: u32,
    /// Antenna index to physical space.
    pub transform: Transform,
    /// Bytes the decoder does not interpret.
    pub vendor: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform() {
        let p = Point::new(3.5, -2.0);
        assert_eq!(Transform::IDENTITY.apply(p), p);
    }

    #[test]
    fn test_coefficient_order() {
        let t = Transform::from_coefficients([2.0, 0.0, 1.0, 0.0, 3.0, -1.0]);
        assert_eq!(t.apply(Point::new(1.0, 1.0)), Point::new(3.0, 2.0));
        assert_eq!(t.coefficients()[2], 1.0);
    }
}
