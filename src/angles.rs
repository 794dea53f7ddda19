//! Binary-angle trigonometry.
//!
//! Orientation is a byte: a full turn is 256 units and increases
//! clockwise, with 0 pointing the actor's local down at the world floor.
//! Conversion to degrees (counter-clockwise): `degrees = ((256 - angle) *
//! 180 / 128) % 360` (one unit is 1.40625 degrees).
//!
//! The cosine table is fixed; sine indexes the same table with a +0x40
//! offset. Slopes are resolved through a precomputed table of the angle
//! of the `(dy, dx)` displacement between two ground probes, so the hot
//! path never calls `atan2`.

/// Half-width of the slope table: probe displacements are clamped to
/// `[-SLOPE_LIMIT, SLOPE_LIMIT]` on both axes.
pub const SLOPE_LIMIT: i32 = 11;

/// Cosine of a binary angle.
#[inline]
pub fn cos(angle: u8) -> f32 {
    COS_TABLE[angle as usize]
}

/// Sine of a binary angle (cosine shifted a quarter turn).
#[inline]
pub fn sin(angle: u8) -> f32 {
    COS_TABLE[angle.wrapping_add(0x40) as usize]
}

/// Binary angle of the slope described by a `(dy, dx)` probe
/// displacement. Components beyond `SLOPE_LIMIT` are clamped.
#[inline]
pub fn slope_angle(dy: i32, dx: i32) -> u8 {
    let row = (SLOPE_LIMIT + dy.clamp(-SLOPE_LIMIT, SLOPE_LIMIT)) as usize;
    let col = (SLOPE_LIMIT + dx.clamp(-SLOPE_LIMIT, SLOPE_LIMIT)) as usize;
    SLOPE_TABLE[row][col]
}

/// Minimal angular distance between two binary angles, in angle units.
#[inline]
pub fn delta_angle(alpha: u8, beta: u8) -> i32 {
    let diff = (i32::from(alpha) - i32::from(beta)).abs();
    if diff > 0x80 {
        0x100 - diff
    } else {
        diff
    }
}

/// Convert a binary angle to whole counter-clockwise degrees.
#[inline]
pub fn to_degrees(angle: u8) -> i32 {
    (((256 - i32::from(angle)) * 180) / 128) % 360
}

/// Convert whole counter-clockwise degrees to the nearest binary angle.
#[inline]
pub fn from_degrees(degrees: i32) -> u8 {
    let degrees = degrees.rem_euclid(360);
    (((256 - (degrees * 128) / 180) % 256) & 0xFF) as u8
}

const COS_TABLE: [f32; 256] = [
    1.00000, 0.99970, 0.99880, 0.99729, 0.99518, 0.99248, 0.98918, 0.98528,
    0.98079, 0.97570, 0.97003, 0.96378, 0.95694, 0.94953, 0.94154, 0.93299,
    0.92388, 0.91421, 0.90399, 0.89322, 0.88192, 0.87009, 0.85773, 0.84485,
    0.83147, 0.81758, 0.80321, 0.78835, 0.77301, 0.75721, 0.74095, 0.72425,
    0.70711, 0.68954, 0.67156, 0.65317, 0.63439, 0.61523, 0.59570, 0.57581,
    0.55557, 0.53500, 0.51410, 0.49290, 0.47140, 0.44961, 0.42755, 0.40524,
    0.38268, 0.35990, 0.33689, 0.31368, 0.29028, 0.26671, 0.24298, 0.21910,
    0.19509, 0.17096, 0.14673, 0.12241, 0.09802, 0.07356, 0.04907, 0.02454,
    0.00000, -0.02454, -0.04907, -0.07356, -0.09802, -0.12241, -0.14673, -0.17096,
    -0.19509, -0.21910, -0.24298, -0.26671, -0.29028, -0.31368, -0.33689, -0.35990,
    -0.38268, -0.40524, -0.42755, -0.44961, -0.47140, -0.49290, -0.51410, -0.53500,
    -0.55557, -0.57581, -0.59570, -0.61523, -0.63439, -0.65317, -0.67156, -0.68954,
    -0.70711, -0.72425, -0.74095, -0.75721, -0.77301, -0.78835, -0.80321, -0.81758,
    -0.83147, -0.84485, -0.85773, -0.87009, -0.88192, -0.89322, -0.90399, -0.91421,
    -0.92388, -0.93299, -0.94154, -0.94953, -0.95694, -0.96378, -0.97003, -0.97570,
    -0.98079, -0.98528, -0.98918, -0.99248, -0.99518, -0.99729, -0.99880, -0.99970,
    -1.00000, -0.99970, -0.99880, -0.99729, -0.99518, -0.99248, -0.98918, -0.98528,
    -0.98079, -0.97570, -0.97003, -0.96378, -0.95694, -0.94953, -0.94154, -0.93299,
    -0.92388, -0.91421, -0.90399, -0.89322, -0.88192, -0.87009, -0.85773, -0.84485,
    -0.83147, -0.81758, -0.80321, -0.78835, -0.77301, -0.75721, -0.74095, -0.72425,
    -0.70711, -0.68954, -0.67156, -0.65317, -0.63439, -0.61523, -0.59570, -0.57581,
    -0.55557, -0.53500, -0.51410, -0.49290, -0.47140, -0.44961, -0.42756, -0.40524,
    -0.38268, -0.35990, -0.33689, -0.31368, -0.29028, -0.26671, -0.24298, -0.21910,
    -0.19509, -0.17096, -0.14673, -0.12241, -0.09802, -0.07356, -0.04907, -0.02454,
    -0.00000, 0.02454, 0.04907, 0.07356, 0.09802, 0.12241, 0.14673, 0.17096,
    0.19509, 0.21910, 0.24298, 0.26671, 0.29028, 0.31368, 0.33689, 0.35990,
    0.38268, 0.40524, 0.42756, 0.44961, 0.47140, 0.49290, 0.51410, 0.53500,
    0.55557, 0.57581, 0.59570, 0.61523, 0.63439, 0.65317, 0.67156, 0.68954,
    0.70711, 0.72425, 0.74095, 0.75721, 0.77301, 0.78835, 0.80321, 0.81758,
    0.83147, 0.84485, 0.85773, 0.87009, 0.88192, 0.89322, 0.90399, 0.91421,
    0.92388, 0.93299, 0.94154, 0.94953, 0.95694, 0.96378, 0.97003, 0.97570,
    0.98079, 0.98528, 0.98918, 0.99248, 0.99518, 0.99729, 0.99880, 0.99970,
];

/// `SLOPE_TABLE[SLOPE_LIMIT + dy][SLOPE_LIMIT + dx]` is the binary angle
/// of the `(dy, dx)` slope.
const SLOPE_TABLE: [[u8; 23]; 23] = [
    [0xA0, 0xA2, 0xA4, 0xA6, 0xA9, 0xAC, 0xAF, 0xB2, 0xB5, 0xB9, 0xBC, 0xC0, 0xC4, 0xC7, 0xCB, 0xCE, 0xD1, 0xD4, 0xD7, 0xDA, 0xDC, 0xDE, 0xE0],
    [0x9E, 0xA0, 0xA2, 0xA5, 0xA7, 0xAA, 0xAD, 0xB0, 0xB4, 0xB8, 0xBC, 0xC0, 0xC4, 0xC8, 0xCC, 0xD0, 0xD3, 0xD6, 0xD9, 0xDB, 0xDE, 0xE0, 0xE2],
    [0x9C, 0x9E, 0xA0, 0xA2, 0xA5, 0xA8, 0xAB, 0xAF, 0xB3, 0xB7, 0xBB, 0xC0, 0xC5, 0xC9, 0xCD, 0xD1, 0xD5, 0xD8, 0xDB, 0xDE, 0xE0, 0xE2, 0xE4],
    [0x9A, 0x9B, 0x9E, 0xA0, 0xA3, 0xA6, 0xA9, 0xAD, 0xB1, 0xB6, 0xBB, 0xC0, 0xC5, 0xCA, 0xCF, 0xD3, 0xD7, 0xDA, 0xDD, 0xE0, 0xE2, 0xE5, 0xE6],
    [0x97, 0x99, 0x9B, 0x9D, 0xA0, 0xA3, 0xA7, 0xAB, 0xB0, 0xB5, 0xBA, 0xC0, 0xC6, 0xCB, 0xD0, 0xD5, 0xD9, 0xDD, 0xE0, 0xE3, 0xE5, 0xE7, 0xE9],
    [0x94, 0x96, 0x98, 0x9A, 0x9D, 0xA0, 0xA4, 0xA8, 0xAD, 0xB3, 0xB9, 0xC0, 0xC7, 0xCD, 0xD3, 0xD8, 0xDC, 0xE0, 0xE3, 0xE6, 0xE8, 0xEA, 0xEC],
    [0x91, 0x93, 0x95, 0x97, 0x99, 0x9C, 0xA0, 0xA5, 0xAA, 0xB0, 0xB8, 0xC0, 0xC8, 0xD0, 0xD6, 0xDB, 0xE0, 0xE4, 0xE7, 0xE9, 0xEB, 0xED, 0xEF],
    [0x8E, 0x90, 0x91, 0x93, 0x95, 0x98, 0x9B, 0xA0, 0xA6, 0xAD, 0xB6, 0xC0, 0xCA, 0xD3, 0xDA, 0xE0, 0xE5, 0xE8, 0xEB, 0xED, 0xEF, 0xF0, 0xF2],
    [0x8B, 0x8C, 0x8D, 0x8F, 0x90, 0x93, 0x96, 0x9A, 0xA0, 0xA8, 0xB3, 0xC0, 0xCD, 0xD8, 0xE0, 0xE6, 0xEA, 0xED, 0xF0, 0xF1, 0xF3, 0xF4, 0xF5],
    [0x87, 0x88, 0x89, 0x8A, 0x8B, 0x8D, 0x90, 0x93, 0x98, 0xA0, 0xAD, 0xC0, 0xD3, 0xE0, 0xE8, 0xED, 0xF0, 0xF3, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9],
    [0x84, 0x84, 0x85, 0x85, 0x86, 0x87, 0x88, 0x8A, 0x8D, 0x93, 0xA0, 0xC0, 0xE0, 0xED, 0xF3, 0xF6, 0xF8, 0xF9, 0xFA, 0xFB, 0xFB, 0xFC, 0xFC],
    [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    [0x7C, 0x7C, 0x7B, 0x7B, 0x7A, 0x79, 0x78, 0x76, 0x73, 0x6D, 0x60, 0x40, 0x20, 0x13, 0x0D, 0x0A, 0x08, 0x07, 0x06, 0x05, 0x05, 0x04, 0x04],
    [0x79, 0x78, 0x77, 0x76, 0x75, 0x73, 0x70, 0x6D, 0x68, 0x60, 0x53, 0x40, 0x2D, 0x20, 0x18, 0x13, 0x10, 0x0D, 0x0B, 0x0A, 0x09, 0x08, 0x07],
    [0x75, 0x74, 0x73, 0x71, 0x70, 0x6D, 0x6A, 0x66, 0x60, 0x58, 0x4D, 0x40, 0x33, 0x28, 0x20, 0x1A, 0x16, 0x13, 0x10, 0x0F, 0x0D, 0x0C, 0x0B],
    [0x72, 0x70, 0x6F, 0x6D, 0x6B, 0x68, 0x65, 0x60, 0x5A, 0x53, 0x4A, 0x40, 0x36, 0x2D, 0x26, 0x20, 0x1B, 0x18, 0x15, 0x13, 0x11, 0x10, 0x0E],
    [0x6F, 0x6D, 0x6B, 0x69, 0x67, 0x64, 0x60, 0x5B, 0x56, 0x50, 0x48, 0x40, 0x38, 0x30, 0x2A, 0x25, 0x20, 0x1C, 0x19, 0x17, 0x15, 0x13, 0x11],
    [0x6C, 0x6A, 0x68, 0x66, 0x63, 0x60, 0x5C, 0x58, 0x53, 0x4D, 0x47, 0x40, 0x39, 0x33, 0x2D, 0x28, 0x24, 0x20, 0x1D, 0x1A, 0x18, 0x16, 0x14],
    [0x69, 0x67, 0x65, 0x63, 0x60, 0x5D, 0x59, 0x55, 0x50, 0x4B, 0x46, 0x40, 0x3A, 0x35, 0x30, 0x2B, 0x27, 0x23, 0x20, 0x1D, 0x1B, 0x19, 0x17],
    [0x66, 0x65, 0x62, 0x60, 0x5D, 0x5A, 0x57, 0x53, 0x4F, 0x4A, 0x45, 0x40, 0x3B, 0x36, 0x31, 0x2D, 0x29, 0x26, 0x23, 0x20, 0x1E, 0x1B, 0x1A],
    [0x64, 0x62, 0x60, 0x5E, 0x5B, 0x58, 0x55, 0x51, 0x4D, 0x49, 0x45, 0x40, 0x3B, 0x37, 0x33, 0x2F, 0x2B, 0x28, 0x25, 0x22, 0x20, 0x1E, 0x1C],
    [0x62, 0x60, 0x5E, 0x5B, 0x59, 0x56, 0x53, 0x50, 0x4C, 0x48, 0x44, 0x40, 0x3C, 0x38, 0x34, 0x30, 0x2D, 0x2A, 0x27, 0x25, 0x22, 0x20, 0x1E],
    [0x60, 0x5E, 0x5C, 0x5A, 0x57, 0x54, 0x51, 0x4E, 0x4B, 0x47, 0x44, 0x40, 0x3C, 0x39, 0x35, 0x32, 0x2F, 0x2C, 0x29, 0x26, 0x24, 0x22, 0x20],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinal_angles() {
        assert_eq!(cos(0x00), 1.0);
        assert_eq!(sin(0x00), 0.0);
        assert_eq!(cos(0x40), 0.0);
        assert_eq!(sin(0x40), -1.0);
        assert_eq!(cos(0x80), -1.0);
        assert_eq!(cos(0xC0), 0.0);
        assert_eq!(sin(0xC0), 1.0);
    }

    #[test]
    fn sine_is_shifted_cosine() {
        for a in 0..=255u8 {
            assert_eq!(sin(a), cos(a.wrapping_add(0x40)));
        }
    }

    #[test]
    fn flat_and_vertical_slopes() {
        // Flat ground to the right and to the left.
        assert_eq!(slope_angle(0, 5), 0x00);
        assert_eq!(slope_angle(0, -5), 0x80);
        // 45-degree slopes: rising to the right, falling to the right.
        assert_eq!(slope_angle(-4, 4), 0xE0);
        assert_eq!(slope_angle(4, 4), 0x20);
    }

    #[test]
    fn slope_components_are_clamped() {
        assert_eq!(slope_angle(0, 100), slope_angle(0, SLOPE_LIMIT));
        assert_eq!(slope_angle(-100, 3), slope_angle(-SLOPE_LIMIT, 3));
    }

    #[test]
    fn delta_angle_wraps() {
        assert_eq!(delta_angle(0x00, 0xFF), 1);
        assert_eq!(delta_angle(0x10, 0xF0), 0x20);
        assert_eq!(delta_angle(0x80, 0x00), 0x80);
        assert_eq!(delta_angle(0x42, 0x42), 0);
    }

    #[test]
    fn degree_conversion() {
        assert_eq!(to_degrees(0x00), 0);
        assert_eq!(to_degrees(0x40), 270);
        assert_eq!(to_degrees(0x80), 180);
        assert_eq!(to_degrees(0xC0), 90);
    }

    #[test]
    fn degree_round_trip() {
        for degrees in (0..360).step_by(45) {
            assert_eq!(to_degrees(from_degrees(degrees)), degrees);
        }
    }
}
