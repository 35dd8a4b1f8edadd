//! MediaPipe Face Mesh landmark topology.
//!
//! Only the indices this crate reads are named here. "Left" and "right" are
//! from the viewer's side of an unmirrored image: left-side indices sit at
//! small x.

/// Minimum number of points for the 468-point mesh.
pub const MIN_LANDMARKS: usize = 468;

/// Points in the refined mesh (468 + 10 iris points).
pub const FULL_LANDMARKS: usize = 478;

/// Named single landmarks.
pub mod indices {
    /// Top of the forehead at the hairline
    pub const HAIRLINE: usize = 10;
    /// Chin tip (menton)
    pub const CHIN: usize = 152;
    /// Between the brows
    pub const GLABELLA: usize = 9;
    /// Base of the nose
    pub const SUBNASALE: usize = 2;
    /// Bottom of the lower lip
    pub const LOWER_LIP: usize = 17;

    pub const FOREHEAD_LEFT: usize = 54;
    pub const FOREHEAD_RIGHT: usize = 284;
    pub const CHEEKBONE_LEFT: usize = 234;
    pub const CHEEKBONE_RIGHT: usize = 454;
    pub const JAW_LEFT: usize = 172;
    pub const JAW_RIGHT: usize = 397;
    pub const CHIN_LEFT: usize = 148;
    pub const CHIN_RIGHT: usize = 377;
}

/// Face boundary contour, hairline first, running down the right side, then
/// back up the left side.
pub const FACE_OVAL: [usize; 36] = [
    10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377,
    152, 148, 176, 149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109,
];

/// Right half of the oval from just below the hairline down to just above the
/// chin (17 points).
pub const OVAL_RIGHT: [usize; 17] = [
    338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377,
];

/// Left half of the oval in the same top-to-bottom order as [`OVAL_RIGHT`].
pub const OVAL_LEFT: [usize; 17] = [
    109, 67, 103, 54, 21, 162, 127, 234, 93, 132, 58, 172, 136, 150, 149, 176, 148,
];

/// Jaw contour between cheekbone and chin, exclusive, left side.
pub const JAW_ARC_LEFT: [usize; 9] = [93, 132, 58, 172, 136, 150, 149, 176, 148];

/// Jaw contour between cheekbone and chin, exclusive, right side.
pub const JAW_ARC_RIGHT: [usize; 9] = [323, 361, 288, 397, 365, 379, 378, 400, 377];

/// The points of one eye used for shape measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeLandmarks {
    pub outer_corner: usize,
    pub inner_corner: usize,
    /// Upper lid: towards the inner corner, centre, towards the outer corner
    pub upper_lid: [usize; 3],
    /// Lower lid, paired element-wise with `upper_lid`
    pub lower_lid: [usize; 3],
    pub brow_center: usize,
}

/// Viewer's-left eye (the subject's right eye).
pub const LEFT_EYE: EyeLandmarks = EyeLandmarks {
    outer_corner: 33,
    inner_corner: 133,
    upper_lid: [160, 159, 158],
    lower_lid: [144, 145, 153],
    brow_center: 105,
};

/// Viewer's-right eye (the subject's left eye).
pub const RIGHT_EYE: EyeLandmarks = EyeLandmarks {
    outer_corner: 263,
    inner_corner: 362,
    upper_lid: [387, 386, 385],
    lower_lid: [373, 374, 380],
    brow_center: 334,
};

/// Left/right counterparts swapped by a horizontal mirror.
pub const MIRROR_PAIRS: &[(usize, usize)] = &[
    // Face oval
    (338, 109),
    (297, 67),
    (332, 103),
    (284, 54),
    (251, 21),
    (389, 162),
    (356, 127),
    (454, 234),
    (323, 93),
    (361, 132),
    (288, 58),
    (397, 172),
    (365, 136),
    (379, 150),
    (378, 149),
    (400, 176),
    (377, 148),
    // Eyes
    (33, 263),
    (133, 362),
    (160, 387),
    (159, 386),
    (158, 385),
    (144, 373),
    (145, 374),
    (153, 380),
    // Brows
    (105, 334),
];
