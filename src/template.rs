//! Parametric synthetic faces.
//!
//! Builds a full 478-point [`LandmarkSet`] from a handful of proportions: a
//! face oval traced from a piecewise-linear width profile, the vertical
//! segment landmarks on the centre line, and both eyes with their brows.
//! Faces are symmetric about the vertical centre line. Landmarks the
//! classifiers never read sit at the face centre.

use crate::landmarks::{
    indices, EyeLandmarks, FULL_LANDMARKS, LEFT_EYE, OVAL_LEFT, OVAL_RIGHT, RIGHT_EYE,
};
use crate::types::{LandmarkSet, Point};

/// Vertical position (fraction of the hairline-to-chin drop) of each oval
/// point in [`OVAL_LEFT`]/[`OVAL_RIGHT`] order.
const OVAL_LEVELS: [f32; 17] = [
    0.02, 0.07, 0.15, 0.25, 0.30, 0.36, 0.41, 0.45, 0.52, 0.60, 0.68, 0.75, 0.82, 0.86, 0.90,
    0.94, 0.97,
];

/// Eye line as a fraction of the hairline-to-chin drop.
const EYE_LEVEL: f32 = 0.42;

/// Face proportions. Widths are full widths as fractions of face height.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceTemplate {
    pub center: Point,
    pub face_height: f32,
    pub forehead_width: f32,
    pub cheekbone_width: f32,
    pub jaw_width: f32,
    pub chin_width: f32,
    /// Hairline to glabella, fraction of face height
    pub upper_third: f32,
    /// Glabella to nose base, fraction of face height
    pub middle_third: f32,
    /// Lower lip to chin, fraction of face height
    pub chin_length: f32,
    /// Corner-to-corner eye width, fraction of face height
    pub eye_width: f32,
    /// Lid opening over eye width (the eye aspect ratio)
    pub eye_aspect: f32,
    /// Outer-corner tilt in degrees, positive = outer corner higher
    pub eye_tilt: f32,
    /// Brow-to-upper-lid distance over lid opening
    pub brow_gap: f32,
    /// Inner-corner gap over eye width
    pub eye_spacing: f32,
}

impl Default for FaceTemplate {
    fn default() -> Self {
        Self {
            center: Point::new(0.5, 0.5),
            face_height: 0.6,
            forehead_width: 0.66,
            cheekbone_width: 0.72,
            jaw_width: 0.56,
            chin_width: 0.25,
            upper_third: 0.33,
            middle_third: 0.33,
            chin_length: 0.18,
            eye_width: 0.13,
            eye_aspect: 0.28,
            eye_tilt: 4.0,
            brow_gap: 1.6,
            eye_spacing: 1.0,
        }
    }
}

impl FaceTemplate {
    pub fn builder() -> FaceTemplateBuilder {
        FaceTemplateBuilder::new()
    }

    /// Lay out the full landmark set.
    pub fn landmarks(&self) -> LandmarkSet {
        let mut points = vec![self.center; FULL_LANDMARKS];
        let h = self.face_height;
        let top = self.center.y - h / 2.0;
        let at = |t: f32| top + t * h;

        points[indices::HAIRLINE] = Point::new(self.center.x, top);
        points[indices::CHIN] = Point::new(self.center.x, top + h);
        points[indices::GLABELLA] = Point::new(self.center.x, at(self.upper_third));
        points[indices::SUBNASALE] =
            Point::new(self.center.x, at(self.upper_third + self.middle_third));
        points[indices::LOWER_LIP] = Point::new(self.center.x, at(1.0 - self.chin_length));

        for (k, &t) in OVAL_LEVELS.iter().enumerate() {
            let half = self.half_width(t) * h;
            points[OVAL_LEFT[k]] = Point::new(self.center.x - half, at(t));
            points[OVAL_RIGHT[k]] = Point::new(self.center.x + half, at(t));
        }

        let eye_y = at(EYE_LEVEL);
        self.place_eye(&mut points, &LEFT_EYE, eye_y, -1.0);
        self.place_eye(&mut points, &RIGHT_EYE, eye_y, 1.0);

        LandmarkSet::new(points)
    }

    /// Half face width at level `t`, as a fraction of face height.
    fn half_width(&self, t: f32) -> f32 {
        let f = self.forehead_width / 2.0;
        let controls = [
            (0.02, 0.40 * f),
            (0.10, 0.85 * f),
            (0.25, f),
            (0.45, self.cheekbone_width / 2.0),
            (0.75, self.jaw_width / 2.0),
            (0.97, self.chin_width / 2.0),
        ];
        if t <= controls[0].0 {
            return controls[0].1;
        }
        for pair in controls.windows(2) {
            let (t0, w0) = pair[0];
            let (t1, w1) = pair[1];
            if t <= t1 {
                return w0 + (w1 - w0) * (t - t0) / (t1 - t0);
            }
        }
        controls[controls.len() - 1].1
    }

    /// `side` is -1 for the viewer's-left eye, +1 for the right one.
    fn place_eye(&self, points: &mut [Point], eye: &EyeLandmarks, eye_y: f32, side: f32) {
        let width = self.eye_width * self.face_height;
        let opening = self.eye_aspect * width;
        let tilt = self.eye_tilt.to_radians();

        let inner = Point::new(self.center.x + side * self.eye_spacing * width / 2.0, eye_y);
        // Unit vector from inner to outer corner; image y grows downward
        let dir = Point::new(side * tilt.cos(), -tilt.sin());
        let outer = inner + dir * width;

        // Perpendicular pointing up the image
        let mut up = Point::new(-dir.y, dir.x);
        if up.y > 0.0 {
            up = up * -1.0;
        }

        points[eye.inner_corner] = inner;
        points[eye.outer_corner] = outer;
        for (k, frac) in [0.25f32, 0.5, 0.75].into_iter().enumerate() {
            let base = inner + dir * (width * frac);
            points[eye.upper_lid[k]] = base + up * (opening / 2.0);
            points[eye.lower_lid[k]] = base + up * (-opening / 2.0);
        }
        let upper_center = points[eye.upper_lid[1]];
        points[eye.brow_center] = upper_center + up * (self.brow_gap * opening);
    }
}

/// Builder for [`FaceTemplate`] landmark sets.
#[derive(Debug, Clone, Default)]
pub struct FaceTemplateBuilder {
    template: FaceTemplate,
}

impl FaceTemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn center(mut self, center: Point) -> Self {
        self.template.center = center;
        self
    }

    pub fn face_height(mut self, height: f32) -> Self {
        self.template.face_height = height;
        self
    }

    pub fn forehead_width(mut self, width: f32) -> Self {
        self.template.forehead_width = width;
        self
    }

    pub fn cheekbone_width(mut self, width: f32) -> Self {
        self.template.cheekbone_width = width;
        self
    }

    pub fn jaw_width(mut self, width: f32) -> Self {
        self.template.jaw_width = width;
        self
    }

    pub fn chin_width(mut self, width: f32) -> Self {
        self.template.chin_width = width;
        self
    }

    pub fn thirds(mut self, upper: f32, middle: f32) -> Self {
        self.template.upper_third = upper;
        self.template.middle_third = middle;
        self
    }

    pub fn chin_length(mut self, length: f32) -> Self {
        self.template.chin_length = length;
        self
    }

    pub fn eye_width(mut self, width: f32) -> Self {
        self.template.eye_width = width;
        self
    }

    pub fn eye_aspect(mut self, aspect: f32) -> Self {
        self.template.eye_aspect = aspect;
        self
    }

    pub fn eye_tilt(mut self, degrees: f32) -> Self {
        self.template.eye_tilt = degrees;
        self
    }

    pub fn brow_gap(mut self, gap: f32) -> Self {
        self.template.brow_gap = gap;
        self
    }

    pub fn eye_spacing(mut self, spacing: f32) -> Self {
        self.template.eye_spacing = spacing;
        self
    }

    /// The proportions collected so far.
    pub fn template(&self) -> &FaceTemplate {
        &self.template
    }

    pub fn build(self) -> LandmarkSet {
        self.template.landmarks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_full_mesh() {
        let set = FaceTemplate::builder().build();
        assert_eq!(set.len(), FULL_LANDMARKS);
    }

    #[test]
    fn hairline_to_chin_is_face_height() {
        let set = FaceTemplate::builder().face_height(0.5).build();
        let h = set[indices::HAIRLINE].distance(&set[indices::CHIN]);
        assert!((h - 0.5).abs() < 1e-6);
    }

    #[test]
    fn width_profile_hits_control_widths() {
        let t = FaceTemplate::default();
        assert!((t.half_width(0.25) - 0.33).abs() < 1e-6);
        assert!((t.half_width(0.45) - 0.36).abs() < 1e-6);
        assert!((t.half_width(0.75) - 0.28).abs() < 1e-6);
        // Monotone between the cheekbone and jaw controls
        assert!(t.half_width(0.60) < t.half_width(0.45));
        assert!(t.half_width(0.60) > t.half_width(0.75));
    }

    #[test]
    fn template_is_mirror_symmetric() {
        let set = FaceTemplate::builder().eye_tilt(8.0).build();
        let mirrored = set.mirrored();
        for (a, b) in set.points().iter().zip(mirrored.points()) {
            assert!((a.x - b.x).abs() < 1e-5, "{a:?} vs {b:?}");
            assert!((a.y - b.y).abs() < 1e-5, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn eye_geometry_follows_parameters() {
        let set = FaceTemplate::builder()
            .eye_tilt(10.0)
            .eye_aspect(0.3)
            .build();
        let inner = set[LEFT_EYE.inner_corner];
        let outer = set[LEFT_EYE.outer_corner];
        let angle = (inner.y - outer.y).atan2((outer.x - inner.x).abs()).to_degrees();
        assert!((angle - 10.0).abs() < 1e-3);

        let width = inner.distance(&outer);
        let open = set[LEFT_EYE.upper_lid[1]].distance(&set[LEFT_EYE.lower_lid[1]]);
        assert!((open / width - 0.3).abs() < 1e-4);
        // Upper lid is above the lower lid
        assert!(set[LEFT_EYE.upper_lid[1]].y < set[LEFT_EYE.lower_lid[1]].y);
    }
}
