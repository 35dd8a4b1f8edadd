//! Property tests: scale and mirror invariance, confidence bounds, determinism.

use percent_shape::{
    classify_face_shape, extract_eye_features, extract_face_features, EyeFeatureVector,
    EyeShapeClassifier, FaceFeatureVector, FaceShape, FaceTemplate, LandmarkSet, Point,
    FACE_CONFIDENCE_CAP,
};
use proptest::prelude::*;

/// Coordinates snapped to multiples of 2^-12 mirror and power-of-two scale
/// without rounding error.
fn quantize(set: &LandmarkSet) -> LandmarkSet {
    let q = |v: f32| (v * 4096.0).round() / 4096.0;
    LandmarkSet::new(set.points().iter().map(|p| Point::new(q(p.x), q(p.y))).collect())
}

prop_compose! {
    fn face_template()(
        face_height in 0.40f32..0.70,
        forehead in 0.50f32..0.85,
        cheekbone in 0.55f32..0.95,
        jaw in 0.40f32..0.90,
        chin in 0.15f32..0.40,
        eye_aspect in 0.15f32..0.45,
        eye_tilt in -15.0f32..18.0,
        brow_gap in 0.6f32..2.5,
        eye_spacing in 0.7f32..1.4
    ) -> LandmarkSet {
        FaceTemplate::builder()
            .face_height(face_height)
            .forehead_width(forehead)
            .cheekbone_width(cheekbone)
            .jaw_width(jaw)
            .chin_width(chin)
            .eye_aspect(eye_aspect)
            .eye_tilt(eye_tilt)
            .brow_gap(brow_gap)
            .eye_spacing(eye_spacing)
            .build()
    }
}

/// Stretch and shear the right half of a face about the vertical centre line.
fn skew_right_side(set: &LandmarkSet, stretch: f32, shear: f32) -> LandmarkSet {
    let cx = 0.5;
    let points = set
        .points()
        .iter()
        .map(|p| {
            if p.x > cx {
                let dx = p.x - cx;
                Point::new(cx + dx * stretch, p.y + dx * shear)
            } else {
                *p
            }
        })
        .collect();
    LandmarkSet::new(points)
}

prop_compose! {
    fn asymmetric_face()(
        set in face_template(),
        stretch in 0.90f32..0.97,
        shear in -0.03f32..0.03
    ) -> LandmarkSet {
        skew_right_side(&set, stretch, shear)
    }
}

prop_compose! {
    fn feature_vector()(
        whr in 0.4f32..1.1,
        fhr in 0.4f32..1.1,
        jhr in 0.3f32..1.1,
        jaw_angle in 90.0f32..170.0,
        chin_angle in 70.0f32..160.0,
        jaw_curvature in 0.0f32..0.1
    ) -> FaceFeatureVector {
        let widest = fhr.max(jhr);
        let mean = (fhr + whr + jhr) / 3.0;
        let var = ((fhr - mean).powi(2) + (whr - mean).powi(2) + (jhr - mean).powi(2)) / 3.0;
        FaceFeatureVector {
            width_height_ratio: whr,
            forehead_height_ratio: fhr,
            jaw_height_ratio: jhr,
            forehead_cheek_ratio: fhr / whr,
            jaw_cheek_ratio: jhr / whr,
            jaw_forehead_ratio: jhr / fhr,
            jaw_angle,
            chin_angle,
            jaw_curvature,
            width_variance: var.sqrt() / mean,
            cheek_prominence: whr / widest,
            ..FaceFeatureVector::neutral()
        }
    }
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-3 * a.abs().max(1.0)
}

fn near(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-4 * a.abs().max(1.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mirror_leaves_features_unchanged(set in asymmetric_face()) {
        let mirrored = set.mirrored();
        prop_assert_ne!(&set, &mirrored);

        let face = extract_face_features(&set).unwrap().values();
        let face_m = extract_face_features(&mirrored).unwrap().values();
        for (x, y) in face.iter().zip(face_m.iter()) {
            prop_assert!(near(*x, *y), "{} vs {}", x, y);
        }

        let eye = extract_eye_features(&set).unwrap();
        let eye_m = extract_eye_features(&mirrored).unwrap();
        prop_assert!(near(eye.ear, eye_m.ear));
        prop_assert!(near(eye.corner_angle, eye_m.corner_angle));
        prop_assert!(near(eye.hood_score, eye_m.hood_score));
        prop_assert!(near(eye.spacing_ratio, eye_m.spacing_ratio));
    }

    #[test]
    fn power_of_two_scale_leaves_labels_unchanged(
        set in face_template(),
        exponent in -1i32..=1,
    ) {
        let set = quantize(&set);
        let scaled = set.scaled(Point::zero(), 2f32.powi(exponent));

        let face = extract_face_features(&set).unwrap();
        let face_s = extract_face_features(&scaled).unwrap();
        prop_assert_eq!(classify_face_shape(&face).shape, classify_face_shape(&face_s).shape);

        let classifier = EyeShapeClassifier::new();
        let eye = classifier.classify_landmarks(&set).unwrap();
        let eye_s = classifier.classify_landmarks(&scaled).unwrap();
        prop_assert_eq!(eye.shape, eye_s.shape);
        prop_assert_eq!(eye.spacing, eye_s.spacing);
    }

    #[test]
    fn any_scale_about_any_centre_keeps_features(
        set in face_template(),
        factor in 0.5f32..2.0,
        cx in 0.3f32..0.7,
        cy in 0.3f32..0.7,
    ) {
        let scaled = set.scaled(Point::new(cx, cy), factor);

        let a = extract_face_features(&set).unwrap().values();
        let b = extract_face_features(&scaled).unwrap().values();
        for (x, y) in a.iter().zip(b.iter()) {
            prop_assert!(close(*x, *y), "{} vs {}", x, y);
        }

        let e = extract_eye_features(&set).unwrap();
        let e_s = extract_eye_features(&scaled).unwrap();
        prop_assert!(close(e.ear, e_s.ear));
        prop_assert!(close(e.corner_angle, e_s.corner_angle));
        prop_assert!(close(e.hood_score, e_s.hood_score));
        prop_assert!(close(e.spacing_ratio, e_s.spacing_ratio));
    }

    #[test]
    fn face_confidence_is_bounded_and_winner_is_top(f in feature_vector()) {
        let result = classify_face_shape(&f);
        prop_assert!(u32::from(result.confidence) <= FACE_CONFIDENCE_CAP);
        let top = result.scores.get(result.shape);
        for shape in FaceShape::ALL {
            prop_assert!(result.scores.get(shape) <= top);
        }
        prop_assert!(result.width_height_ratio.is_finite());
        prop_assert!(result.cheek_jaw_ratio.is_finite());
    }

    #[test]
    fn face_classification_is_deterministic(f in feature_vector()) {
        prop_assert_eq!(classify_face_shape(&f), classify_face_shape(&f));
    }

    #[test]
    fn eye_confidence_is_bounded(
        ear in 0.0f32..0.8,
        corner_angle in -40.0f32..40.0,
        hood_score in 0.0f32..4.0,
        spacing_ratio in 0.3f32..2.0,
    ) {
        let features = EyeFeatureVector { ear, corner_angle, hood_score, spacing_ratio };
        let classifier = EyeShapeClassifier::new();
        let a = classifier.classify(&features);
        let b = classifier.classify(&features);
        prop_assert!(a.confidence <= 87);
        prop_assert!(a.confidence >= 45);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn extracted_features_are_finite(set in face_template()) {
        for v in extract_face_features(&set).unwrap().values() {
            prop_assert!(v.is_finite());
        }
    }
}
