use approx::assert_abs_diff_eq;
use gingham_chessboard::{ChessboardDetector, DetectorConfig, GridSize, Pattern, RefineParams};
use gingham_core::synthetic::{ChessboardTarget, DotGridTarget};
use nalgebra::Point2;

fn nearest_distance(p: Point2<f64>, truth: &[Point2<f64>]) -> f64 {
    truth
        .iter()
        .map(|t| (t - p).norm())
        .fold(f64::INFINITY, f64::min)
}

/// 8x8 squares of 36 px: the default 7x7 interior corners.
fn standard_board() -> ChessboardTarget {
    ChessboardTarget::new((100.0, 40.0), 36.0, (8, 8))
}

#[test]
fn detects_seven_by_seven_board_in_row_major_order() {
    let board = standard_board();
    let img = board.render(640, 480);
    let detector = ChessboardDetector::new(DetectorConfig::default()).unwrap();

    let detection = detector.detect(&img).unwrap().expect("board");
    assert_eq!(detection.corners.len(), 49);
    assert_eq!(detection.grid, GridSize::square(7));

    let truth = board.interior_corners();
    for (k, c) in detection.corners.iter().enumerate() {
        let (r, col) = (k / 7, k % 7);
        assert_abs_diff_eq!(c.position.x, 136.0 + 36.0 * col as f64, epsilon = 0.3);
        assert_abs_diff_eq!(c.position.y, 76.0 + 36.0 * r as f64, epsilon = 0.3);
        assert!(nearest_distance(c.position, &truth) < 0.3);
    }
}

#[test]
fn refinement_counts_passes_down_to_full_resolution() {
    let img = standard_board().render(640, 480);
    let detector = ChessboardDetector::new(DetectorConfig {
        pyramid_level: Some(1),
        ..Default::default()
    })
    .unwrap();

    let detection = detector.detect(&img).unwrap().expect("board");
    assert_eq!(detection.level, 1);
    let points = detection.points();
    assert_eq!(points.len(), 49);
    assert!(points.iter().any(|p| p.refinement_level > 0));
    for (p, c) in points.iter().zip(&detection.corners) {
        assert_eq!(p.refinement_level as u32, c.refinement_passes);
        if c.refinement_passes > 0 {
            assert_eq!(c.level, 0);
        }
    }
}

#[test]
fn disabled_refinement_reports_raw_points() {
    let img = standard_board().render(640, 480);
    let detector = ChessboardDetector::new(DetectorConfig {
        pyramid_level: Some(1),
        refine: RefineParams {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();

    let detection = detector.detect(&img).unwrap().expect("board");
    assert!(detection.points().iter().all(|p| p.refinement_level == 0));
    assert!(detection.corners.iter().all(|c| c.level == 1));
}

#[test]
fn rotated_rectangular_board() {
    let board =
        ChessboardTarget::new((170.0, 90.0), 30.0, (10, 8)).rotated(8f64.to_radians());
    let img = board.render(640, 480);
    let detector = ChessboardDetector::new(DetectorConfig {
        grid: GridSize::new(7, 9).unwrap(),
        ..Default::default()
    })
    .unwrap();

    let detection = detector.detect(&img).unwrap().expect("board");
    assert_eq!(detection.corners.len(), 63);

    let truth = board.interior_corners();
    for c in &detection.corners {
        assert!(nearest_distance(c.position, &truth) < 0.5, "{c:?}");
    }
    // Rows run left to right.
    for row in detection.corners.chunks(9) {
        for pair in row.windows(2) {
            let d = pair[1].position - pair[0].position;
            assert!(d.x > 25.0 && d.y.abs() < 10.0, "{d:?}");
        }
    }
    let first = detection.corners[0].position;
    assert!(nearest_distance(first, &truth[..1]) < 0.5);
}

#[test]
fn wrong_grid_size_finds_nothing() {
    let img = standard_board().render(640, 480);
    let detector = ChessboardDetector::new(DetectorConfig {
        grid: GridSize::square(9),
        ..Default::default()
    })
    .unwrap();
    assert!(detector.detect(&img).unwrap().is_none());
}

#[test]
fn explicit_level_out_of_range_is_an_error() {
    assert!(ChessboardDetector::new(DetectorConfig {
        pyramid_level: Some(11),
        ..Default::default()
    })
    .is_err());
}

#[test]
fn rectangular_circle_grid_in_row_major_order() {
    let target =
        DotGridTarget::new((120.0, 100.0), 40.0, 16.0, (6, 4)).rotated(-5f64.to_radians());
    let img = target.render(480, 360);
    let detector = ChessboardDetector::new(DetectorConfig {
        pattern: Pattern::CircleGrid,
        grid: GridSize::new(4, 6).unwrap(),
        ..Default::default()
    })
    .unwrap();

    let detection = detector.detect(&img).unwrap().expect("circle grid");
    assert_eq!(detection.corners.len(), 24);
    for (c, expected) in detection.corners.iter().zip(target.centers()) {
        assert!((c.position - expected).norm() < 0.3, "{c:?} vs {expected}");
    }
    assert!(detection.points().iter().all(|p| p.refinement_level == 0));
}
