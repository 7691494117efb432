//! True-shape track projection
//!
//! The outline's point cloud is fitted to the viewport by its bounding box.
//! Both axes are inverted on the way to the screen: X because the source
//! coordinate convention is mirrored, Y because screen coordinates grow
//! downward.

use super::{ScreenPoint, Viewport};
use crate::model::{DriverPosition, Placement, Point, Sectors, TrackOutline};
use serde::Serialize;

/// Share of the viewport the outline may occupy
const FILL_FACTOR: f64 = 0.85;

/// Half length of the start/finish line in view-box units
pub const START_FINISH_HALF_LENGTH: f64 = 25.0;

/// Outline fitted into a viewport
#[derive(Debug, Clone)]
pub struct CartesianFrame {
    path: Vec<Point>,
    center: Option<Point>,
    norm_scale: Option<f64>,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

/// Start/finish line drawn across the track at the first outline point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StartFinishMarker {
    pub at: ScreenPoint,
    pub from: ScreenPoint,
    pub to: ScreenPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorMarker {
    pub label: String,
    pub at: ScreenPoint,
}

impl CartesianFrame {
    /// Fit the outline into the viewport; `None` for an empty outline
    pub fn fit(outline: &TrackOutline, viewport: Viewport) -> Option<Self> {
        let first = outline.path.first()?;

        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for p in &outline.path {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }

        let range_x = non_zero(max_x - min_x);
        let range_y = non_zero(max_y - min_y);
        let scale = (viewport.width / range_x).min(viewport.height / range_y) * FILL_FACTOR;

        // -center * scale + offset == viewport center
        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;

        Some(Self {
            path: outline.path.clone(),
            center: outline.center,
            norm_scale: outline.scale.filter(|s| *s > 0.0 && s.is_finite()),
            scale,
            offset_x: viewport.width / 2.0 + center_x * scale,
            offset_y: viewport.height / 2.0 + center_y * scale,
        })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Map a normalized outline point to the screen
    pub fn to_screen(&self, p: Point) -> ScreenPoint {
        ScreenPoint::new(
            -p.x * self.scale + self.offset_x,
            -p.y * self.scale + self.offset_y,
        )
    }

    /// Outline in screen space; the sink closes the loop
    pub fn track_path(&self) -> Vec<ScreenPoint> {
        self.path.iter().map(|p| self.to_screen(*p)).collect()
    }

    /// Start/finish line perpendicular to the averaged tangent at the first point
    ///
    /// The tangent averages the closing segment (last -> first) with the
    /// opening segment (first -> second) so the marker sits square to the
    /// track where the loop closes.
    pub fn start_finish(&self) -> StartFinishMarker {
        let at = self.to_screen(self.path[0]);

        let (mut dir_x, mut dir_y) = (0.0, 0.0);
        if self.path.len() > 1 {
            let first = self.to_screen(self.path[0]);
            let second = self.to_screen(self.path[1]);
            let last = self.to_screen(self.path[self.path.len() - 1]);

            dir_x = ((second.x - first.x) + (first.x - last.x)) / 2.0;
            dir_y = ((second.y - first.y) + (first.y - last.y)) / 2.0;

            let len = (dir_x * dir_x + dir_y * dir_y).sqrt();
            if len > 0.0 {
                dir_x /= len;
                dir_y /= len;
            }
        }
        if dir_x == 0.0 && dir_y == 0.0 {
            dir_x = 1.0;
        }

        let (perp_x, perp_y) = (-dir_y, dir_x);
        StartFinishMarker {
            at,
            from: ScreenPoint::new(
                at.x - perp_x * START_FINISH_HALF_LENGTH,
                at.y - perp_y * START_FINISH_HALF_LENGTH,
            ),
            to: ScreenPoint::new(
                at.x + perp_x * START_FINISH_HALF_LENGTH,
                at.y + perp_y * START_FINISH_HALF_LENGTH,
            ),
        }
    }

    /// Sector 2 and 3 markers, placed by outline index
    ///
    /// Assumes outline points are evenly spaced along the lap, which real
    /// digitizations are not; markers land near, not on, the true boundary.
    /// Markers whose index falls outside `1..len` are skipped.
    pub fn sector_markers(&self, sectors: &Sectors) -> Vec<SectorMarker> {
        if !(sectors.track_length > 0.0) {
            return Vec::new();
        }

        [("S2", sectors.sector2_start), ("S3", sectors.sector3_start)]
            .into_iter()
            .filter_map(|(label, start)| {
                let index = (start / sectors.track_length * self.path.len() as f64).floor();
                if index >= 1.0 && (index as usize) < self.path.len() {
                    Some(SectorMarker {
                        label: label.to_string(),
                        at: self.to_screen(self.path[index as usize]),
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Place a driver on the track map; `None` when the driver cannot be placed
    pub fn project(&self, position: &DriverPosition) -> Option<ScreenPoint> {
        match position.placement() {
            Placement::Known { x, y } => match (self.center, self.norm_scale) {
                (Some(center), Some(scale)) => {
                    // same normalization the provider applied to the outline
                    let norm = Point::new(-(x - center.x) / scale, (y - center.y) / scale);
                    Some(self.to_screen(norm))
                }
                _ => position.distance.and_then(|d| self.project_distance(d)),
            },
            Placement::ByDistance { distance } => self.project_distance(distance),
            Placement::Unknown => None,
        }
    }

    /// Coarse fallback: `distance mod path.len()` taken as an outline index
    ///
    /// Not metric; distance is not proportional to outline index. Kept as an
    /// approximation until outlines are resampled by arc length.
    fn project_distance(&self, distance: f64) -> Option<ScreenPoint> {
        if !distance.is_finite() {
            return None;
        }
        let index = distance.rem_euclid(self.path.len() as f64).floor() as usize;
        let point = self.path[index.min(self.path.len() - 1)];
        Some(self.to_screen(point))
    }
}

fn non_zero(range: f64) -> f64 {
    if range == 0.0 || !range.is_finite() {
        1.0
    } else {
        range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_outline() -> TrackOutline {
        TrackOutline {
            path: vec![
                Point::new(-0.5, -0.5),
                Point::new(0.5, -0.5),
                Point::new(0.5, 0.5),
                Point::new(-0.5, 0.5),
            ],
            center: Some(Point::new(1000.0, 2000.0)),
            scale: Some(400.0),
            ..Default::default()
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fit_empty_outline_is_none() {
        assert!(CartesianFrame::fit(&TrackOutline::default(), Viewport::TRACK_MAP).is_none());
    }

    #[test]
    fn test_fit_scale_uses_limiting_axis() {
        let frame = CartesianFrame::fit(&square_outline(), Viewport::TRACK_MAP).unwrap();
        // min(800/1, 600/1) * 0.85
        assert!(approx(frame.scale(), 510.0));
    }

    #[test]
    fn test_bounding_box_center_maps_to_viewport_center() {
        let outline = TrackOutline {
            path: vec![Point::new(0.0, 0.0), Point::new(2.0, 1.0), Point::new(1.0, 3.0)],
            ..Default::default()
        };
        let frame = CartesianFrame::fit(&outline, Viewport::TRACK_MAP).unwrap();
        let center = frame.to_screen(Point::new(1.0, 1.5));
        assert!(approx(center.x, 400.0));
        assert!(approx(center.y, 300.0));
    }

    #[test]
    fn test_both_axes_inverted() {
        let frame = CartesianFrame::fit(&square_outline(), Viewport::TRACK_MAP).unwrap();
        let left_top = frame.to_screen(Point::new(-0.5, -0.5));
        let right_bottom = frame.to_screen(Point::new(0.5, 0.5));
        assert!(left_top.x > right_bottom.x);
        assert!(left_top.y > right_bottom.y);
    }

    #[test]
    fn test_degenerate_outline_does_not_divide_by_zero() {
        let outline = TrackOutline {
            path: vec![Point::new(0.2, 0.2), Point::new(0.2, 0.2)],
            ..Default::default()
        };
        let frame = CartesianFrame::fit(&outline, Viewport::TRACK_MAP).unwrap();
        assert!(frame.scale().is_finite());
        let p = frame.to_screen(Point::new(0.2, 0.2));
        assert!(approx(p.x, 400.0) && approx(p.y, 300.0));
    }

    #[test]
    fn test_start_finish_is_perpendicular_to_averaged_tangent() {
        // first point in the middle of a straight running along +x
        let outline = TrackOutline {
            path: vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(-1.0, 1.0),
                Point::new(-1.0, 0.0),
            ],
            ..Default::default()
        };
        let frame = CartesianFrame::fit(&outline, Viewport::TRACK_MAP).unwrap();
        let marker = frame.start_finish();

        // the track is horizontal at the start, so the line is vertical
        assert!(approx(marker.from.x, marker.at.x));
        assert!(approx(marker.to.x, marker.at.x));
        assert!(approx((marker.to.y - marker.from.y).abs(), 2.0 * START_FINISH_HALF_LENGTH));
    }

    #[test]
    fn test_start_finish_single_point_uses_default_direction() {
        let outline = TrackOutline {
            path: vec![Point::new(0.0, 0.0)],
            ..Default::default()
        };
        let frame = CartesianFrame::fit(&outline, Viewport::TRACK_MAP).unwrap();
        let marker = frame.start_finish();
        assert!(approx(marker.from.x, marker.at.x));
        assert!(approx(marker.from.y, marker.at.y - START_FINISH_HALF_LENGTH));
    }

    #[test]
    fn test_sector_markers_by_index() {
        let outline = TrackOutline {
            path: (0..10).map(|i| Point::new(i as f64, 0.0)).collect(),
            ..Default::default()
        };
        let frame = CartesianFrame::fit(&outline, Viewport::TRACK_MAP).unwrap();
        let markers = frame.sector_markers(&Sectors {
            track_length: 5000.0,
            sector2_start: 1750.0,
            sector3_start: 3600.0,
        });

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].label, "S2");
        assert_eq!(markers[0].at, frame.to_screen(Point::new(3.0, 0.0)));
        assert_eq!(markers[1].at, frame.to_screen(Point::new(7.0, 0.0)));
    }

    #[test]
    fn test_sector_marker_at_index_zero_skipped() {
        let outline = square_outline();
        let frame = CartesianFrame::fit(&outline, Viewport::TRACK_MAP).unwrap();
        let markers = frame.sector_markers(&Sectors {
            track_length: 5000.0,
            sector2_start: 100.0,
            sector3_start: 6000.0,
        });
        assert!(markers.is_empty());
    }

    #[test]
    fn test_project_known_coordinates_use_outline_normalization() {
        let frame = CartesianFrame::fit(&square_outline(), Viewport::TRACK_MAP).unwrap();
        // raw (800, 1800) normalizes to (0.5, -0.5)
        let pos = DriverPosition {
            x: Some(800.0),
            y: Some(1800.0),
            ..Default::default()
        };
        assert_eq!(frame.project(&pos), Some(frame.to_screen(Point::new(0.5, -0.5))));
    }

    #[test]
    fn test_project_known_without_normalization_falls_back_to_distance() {
        let mut outline = square_outline();
        outline.center = None;
        let frame = CartesianFrame::fit(&outline, Viewport::TRACK_MAP).unwrap();

        let pos = DriverPosition {
            x: Some(800.0),
            y: Some(1800.0),
            distance: Some(6.0),
            ..Default::default()
        };
        // 6 mod 4 = 2
        assert_eq!(frame.project(&pos), Some(frame.to_screen(outline.path[2])));

        let no_distance = DriverPosition {
            x: Some(800.0),
            y: Some(1800.0),
            ..Default::default()
        };
        assert_eq!(frame.project(&no_distance), None);
    }

    #[test]
    fn test_project_by_distance_wraps_on_path_length() {
        let outline = square_outline();
        let frame = CartesianFrame::fit(&outline, Viewport::TRACK_MAP).unwrap();
        let pos = DriverPosition {
            distance: Some(9.5),
            ..Default::default()
        };
        assert_eq!(frame.project(&pos), Some(frame.to_screen(outline.path[1])));
    }

    #[test]
    fn test_project_unknown_is_skipped() {
        let frame = CartesianFrame::fit(&square_outline(), Viewport::TRACK_MAP).unwrap();
        assert_eq!(frame.project(&DriverPosition::default()), None);
    }
}
