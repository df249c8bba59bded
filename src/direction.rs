// Flow direction of a segment: bearing from its first to its last vertex,
// plus the eight-way compass text written to `direction_text`.

use crate::models::{DirectionRecord, Segment};
use geo_types::Coord;

/// Compass sector of a bearing. Each sector spans 45 degrees centred on its
/// direction; N wraps across 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinal {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Cardinal {
    const SECTORS: [Cardinal; 8] = [
        Cardinal::N,
        Cardinal::NE,
        Cardinal::E,
        Cardinal::SE,
        Cardinal::S,
        Cardinal::SW,
        Cardinal::W,
        Cardinal::NW,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinal::N => "N",
            Cardinal::NE => "NE",
            Cardinal::E => "E",
            Cardinal::SE => "SE",
            Cardinal::S => "S",
            Cardinal::SW => "SW",
            Cardinal::W => "W",
            Cardinal::NW => "NW",
        }
    }
}

impl std::fmt::Display for Cardinal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Clockwise angle from north, in degrees within [0, 360).
///
/// Returns `None` for identical points.
pub fn bearing(start: Coord<f64>, end: Coord<f64>) -> Option<f64> {
    if start == end {
        return None;
    }
    let angle = (end.y - start.y).atan2(end.x - start.x).to_degrees();
    let bearing = (90.0 - angle + 360.0) % 360.0;
    // 360 - tiny can round up to exactly 360.0
    Some(if bearing >= 360.0 { 0.0 } else { bearing })
}

/// Compass sector for a bearing. Non-finite input has no direction.
pub fn cardinal(bearing: f64) -> Option<Cardinal> {
    if !bearing.is_finite() {
        return None;
    }
    let normalized = bearing.rem_euclid(360.0);
    let sector = (((normalized + 22.5) / 45.0).floor() as usize) % 8;
    Some(Cardinal::SECTORS[sector])
}

/// Bearing and compass text for a whole segment (first vertex to last).
pub fn direction_of(segment: &Segment) -> DirectionRecord {
    let bearing = match (segment.start(), segment.end()) {
        (Some(start), Some(end)) => bearing(start, end),
        _ => None,
    };
    DirectionRecord {
        bearing,
        direction_text: bearing
            .and_then(cardinal)
            .map(|c| c.as_str().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("bearing should be defined");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_axis_bearings() {
        let p = c(10.0, 20.0);
        assert_close(bearing(p, c(11.0, 20.0)), 90.0);
        assert_close(bearing(p, c(10.0, 21.0)), 0.0);
        assert_close(bearing(p, c(9.0, 20.0)), 270.0);
        assert_close(bearing(p, c(10.0, 19.0)), 180.0);
    }

    #[test]
    fn test_diagonal_bearings() {
        let origin = c(0.0, 0.0);
        assert_close(bearing(origin, c(1.0, 1.0)), 45.0);
        assert_close(bearing(origin, c(-1.0, -1.0)), 225.0);
        assert_close(bearing(origin, c(-1.0, 1.0)), 315.0);
    }

    #[test]
    fn test_translation_invariance() {
        let delta = (3.0, -4.0);
        let base = bearing(c(0.0, 0.0), c(delta.0, delta.1));
        for (x, y) in [(100.0, 100.0), (-2500.5, 7.25), (1e6, -1e6)] {
            let moved = bearing(c(x, y), c(x + delta.0, y + delta.1));
            assert!((moved.unwrap() - base.unwrap()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_length_has_no_direction() {
        let p = c(5.0, 5.0);
        assert_eq!(bearing(p, p), None);

        let segment = Segment::new("loop", vec![p, c(6.0, 6.0), p]);
        assert_eq!(direction_of(&segment), DirectionRecord::default());
    }

    #[test]
    fn test_cardinal_boundaries() {
        assert_eq!(cardinal(0.0), Some(Cardinal::N));
        assert_eq!(cardinal(22.4), Some(Cardinal::N));
        assert_eq!(cardinal(22.5), Some(Cardinal::NE));
        assert_eq!(cardinal(44.0), Some(Cardinal::NE));
        assert_eq!(cardinal(45.0), Some(Cardinal::NE));
        assert_eq!(cardinal(67.5), Some(Cardinal::E));
        assert_eq!(cardinal(180.0), Some(Cardinal::S));
        assert_eq!(cardinal(337.4), Some(Cardinal::NW));
        assert_eq!(cardinal(337.5), Some(Cardinal::N));
        assert_eq!(cardinal(359.99), Some(Cardinal::N));
        assert_eq!(cardinal(360.0), Some(Cardinal::N));
        assert_eq!(cardinal(f64::NAN), None);
    }

    #[test]
    fn test_direction_of_segment() {
        let segment = Segment::new("L1", vec![c(0.0, 0.0), c(3.0, 7.0), c(0.0, 10.0)]);
        let record = direction_of(&segment);
        assert_close(record.bearing, 0.0);
        assert_eq!(record.direction_text.as_deref(), Some("N"));
    }
}
