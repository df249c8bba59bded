// Tolerance-based coordinate equality.
//
// Tolerances are linear distances in the units of the working CRS. A
// geographic CRS (degrees) silently produces wrong answers; callers are
// expected to reproject before handing features to the core.

use geo_types::Coord;

/// Euclidean distance between two coordinates.
#[inline]
pub fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// True iff `a` and `b` are within `tolerance` of each other (inclusive).
#[inline]
pub fn coincident(a: Coord<f64>, b: Coord<f64>, tolerance: f64) -> bool {
    distance(a, b) <= tolerance
}

#[inline]
pub fn is_finite(coord: Coord<f64>) -> bool {
    coord.x.is_finite() && coord.y.is_finite()
}

/// Squared search radius handed to an R-tree so that every coordinate that
/// passes [`coincident`] is returned as a candidate, even when squaring the
/// tolerance rounds down.
#[inline]
pub(crate) fn search_radius_2(tolerance: f64) -> f64 {
    let padded = tolerance * (1.0 + 1e-9) + f64::EPSILON;
    padded * padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let p = Coord { x: 5.0, y: 0.0 };
        assert!(coincident(p, p, 0.0));
    }

    #[test]
    fn test_within_tolerance() {
        let a = Coord { x: 5.0, y: 0.0 };
        let b = Coord { x: 5.0002, y: 0.0 };
        assert!(coincident(a, b, 0.001));
        assert!(!coincident(a, b, 0.0001));
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let a = Coord { x: 0.0, y: 0.0 };
        let b = Coord { x: 3.0, y: 4.0 };
        assert!(coincident(a, b, 5.0));
        assert!(!coincident(a, b, 4.999));
    }

    #[test]
    fn test_symmetric() {
        let a = Coord { x: 1.0, y: 2.0 };
        let b = Coord { x: 1.0005, y: 2.0005 };
        assert_eq!(coincident(a, b, 0.001), coincident(b, a, 0.001));
    }

    #[test]
    fn test_search_radius_covers_boundary() {
        let tolerance = 0.3;
        assert!(search_radius_2(tolerance) >= tolerance * tolerance);
    }
}
