//! Named-area distance for Kigali transport corridors.
//!
//! Distance scale:
//!   0 — same area
//!   1 — adjacent areas (adjacency table)
//!   2 — different areas in the same district
//!   3 — everything else (including unknown areas)
//!
//! The adjacency table is stored one-directional; lookups check both
//! orientations so the relation behaves symmetrically no matter which way a
//! pair was recorded.

/// One-directional adjacency pairs. Do not rely on row direction.
const ADJACENT_AREAS: &[(&str, &str)] = &[
    ("kimironko", "remera"),
    ("kimironko", "kibagabaga"),
    ("kimironko", "nyarutarama"),
    ("remera", "kisimenti"),
    ("remera", "kanombe"),
    ("kisimenti", "kimihurura"),
    ("kimihurura", "kacyiru"),
    ("kacyiru", "nyarutarama"),
    ("kacyiru", "gisozi"),
    ("gisozi", "kinyinya"),
    ("kinyinya", "kibagabaga"),
    ("nyabugogo", "muhima"),
    ("muhima", "nyarugenge"),
    ("nyarugenge", "nyamirambo"),
    ("nyamirambo", "kimisagara"),
    ("kimisagara", "nyabugogo"),
    ("gikondo", "gatenga"),
    ("gatenga", "kicukiro"),
    ("kicukiro", "niboye"),
    ("niboye", "kagarama"),
    ("kanombe", "kabeza"),
    ("kabeza", "kicukiro"),
    ("gikondo", "nyarugenge"),
];

/// Area → district. Areas missing here score distance 3 against everything
/// except an exact match.
const DISTRICTS: &[(&str, &str)] = &[
    ("kimironko", "gasabo"),
    ("remera", "gasabo"),
    ("kibagabaga", "gasabo"),
    ("nyarutarama", "gasabo"),
    ("kisimenti", "gasabo"),
    ("kimihurura", "gasabo"),
    ("kacyiru", "gasabo"),
    ("gisozi", "gasabo"),
    ("kinyinya", "gasabo"),
    ("ndera", "gasabo"),
    ("nyabugogo", "nyarugenge"),
    ("muhima", "nyarugenge"),
    ("nyarugenge", "nyarugenge"),
    ("nyamirambo", "nyarugenge"),
    ("kimisagara", "nyarugenge"),
    ("gitega", "nyarugenge"),
    ("kicukiro", "kicukiro"),
    ("gatenga", "kicukiro"),
    ("gikondo", "kicukiro"),
    ("kanombe", "kicukiro"),
    ("kabeza", "kicukiro"),
    ("niboye", "kicukiro"),
    ("kagarama", "kicukiro"),
];

fn normalize_area(area: &str) -> String {
    area.trim().to_lowercase()
}

fn district_of(area: &str) -> Option<&'static str> {
    DISTRICTS
        .iter()
        .find(|(a, _)| *a == area)
        .map(|(_, d)| *d)
}

/// Symmetric adjacency lookup over the one-directional table.
fn are_adjacent(a: &str, b: &str) -> bool {
    ADJACENT_AREAS
        .iter()
        .any(|(x, y)| (*x == a && *y == b) || (*x == b && *y == a))
}

/// Distance between two named areas, 0..=3.
pub fn area_distance(a: &str, b: &str) -> u8 {
    let a = normalize_area(a);
    let b = normalize_area(b);

    if a == b && !a.is_empty() {
        return 0;
    }
    if are_adjacent(&a, &b) {
        return 1;
    }
    match (district_of(&a), district_of(&b)) {
        (Some(da), Some(db)) if da == db => 2,
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_area() {
        assert_eq!(area_distance("Kimironko", "kimironko"), 0);
        assert_eq!(area_distance("  Remera ", "remera"), 0);
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        // Table rows are one-directional; both orientations must resolve.
        assert_eq!(area_distance("kimironko", "remera"), 1);
        assert_eq!(area_distance("remera", "kimironko"), 1);
        assert_eq!(area_distance("muhima", "nyabugogo"), 1);
        assert_eq!(area_distance("nyabugogo", "muhima"), 1);
    }

    #[test]
    fn test_same_district() {
        // Both gasabo, not adjacent in the table.
        assert_eq!(area_distance("kimironko", "kacyiru"), 2);
        // Both kicukiro.
        assert_eq!(area_distance("kagarama", "gikondo"), 2);
    }

    #[test]
    fn test_cross_district_and_unknown() {
        assert_eq!(area_distance("kimironko", "nyamirambo"), 3);
        assert_eq!(area_distance("kimironko", "huye"), 3);
        assert_eq!(area_distance("", ""), 3);
    }

    #[test]
    fn test_every_adjacent_pair_has_district_rows() {
        for (a, b) in ADJACENT_AREAS {
            assert!(district_of(a).is_some(), "missing district for {}", a);
            assert!(district_of(b).is_some(), "missing district for {}", b);
        }
    }
}
