//! Attribute catalogs.
//!
//! The priority table mirrors buildifier's `namePriority` so generated and merged rules print in
//! the order a formatter would leave them in.

use std::cmp::Ordering;

const NAME_PRIORITY: &[(&str, i32)] = &[
    ("name", -99),
    ("gwt_name", -98),
    ("package_name", -97),
    ("visible_node_name", -96),
    ("size", -95),
    ("timeout", -94),
    ("testonly", -93),
    ("src", -92),
    ("srcdir", -91),
    ("srcs", -90),
    ("out", -89),
    ("outs", -88),
    ("hdrs", -87),
    ("has_services", -86),
    ("include", -85),
    ("of", -84),
    ("baseline", -83),
    // All others sort here, at 0.
    ("destdir", 1),
    ("exports", 2),
    ("runtime_deps", 3),
    ("deps", 4),
    ("implementation", 5),
    ("implements", 6),
    ("alwayslink", 7),
];

/// Attributes fully computed by the generator.
///
/// When a fresh rule no longer carries one of these, the merged rule drops it too (apart from
/// elements marked `# keep`). Every other attribute found only on the existing rule is treated as
/// hand-authored and carried over.
pub const GENERATED_ATTRS: &[&str] = &["srcs", "deps", "library", "clinkopts", "copts"];

pub fn priority(name: &str) -> i32 {
    NAME_PRIORITY
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, p)| *p)
        .unwrap_or(0)
}

/// Total order over attribute names: priority first, then name.
pub fn compare(a: &str, b: &str) -> Ordering {
    priority(a).cmp(&priority(b)).then_with(|| a.cmp(b))
}

pub fn is_generated(name: &str) -> bool {
    GENERATED_ATTRS.contains(&name)
}
