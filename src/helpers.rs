//! Small shared helpers for text normalization and coordinate rounding.

/// Round a coordinate to 4 decimal places (~11 m).
///
/// Both the weather request URL and the fetch-cache key go through this, so
/// a coordinate always maps to the same cache entry as the request it issued.
pub(crate) fn round_coordinate(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Title-case a free-text name: first letter of each whitespace-separated
/// word uppercased, the rest lowercased.
pub(crate) fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
