//! Price string normalization for comma-as-decimal locales.

/// Parse a locale-formatted price string into euros.
///
/// Strips currency symbols/units and whitespace, converts the comma decimal
/// separator to a point, and parses the remainder. Returns `None` for empty
/// or malformed input; never panics.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .replace('€', "")
        .replace("EUR", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
}
