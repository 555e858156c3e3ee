//! Market/asset-type normalization.
//!
//! Two conventions coexist in the source this pipeline was distilled from: a
//! closed enum and a free-form string. The free-form string is canonical
//! (`spec.md` §9, Open Questions) — `securities.market`/`securities.type`
//! are persisted as plain strings. This module only normalizes *known*
//! vendor spellings into the controlled vocabulary; anything else passes
//! through unchanged and is logged by the caller.

/// Markets the pipeline recognizes out of the box. Not exhaustive — vendors
/// may report markets outside this list, which pass through verbatim.
pub const KNOWN_MARKETS: &[&str] = &["US", "HK", "CNA"];

/// Asset types the pipeline recognizes out of the box.
pub const KNOWN_ASSET_TYPES: &[&str] = &[
    "STOCK",
    "ETF",
    "INDEX",
    "ADR",
    "WARRANT",
    "PREFERRED",
    "MUTUAL_FUND",
    "OTC",
];

/// Normalizes a vendor-supplied market string to the controlled vocabulary.
/// Unknown values are upper-cased and passed through; the caller is
/// responsible for logging that fact (`spec.md` §4.2).
pub fn normalize_market(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    match upper.as_str() {
        "US" | "USA" | "GLOBAL" => "US".to_string(),
        "HK" | "HKG" => "HK".to_string(),
        "CN" | "CNA" | "CHINA" => "CNA".to_string(),
        _ => upper,
    }
}

/// Normalizes a vendor-supplied instrument type string to the controlled
/// vocabulary. Unknown values are upper-cased and passed through.
pub fn normalize_asset_type(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    match upper.as_str() {
        "CS" | "COMMON STOCK" | "STOCK" => "STOCK".to_string(),
        "ETF" | "ETN" => "ETF".to_string(),
        "INDEX" => "INDEX".to_string(),
        "ADRC" | "ADR" => "ADR".to_string(),
        "WARRANT" => "WARRANT".to_string(),
        "PREFERRED STOCK" | "PREFERRED" => "PREFERRED".to_string(),
        "MUTUAL FUND" | "MUTUAL_FUND" => "MUTUAL_FUND".to_string(),
        "OTC" => "OTC".to_string(),
        _ => upper,
    }
}

/// Lower-cases and trims a vendor symbol into the canonical internal form
/// (`spec.md` §3: "symbol non-empty and lowercase").
pub fn canonical_symbol(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_markets() {
        assert_eq!(normalize_market("global"), "US");
        assert_eq!(normalize_market("hkg"), "HK");
        assert_eq!(normalize_market("china"), "CNA");
    }

    #[test]
    fn passes_through_unknown_market() {
        assert_eq!(normalize_market("forex"), "FOREX");
    }

    #[test]
    fn normalizes_known_asset_types() {
        assert_eq!(normalize_asset_type("cs"), "STOCK");
        assert_eq!(normalize_asset_type("ADRC"), "ADR");
        assert_eq!(normalize_asset_type("mutual fund"), "MUTUAL_FUND");
    }

    #[test]
    fn canonical_symbol_lowercases_and_trims() {
        assert_eq!(canonical_symbol("  AAPL \n"), "aapl");
    }
}
