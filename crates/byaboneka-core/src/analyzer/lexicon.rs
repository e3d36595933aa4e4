//! Closed color and brand lexicons.
//!
//! Tokens in either list are always retained by the keyword extractor, even
//! below the general length threshold: "red", "hp" and "lg" carry more
//! matching signal than most long words in an item description.

/// Colors in English and Kinyarwanda.
pub const COLORS: &[&str] = &[
    "black", "white", "red", "blue", "green", "yellow", "grey", "gray",
    "brown", "pink", "purple", "orange", "silver", "gold", "navy", "maroon",
    "beige", "cream", "violet", "cyan",
    // Kinyarwanda color terms seen in reports
    "umukara", "umweru", "umutuku", "ubururu", "icyatsi", "umuhondo",
];

/// Brands common in Rwandan urban transport lost-property reports.
pub const BRANDS: &[&str] = &[
    // Phones & electronics
    "iphone", "apple", "samsung", "tecno", "infinix", "itel", "huawei",
    "nokia", "xiaomi", "redmi", "oppo", "vivo", "realme", "pixel",
    "macbook", "dell", "hp", "lenovo", "asus", "acer", "toshiba",
    "jbl", "sony", "lg", "canon", "nikon", "anker", "oraimo",
    // Wearables & fashion
    "rolex", "casio", "seiko", "fitbit", "nike", "adidas", "puma", "bata",
    // Telecom
    "mtn", "airtel",
];

pub fn is_color(token: &str) -> bool {
    COLORS.contains(&token)
}

pub fn is_brand(token: &str) -> bool {
    BRANDS.contains(&token)
}

/// A lexicon token is retained regardless of the length heuristic.
pub fn is_lexicon_token(token: &str) -> bool {
    is_color(token) || is_brand(token)
}
