//! Phone number normalization, formatting, and the country table backing the
//! country-code picker.

use serde::Serialize;

/// A dialable country: display name, calling code, ISO region, and flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Country {
    pub name: &'static str,
    pub calling_code: u16,
    pub region_code: &'static str,
    pub emoji: &'static str,
}

/// Region-ordered country table. The first entry for a shared calling code
/// (NANP) wins reverse lookups.
static COUNTRIES: &[Country] = &[
    Country { name: "United States", calling_code: 1, region_code: "US", emoji: "\u{1F1FA}\u{1F1F8}" },
    Country { name: "Canada", calling_code: 1, region_code: "CA", emoji: "\u{1F1E8}\u{1F1E6}" },
    Country { name: "United Kingdom", calling_code: 44, region_code: "GB", emoji: "\u{1F1EC}\u{1F1E7}" },
    Country { name: "Germany", calling_code: 49, region_code: "DE", emoji: "\u{1F1E9}\u{1F1EA}" },
    Country { name: "France", calling_code: 33, region_code: "FR", emoji: "\u{1F1EB}\u{1F1F7}" },
    Country { name: "Italy", calling_code: 39, region_code: "IT", emoji: "\u{1F1EE}\u{1F1F9}" },
    Country { name: "Spain", calling_code: 34, region_code: "ES", emoji: "\u{1F1EA}\u{1F1F8}" },
    Country { name: "Netherlands", calling_code: 31, region_code: "NL", emoji: "\u{1F1F3}\u{1F1F1}" },
    Country { name: "Sweden", calling_code: 46, region_code: "SE", emoji: "\u{1F1F8}\u{1F1EA}" },
    Country { name: "Switzerland", calling_code: 41, region_code: "CH", emoji: "\u{1F1E8}\u{1F1ED}" },
    Country { name: "Poland", calling_code: 48, region_code: "PL", emoji: "\u{1F1F5}\u{1F1F1}" },
    Country { name: "Ukraine", calling_code: 380, region_code: "UA", emoji: "\u{1F1FA}\u{1F1E6}" },
    Country { name: "Turkey", calling_code: 90, region_code: "TR", emoji: "\u{1F1F9}\u{1F1F7}" },
    Country { name: "India", calling_code: 91, region_code: "IN", emoji: "\u{1F1EE}\u{1F1F3}" },
    Country { name: "China", calling_code: 86, region_code: "CN", emoji: "\u{1F1E8}\u{1F1F3}" },
    Country { name: "Japan", calling_code: 81, region_code: "JP", emoji: "\u{1F1EF}\u{1F1F5}" },
    Country { name: "South Korea", calling_code: 82, region_code: "KR", emoji: "\u{1F1F0}\u{1F1F7}" },
    Country { name: "Australia", calling_code: 61, region_code: "AU", emoji: "\u{1F1E6}\u{1F1FA}" },
    Country { name: "New Zealand", calling_code: 64, region_code: "NZ", emoji: "\u{1F1F3}\u{1F1FF}" },
    Country { name: "Brazil", calling_code: 55, region_code: "BR", emoji: "\u{1F1E7}\u{1F1F7}" },
    Country { name: "Mexico", calling_code: 52, region_code: "MX", emoji: "\u{1F1F2}\u{1F1FD}" },
    Country { name: "Argentina", calling_code: 54, region_code: "AR", emoji: "\u{1F1E6}\u{1F1F7}" },
    Country { name: "South Africa", calling_code: 27, region_code: "ZA", emoji: "\u{1F1FF}\u{1F1E6}" },
    Country { name: "Nigeria", calling_code: 234, region_code: "NG", emoji: "\u{1F1F3}\u{1F1EC}" },
    Country { name: "Kenya", calling_code: 254, region_code: "KE", emoji: "\u{1F1F0}\u{1F1EA}" },
    Country { name: "Egypt", calling_code: 20, region_code: "EG", emoji: "\u{1F1EA}\u{1F1EC}" },
    Country { name: "United Arab Emirates", calling_code: 971, region_code: "AE", emoji: "\u{1F1E6}\u{1F1EA}" },
    Country { name: "Indonesia", calling_code: 62, region_code: "ID", emoji: "\u{1F1EE}\u{1F1E9}" },
    Country { name: "Philippines", calling_code: 63, region_code: "PH", emoji: "\u{1F1F5}\u{1F1ED}" },
];

/// Regions shown at the top of the picker before any search.
static COMMON_REGIONS: &[&str] = &["US", "CA", "GB", "DE", "IN"];

pub fn all_countries() -> &'static [Country] {
    COUNTRIES
}

pub fn common_countries() -> Vec<Country> {
    COMMON_REGIONS
        .iter()
        .filter_map(|region| COUNTRIES.iter().find(|c| c.region_code == *region))
        .copied()
        .collect()
}

/// First region registered for a calling code ("1" -> "US", "44" -> "GB").
pub fn region_for_calling_code(calling_code: &str) -> Option<&'static str> {
    let code: u16 = calling_code.parse().ok()?;
    COUNTRIES
        .iter()
        .find(|c| c.calling_code == code)
        .map(|c| c.region_code)
}

pub fn calling_code_for_region(region_code: &str) -> Option<u16> {
    COUNTRIES
        .iter()
        .find(|c| c.region_code == region_code)
        .map(|c| c.calling_code)
}

/// Filter the country table the way the picker search box does: by name
/// fragment, by calling-code fragment (leading `+` ignored), with a special
/// "usa" alias for the United States.
pub fn search(query: &str, countries: &[Country]) -> Vec<Country> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let lowered = query.to_lowercase();
    let digits = query.trim_start_matches('+');

    countries
        .iter()
        .filter(|country| {
            country.name.to_lowercase().contains(&lowered)
                || (!digits.is_empty() && country.calling_code.to_string().contains(digits))
                || (lowered == "usa" && country.name == "United States")
        })
        .copied()
        .collect()
}

/// Strip everything but ASCII digits from user input.
pub fn extract_digits(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Build an E.164 string from a calling code and national digits.
pub fn to_e164(calling_code: &str, national_digits: &str) -> String {
    format!("+{}{}", calling_code, national_digits)
}

/// Format national digits for display, progressively as digits are typed.
///
/// NANP regions get the full "(555) 123-4567" treatment; other regions fall
/// back to space-separated groups of four, which is enough for an entry
/// field without shipping a full metadata set.
pub fn format_national(digits: &str, region_code: &str) -> String {
    match region_code {
        "US" | "CA" => format_nanp(digits),
        _ => format_grouped(digits),
    }
}

fn format_nanp(digits: &str) -> String {
    match digits.len() {
        0..=3 => digits.to_string(),
        4..=7 => format!("{}-{}", &digits[..3], &digits[3..]),
        8..=10 => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        _ => digits.to_string(),
    }
}

fn format_grouped(digits: &str) -> String {
    digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ")
}
