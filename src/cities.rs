//! The fixed city list behind "Canada-wide" searches.

/// Cities searched in Canada-wide mode, in search order.
///
/// Ordered by metropolitan population so that, with a shared seen-set, a
/// chain's flagship location is attributed to its largest market.
pub const CANADA_WIDE_CITIES: &[&str] = &[
    "Toronto, ON",
    "Montreal, QC",
    "Vancouver, BC",
    "Calgary, AB",
    "Edmonton, AB",
    "Ottawa, ON",
    "Winnipeg, MB",
    "Quebec City, QC",
    "Hamilton, ON",
    "Halifax, NS",
];

/// Owned copy of [`CANADA_WIDE_CITIES`], used as the config default.
pub fn default_cities() -> Vec<String> {
    CANADA_WIDE_CITIES.iter().map(|c| (*c).to_string()).collect()
}
