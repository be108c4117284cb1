//! Kennel name ordering
//!
//! Kennels are named `<letters><number>[suffix]` (`A01`, `B12 Q`). Listings,
//! dropdowns and adjacency pre-fill all order through [`compare_kennel_names`]
//! so "next kennel" means the same thing everywhere.

use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

use crate::Resource;

static KENNEL_NAME: OnceLock<Regex> = OnceLock::new();

fn kennel_name_regex() -> &'static Regex {
    KENNEL_NAME.get_or_init(|| {
        Regex::new(r"^([A-Za-z]+)(\d+)(.*)$").expect("kennel name pattern is valid")
    })
}

/// Parsed `<letters><number>[suffix]` name
#[derive(Debug, PartialEq, Eq)]
struct KennelName<'a> {
    letters: String,
    number: u64,
    suffix: &'a str,
}

fn parse(name: &str) -> Option<KennelName<'_>> {
    let caps = kennel_name_regex().captures(name.trim())?;
    let letters = caps.get(1)?.as_str().to_ascii_uppercase();
    // Overlong digit runs do not fit u64; treat them as unpatterned
    let number = caps.get(2)?.as_str().parse().ok()?;
    let suffix = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");
    Some(KennelName {
        letters,
        number,
        suffix,
    })
}

/// Total order over kennel names
///
/// Letters first, then the numeric segment by value, then any suffix.
/// Names without the pattern sort after patterned ones, lexicographically.
/// Ties fall back to the raw string so distinct names never compare equal.
pub fn compare_kennel_names(a: &str, b: &str) -> Ordering {
    let primary = match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x
            .letters
            .cmp(&y.letters)
            .then(x.number.cmp(&y.number))
            .then_with(|| x.suffix.cmp(y.suffix)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    primary.then_with(|| a.cmp(b))
}

/// Sort resources in place by display name (stable)
pub fn sort_resources(resources: &mut [Resource]) {
    resources.sort_by(|a, b| compare_kennel_names(a.display_name(), b.display_name()));
}
