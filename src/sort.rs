// Sort criteria for the task list

use crate::models::Task;
use std::cmp::Ordering;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Orderings the list can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortCriterion {
    TextAsc,     // a-z
    TextDesc,    // z-a
    NewestFirst, // created_at desc
    OldestFirst, // created_at asc
}

impl SortCriterion {
    pub const ALL: [SortCriterion; 4] = [
        SortCriterion::TextAsc,
        SortCriterion::TextDesc,
        SortCriterion::NewestFirst,
        SortCriterion::OldestFirst,
    ];

    /// Compare two tasks under this criterion
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortCriterion::TextAsc => locale_compare(&a.text, &b.text),
            SortCriterion::TextDesc => locale_compare(&b.text, &a.text),
            SortCriterion::NewestFirst => b.created_at.cmp(&a.created_at),
            SortCriterion::OldestFirst => a.created_at.cmp(&b.created_at),
        }
    }

    /// Sort `tasks` in place starting from their current order
    pub fn apply(self, tasks: &mut [Task]) {
        tasks.sort_by(|a, b| self.compare(a, b));
    }
}

impl std::fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortCriterion::TextAsc => write!(f, "a-z"),
            SortCriterion::TextDesc => write!(f, "z-a"),
            SortCriterion::NewestFirst => write!(f, "newest"),
            SortCriterion::OldestFirst => write!(f, "oldest"),
        }
    }
}

impl FromStr for SortCriterion {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a-z" | "az" | "asc" => Ok(SortCriterion::TextAsc),
            "z-a" | "za" | "desc" => Ok(SortCriterion::TextDesc),
            "newest" | "new" => Ok(SortCriterion::NewestFirst),
            "oldest" | "old" => Ok(SortCriterion::OldestFirst),
            other => Err(eyre::eyre!(
                "Unknown sort criterion: {} (expected a-z, z-a, newest or oldest)",
                other
            )),
        }
    }
}

/// Collation-style string comparison.
///
/// Strings compare by their base letters first, ignoring accents and case.
/// Ties are broken by accents (unaccented first), then by case (lowercase
/// first), then by code points of the decomposed text.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let primary = base_letters(a).cmp(base_letters(b));
    if primary != Ordering::Equal {
        return primary;
    }

    let accents = a
        .nfd()
        .flat_map(char::to_lowercase)
        .cmp(b.nfd().flat_map(char::to_lowercase));
    if accents != Ordering::Equal {
        return accents;
    }

    let case = a
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(char::is_uppercase)
        .cmp(b.nfd().filter(|c| !is_combining_mark(*c)).map(char::is_uppercase));
    if case != Ordering::Equal {
        return case;
    }

    a.nfd().cmp(b.nfd())
}

/// Lowercased letters with combining marks stripped
fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}
