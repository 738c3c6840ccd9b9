use std::fmt;

use smallvec::SmallVec;

/// Number of distinct letters available for tagged missing values.
pub const MAX_TAGS: usize = 26;

/// Returns the tag letter (`'a'..='z'`) for a position in the missingness list.
#[must_use]
pub fn tag_for_index(index: usize) -> Option<char> {
    u8::try_from(index)
        .ok()
        .filter(|i| usize::from(*i) < MAX_TAGS)
        .map(|i| char::from(b'a' + i))
}

/// A coded value in the column's native representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Code {
    Double(f64),
    /// Day offset of a calendar column stored as a 32-bit integer.
    Int32(i32),
    Str(String),
}

impl Code {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Int32(v) => Some(f64::from(*v)),
            Self::Str(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// One user-missing declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingSpec {
    Discrete(Code),
    /// Inclusive on both ends. `low == high` is a discrete value written as a range.
    Range { low: Code, high: Code },
}

impl MissingSpec {
    #[must_use]
    pub fn contains(&self, value: &Code) -> bool {
        match self {
            Self::Discrete(code) => code == value,
            // Normalized ISO dates order lexicographically.
            Self::Range {
                low: Code::Str(low),
                high: Code::Str(high),
            } => value
                .as_str()
                .is_some_and(|v| low.as_str() <= v && v <= high.as_str()),
            Self::Range { low, high } => match (low.as_f64(), high.as_f64(), value.as_f64()) {
                (Some(low), Some(high), Some(v)) => low <= v && v <= high,
                _ => false,
            },
        }
    }

    /// True for ranges that span more than one value.
    #[must_use]
    pub fn is_proper_range(&self) -> bool {
        matches!(self, Self::Range { low, high } if low != high)
    }
}

/// Ordered user-missing declarations of one column.
///
/// Order is taken verbatim from the schema document; the position of the
/// first matching spec is the value's tag index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Missingness {
    specs: SmallVec<[MissingSpec; 3]>,
    tagged: bool,
}

impl Missingness {
    #[must_use]
    pub fn new(specs: impl IntoIterator<Item = MissingSpec>, tagged: bool) -> Self {
        Self {
            specs: specs.into_iter().collect(),
            tagged,
        }
    }

    #[must_use]
    pub fn specs(&self) -> &[MissingSpec] {
        &self.specs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether matches carry a letter tag on the resolved target.
    #[must_use]
    pub const fn is_tagged(&self) -> bool {
        self.tagged
    }

    /// Index of the first spec containing `value`.
    #[must_use]
    pub fn first_match(&self, value: &Code) -> Option<usize> {
        self.specs.iter().position(|spec| spec.contains(value))
    }

    #[must_use]
    pub fn tag_at(&self, index: usize) -> Option<char> {
        if self.tagged { tag_for_index(index) } else { None }
    }

    #[must_use]
    pub fn discrete_count(&self) -> usize {
        self.specs.iter().filter(|spec| !spec.is_proper_range()).count()
    }

    #[must_use]
    pub fn range_count(&self) -> usize {
        self.specs.iter().filter(|spec| spec.is_proper_range()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_cover_lowercase_alphabet_only() {
        assert_eq!(tag_for_index(0), Some('a'));
        assert_eq!(tag_for_index(25), Some('z'));
        assert_eq!(tag_for_index(26), None);
    }

    #[test]
    fn range_membership_is_inclusive() {
        let spec = MissingSpec::Range {
            low: Code::Double(-9.0),
            high: Code::Double(-7.0),
        };
        assert!(spec.contains(&Code::Double(-9.0)));
        assert!(spec.contains(&Code::Double(-7.0)));
        assert!(spec.contains(&Code::Double(-8.5)));
        assert!(!spec.contains(&Code::Double(-6.999)));
    }

    #[test]
    fn iso_date_ranges_compare_as_text() {
        let spec = MissingSpec::Range {
            low: Code::Str("1999-12-01".into()),
            high: Code::Str("2000-01-31".into()),
        };
        assert!(spec.contains(&Code::Str("2000-01-01".into())));
        assert!(!spec.contains(&Code::Str("2000-02-01".into())));
        assert!(!spec.contains(&Code::Double(0.0)));
    }

    #[test]
    fn first_match_wins_when_specs_overlap() {
        let missing = Missingness::new(
            [
                MissingSpec::Range {
                    low: Code::Double(-10.0),
                    high: Code::Double(-1.0),
                },
                MissingSpec::Discrete(Code::Double(-5.0)),
            ],
            true,
        );
        assert_eq!(missing.first_match(&Code::Double(-5.0)), Some(0));
        assert_eq!(missing.tag_at(0), Some('a'));
    }

    #[test]
    fn degenerate_range_counts_as_discrete() {
        let missing = Missingness::new(
            [MissingSpec::Range {
                low: Code::Double(1.0),
                high: Code::Double(1.0),
            }],
            false,
        );
        assert_eq!(missing.discrete_count(), 1);
        assert_eq!(missing.range_count(), 0);
        assert_eq!(missing.tag_at(0), None);
    }
}
