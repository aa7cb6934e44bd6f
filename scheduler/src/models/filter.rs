use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Photometric filter identifier.
///
/// Ordered by wavelength so per-filter maps iterate `u g r i z y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Filter {
    #[serde(rename = "u")]
    U,
    #[serde(rename = "g")]
    G,
    #[serde(rename = "r")]
    R,
    #[serde(rename = "i")]
    I,
    #[serde(rename = "z")]
    Z,
    #[serde(rename = "y")]
    Y,
}

impl Filter {
    pub const ALL: [Filter; 6] = [Filter::U, Filter::G, Filter::R, Filter::I, Filter::Z, Filter::Y];

    pub fn from_char(c: char) -> Option<Filter> {
        match c {
            'u' => Some(Filter::U),
            'g' => Some(Filter::G),
            'r' => Some(Filter::R),
            'i' => Some(Filter::I),
            'z' => Some(Filter::Z),
            'y' => Some(Filter::Y),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Filter::U => 'u',
            Filter::G => 'g',
            Filter::R => 'r',
            Filter::I => 'i',
            Filter::Z => 'z',
            Filter::Y => 'y',
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Filter::from_char(c).ok_or_else(|| format!("Unknown filter: {}", s)),
            _ => Err(format!("Unknown filter: {}", s)),
        }
    }
}

/// A set of filters, e.g. the filters mounted in the changer or the
/// filters a survey wants pairs in.
///
/// # Examples
///
/// ```
/// use survey_scheduler::models::{Filter, FilterSet};
///
/// let set: FilterSet = "griz".parse().unwrap();
/// assert!(set.contains(Filter::R));
/// assert!(!set.contains(Filter::U));
/// assert_eq!(set.to_string(), "griz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSet(BTreeSet<Filter>);

impl FilterSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, filter: Filter) -> bool {
        self.0.insert(filter)
    }

    pub fn contains(&self, filter: Filter) -> bool {
        self.0.contains(&filter)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the two sets share at least one filter.
    pub fn intersects(&self, other: &FilterSet) -> bool {
        self.0.intersection(&other.0).next().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = Filter> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<T: IntoIterator<Item = Filter>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for FilterSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(|c| Filter::from_char(c).ok_or_else(|| format!("Unknown filter '{}' in '{}'", c, s)))
            .collect()
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for filter in &self.0 {
            write!(f, "{}", filter)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!("r".parse::<Filter>().unwrap(), Filter::R);
        assert!("rg".parse::<Filter>().is_err());
        assert!("x".parse::<Filter>().is_err());
    }

    #[test]
    fn test_filter_set_parsing() {
        let set: FilterSet = "g, r".parse().unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(Filter::G));
        assert!("grq".parse::<FilterSet>().is_err());
    }

    #[test]
    fn test_filter_set_intersection() {
        let mounted: FilterSet = "rg".parse().unwrap();
        let wanted: FilterSet = "izy".parse().unwrap();
        assert!(!mounted.intersects(&wanted));
        assert!(mounted.intersects(&"rgiz".parse().unwrap()));
    }

    #[test]
    fn test_filter_serde() {
        assert_eq!(serde_json::to_string(&Filter::Z).unwrap(), "\"z\"");
        let f: Filter = serde_json::from_str("\"u\"").unwrap();
        assert_eq!(f, Filter::U);
    }
}
