use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SEPARATOR: char = ':';

/// A user-selected tag: a main category, or `Category:Subcategory`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interest {
    Category(String),
    Subcategory {
        category: String,
        subcategory: String,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum InterestError {
    #[error("empty interest tag")]
    Empty,
    #[error("malformed interest tag: {0}")]
    Malformed(String),
}

impl Interest {
    pub fn category(&self) -> &str {
        match self {
            Interest::Category(category) => category,
            Interest::Subcategory { category, .. } => category,
        }
    }
}

impl FromStr for Interest {
    type Err = InterestError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        if tag.is_empty() {
            return Err(InterestError::Empty);
        }
        let mut parts = tag.split(SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(category), None, None) => Ok(Interest::Category(category.to_owned())),
            (Some(category), Some(subcategory), None)
                if !category.is_empty() && !subcategory.is_empty() =>
            {
                Ok(Interest::Subcategory {
                    category: category.to_owned(),
                    subcategory: subcategory.to_owned(),
                })
            }
            _ => Err(InterestError::Malformed(tag.to_owned())),
        }
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interest::Category(category) => f.write_str(category),
            Interest::Subcategory {
                category,
                subcategory,
            } => write!(f, "{}{}{}", category, SEPARATOR, subcategory),
        }
    }
}

/// The set of selected interest tags.
///
/// Serialized as a JSON array of tags. Ordering is canonical so equal sets
/// always serialize identically.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterestSet(BTreeSet<String>);

impl InterestSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, interest: &Interest) -> bool {
        self.0.contains(&interest.to_string())
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn insert(&mut self, interest: Interest) -> bool {
        self.0.insert(interest.to_string())
    }

    /// Adds the interest if absent, removes it otherwise. Returns whether it
    /// is selected afterwards.
    pub fn toggle(&mut self, interest: &Interest) -> bool {
        let tag = interest.to_string();
        if self.0.remove(&tag) {
            false
        } else {
            self.0.insert(tag);
            true
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Parsed interests; tags that do not parse are skipped.
    pub fn interests(&self) -> impl Iterator<Item = Interest> + '_ {
        self.0.iter().filter_map(|tag| tag.parse().ok())
    }

    pub fn main_categories(&self) -> Vec<&str> {
        self.tags().filter(|tag| !tag.contains(SEPARATOR)).collect()
    }

    /// Main category to the subcategories selected under it.
    pub fn subcategories_by_category(&self) -> HashMap<&str, Vec<&str>> {
        let mut ret: HashMap<&str, Vec<&str>> = HashMap::new();
        for tag in self.tags() {
            let mut parts = tag.splitn(2, SEPARATOR);
            if let (Some(category), Some(subcategory)) = (parts.next(), parts.next()) {
                ret.entry(category).or_default().push(subcategory);
            }
        }
        ret
    }

    /// Categories with at least one selected subcategory.
    pub fn categories_with_subcategories(&self) -> BTreeSet<&str> {
        self.subcategories_by_category().into_iter().map(|(category, _)| category).collect()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_owned())
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let tags: Vec<String> = serde_json::from_str(json)?;
        Ok(InterestSet(tags.into_iter().collect()))
    }
}

impl std::iter::FromIterator<Interest> for InterestSet {
    fn from_iter<I: IntoIterator<Item = Interest>>(iter: I) -> Self {
        InterestSet(iter.into_iter().map(|interest| interest.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interest(tag: &str) -> Interest {
        tag.parse().unwrap()
    }

    #[test]
    fn parse_tags() {
        assert_eq!(interest("Movies"), Interest::Category("Movies".to_owned()));
        assert_eq!(
            interest("TV Shows:Sci-Fi"),
            Interest::Subcategory {
                category: "TV Shows".to_owned(),
                subcategory: "Sci-Fi".to_owned(),
            }
        );
        assert_eq!("".parse::<Interest>(), Err(InterestError::Empty));
        assert!("Movies:".parse::<Interest>().is_err());
        assert!(":Action".parse::<Interest>().is_err());
        assert!("Movies:Action:Extra".parse::<Interest>().is_err());
        assert_eq!(interest("Music:R&B").to_string(), "Music:R&B");
    }

    #[test]
    fn toggle_twice_restores_serialization() {
        let mut set: InterestSet = vec![interest("Games"), interest("Movies:Action")]
            .into_iter()
            .collect();
        let before = set.to_json();
        assert!(set.toggle(&interest("Anime")));
        assert_ne!(set.to_json(), before);
        assert!(!set.toggle(&interest("Anime")));
        assert_eq!(set.to_json(), before);
    }

    #[test]
    fn partitions_tags() {
        let set: InterestSet = vec![
            interest("Movies"),
            interest("Movies:Action"),
            interest("Movies:Horror"),
            interest("Games:RPG"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.main_categories(), vec!["Movies"]);
        let by_category = set.subcategories_by_category();
        assert_eq!(by_category["Movies"], vec!["Action", "Horror"]);
        assert_eq!(by_category["Games"], vec!["RPG"]);
        assert_eq!(
            set.categories_with_subcategories().into_iter().collect::<Vec<_>>(),
            vec!["Games", "Movies"]
        );
    }

    #[test]
    fn json_is_canonical() {
        let a = InterestSet::from_json(r#"["Music","Anime","Music"]"#).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a.to_json(), r#"["Anime","Music"]"#);
        assert!(InterestSet::from_json("{").is_err());
    }
}
