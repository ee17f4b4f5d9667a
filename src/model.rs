use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parses the instant formats accepted on input: RFC 3339, a naive date-time
/// (taken as UTC) or a plain date (midnight UTC).
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(DateTime::from_utc(naive, Utc));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|date| DateTime::from_utc(date.and_hms(0, 0, 0), Utc))
}

pub(crate) mod instant {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(d)?;
        super::parse_instant(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid date: {}", s)))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Movies,
    #[serde(rename = "TV Shows")]
    TvShows,
    Anime,
    Games,
    Music,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Movies,
        Category::TvShows,
        Category::Anime,
        Category::Games,
        Category::Music,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Movies => "Movies",
            Category::TvShows => "TV Shows",
            Category::Anime => "Anime",
            Category::Games => "Games",
            Category::Music => "Music",
        }
    }

    pub fn color_class(self) -> &'static str {
        match self {
            Category::Movies => "bg-red-500",
            Category::TvShows => "bg-blue-500",
            Category::Anime => "bg-purple-500",
            Category::Games => "bg-amber-500",
            Category::Music => "bg-green-500",
        }
    }

    pub fn bg_color_class(self) -> &'static str {
        match self {
            Category::Movies => "bg-red-100",
            Category::TvShows => "bg-blue-100",
            Category::Anime => "bg-purple-100",
            Category::Games => "bg-amber-100",
            Category::Music => "bg-green-100",
        }
    }

    /// Subcategories offered on the interests page.
    pub fn subcategories(self) -> &'static [&'static str] {
        match self {
            Category::Movies => &[
                "Sci-Fi",
                "Action",
                "Superhero",
                "Horror",
                "Thriller",
                "Adventure",
                "Drama",
                "Historical",
            ],
            Category::TvShows => &[
                "Fantasy", "Drama", "Horror", "Thriller", "Sci-Fi", "Action", "Comedy",
            ],
            Category::Anime => &[
                "Action",
                "Fantasy",
                "Superhero",
                "Horror",
                "Comedy",
                "Supernatural",
            ],
            Category::Games => &["RPG", "Open World", "Action", "Adventure", "Souls-like"],
            Category::Music => &[
                "Pop",
                "Soul",
                "Hip-Hop",
                "Rap",
                "Alternative",
                "K-Pop",
                "R&B",
            ],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "instant")]
    pub release_date: DateTime<Utc>,
    pub category: Category,
    pub subcategory1: Option<String>,
    pub subcategory2: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
}

impl Event {
    pub fn has_subcategory_in(&self, selected: &[&str]) -> bool {
        [&self.subcategory1, &self.subcategory2]
            .iter()
            .filter_map(|sub| sub.as_deref())
            .any(|sub| selected.contains(&sub))
    }
}

/// Event fields as written by a client; the store assigns the id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    #[serde(with = "instant")]
    pub release_date: DateTime<Utc>,
    pub category: Category,
    pub subcategory1: Option<String>,
    pub subcategory2: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
}

impl NewEvent {
    pub fn with_id(self, id: u64) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            release_date: self.release_date,
            category: self.category,
            subcategory1: self.subcategory1,
            subcategory2: self.subcategory2,
            link: self.link,
            image_url: self.image_url,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserRecord {
    pub email: String,
    pub password_hash: String,
    #[serde(with = "instant")]
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(with = "instant")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn from_record(id: u64, record: &UserRecord) -> Self {
        User {
            id,
            email: record.email.clone(),
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub user_id: u64,
    #[serde(with = "instant")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserEvent {
    pub id: u64,
    pub user_id: u64,
    pub event_id: u64,
    pub is_favorite: bool,
    #[serde(with = "instant")]
    pub created_at: DateTime<Utc>,
}
