//! Sample releases for an empty database.

use crate::database::{DbResult, EventDb};
use crate::model::{Category, NewEvent};
use chrono::{DateTime, Duration, Timelike, Utc};
use log::info;

struct Sample {
    title: &'static str,
    description: &'static str,
    category: Category,
    subcategory1: &'static str,
    subcategory2: Option<&'static str>,
    /// Days after the seeding date.
    in_days: i64,
    /// Hour of the release, UTC.
    hour: u32,
}

const SAMPLES: &[Sample] = &[
    Sample {
        title: "Starfall: Rebellion",
        description: "The last fleet makes its stand at the edge of the galaxy.",
        category: Category::Movies,
        subcategory1: "Sci-Fi",
        subcategory2: Some("Action"),
        in_days: 3,
        hour: 0,
    },
    Sample {
        title: "The Hollow House",
        description: "A family inherits a house that remembers every guest.",
        category: Category::Movies,
        subcategory1: "Horror",
        subcategory2: Some("Thriller"),
        in_days: 10,
        hour: 0,
    },
    Sample {
        title: "Crown of Ash: Season 2",
        description: "The war for the northern throne continues.",
        category: Category::TvShows,
        subcategory1: "Fantasy",
        subcategory2: Some("Drama"),
        in_days: 5,
        hour: 1,
    },
    Sample {
        title: "Night Shift",
        description: "An emergency room comedy set entirely after midnight.",
        category: Category::TvShows,
        subcategory1: "Comedy",
        subcategory2: None,
        in_days: 17,
        hour: 2,
    },
    Sample {
        title: "Spirit Blade Chronicles",
        description: "A young exorcist inherits a sword that talks back.",
        category: Category::Anime,
        subcategory1: "Action",
        subcategory2: Some("Supernatural"),
        in_days: 7,
        hour: 15,
    },
    Sample {
        title: "Elden Depths",
        description: "An open world descent into a kingdom beneath the sea.",
        category: Category::Games,
        subcategory1: "RPG",
        subcategory2: Some("Open World"),
        in_days: 14,
        hour: 13,
    },
    Sample {
        title: "Iron Vigil",
        description: "A punishing action adventure through a cursed fortress.",
        category: Category::Games,
        subcategory1: "Souls-like",
        subcategory2: Some("Action"),
        in_days: 21,
        hour: 13,
    },
    Sample {
        title: "Neon Hearts",
        description: "The debut full-length album from the K-Pop quintet.",
        category: Category::Music,
        subcategory1: "K-Pop",
        subcategory2: Some("Pop"),
        in_days: 5,
        hour: 4,
    },
    Sample {
        title: "Low Tide",
        description: "A stripped back soul record recorded in one take.",
        category: Category::Music,
        subcategory1: "Soul",
        subcategory2: Some("R&B"),
        in_days: 28,
        hour: 4,
    },
];

fn release_date(sample: &Sample, today: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = today - Duration::seconds(i64::from(today.num_seconds_from_midnight()));
    midnight + Duration::days(sample.in_days) + Duration::hours(i64::from(sample.hour))
}

/// Inserts the sample releases if there are no events yet. Returns how many
/// were inserted.
pub fn seed_events(db: &sled::Db, now: DateTime<Utc>) -> DbResult<usize> {
    if db.count_events()? > 0 {
        return Ok(0);
    }
    for sample in SAMPLES {
        db.add_event(NewEvent {
            title: sample.title.to_owned(),
            description: sample.description.to_owned(),
            release_date: release_date(sample, now),
            category: sample.category,
            subcategory1: Some(sample.subcategory1.to_owned()),
            subcategory2: sample.subcategory2.map(str::to_owned),
            link: None,
            image_url: None,
        })?;
    }
    info!("seeded {} sample events", SAMPLES.len());
    Ok(SAMPLES.len())
}
