use super::{parse_body, required};
use crate::database::{EventDb, EventQuery};
use crate::error::{log_error, ApiError};
use crate::model::{parse_instant, Category, Event, NewEvent};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventsParams {
    pub category: Option<String>,
    pub subcategories: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn parse_bound(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    if end_of_day {
        if let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
            return Ok(DateTime::from_utc(date.and_hms_milli(23, 59, 59, 999), Utc));
        }
    }
    parse_instant(value).ok_or(ApiError::BadRequest("Invalid date"))
}

impl EventsParams {
    pub fn to_query(&self) -> Result<EventQuery, ApiError> {
        let category = match required(&self.category) {
            Some(category) => Some(
                category
                    .parse::<Category>()
                    .map_err(|_| ApiError::BadRequest("Invalid category"))?,
            ),
            None => None,
        };
        let subcategories = required(&self.subcategories)
            .map(|csv| {
                csv.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let start = match required(&self.start_date) {
            Some(value) => Some(parse_bound(value, false)?),
            None => None,
        };
        let end = match required(&self.end_date) {
            Some(value) => Some(parse_bound(value, true)?),
            None => None,
        };
        Ok(EventQuery {
            category,
            subcategories,
            start,
            end,
        })
    }
}

#[derive(Deserialize, Default)]
struct EventBody {
    title: Option<String>,
    description: Option<String>,
    release_date: Option<String>,
    category: Option<String>,
    subcategory1: Option<String>,
    subcategory2: Option<String>,
    link: Option<String>,
    image_url: Option<String>,
}

impl EventBody {
    fn into_new_event(self) -> Result<NewEvent, ApiError> {
        let (title, release_date, category) = match (
            required(&self.title),
            required(&self.release_date),
            required(&self.category),
        ) {
            (Some(title), Some(release_date), Some(category)) => (title, release_date, category),
            _ => return Err(ApiError::BadRequest("Missing required fields")),
        };
        let optional = |value: &Option<String>| required(value).map(str::to_owned);
        Ok(NewEvent {
            title: title.to_owned(),
            description: self.description.clone().unwrap_or_default(),
            release_date: parse_instant(release_date).ok_or(ApiError::BadRequest("Invalid date"))?,
            category: category
                .parse()
                .map_err(|_| ApiError::BadRequest("Invalid category"))?,
            subcategory1: optional(&self.subcategory1),
            subcategory2: optional(&self.subcategory2),
            link: optional(&self.link),
            image_url: optional(&self.image_url),
        })
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreatedEvent {
    pub event: Event,
}

pub async fn list(
    state: web::Data<AppState>,
    params: web::Query<EventsParams>,
) -> Result<HttpResponse, ApiError> {
    let query = params.to_query()?;
    let key = query.cache_key();
    if let Some(events) = state.events_cache.get(&key) {
        debug!("events cache hit: {}", key);
        return Ok(HttpResponse::Ok().json(events));
    }
    let events = state
        .db
        .list_events(&query)
        .map_err(|err| log_error(err, "Database error"))?;
    state.events_cache.put(key, events.clone());
    Ok(HttpResponse::Ok().json(events))
}

pub async fn create(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let event = parse_body::<EventBody>(&body)?.into_new_event()?;
    let event = state
        .db
        .add_event(event)
        .map_err(|err| log_error(err, "Database error"))?;
    state.events_cache.clear();
    debug!("created event {} ({})", event.id, event.title);
    Ok(HttpResponse::Created().json(CreatedEvent { event }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::test_state;
    use crate::error::ErrorBody;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn params_to_query() {
        let params = EventsParams {
            category: Some("TV Shows".to_owned()),
            subcategories: Some("Drama, Sci-Fi,,".to_owned()),
            start_date: Some("2025-01-01".to_owned()),
            end_date: Some("2025-01-31".to_owned()),
        };
        let query = params.to_query().unwrap();
        assert_eq!(query.category, Some(Category::TvShows));
        assert_eq!(query.subcategories, vec!["Drama", "Sci-Fi"]);
        assert_eq!(query.start, Some(Utc.ymd(2025, 1, 1).and_hms(0, 0, 0)));
        assert_eq!(
            query.end,
            Some(Utc.ymd(2025, 1, 31).and_hms_milli(23, 59, 59, 999))
        );

        let bad = EventsParams {
            category: Some("Books".to_owned()),
            ..EventsParams::default()
        };
        assert_eq!(bad.to_query().unwrap_err(), ApiError::BadRequest("Invalid category"));
        let bad = EventsParams {
            start_date: Some("soon".to_owned()),
            ..EventsParams::default()
        };
        assert_eq!(bad.to_query().unwrap_err(), ApiError::BadRequest("Invalid date"));
    }

    #[actix_rt::test]
    async fn create_requires_fields() {
        let mut app = test_app!(test_state()).await;
        let req = test::TestRequest::post()
            .uri("/api/events")
            .set_json(&json!({ "title": "Dune: Part Three" }))
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = serde_json::from_slice(&test::read_body(resp).await).unwrap();
        assert_eq!(body.error, "Missing required fields");
    }

    #[actix_rt::test]
    async fn create_then_list_filtered() {
        let mut app = test_app!(test_state()).await;
        for (title, date, category, sub) in &[
            ("Late Movie", "2025-02-01T20:00:00Z", "Movies", "Action"),
            ("Early Movie", "2025-01-05", "Movies", "Horror"),
            ("Some Game", "2025-01-10", "Games", "RPG"),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/events")
                .set_json(&json!({
                    "title": title,
                    "description": "",
                    "release_date": date,
                    "category": category,
                    "subcategory1": sub,
                }))
                .to_request();
            let resp = test::call_service(&mut app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        // Warm the cache before checking that a later insert invalidates it.
        let req = test::TestRequest::get().uri("/api/events").to_request();
        let events: Vec<Event> =
            serde_json::from_slice(&test::read_body(test::call_service(&mut app, req).await).await)
                .unwrap();
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Early Movie", "Some Game", "Late Movie"]);

        let req = test::TestRequest::get()
            .uri("/api/events?category=Movies&subcategories=Action,Drama")
            .to_request();
        let events: Vec<Event> =
            serde_json::from_slice(&test::read_body(test::call_service(&mut app, req).await).await)
                .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Late Movie");

        let req = test::TestRequest::get()
            .uri("/api/events?startDate=2025-01-06&endDate=2025-01-10")
            .to_request();
        let events: Vec<Event> =
            serde_json::from_slice(&test::read_body(test::call_service(&mut app, req).await).await)
                .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Some Game");

        let req = test::TestRequest::post()
            .uri("/api/events")
            .set_json(&json!({
                "title": "New Album",
                "release_date": "2025-01-01",
                "category": "Music",
            }))
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        let created: CreatedEvent = serde_json::from_slice(&test::read_body(resp).await).unwrap();
        assert_eq!(created.event.category, Category::Music);

        let req = test::TestRequest::get().uri("/api/events").to_request();
        let events: Vec<Event> =
            serde_json::from_slice(&test::read_body(test::call_service(&mut app, req).await).await)
                .unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].title, "New Album");
    }

    #[actix_rt::test]
    async fn list_rejects_unknown_category() {
        let mut app = test_app!(test_state()).await;
        let req = test::TestRequest::get()
            .uri("/api/events?category=Books")
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
