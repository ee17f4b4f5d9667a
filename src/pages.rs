//! Server-rendered HTML views.

use crate::auth;
use crate::calendar::{self, CalendarError};
use crate::client::interests::{InterestStore, INTERESTS_KEY};
use crate::client::storage::MemoryStorage;
use crate::countdown::Countdown;
use crate::database::{EventDb, EventQuery};
use crate::error::ApiError;
use crate::filter;
use crate::highlight::{highlight, Segment};
use crate::interest::{Interest, InterestSet};
use crate::model::{Category, Event};
use crate::state::AppState;
use actix_identity::Identity;
use actix_web::http::Cookie;
use actix_web::{error, web, HttpMessage, HttpRequest, HttpResponse};
use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::America::New_York;
use log::{debug, info};
use serde::{Deserialize, Serialize};

type Tera = web::Data<tera::Tera>;
type State = web::Data<AppState>;

const UPCOMING_LIMIT: usize = 6;
const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/calendar", web::get().to(calendar_page))
        .route("/list", web::get().to(list))
        .route("/event/{id}", web::get().to(event_detail))
        .route("/interests", web::get().to(interests))
        .route("/interests", web::post().to(interests_post))
        .route("/auth/sign-in", web::get().to(sign_in))
        .route("/auth/sign-in", web::post().to(sign_in_post))
        .route("/auth/sign-up", web::get().to(sign_up))
        .route("/auth/sign-up", web::post().to(sign_up_post))
        .route("/auth/sign-out", web::get().to(sign_out));
}

fn log_error<E: std::fmt::Debug>(err: E, message: &'static str) -> error::Error {
    debug!("{:?}", err);
    error::ErrorInternalServerError(message)
}

fn render(tera: &tera::Tera, template: &str, ctx: &tera::Context) -> actix_web::Result<String> {
    tera.render(template, ctx)
        .map_err(|err| log_error(err, "Template error"))
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type("text/html").body(body)
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found().header("location", location).finish()
}

/// Context shared by every page: the signed-in user, if any.
fn base_context(req: &HttpRequest, state: &AppState, id: &Identity) -> Result<tera::Context, ApiError> {
    let mut ctx = tera::Context::new();
    let token = auth::session_token(req, id);
    if let Some(user) = auth::current_user(state, token.as_deref())? {
        ctx.insert("user", &user);
    }
    Ok(ctx)
}

fn interests_from(req: &HttpRequest) -> InterestStore<MemoryStorage> {
    let storage = match req.cookie(INTERESTS_KEY) {
        Some(cookie) => MemoryStorage::new().with(INTERESTS_KEY, cookie.value()),
        None => MemoryStorage::new(),
    };
    InterestStore::load(storage)
}

fn all_events(state: &AppState) -> actix_web::Result<Vec<Event>> {
    state
        .db
        .list_events(&EventQuery::default())
        .map_err(|err| log_error(err, "Database error"))
}

fn query_flag(req: &HttpRequest, flag: &str) -> bool {
    req.query_string()
        .split('&')
        .any(|pair| pair == flag || pair.starts_with(&format!("{}=", flag)))
}

#[derive(Serialize)]
struct EventView<'a> {
    id: u64,
    title: &'a str,
    description: &'a str,
    category: &'static str,
    color_class: &'static str,
    bg_color_class: &'static str,
    subcategories: Vec<&'a str>,
    date: String,
    time: String,
    link: Option<&'a str>,
    image_url: Option<&'a str>,
    title_segments: Vec<Segment<'a>>,
    description_segments: Vec<Segment<'a>>,
    countdown: Countdown,
}

impl<'a> EventView<'a> {
    fn new(event: &'a Event, query: &str) -> Self {
        EventView {
            id: event.id,
            title: &event.title,
            description: &event.description,
            category: event.category.as_str(),
            color_class: event.category.color_class(),
            bg_color_class: event.category.bg_color_class(),
            subcategories: event
                .subcategory1
                .iter()
                .chain(event.subcategory2.iter())
                .map(String::as_str)
                .collect(),
            date: release_day(event),
            time: release_time(event),
            link: event.link.as_deref(),
            image_url: event.image_url.as_deref(),
            title_segments: highlight(&event.title, query),
            description_segments: highlight(&event.description, query),
            countdown: Countdown::until(event.release_date, Utc::now()),
        }
    }
}

/// Release date on the US east coast, matching `release_time`. Calendar
/// buckets stay on UTC days.
fn release_day(event: &Event) -> String {
    day_label(event.release_date.with_timezone(&New_York).naive_local().date())
}

/// Release time of day on the US east coast, e.g. `09:00 PM ET`.
fn release_time(event: &Event) -> String {
    event
        .release_date
        .with_timezone(&New_York)
        .format("%I:%M %p ET")
        .to_string()
}

fn day_label(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

async fn index(req: HttpRequest, id: Identity, tera: Tera, state: State) -> actix_web::Result<HttpResponse> {
    let mut ctx = base_context(&req, &state, &id)?;
    let interests = interests_from(&req);
    let events = all_events(&state)?;
    let now = Utc::now();
    let upcoming: Vec<EventView> = filter::filter_events(&events, interests.interests(), "")
        .into_iter()
        .filter(|event| event.release_date >= now)
        .take(UPCOMING_LIMIT)
        .map(|event| EventView::new(event, ""))
        .collect();
    ctx.insert("has_interests", &!interests.interests().is_empty());
    ctx.insert("upcoming", &upcoming);
    Ok(html(render(&tera, "index.html", &ctx)?))
}

#[derive(Deserialize)]
struct CalendarParams {
    year: Option<i32>,
    /// One-based.
    month: Option<u32>,
    q: Option<String>,
}

#[derive(Serialize)]
struct DayCell<'a> {
    day: u32,
    is_today: bool,
    search_hit: bool,
    events: Vec<EventView<'a>>,
}

#[derive(Serialize)]
struct MonthLink {
    year: i32,
    month: u32,
}

async fn calendar_page(
    req: HttpRequest,
    id: Identity,
    tera: Tera,
    state: State,
    params: web::Query<CalendarParams>,
) -> actix_web::Result<HttpResponse> {
    let today = Utc::now().naive_utc().date();
    let year = params.year.unwrap_or_else(|| today.year());
    let month = match params.month {
        Some(month) if (1..=12).contains(&month) => month - 1,
        Some(month) => {
            return Err(error::ErrorBadRequest(CalendarError::InvalidMonth(month)));
        }
        None => today.month0(),
    };
    let query = params.q.as_deref().unwrap_or("").trim();

    let mut ctx = base_context(&req, &state, &id)?;
    let interests = interests_from(&req);
    let events = all_events(&state)?;
    let visible = filter::filter_events(&events, interests.interests(), "");
    let grid = calendar::month_grid(year, month, visible).map_err(error::ErrorBadRequest)?;

    let weeks: Vec<Vec<Option<DayCell>>> = grid
        .weeks()
        .into_iter()
        .map(|week| {
            week.into_iter()
                .map(|cell| {
                    cell.map(|day| {
                        let events = grid.events_on(day);
                        DayCell {
                            day,
                            is_today: today.year() == year && today.month0() == month && today.day() == day,
                            search_hit: filter::has_search_match(events.iter().copied(), query),
                            events: events.iter().map(|event| EventView::new(event, query)).collect(),
                        }
                    })
                })
                .collect()
        })
        .collect();

    let ((prev_year, prev_month), (next_year, next_month)) = calendar::adjacent_months(year, month);
    ctx.insert("title", &format!("{} {}", MONTH_NAMES[month as usize], year));
    ctx.insert("year", &year);
    ctx.insert("month", &(month + 1));
    ctx.insert("weeks", &weeks);
    ctx.insert("query", query);
    ctx.insert(
        "prev",
        &MonthLink {
            year: prev_year,
            month: prev_month + 1,
        },
    );
    ctx.insert(
        "next",
        &MonthLink {
            year: next_year,
            month: next_month + 1,
        },
    );
    Ok(html(render(&tera, "calendar.html", &ctx)?))
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Serialize)]
struct DayGroup<'a> {
    date: String,
    events: Vec<EventView<'a>>,
}

async fn list(
    req: HttpRequest,
    id: Identity,
    tera: Tera,
    state: State,
    params: web::Query<SearchParams>,
) -> actix_web::Result<HttpResponse> {
    let query = params.q.as_deref().unwrap_or("").trim();
    let mut ctx = base_context(&req, &state, &id)?;
    let interests = interests_from(&req);
    let events = all_events(&state)?;
    let days: Vec<DayGroup> = calendar::group_by_day(filter::filter_events(&events, interests.interests(), query))
        .into_iter()
        .map(|(date, events)| DayGroup {
            date: day_label(date),
            events: events.into_iter().map(|event| EventView::new(event, query)).collect(),
        })
        .collect();
    ctx.insert("days", &days);
    ctx.insert("query", query);
    Ok(html(render(&tera, "list.html", &ctx)?))
}

async fn event_detail(
    req: HttpRequest,
    id: Identity,
    tera: Tera,
    state: State,
    event_id: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    let mut ctx = base_context(&req, &state, &id)?;
    let event = state
        .db
        .get_event(*event_id)
        .map_err(|err| log_error(err, "Database error"))?;
    match event {
        Some(event) => {
            ctx.insert("event", &EventView::new(&event, ""));
            Ok(html(render(&tera, "event.html", &ctx)?))
        }
        None => {
            ctx.insert("message", "Release not found.");
            let body = render(&tera, "not_found.html", &ctx)?;
            Ok(HttpResponse::NotFound().content_type("text/html").body(body))
        }
    }
}

#[derive(Serialize)]
struct Choice {
    name: &'static str,
    tag: String,
    selected: bool,
}

#[derive(Serialize)]
struct CategoryChoice {
    category: Choice,
    color_class: &'static str,
    subcategories: Vec<Choice>,
}

fn interest_choices(interests: &InterestSet) -> Vec<CategoryChoice> {
    Category::ALL
        .iter()
        .map(|&category| {
            let main = Interest::Category(category.as_str().to_owned());
            CategoryChoice {
                category: Choice {
                    name: category.as_str(),
                    selected: interests.contains(&main),
                    tag: main.to_string(),
                },
                color_class: category.color_class(),
                subcategories: category
                    .subcategories()
                    .iter()
                    .map(|&name| {
                        let sub = Interest::Subcategory {
                            category: category.as_str().to_owned(),
                            subcategory: name.to_owned(),
                        };
                        Choice {
                            name,
                            selected: interests.contains(&sub),
                            tag: sub.to_string(),
                        }
                    })
                    .collect(),
            }
        })
        .collect()
}

async fn interests(req: HttpRequest, id: Identity, tera: Tera, state: State) -> actix_web::Result<HttpResponse> {
    let mut ctx = base_context(&req, &state, &id)?;
    let interests = interests_from(&req);
    ctx.insert("choices", &interest_choices(interests.interests()));
    ctx.insert("selected_count", &interests.interests().len());
    Ok(html(render(&tera, "interests.html", &ctx)?))
}

#[derive(Deserialize)]
struct InterestForm {
    interest: String,
}

async fn interests_post(req: HttpRequest, form: web::Form<InterestForm>) -> actix_web::Result<HttpResponse> {
    let interest: Interest = form.interest.parse().map_err(error::ErrorBadRequest)?;
    let mut store = interests_from(&req);
    let selected = store
        .toggle(&interest)
        .map_err(|err| log_error(err, "Failed to save your interests. Please try again later."))?;
    debug!("interest {} selected: {}", interest, selected);
    let value = store.storage().value(INTERESTS_KEY).unwrap_or("[]").to_owned();
    Ok(HttpResponse::SeeOther()
        .header("location", "/interests")
        .cookie(Cookie::build(INTERESTS_KEY, value).path("/").permanent().finish())
        .finish())
}

#[derive(Serialize, Deserialize)]
struct CredentialsForm {
    email: String,
    password: String,
}

async fn sign_in(req: HttpRequest, id: Identity, tera: Tera, state: State) -> actix_web::Result<HttpResponse> {
    let mut ctx = base_context(&req, &state, &id)?;
    ctx.insert("error", &query_flag(&req, "error"));
    ctx.insert("registered", &query_flag(&req, "registered"));
    Ok(html(render(&tera, "sign_in.html", &ctx)?))
}

async fn sign_in_post(
    form: web::Form<CredentialsForm>,
    id: Identity,
    state: State,
) -> actix_web::Result<HttpResponse> {
    match auth::sign_in(&state, form.email.trim(), &form.password) {
        Ok((user, session)) => {
            info!("user {} signed in", user.id);
            id.remember(session.access_token);
            Ok(redirect("/"))
        }
        Err(err @ ApiError::Internal(_)) => Err(err.into()),
        Err(err) => {
            debug!("sign in rejected: {}", err);
            Ok(redirect("/auth/sign-in?error"))
        }
    }
}

async fn sign_up(req: HttpRequest, id: Identity, tera: Tera, state: State) -> actix_web::Result<HttpResponse> {
    let ctx = base_context(&req, &state, &id)?;
    Ok(html(render(&tera, "sign_up.html", &ctx)?))
}

async fn sign_up_post(
    req: HttpRequest,
    form: web::Form<CredentialsForm>,
    id: Identity,
    tera: Tera,
    state: State,
) -> actix_web::Result<HttpResponse> {
    match auth::sign_up(&state, form.email.trim(), &form.password) {
        Ok((_user, session)) => {
            // The form flow signs in separately.
            auth::sign_out(&state, Some(&session.access_token))?;
            Ok(redirect("/auth/sign-in?registered"))
        }
        Err(ApiError::BadRequest(message)) => {
            let mut ctx = base_context(&req, &state, &id)?;
            ctx.insert("error", message);
            ctx.insert("email", form.email.trim());
            let body = render(&tera, "sign_up.html", &ctx)?;
            Ok(HttpResponse::BadRequest().content_type("text/html").body(body))
        }
        Err(err) => Err(err.into()),
    }
}

async fn sign_out(req: HttpRequest, id: Identity, state: State) -> actix_web::Result<HttpResponse> {
    let token = auth::session_token(&req, &id);
    auth::sign_out(&state, token.as_deref())?;
    id.forget();
    Ok(redirect("/"))
}
