//! Interest and search filtering shared by every event view.

use crate::highlight::fold_case;
use crate::interest::InterestSet;
use crate::model::Event;

/// Case-insensitive substring match on title or description. An empty query
/// matches everything. Folding is shared with `highlight`, so every match has
/// a highlighted segment.
pub fn matches_search(event: &Event, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let query = fold_case(query);
    fold_case(&event.title).contains(&query) || fold_case(&event.description).contains(&query)
}

/// Precomputed view of an interest set for matching many events.
pub struct InterestMatcher<'a> {
    empty: bool,
    main_categories: Vec<&'a str>,
    subcategories: std::collections::HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> InterestMatcher<'a> {
    pub fn new(interests: &'a InterestSet) -> Self {
        InterestMatcher {
            empty: interests.is_empty(),
            main_categories: interests.main_categories(),
            subcategories: interests.subcategories_by_category(),
        }
    }

    /// Selected subcategories of a category take precedence over selecting the
    /// category itself: an event without a matching subcategory is excluded
    /// even when its category is selected.
    pub fn matches(&self, event: &Event) -> bool {
        if self.empty {
            return true;
        }
        let category = event.category.as_str();
        match self.subcategories.get(category) {
            Some(selected) if !selected.is_empty() => event.has_subcategory_in(selected),
            _ => self.main_categories.contains(&category),
        }
    }
}

/// Events matching both the interests and the search query, stably sorted by
/// release date.
pub fn filter_events<'e>(events: &'e [Event], interests: &InterestSet, query: &str) -> Vec<&'e Event> {
    let matcher = InterestMatcher::new(interests);
    let mut ret: Vec<&Event> = events
        .iter()
        .filter(|event| matches_search(event, query) && matcher.matches(event))
        .collect();
    ret.sort_by_key(|event| event.release_date);
    ret
}

/// Whether any of the events matches a non-blank search query.
pub fn has_search_match<'e, I>(events: I, query: &str) -> bool
where
    I: IntoIterator<Item = &'e Event>,
{
    if query.trim().is_empty() {
        return false;
    }
    events.into_iter().any(|event| matches_search(event, query))
}
