use std::cmp::Reverse;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EventWithFoods, FoodItem};

pub const DEFAULT_FRESHNESS_WINDOW_MINUTES: i64 = 30;

/// Temporal slices of the event listing. Every predicate is evaluated
/// against one caller-supplied `now`, so a whole listing is judged at a
/// single instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFilter {
    #[default]
    All,
    JustStarted,
    WithinHour,
    EndingSoon,
    RunningNow,
    FreshFood,
}

impl TimeFilter {
    /// Whether an event with window `[start, end]` passes this filter at `now`.
    pub fn matches(
        &self,
        now: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        freshness_window: Duration,
    ) -> bool {
        match self {
            TimeFilter::All => true,
            TimeFilter::JustStarted => within(now - start, Duration::minutes(30)),
            TimeFilter::WithinHour => within(now - start, Duration::minutes(60)),
            TimeFilter::EndingSoon => within(end - now, Duration::minutes(60)),
            TimeFilter::RunningNow => is_active(now, start, end),
            TimeFilter::FreshFood => within(now - end, freshness_window),
        }
    }

    /// Orders a filtered listing in place. ALL and RUNNING_NOW leave the
    /// incoming order untouched.
    pub fn sort(&self, events: &mut [EventWithFoods], now: DateTime<Utc>) {
        match self {
            TimeFilter::All | TimeFilter::RunningNow => {}
            TimeFilter::JustStarted | TimeFilter::WithinHour => {
                events.sort_by_key(|e| Reverse(e.event.start_time));
            }
            TimeFilter::EndingSoon => {
                events.sort_by_key(|e| e.event.last_reservation_time);
            }
            // Smallest elapsed time since the window closed first.
            TimeFilter::FreshFood => {
                events.sort_by_key(|e| now - e.event.last_reservation_time);
            }
        }
    }
}

fn within(elapsed: Duration, window: Duration) -> bool {
    elapsed >= Duration::zero() && elapsed <= window
}

/// Host-dashboard bucket and the RUNNING_NOW predicate: active iff the
/// reservation window contains `now` (boundaries included).
pub fn is_active(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start <= now && now <= end
}

/// Normalizes a comma-encoded tag list to lowercase, trimmed tokens.
pub fn normalize_tags(raw: &str) -> String {
    tag_tokens(raw).collect::<Vec<_>>().join(",")
}

/// Splits a raw comma-separated restriction list into normalized tokens.
pub fn parse_restrictions(raw: &str) -> Vec<String> {
    tag_tokens(raw).collect()
}

fn tag_tokens(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Whether every requested restriction appears in at least one food item's
/// tag set. Matching is case-insensitive on exact tokens; different
/// restrictions may be satisfied by different items.
pub fn satisfies_restrictions(foods: &[FoodItem], restrictions: &[String]) -> bool {
    restrictions.iter().all(|want| {
        let want = want.trim().to_lowercase();
        if want.is_empty() {
            return true;
        }
        foods
            .iter()
            .any(|f| tag_tokens(&f.dietary_tags).any(|t| t == want))
    })
}

/// Applies the dietary and temporal predicates to a listing, then orders it
/// per the time filter.
pub fn apply_filters(
    mut events: Vec<EventWithFoods>,
    restrictions: &[String],
    time_filter: TimeFilter,
    freshness_window: Duration,
    now: DateTime<Utc>,
) -> Vec<EventWithFoods> {
    events.retain(|e| {
        satisfies_restrictions(&e.foods, restrictions)
            && time_filter.matches(
                now,
                e.event.start_time,
                e.event.last_reservation_time,
                freshness_window,
            )
    });
    time_filter.sort(&mut events, now);
    events
}
