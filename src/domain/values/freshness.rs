use chrono::{DateTime, Utc};

pub const FRESHNESS_FLOOR: f64 = 0.2;
pub const FRESHNESS_CEILING: f64 = 1.0;
/// Used when a signal carries no publish timestamp.
pub const FRESHNESS_UNKNOWN: f64 = 0.5;

/// Exponential decay from publish time: `0.5^(age_hours / half_life_hours)`,
/// clamped to `[0.2, 1.0]`.
pub fn freshness(
    published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    half_life_hours: f64,
) -> f64 {
    let Some(published) = published_at else {
        return FRESHNESS_UNKNOWN;
    };
    let age_hours = (now - published).num_seconds() as f64 / 3600.0;
    if age_hours <= 0.0 || half_life_hours <= 0.0 {
        return FRESHNESS_CEILING;
    }
    0.5_f64
        .powf(age_hours / half_life_hours)
        .clamp(FRESHNESS_FLOOR, FRESHNESS_CEILING)
}
