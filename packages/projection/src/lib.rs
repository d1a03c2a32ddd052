#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rule-based population and risk radius projection.
//!
//! [`project`] is total: it never panics and never fails on any `f64`
//! input, including negatives, infinities and `NaN`. Callers are expected
//! to sanitize store rows into [`ZoneAttributes`] first.
//!
//! # Rounding
//!
//! The population uses round-half-away-from-zero ([`f64::round`]), so a raw
//! population of `1.5` projects to `2` and `-2.5` to `-3` (then clamped to
//! `0`).
//!
//! The radius is rounded to cents from its exact binary value, so `2.675`
//! (stored as `2.67499999…`) becomes `2.67`. Only exact binary ties such as
//! `0.125` reach the tie-break, which goes to the even cent.

use zone_forecast_zone_models::{MAX_RADIUS, ZoneAttributes, ZoneProjection};

/// Weight applied to the combined food and water scores.
const RESOURCE_WEIGHT: f64 = 0.2;

/// Weight subtracted per vaccinated dog.
const VACCINATED_WEIGHT: f64 = 0.1;

/// Weight subtracted per sterilized dog.
const STERILIZED_WEIGHT: f64 = 0.2;

/// Weight added per rabies-affected dog.
const RABIES_WEIGHT: f64 = 0.3;

/// Scales the incident-per-dog ratio into a radius growth factor.
const INCIDENT_RADIUS_FACTOR: f64 = 0.5;

/// Computes both projections for one zone.
#[must_use]
pub fn project(attrs: &ZoneAttributes) -> ZoneProjection {
    ZoneProjection {
        predicted_population: predict_population(attrs),
        predicted_risk_radius: predict_risk_radius(attrs),
    }
}

/// Projects next period's population, rounded to the nearest integer and
/// floored at zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn predict_population(attrs: &ZoneAttributes) -> i64 {
    let raw = attrs.dog_population
        + (attrs.food_score + attrs.water_score) * RESOURCE_WEIGHT
        - attrs.vaccinated_dogs * VACCINATED_WEIGHT
        - attrs.sterilized_dogs * STERILIZED_WEIGHT
        + attrs.affected_by_rabies * RABIES_WEIGHT;

    // `f64::max` discards NaN, and the cast saturates at `i64::MAX`.
    raw.round().max(0.0) as i64
}

/// Projects the risk radius, rounded to two decimals and capped at
/// [`MAX_RADIUS`].
#[must_use]
pub fn predict_risk_radius(attrs: &ZoneAttributes) -> f64 {
    // +1 keeps an empty zone from dividing by zero.
    let divisor = attrs.dog_population + 1.0;
    let incidents = attrs.affected_by_rabies + attrs.bite_cases;
    let raw = attrs.radius_meters * (1.0 + incidents / divisor * INCIDENT_RADIUS_FACTOR);

    // Clamp after rounding. `f64::min` maps NaN to the ceiling as well.
    round_to_cents(raw).min(MAX_RADIUS)
}

/// Rounds to two decimal places using the exact value of `value`.
///
/// Non-finite values are returned unchanged.
#[must_use]
pub fn round_to_cents(value: f64) -> f64 {
    // Scaling by 100 first would round the product and push values just
    // below a half cent onto the tie.
    format!("{value:.2}").parse().unwrap_or(value)
}
