#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Zone attribute and projection types.
//!
//! A zone arrives from the store as [`ZoneInputs`], where every attribute
//! may be missing. [`ZoneInputs::sanitize`] defaults each missing value to
//! `0.0` and yields a [`ZoneAttributes`] record, which is the only shape the
//! projection function accepts. The projection result is a
//! [`ZoneProjection`].

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Upper bound on any predicted risk radius, in meters.
pub const MAX_RADIUS: f64 = 600.0;

/// A numeric zone attribute read from the store.
///
/// The string form of each variant is the store column name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ZoneAttribute {
    /// Current estimated dog population.
    DogPopulation,
    /// Radius of the zone in meters.
    RadiusMeters,
    /// Food availability score.
    FoodScore,
    /// Water availability score.
    WaterScore,
    /// Number of vaccinated dogs.
    VaccinatedDogs,
    /// Number of sterilized dogs.
    SterilizedDogs,
    /// Number of dogs affected by rabies.
    AffectedByRabies,
    /// Number of reported bite cases.
    BiteCases,
}

impl ZoneAttribute {
    /// Every attribute the projection reads, in declaration order.
    pub const ALL: &[Self] = &[
        Self::DogPopulation,
        Self::RadiusMeters,
        Self::FoodScore,
        Self::WaterScore,
        Self::VaccinatedDogs,
        Self::SterilizedDogs,
        Self::AffectedByRabies,
        Self::BiteCases,
    ];

    /// Returns the store column name for this attribute.
    #[must_use]
    pub fn column(self) -> &'static str {
        self.into()
    }
}

/// Raw zone attributes as read from the store. `None` means the column was
/// absent or `NULL`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneInputs {
    pub dog_population: Option<f64>,
    pub radius_meters: Option<f64>,
    pub food_score: Option<f64>,
    pub water_score: Option<f64>,
    pub vaccinated_dogs: Option<f64>,
    pub sterilized_dogs: Option<f64>,
    pub affected_by_rabies: Option<f64>,
    pub bite_cases: Option<f64>,
}

impl ZoneInputs {
    /// Sets a single attribute.
    pub const fn set(&mut self, attribute: ZoneAttribute, value: Option<f64>) {
        match attribute {
            ZoneAttribute::DogPopulation => self.dog_population = value,
            ZoneAttribute::RadiusMeters => self.radius_meters = value,
            ZoneAttribute::FoodScore => self.food_score = value,
            ZoneAttribute::WaterScore => self.water_score = value,
            ZoneAttribute::VaccinatedDogs => self.vaccinated_dogs = value,
            ZoneAttribute::SterilizedDogs => self.sterilized_dogs = value,
            ZoneAttribute::AffectedByRabies => self.affected_by_rabies = value,
            ZoneAttribute::BiteCases => self.bite_cases = value,
        }
    }

    /// Defaults every missing attribute to `0.0`.
    #[must_use]
    pub fn sanitize(&self) -> ZoneAttributes {
        ZoneAttributes {
            dog_population: self.dog_population.unwrap_or(0.0),
            radius_meters: self.radius_meters.unwrap_or(0.0),
            food_score: self.food_score.unwrap_or(0.0),
            water_score: self.water_score.unwrap_or(0.0),
            vaccinated_dogs: self.vaccinated_dogs.unwrap_or(0.0),
            sterilized_dogs: self.sterilized_dogs.unwrap_or(0.0),
            affected_by_rabies: self.affected_by_rabies.unwrap_or(0.0),
            bite_cases: self.bite_cases.unwrap_or(0.0),
        }
    }
}

/// Fully defaulted zone attributes, ready for projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneAttributes {
    pub dog_population: f64,
    pub radius_meters: f64,
    pub food_score: f64,
    pub water_score: f64,
    pub vaccinated_dogs: f64,
    pub sterilized_dogs: f64,
    pub affected_by_rabies: f64,
    pub bite_cases: f64,
}

/// The two derived metrics for one zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneProjection {
    /// Projected dog population for the next period. Never negative.
    pub predicted_population: i64,
    /// Projected risk radius in meters. Never above [`MAX_RADIUS`].
    pub predicted_risk_radius: f64,
}
