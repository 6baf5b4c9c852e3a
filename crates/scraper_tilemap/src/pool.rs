//! # Weather Pools
//!
//! Determines which chunk templates a level may draw from.
//!
//! The weather collaborator reports one discrete condition string (the
//! OpenWeatherMap `weather[0].main` vocabulary). Every condition resolves to
//! exactly one of three pools:
//!
//! | Condition            | Pool            |
//! |----------------------|-----------------|
//! | `Clear`              | `Fair`          |
//! | `Clouds`             | `Mixed`         |
//! | anything else        | `Precipitation` |
//!
//! `Mixed` is the union of the other two.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Weather conditions the collaborator can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WeatherCondition {
    /// Clear sky.
    Clear,
    /// Clouds.
    Clouds,
    /// Rain.
    Rain,
    /// Drizzle.
    Drizzle,
    /// Thunderstorm.
    Thunderstorm,
    /// Snow.
    Snow,
    /// Mist.
    Mist,
    /// Smoke.
    Smoke,
    /// Haze.
    Haze,
    /// Dust.
    Dust,
    /// Fog.
    Fog,
    /// Sand.
    Sand,
    /// Volcanic ash.
    Ash,
    /// Squall.
    Squall,
    /// Tornado.
    Tornado,
    /// Anything the collaborator sent that we do not recognise.
    Unknown,
}

impl WeatherCondition {
    /// Parses a condition string. Never fails: unknown strings map to
    /// [`WeatherCondition::Unknown`].
    #[must_use]
    pub fn parse(condition: &str) -> Self {
        match condition.trim() {
            "Clear" => Self::Clear,
            "Clouds" => Self::Clouds,
            "Rain" => Self::Rain,
            "Drizzle" => Self::Drizzle,
            "Thunderstorm" => Self::Thunderstorm,
            "Snow" => Self::Snow,
            "Mist" => Self::Mist,
            "Smoke" => Self::Smoke,
            "Haze" => Self::Haze,
            "Dust" => Self::Dust,
            "Fog" => Self::Fog,
            "Sand" => Self::Sand,
            "Ash" => Self::Ash,
            "Squall" => Self::Squall,
            "Tornado" => Self::Tornado,
            _ => Self::Unknown,
        }
    }

    /// Returns the pool this condition draws templates from.
    #[must_use]
    pub const fn pool(self) -> TemplatePool {
        match self {
            Self::Clear => TemplatePool::Fair,
            Self::Clouds => TemplatePool::Mixed,
            _ => TemplatePool::Precipitation,
        }
    }
}

/// Template selection pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplatePool {
    /// Fair-weather obstacles.
    Fair,
    /// Precipitation-weather hazards.
    Precipitation,
    /// Cloudy: union of fair and precipitation.
    Mixed,
}

impl TemplatePool {
    /// All pools, in index order.
    pub const ALL: [Self; 3] = [Self::Fair, Self::Precipitation, Self::Mixed];

    /// Dense index for per-pool tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Fair => 0,
            Self::Precipitation => 1,
            Self::Mixed => 2,
        }
    }
}

impl fmt::Display for TemplatePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fair => "fair",
            Self::Precipitation => "precipitation",
            Self::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_conditions() {
        assert_eq!(WeatherCondition::parse("Clear").pool(), TemplatePool::Fair);
        assert_eq!(WeatherCondition::parse("Clouds").pool(), TemplatePool::Mixed);
        assert_eq!(WeatherCondition::parse("Rain").pool(), TemplatePool::Precipitation);
        assert_eq!(WeatherCondition::parse("Tornado").pool(), TemplatePool::Precipitation);
    }

    #[test]
    fn test_unknown_falls_back_to_precipitation() {
        for raw in ["", "clear", "Meteor shower", "CLOUDS"] {
            let condition = WeatherCondition::parse(raw);
            assert_eq!(condition, WeatherCondition::Unknown, "{raw:?}");
            assert_eq!(condition.pool(), TemplatePool::Precipitation);
        }
    }

    #[test]
    fn test_pool_indices_are_dense() {
        for (i, pool) in TemplatePool::ALL.iter().enumerate() {
            assert_eq!(pool.index(), i);
        }
    }
}
