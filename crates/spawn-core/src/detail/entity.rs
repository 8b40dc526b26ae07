//! Single-entity details.

use std::fmt;
use std::str::FromStr;

use rand::{Rng, RngCore};
use serde::Deserialize;

use crate::weighted::weighted_selection;

/// Levels assigned when a detail does not name a range.
pub const DEFAULT_LEVEL_RANGE: LevelRange = LevelRange { min: 1, max: 100 };

/// An inclusive level range, written `"5"` or `"5-10"` (or as a bare number).
/// Offsets may be negative: `"-2-1"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RangeRepr")]
pub struct LevelRange {
    pub min: i32,
    pub max: i32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RangeRepr {
    Single(i32),
    Text(String),
}

impl TryFrom<RangeRepr> for LevelRange {
    type Error = String;

    fn try_from(repr: RangeRepr) -> Result<Self, Self::Error> {
        match repr {
            RangeRepr::Single(level) => Ok(LevelRange::exactly(level)),
            RangeRepr::Text(text) => text.parse(),
        }
    }
}

impl FromStr for LevelRange {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| format!("invalid level range `{text}`"))
        };
        // The separator is the first '-' that is not a leading sign.
        let split = text
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '-')
            .map(|(i, _)| i);
        let range = match split {
            Some(i) => LevelRange {
                min: parse(&text[..i])?,
                max: parse(&text[i + 1..])?,
            },
            None => LevelRange::exactly(parse(text)?),
        };
        if range.min > range.max {
            return Err(format!("level range `{text}` is empty"));
        }
        Ok(range)
    }
}

impl fmt::Display for LevelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

impl LevelRange {
    pub const fn exactly(level: i32) -> Self {
        Self {
            min: level,
            max: level,
        }
    }

    pub fn contains(&self, level: i32) -> bool {
        (self.min..=self.max).contains(&level)
    }

    /// Shifts both ends by `level`.
    pub fn offset_by(&self, level: i32) -> Self {
        Self {
            min: level + self.min,
            max: level + self.max,
        }
    }

    pub fn random(&self, rng: &mut dyn RngCore) -> i32 {
        if self.min >= self.max {
            return self.min;
        }
        rng.random_range(self.min..=self.max)
    }
}

/// An item an entity may spawn holding.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PossibleHeldItem {
    pub item: String,
    #[serde(default = "full_chance")]
    pub percentage: f64,
}

fn full_chance() -> f64 {
    100.0
}

/// Rolls a held item. Percentages below 100 in total leave the remainder as
/// the chance of holding nothing; the rest is a weighted draw.
pub fn roll_held_item(items: &[PossibleHeldItem], rng: &mut dyn RngCore) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let until_100 = 1.0 - items.iter().map(|i| i.percentage / 100.0).sum::<f64>();
    if until_100 > 0.0 && rng.random::<f64>() < until_100 {
        return None;
    }
    weighted_selection(items, rng, |i| i.percentage as f32).map(|i| i.item.clone())
}

/// Spawns one entity of `entity_type`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EntitySpawn {
    #[serde(rename = "entity")]
    pub entity_type: String,
    #[serde(default, alias = "level_range")]
    pub level: Option<LevelRange>,
    #[serde(default)]
    pub held_items: Vec<PossibleHeldItem>,
    #[serde(default)]
    pub drops: Option<String>,
}

impl EntitySpawn {
    pub fn level_range(&self) -> LevelRange {
        self.level.unwrap_or(DEFAULT_LEVEL_RANGE)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.entity_type.trim().is_empty() {
            return Err("entity type is empty".to_string());
        }
        if let Some(item) = self.held_items.iter().find(|i| !(i.percentage >= 0.0)) {
            return Err(format!("held item `{}` has a negative percentage", item.item));
        }
        Ok(())
    }
}
