//! Herd details: one selection claims the pass and fills it with members.

use rand::RngCore;
use serde::Deserialize;

use super::entity::LevelRange;
use crate::weighted::weighted_selection;

/// Label added to the action spawning a herd leader.
pub const HERD_LEADER: &str = "leader";

/// One kind of entity a herd can contain.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Herdable {
    #[serde(rename = "entity")]
    pub entity_type: String,
    /// Herd levels this member may join at.
    #[serde(default)]
    pub level_range: Option<LevelRange>,
    /// Member level relative to the herd level.
    #[serde(default)]
    pub level_range_offset: Option<LevelRange>,
    #[serde(default)]
    pub drop_table: Option<String>,
    #[serde(default)]
    pub is_leader: bool,
    #[serde(default = "default_weight")]
    pub weight: f32,
    #[serde(default = "default_max_times")]
    pub max_times: u32,
}

fn default_weight() -> f32 {
    1.0
}

fn default_max_times() -> u32 {
    10
}

fn default_herd_level() -> LevelRange {
    LevelRange { min: 1, max: 100 }
}

fn default_max_herd_size() -> usize {
    10
}

fn default_min_distance() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HerdSpawn {
    #[serde(rename = "herdable")]
    pub members: Vec<Herdable>,
    /// Range the shared herd level is rolled from.
    #[serde(default = "default_herd_level", alias = "level_range")]
    pub level: LevelRange,
    #[serde(default = "default_max_herd_size")]
    pub max_herd_size: usize,
    /// Positions closer than this to a placed member are dropped.
    #[serde(default = "default_min_distance")]
    pub min_distance_between_spawns: f64,
}

impl HerdSpawn {
    pub fn validate(&self) -> Result<(), String> {
        if self.members.is_empty() {
            return Err("herd has no members".to_string());
        }
        for member in &self.members {
            if member.entity_type.trim().is_empty() {
                return Err("herd member has an empty entity type".to_string());
            }
            if !(member.weight > 0.0) {
                return Err(format!("herd member `{}` needs a positive weight", member.entity_type));
            }
            if member.max_times == 0 {
                return Err(format!("herd member `{}` has max_times 0", member.entity_type));
            }
        }
        if self.max_herd_size == 0 {
            return Err("max_herd_size must be at least 1".to_string());
        }
        Ok(())
    }

    /// Members that may still be added at `level`, given how many of each
    /// are already in the herd (`counts` is indexed like `members`).
    pub fn eligible_members(&self, level: i32, counts: &[u32]) -> Vec<usize> {
        self.members
            .iter()
            .enumerate()
            .filter(|(i, member)| {
                counts.get(*i).copied().unwrap_or(0) < member.max_times
                    && member.level_range.is_none_or(|range| range.contains(level))
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// A leader could still join but none has been chosen yet.
    pub fn lacks_leader(&self, level: i32, counts: &[u32]) -> bool {
        let leader_possible = self
            .eligible_members(level, counts)
            .into_iter()
            .any(|i| self.members[i].is_leader);
        let leader_chosen = self
            .members
            .iter()
            .zip(counts)
            .any(|(member, count)| member.is_leader && *count > 0);
        leader_possible && !leader_chosen
    }

    /// Draws the next member by weight. While a leader is missing only
    /// leaders are offered.
    pub fn pick_member(&self, level: i32, counts: &[u32], rng: &mut dyn RngCore) -> Option<usize> {
        let mut eligible = self.eligible_members(level, counts);
        if self.lacks_leader(level, counts) {
            eligible.retain(|&i| self.members[i].is_leader);
        }
        weighted_selection(&eligible, rng, |&i| self.members[i].weight).copied()
    }

    /// Level range for a member joining a herd at `level`.
    pub fn member_level_range(&self, member: usize, level: i32) -> LevelRange {
        self.members
            .get(member)
            .and_then(|m| m.level_range_offset)
            .map_or(LevelRange::exactly(level), |offset| offset.offset_by(level))
    }
}
