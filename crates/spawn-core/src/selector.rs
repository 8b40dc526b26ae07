//! Stage two of selection: which detail spawns, and where.
//!
//! Candidates are grouped by position kind, then by detail. Each draw picks a
//! kind (favouring kinds with more possible details), then a detail, then one
//! of that detail's positions by its position-adjusted weight. A detail's
//! chance is governed by its best position, so details that only fit a few
//! spots are not drowned out by details that fit everywhere.
//!
//! Details with a percentage are drawn first: a roll in `(0, 100]` walks
//! their cumulative percentages and only a miss falls through to the
//! weighted draw.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::{Rng, RngCore};
use rustc_hash::FxHashMap;
use spawn_world::WorldQuery;
use tracing::{debug, warn};

use crate::action::SpawnAction;
use crate::bucket::SpawnBucket;
use crate::detail::{LevelRange, SpawnDetail, SpawnPool};
use crate::position::{PositionKind, SpawnablePosition};
use crate::weighted::weighted_index;

// ---------------------------------------------------------------------------
// Selection state
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct DetailCandidates {
    detail: Arc<SpawnDetail>,
    /// Position index and the detail's weight there.
    positions: Vec<(usize, f32)>,
    highest_weight: f32,
}

impl DetailCandidates {
    fn refresh_highest(&mut self) {
        self.highest_weight = self
            .positions
            .iter()
            .map(|(_, w)| *w)
            .fold(0.0, f32::max);
    }
}

#[derive(Debug)]
struct KindCandidates {
    kind: PositionKind,
    details: Vec<DetailCandidates>,
    /// Sum of percentages over this kind's percentage details.
    percent_sum: f32,
}

impl KindCandidates {
    fn drop_details(&mut self, mut remove: impl FnMut(&DetailCandidates) -> bool) {
        let mut removed = 0.0;
        self.details.retain(|candidates| {
            if remove(candidates) {
                removed += candidates.detail.percentage_or_zero();
                false
            } else {
                true
            }
        });
        self.percent_sum -= removed;
    }
}

/// Everything one selection run knows: the candidate positions, what may
/// spawn where, the actions chosen so far and per-run context values.
#[derive(Debug)]
pub struct SelectionState {
    spawner: String,
    positions: Vec<SpawnablePosition>,
    kinds: Vec<KindCandidates>,
    actions: Vec<SpawnAction>,
    context: FxHashMap<String, i32>,
    minimum_distance: f64,
}

impl SelectionState {
    /// Spacing ordinary details keep between spawns.
    pub fn minimum_distance(&self) -> f64 {
        self.minimum_distance
    }

    pub fn actions(&self) -> &[SpawnAction] {
        &self.actions
    }

    /// Actions chosen so far from `detail`.
    pub fn actions_of<'a>(
        &'a self,
        detail: &'a Arc<SpawnDetail>,
    ) -> impl Iterator<Item = &'a SpawnAction> + 'a {
        self.actions
            .iter()
            .filter(move |action| Arc::ptr_eq(&action.detail, detail))
    }

    /// The level stored under `key`, rolling it from `range` the first time.
    pub fn context_level(&mut self, key: &str, range: LevelRange, rng: &mut dyn RngCore) -> i32 {
        if let Some(level) = self.context.get(key) {
            return *level;
        }
        let level = range.random(rng);
        self.context.insert(key.to_string(), level);
        level
    }

    pub fn cached_level(&self, key: &str) -> Option<i32> {
        self.context.get(key).copied()
    }

    /// Whether anything is left to draw.
    pub fn is_exhausted(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Removes every detail matching `remove`, wherever it appears.
    pub fn remove_details(&mut self, remove: impl Fn(&SpawnDetail) -> bool) {
        for kind in &mut self.kinds {
            kind.drop_details(|candidates| remove(&candidates.detail));
        }
        self.kinds.retain(|kind| !kind.details.is_empty());
    }

    /// Removes each (detail, position) pair matching `remove`. Details left
    /// without positions are dropped.
    pub fn remove_positions(&mut self, remove: impl Fn(&SpawnDetail, &SpawnablePosition) -> bool) {
        let positions = &self.positions;
        for kind in &mut self.kinds {
            for candidates in &mut kind.details {
                let detail = Arc::clone(&candidates.detail);
                candidates
                    .positions
                    .retain(|(index, _)| !remove(&detail, &positions[*index]));
                candidates.refresh_highest();
            }
            kind.drop_details(|candidates| candidates.positions.is_empty());
        }
        self.kinds.retain(|kind| !kind.details.is_empty());
    }

    fn remove_detail_at(&mut self, kind_index: usize, detail_index: usize) {
        let kind = &mut self.kinds[kind_index];
        let candidates = kind.details.remove(detail_index);
        kind.percent_sum -= candidates.detail.percentage_or_zero();
        if kind.details.is_empty() {
            self.kinds.remove(kind_index);
        }
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Draws spawn actions from a bucket's pool over a set of positions.
#[derive(Clone, Debug)]
pub struct SpawningSelector {
    pub minimum_distance: f64,
    /// Relative weight of each position kind in the kind draw; unlisted
    /// kinds weigh 1.
    kind_weights: FxHashMap<PositionKind, f32>,
}

impl SpawningSelector {
    pub fn new(minimum_distance: f64) -> Self {
        Self {
            minimum_distance,
            kind_weights: FxHashMap::default(),
        }
    }

    /// Sets kind weights from configuration, keyed by kind name.
    pub fn with_kind_weights(mut self, weights: &BTreeMap<String, f32>) -> Self {
        for (name, weight) in weights {
            match PositionKind::from_name(name) {
                Some(kind) => {
                    self.kind_weights.insert(kind, weight.max(0.0));
                }
                None => warn!("Unknown position kind `{name}` in kind weights"),
            }
        }
        self
    }

    pub fn kind_weight(&self, kind: PositionKind) -> f32 {
        self.kind_weights.get(&kind).copied().unwrap_or(1.0)
    }

    /// Groups every detail of `bucket` possible at `positions`.
    pub fn build(
        &self,
        pool: &SpawnPool,
        bucket: &SpawnBucket,
        positions: Vec<SpawnablePosition>,
        world: &dyn WorldQuery,
    ) -> SelectionState {
        let spawner = positions
            .first()
            .map(|p| p.cause.spawner.clone())
            .unwrap_or_default();
        let mut kinds: Vec<KindCandidates> = Vec::new();

        for (index, position) in positions.iter().enumerate() {
            let matching = pool.matching(bucket, position, world);
            if matching.is_empty() {
                continue;
            }
            let kind = position.kind();
            let kind_index = match kinds.iter().position(|k| k.kind == kind) {
                Some(i) => i,
                None => {
                    kinds.push(KindCandidates {
                        kind,
                        details: Vec::new(),
                        percent_sum: 0.0,
                    });
                    kinds.len() - 1
                }
            };
            let kind_weight = self.kind_weight(kind);
            let group = &mut kinds[kind_index];
            for detail in matching {
                let weight = detail.weight_for(position, world) * kind_weight;
                let candidates = match group.details.iter().position(|c| c.detail.id == detail.id)
                {
                    Some(i) => &mut group.details[i],
                    None => {
                        // Counted once per kind, not once per position.
                        group.percent_sum += detail.percentage_or_zero();
                        group.details.push(DetailCandidates {
                            detail,
                            positions: Vec::new(),
                            highest_weight: 0.0,
                        });
                        let last = group.details.len() - 1;
                        &mut group.details[last]
                    }
                };
                candidates.positions.push((index, weight));
                candidates.highest_weight = candidates.highest_weight.max(weight);
            }
        }

        // Zero-weight details can never be drawn; percentage details are
        // drawn by chance instead.
        for kind in &mut kinds {
            kind.details
                .retain(|c| c.detail.is_percentage() || c.highest_weight > 0.0);
        }
        kinds.retain(|kind| !kind.details.is_empty());

        SelectionState {
            spawner,
            positions,
            kinds,
            actions: Vec::new(),
            context: FxHashMap::default(),
            minimum_distance: self.minimum_distance,
        }
    }

    /// Chooses up to `max` spawn actions.
    pub fn select(
        &self,
        pool: &SpawnPool,
        bucket: &SpawnBucket,
        positions: Vec<SpawnablePosition>,
        max: usize,
        world: &dyn WorldQuery,
        rng: &mut dyn RngCore,
    ) -> Vec<SpawnAction> {
        let mut state = self.build(pool, bucket, positions, world);
        while state.actions.len() < max {
            let Some(action) = self.select_one(bucket, &mut state, rng) else {
                break;
            };
            state.actions.push(action);
        }
        state.actions
    }

    /// Draws the next action, or `None` when nothing is left.
    pub fn select_one(
        &self,
        bucket: &SpawnBucket,
        state: &mut SelectionState,
        rng: &mut dyn RngCore,
    ) -> Option<SpawnAction> {
        loop {
            let kind_index = weighted_index(&state.kinds, rng, |k| {
                self.kind_weight(k.kind) * k.details.len() as f32
            })?;
            let Some(detail_index) = Self::pick_detail(&state.spawner, &state.kinds[kind_index], rng)
            else {
                // This kind yields nothing this pass; the others still can.
                state.kinds.remove(kind_index);
                continue;
            };

            let candidates = &state.kinds[kind_index].details[detail_index];
            let position_index = weighted_index(&candidates.positions, rng, |(_, w)| *w)
                .or_else(|| {
                    // Percentage details are drawn by chance, not weight.
                    (candidates.detail.is_percentage() && !candidates.positions.is_empty())
                        .then(|| rng.random_range(0..candidates.positions.len()))
                });
            let Some(position_index) = position_index else {
                debug!(
                    "Spawn detail {} has no weighted position left",
                    candidates.detail.id
                );
                state.remove_detail_at(kind_index, detail_index);
                continue;
            };

            let detail = Arc::clone(&candidates.detail);
            let position = state.positions[candidates.positions[position_index].0].clone();
            let Some(action) = detail.create_action(&position, bucket, state, rng) else {
                state.remove_details(|d| d.id == detail.id);
                continue;
            };
            detail.on_selection(&action, state);
            return Some(action);
        }
    }

    /// Percentage pass, then a weighted draw over best-position weights.
    fn pick_detail(spawner: &str, kind: &KindCandidates, rng: &mut dyn RngCore) -> Option<usize> {
        if kind.percent_sum > 0.0 {
            if kind.percent_sum > 100.0 {
                warn!(
                    "Percentages for {spawner} sum to {} (over 100); skipping selection",
                    kind.percent_sum
                );
                return None;
            }
            // (0, 100] rather than [0, 100).
            let roll = 100.0 - rng.random::<f32>() * 100.0;
            let mut running = 0.0;
            for (index, candidates) in kind.details.iter().enumerate() {
                if candidates.detail.is_percentage() {
                    running += candidates.detail.percentage_or_zero();
                    if running >= roll {
                        return Some(index);
                    }
                }
            }
        }
        weighted_index(&kind.details, rng, |c| c.highest_weight)
    }

    /// Effective weight of each detail across `positions`, with percentage
    /// details converted to the weight that yields their percentage.
    pub fn total_weights(
        &self,
        pool: &SpawnPool,
        bucket: &SpawnBucket,
        positions: Vec<SpawnablePosition>,
        world: &dyn WorldQuery,
    ) -> Vec<(Arc<SpawnDetail>, f32)> {
        let state = self.build(pool, bucket, positions, world);
        let total_kind_weight: f32 = state.kinds.iter().map(|k| self.kind_weight(k.kind)).sum();
        if !(total_kind_weight > 0.0) {
            return Vec::new();
        }
        let mut weights = Vec::new();
        for kind in &state.kinds {
            let correction = self.kind_weight(kind.kind) / total_kind_weight;
            for (detail, weight) in Self::kind_weights(&state.spawner, kind) {
                weights.push((detail, weight * correction));
            }
        }
        weights
    }

    fn kind_weights(spawner: &str, kind: &KindCandidates) -> Vec<(Arc<SpawnDetail>, f32)> {
        let percent_sum = kind.percent_sum;
        if percent_sum > 100.0 {
            warn!("Percentages for {spawner} sum to {percent_sum} (over 100)");
            return Vec::new();
        }
        let total: f32 = kind.details.iter().map(|c| c.highest_weight).sum();
        // Percentages alone decide the outcome.
        let percentage_only = percent_sum > 0.0 && (percent_sum >= 100.0 || !(total > 0.0));
        let percentage_weight = if percent_sum > 0.0 && !percentage_only {
            let rescaled = total * 100.0 / (100.0 - percent_sum);
            (rescaled - total) / percent_sum
        } else {
            0.0
        };
        kind.details
            .iter()
            .map(|c| {
                let percentage = c.detail.percentage_or_zero();
                let weight = if percentage_only {
                    percentage
                } else {
                    c.highest_weight + percentage * percentage_weight
                };
                (Arc::clone(&c.detail), weight)
            })
            .collect()
    }

    /// Chance, in percent, of each detail being the next one drawn.
    pub fn probabilities(
        &self,
        pool: &SpawnPool,
        bucket: &SpawnBucket,
        positions: Vec<SpawnablePosition>,
        world: &dyn WorldQuery,
    ) -> Vec<(Arc<SpawnDetail>, f32)> {
        let weights = self.total_weights(pool, bucket, positions, world);
        let total: f32 = weights.iter().map(|(_, w)| *w).sum();
        if !(total > 0.0) {
            return Vec::new();
        }
        weights
            .into_iter()
            .map(|(detail, weight)| (detail, (weight / total * 100.0).clamp(0.0, 100.0)))
            .collect()
    }
}
