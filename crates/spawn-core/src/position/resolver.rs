//! Turns a zone snapshot into spawnable positions.

use std::sync::Arc;

use spawn_config::ZoneConfig;
use spawn_world::{BlockPos, WorldQuery};
use tracing::trace;

use super::{CalculationInput, CalculatorRegistry, SpawnablePosition};
use crate::influence::SpawningInfluence;
use crate::zone::SpawningZone;

/// Runs every calculator over every cell of `zone`.
///
/// A cell can yield one position per matching calculator. Cells whose spawn
/// point lies within `minimum_distance` of a tracked entity (other than the
/// cause entity) are skipped, as are kinds rejected by any spawner influence.
/// Zone influences reaching a position are attached to it, followed by the
/// spawner's own influences.
pub fn resolve_positions(
    world: &dyn WorldQuery,
    zone: &SpawningZone,
    calculators: &CalculatorRegistry,
    config: &ZoneConfig,
    minimum_distance: f64,
    spawner_influences: &[Arc<dyn SpawningInfluence>],
) -> Vec<SpawnablePosition> {
    let mut positions = Vec::new();
    let except = zone.cause.entity;

    for x in zone.base_x..zone.base_x + zone.length {
        for z in zone.base_z..zone.base_z + zone.width {
            for y in zone.base_y..zone.base_y + zone.height {
                let pos = BlockPos::new(x, y, z);
                let spawn_point = pos.as_dvec3() + glam::DVec3::new(0.5, 1.0, 0.5);
                if zone.entity_within(spawn_point, minimum_distance, except) {
                    continue;
                }
                let input = CalculationInput {
                    zone,
                    blocks: world.blocks(),
                    config,
                    pos,
                };
                for calculator in calculators.iter() {
                    if !calculator.fits(&input) {
                        continue;
                    }
                    let kind = calculator.kind();
                    if spawner_influences
                        .iter()
                        .any(|influence| !influence.is_allowed_position(world, pos, kind))
                    {
                        continue;
                    }
                    let mut position = calculator.calculate(&input);
                    for zone_influence in zone.influences_at(pos) {
                        position.attach_influence(zone_influence.influence().clone());
                    }
                    for influence in spawner_influences {
                        position.attach_influence(influence.clone());
                    }
                    positions.push(position);
                }
            }
        }
    }

    trace!(count = positions.len(), "positions resolved");
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cause::SpawnCause;
    use crate::influence::{DetectorRegistry, ZoneInfluence};
    use crate::position::PositionKind;
    use crate::test_world::{flat_world, FlatWorld};
    use crate::zone::{ZoneGenerator, ZoneInput};
    use glam::DVec3;
    use spawn_world::{GridWorld, LivingEntity, WorldMut};

    fn resolve(world: &GridWorld, input: ZoneInput, distance: f64) -> Vec<SpawnablePosition> {
        let zone = ZoneGenerator::new(distance)
            .generate(
                world,
                &input,
                Arc::new(SpawnCause::new("test", None)),
                &DetectorRegistry::new(),
            )
            .unwrap();
        resolve_positions(
            world,
            &zone,
            &CalculatorRegistry::with_defaults(),
            &ZoneConfig::default(),
            distance,
            &[],
        )
    }

    #[test]
    fn test_flat_region_one_grounded_per_column() {
        let FlatWorld { world, .. } = flat_world(10);
        let positions = resolve(&world, ZoneInput::new(BlockPos::new(0, 5, 0), 4, 10, 4), 0.0);
        assert_eq!(positions.len(), 16);
        assert!(positions.iter().all(|p| p.kind() == PositionKind::Grounded));
        assert!(positions.iter().all(|p| p.pos.y == 9));
    }

    #[test]
    fn test_interface_outside_window_yields_nothing() {
        let FlatWorld { world, .. } = flat_world(10);
        let above = resolve(&world, ZoneInput::new(BlockPos::new(0, 12, 0), 4, 8, 4), 0.0);
        assert!(above.is_empty());
        let below = resolve(&world, ZoneInput::new(BlockPos::new(0, 0, 0), 4, 5, 4), 0.0);
        assert!(below.is_empty());
    }

    #[test]
    fn test_positions_near_entities_skipped() {
        let FlatWorld { mut world, .. } = flat_world(10);
        world.add_entity(LivingEntity::creature("resident", DVec3::new(0.5, 10.0, 0.5)));
        let positions = resolve(&world, ZoneInput::new(BlockPos::new(0, 5, 0), 4, 10, 4), 2.0);
        // Columns whose spawn point lies within 2 blocks of (0.5, 10, 0.5).
        assert!(positions.iter().all(|p| p.spawn_point().distance(DVec3::new(0.5, 10.0, 0.5)) >= 2.0));
        assert_eq!(positions.len(), 16 - 4);
    }

    #[derive(Debug)]
    struct NoGrounded;

    impl SpawningInfluence for NoGrounded {
        fn is_allowed_position(&self, _: &dyn WorldQuery, _: BlockPos, kind: PositionKind) -> bool {
            kind != PositionKind::Grounded
        }
    }

    #[derive(Debug)]
    struct Marker;

    impl SpawningInfluence for Marker {
        fn affect_position(&self, position: &mut SpawnablePosition) {
            position.markers.push("marked".to_string());
        }
    }

    #[test]
    fn test_spawner_influence_can_veto_kind() {
        let FlatWorld { world, .. } = flat_world(10);
        let zone = ZoneGenerator::new(0.0)
            .generate(
                &world,
                &ZoneInput::new(BlockPos::new(0, 5, 0), 2, 10, 2),
                Arc::new(SpawnCause::new("test", None)),
                &DetectorRegistry::new(),
            )
            .unwrap();
        let veto: Arc<dyn SpawningInfluence> = Arc::new(NoGrounded);
        let positions = resolve_positions(
            &world,
            &zone,
            &CalculatorRegistry::with_defaults(),
            &ZoneConfig::default(),
            0.0,
            &[veto],
        );
        assert!(positions.is_empty());
    }

    #[test]
    fn test_zone_influences_attached_within_radius() {
        let FlatWorld { world, .. } = flat_world(10);
        let mut zone = ZoneGenerator::new(0.0)
            .generate(
                &world,
                &ZoneInput::new(BlockPos::new(0, 5, 0), 4, 10, 1),
                Arc::new(SpawnCause::new("test", None)),
                &DetectorRegistry::new(),
            )
            .unwrap();
        zone.influences.push(ZoneInfluence::Spatial {
            anchor: BlockPos::new(0, 9, 0),
            radius: 1.0,
            influence: Arc::new(Marker),
        });
        let positions = resolve_positions(
            &world,
            &zone,
            &CalculatorRegistry::with_defaults(),
            &ZoneConfig::default(),
            0.0,
            &[],
        );
        let marked: Vec<i32> = positions
            .iter()
            .filter(|p| p.markers.iter().any(|m| m == "marked"))
            .map(|p| p.pos.x)
            .collect();
        assert_eq!(marked, vec![0, 1]);
        assert_eq!(positions[0].influences.len(), 1);
    }
}
