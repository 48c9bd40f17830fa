//! Built-in spawn rules for bullet patterns.
//!
//! Value rules run in the order a layer lists them, so a pattern is usually
//! a position rule (`CopyPosition`, then `LineSpread`) followed by a velocity
//! rule (`SetVelocity`, `RingVelocity` or `AngleSweep`) and optionally
//! `RandomSpeed`.

use serde::{Deserialize, Serialize};

use barrage_pool::array::{ComponentArray, TypedArray};
use barrage_pool::spawn::{SpawnRule, SpawnRuleInfo};

use crate::components::{Position, Velocity, POSITION, VELOCITY};

/// Centered offset of `group` among `num_groups`: `-1, 0, 1` for three.
fn centered(group: u32, num_groups: u32) -> f32 {
    group as f32 - (num_groups.max(1) - 1) as f32 / 2.0
}

// ---------------------------------------------------------------------------
// Position rules
// ---------------------------------------------------------------------------

/// Place every new object at the source object's position plus `offset`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyPosition {
    pub offset: Position,
}

impl SpawnRule for CopyPosition {
    fn execute(&mut self, info: &mut SpawnRuleInfo<'_>) {
        let origin = *info
            .source()
            .component_array::<Position>(POSITION)
            .get(info.source_index);
        let position = Position::new(origin.x + self.offset.x, origin.y + self.offset.y);
        let slots = info.slots();
        let positions = info.dest_mut().component_array_mut::<Position>(POSITION);
        for slot in slots {
            positions.set(slot.index, position);
        }
    }

    fn clone_rule(&self) -> Box<dyn SpawnRule> {
        Box::new(self.clone())
    }
}

/// Shift each group sideways along the direction `angle_deg`, `spacing`
/// apart and centered on the current position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineSpread {
    pub spacing: f32,
    #[serde(default)]
    pub angle_deg: f32,
}

impl SpawnRule for LineSpread {
    fn execute(&mut self, info: &mut SpawnRuleInfo<'_>) {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        let num_groups = info.group_info.num_groups;
        let slots = info.slots();
        let positions = info.dest_mut().component_array_mut::<Position>(POSITION);
        for slot in slots {
            let offset = centered(slot.group, num_groups) * self.spacing;
            let position = positions.get_mut(slot.index);
            position.x += cos * offset;
            position.y += sin * offset;
        }
    }

    fn clone_rule(&self) -> Box<dyn SpawnRule> {
        Box::new(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Velocity rules
// ---------------------------------------------------------------------------

/// Give every new object the same velocity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetVelocity {
    pub x: f32,
    pub y: f32,
}

impl SpawnRule for SetVelocity {
    fn execute(&mut self, info: &mut SpawnRuleInfo<'_>) {
        let velocity = Velocity::new(self.x, self.y);
        let slots = info.slots();
        let velocities = info.dest_mut().component_array_mut::<Velocity>(VELOCITY);
        for slot in slots {
            velocities.set(slot.index, velocity);
        }
    }

    fn clone_rule(&self) -> Box<dyn SpawnRule> {
        Box::new(self.clone())
    }
}

/// Spread the groups evenly around a full circle at `speed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RingVelocity {
    pub speed: f32,
    #[serde(default)]
    pub start_deg: f32,
}

impl SpawnRule for RingVelocity {
    fn execute(&mut self, info: &mut SpawnRuleInfo<'_>) {
        let num_groups = info.group_info.num_groups.max(1) as f32;
        let start = self.start_deg.to_radians();
        let slots = info.slots();
        let velocities = info.dest_mut().component_array_mut::<Velocity>(VELOCITY);
        for slot in slots {
            let angle = start + std::f32::consts::TAU * slot.group as f32 / num_groups;
            velocities.set(slot.index, Velocity::from_angle(angle, self.speed));
        }
    }

    fn clone_rule(&self) -> Box<dyn SpawnRule> {
        Box::new(self.clone())
    }
}

/// A fan of groups `spread_deg` apart around an aim that turns by `step_deg`
/// after every spawn event of the same source object.
///
/// The current aim is kept per source slot, so it follows the source pool's
/// compaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AngleSweep {
    pub speed: f32,
    pub step_deg: f32,
    #[serde(default)]
    pub spread_deg: f32,
    #[serde(default)]
    pub start_deg: f32,
    /// Degrees turned so far, per source object.
    #[serde(skip)]
    turned: TypedArray<f32>,
}

impl AngleSweep {
    pub fn new(speed: f32, step_deg: f32) -> Self {
        Self {
            speed,
            step_deg,
            ..Self::default()
        }
    }

    /// Current aim of `source` in degrees.
    pub fn aim_deg(&self, source: usize) -> f32 {
        self.start_deg + self.turned.get(source)
    }
}

impl SpawnRule for AngleSweep {
    fn execute(&mut self, info: &mut SpawnRuleInfo<'_>) {
        let aim = self.aim_deg(info.source_index);
        let num_groups = info.group_info.num_groups;
        let slots = info.slots();
        let velocities = info.dest_mut().component_array_mut::<Velocity>(VELOCITY);
        for slot in slots {
            let angle = aim + centered(slot.group, num_groups) * self.spread_deg;
            velocities.set(slot.index, Velocity::from_angle(angle.to_radians(), self.speed));
        }
        let turned = self.turned.get_mut(info.source_index);
        *turned = (*turned + self.step_deg) % 360.0;
    }

    fn clone_rule(&self) -> Box<dyn SpawnRule> {
        Box::new(self.clone())
    }

    fn set_capacity(&mut self, capacity: usize) {
        self.turned.set_capacity(capacity);
    }

    fn handle_destructions(&mut self, destroyed: &[bool], write_index: usize, end_index: usize) {
        let new_end = self
            .turned
            .handle_destructions(destroyed, write_index, end_index);
        // Freed slots start over for the next object created there.
        self.turned.reset_range(new_end..end_index);
    }
}

/// Rescale each new object's velocity to a speed drawn from `[min, max]`,
/// keeping its direction. Objects without a direction move along +x.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RandomSpeed {
    pub min: f32,
    pub max: f32,
}

impl SpawnRule for RandomSpeed {
    fn execute(&mut self, info: &mut SpawnRuleInfo<'_>) {
        let slots = info.slots();
        for slot in slots {
            let speed = info.random.range_float(self.min, self.max);
            let velocity = info
                .dest_mut()
                .component_array_mut::<Velocity>(VELOCITY)
                .get_mut(slot.index);
            let length = velocity.length();
            if length > f32::EPSILON {
                velocity.x *= speed / length;
                velocity.y *= speed / length;
            } else {
                *velocity = Velocity::new(speed, 0.0);
            }
        }
    }

    fn clone_rule(&self) -> Box<dyn SpawnRule> {
        Box::new(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use barrage_pool::pool::PoolData;
    use barrage_pool::random::Random;
    use barrage_pool::spawn::GroupInfo;

    fn motion_data(capacity: usize) -> PoolData {
        let mut data = PoolData::new();
        data.add_component_array(POSITION, Box::new(TypedArray::<Position>::new(capacity)));
        data.add_component_array(VELOCITY, Box::new(TypedArray::<Velocity>::new(capacity)));
        data
    }

    fn run(rule: &mut dyn SpawnRule, source: Option<&PoolData>, dest: &mut PoolData, source_index: usize, groups: u32) {
        let mut random = Random::new(11);
        let mut info = SpawnRuleInfo::new(
            source,
            dest,
            source_index,
            0,
            GroupInfo::new(groups, 1, 1),
            0,
            &mut random,
        );
        rule.execute(&mut info);
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn copy_position_adds_offset() {
        let mut source = motion_data(2);
        source
            .component_array_mut::<Position>(POSITION)
            .set(1, Position::new(3.0, 4.0));
        let mut dest = motion_data(4);
        let mut rule = CopyPosition {
            offset: Position::new(0.0, -1.0),
        };
        run(&mut rule, Some(&source), &mut dest, 1, 2);
        let positions = dest.component_array::<Position>(POSITION);
        assert_eq!(positions.get(0), &Position::new(3.0, 3.0));
        assert_eq!(positions.get(1), &Position::new(3.0, 3.0));
        assert_eq!(positions.get(2), &Position::default());
    }

    #[test]
    fn line_spread_centers_groups() {
        let mut dest = motion_data(3);
        let mut rule = LineSpread {
            spacing: 2.0,
            angle_deg: 0.0,
        };
        run(&mut rule, None, &mut dest, 0, 3);
        let xs: Vec<f32> = dest
            .component_array::<Position>(POSITION)
            .as_slice()
            .iter()
            .map(|p| p.x)
            .collect();
        assert_eq!(xs, vec![-2.0, 0.0, 2.0]);
    }

    #[test]
    fn ring_velocity_spreads_around_circle() {
        let mut dest = motion_data(4);
        let mut rule = RingVelocity {
            speed: 2.0,
            start_deg: 0.0,
        };
        run(&mut rule, None, &mut dest, 0, 4);
        let velocities = dest.component_array::<Velocity>(VELOCITY);
        assert!(close(velocities.get(0).x, 2.0) && close(velocities.get(0).y, 0.0));
        assert!(close(velocities.get(1).x, 0.0) && close(velocities.get(1).y, 2.0));
        assert!(close(velocities.get(2).x, -2.0));
        assert!(close(velocities.get(3).y, -2.0));
    }

    #[test]
    fn angle_sweep_turns_per_source() {
        let mut dest = motion_data(1);
        let mut rule = AngleSweep::new(1.0, 90.0);
        rule.set_capacity(2);

        run(&mut rule, None, &mut dest, 0, 1);
        assert!(close(dest.component_array::<Velocity>(VELOCITY).get(0).x, 1.0));
        run(&mut rule, None, &mut dest, 0, 1);
        assert!(close(dest.component_array::<Velocity>(VELOCITY).get(0).y, 1.0));

        // Source 1 has its own aim.
        assert_eq!(rule.aim_deg(1), 0.0);
        assert_eq!(rule.aim_deg(0), 180.0);
    }

    #[test]
    fn angle_sweep_state_follows_compaction() {
        let mut rule = AngleSweep::new(1.0, 10.0);
        rule.set_capacity(3);
        let mut dest = motion_data(1);
        for source in 0..3 {
            for _ in 0..=source {
                run(&mut rule, None, &mut dest, source, 1);
            }
        }
        assert_eq!([rule.aim_deg(0), rule.aim_deg(1), rule.aim_deg(2)], [10.0, 20.0, 30.0]);

        rule.handle_destructions(&[false, true, false], 0, 3);
        assert_eq!(rule.aim_deg(0), 10.0);
        assert_eq!(rule.aim_deg(1), 30.0);
        assert_eq!(rule.aim_deg(2), 0.0);
    }

    #[test]
    fn random_speed_keeps_direction() {
        let mut dest = motion_data(2);
        dest.component_array_mut::<Velocity>(VELOCITY)
            .set(0, Velocity::new(0.0, 3.0));
        let mut rule = RandomSpeed { min: 5.0, max: 5.0 };
        run(&mut rule, None, &mut dest, 0, 2);
        let velocities = dest.component_array::<Velocity>(VELOCITY);
        assert!(close(velocities.get(0).x, 0.0) && close(velocities.get(0).y, 5.0));
        assert!(close(velocities.get(1).x, 5.0) && close(velocities.get(1).y, 0.0));
    }
}
