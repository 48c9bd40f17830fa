//! Built-in behavior tree leaves.

use serde::{Deserialize, Serialize};

use barrage_pool::array::DESTRUCTIBLE;
use barrage_pool::behavior::{BehaviorContext, BehaviorNode, BehaviorState};

use crate::components::{Velocity, VELOCITY};

/// Set the object's velocity and succeed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SetVelocityNode {
    pub x: f32,
    pub y: f32,
}

impl BehaviorNode for SetVelocityNode {
    fn start(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorState {
        ctx.data
            .component_array_mut::<Velocity>(VELOCITY)
            .set(ctx.object, Velocity::new(self.x, self.y));
        BehaviorState::Success
    }

    fn clone_node(&self) -> Box<dyn BehaviorNode> {
        Box::new(*self)
    }
}

/// Mark the object for destruction and succeed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Destroy;

impl BehaviorNode for Destroy {
    fn start(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorState {
        ctx.data
            .component_array_mut::<bool>(DESTRUCTIBLE)
            .set(ctx.object, true);
        BehaviorState::Success
    }

    fn clone_node(&self) -> Box<dyn BehaviorNode> {
        Box::new(*self)
    }
}

/// Succeed with probability `p`, fail otherwise.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Chance {
    pub p: f32,
}

impl BehaviorNode for Chance {
    fn start(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorState {
        if ctx.random.chance(self.p) {
            BehaviorState::Success
        } else {
            BehaviorState::Failure
        }
    }

    fn clone_node(&self) -> Box<dyn BehaviorNode> {
        Box::new(*self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
