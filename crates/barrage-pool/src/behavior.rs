//! Per-object behavior trees.
//!
//! A pool owns at most one [`BehaviorTree`]. The tree is stored flat: nodes
//! are linearized breadth-first from a [`BehaviorNodeRecipe`], each knowing its
//! parent and its children. Every live object has a *current node*; one tick
//! of [`BehaviorTree::update`] resumes each object at its current node and
//! follows transitions until some node reports [`BehaviorState::Running`] or
//! the root finishes. A finished root restarts on the object's next tick.
//!
//! Nodes are shared by all objects of the pool, so any per-object state a node
//! keeps (a countdown, a cursor) must live in arrays indexed by object slot and
//! follow the pool's compaction through
//! [`BehaviorNode::handle_destructions`].

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::array::{ComponentArray, TypedArray};
use crate::pool::PoolData;
use crate::random::Random;
use crate::registry::Registry;
use crate::PoolError;

/// Outcome of starting or updating a node for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorState {
    /// The node stays current; resume it next tick.
    Running,
    Success,
    Failure,
    /// Make the child at this position current and start it immediately.
    Transfer(usize),
}

impl BehaviorState {
    pub fn is_finished(self) -> bool {
        matches!(self, BehaviorState::Success | BehaviorState::Failure)
    }
}

/// What a node sees while running for one object.
pub struct BehaviorContext<'a> {
    pub data: &'a mut PoolData,
    pub random: &'a mut Random,
    pub dt: f32,
    /// Slot of the object being updated.
    pub object: usize,
    /// Number of children of the node being run.
    pub num_children: usize,
}

impl fmt::Debug for BehaviorContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorContext")
            .field("dt", &self.dt)
            .field("object", &self.object)
            .field("num_children", &self.num_children)
            .finish()
    }
}

/// One node type of a behavior tree.
pub trait BehaviorNode: fmt::Debug + Send + Sync {
    /// The node became current for `ctx.object`.
    fn start(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorState;

    /// The node is still current from an earlier tick.
    fn update(&mut self, _ctx: &mut BehaviorContext<'_>) -> BehaviorState {
        BehaviorState::Running
    }

    /// The child at `child` finished with `state` (always `Success` or
    /// `Failure`). The default passes the result up.
    fn child_finished(
        &mut self,
        _ctx: &mut BehaviorContext<'_>,
        _child: usize,
        state: BehaviorState,
    ) -> BehaviorState {
        state
    }

    fn clone_node(&self) -> Box<dyn BehaviorNode>;

    fn set_capacity(&mut self, _capacity: usize) {}

    fn handle_destructions(&mut self, _destroyed: &[bool], _write_index: usize, _end_index: usize) {
    }
}

impl Clone for Box<dyn BehaviorNode> {
    fn clone(&self) -> Self {
        self.clone_node()
    }
}

/// Serializable description of a tree: a registered node name, its
/// parameters and its children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorNodeRecipe {
    pub node: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub children: Vec<BehaviorNodeRecipe>,
}

impl BehaviorNodeRecipe {
    pub fn new(node: &str) -> Self {
        Self {
            node: node.to_owned(),
            params: serde_json::Value::Null,
            children: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_child(mut self, child: BehaviorNodeRecipe) -> Self {
        self.children.push(child);
        self
    }
}

// ---------------------------------------------------------------------------
// BehaviorTree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TreeNode {
    name: String,
    node: Box<dyn BehaviorNode>,
    parent: Option<usize>,
    /// Position of this node among its parent's children.
    position: usize,
    children: Vec<usize>,
}

/// A linearized tree plus the per-object current node.
#[derive(Debug, Clone)]
pub struct BehaviorTree {
    nodes: Vec<TreeNode>,
    /// `None` means the object has not started the root yet.
    current: TypedArray<Option<u32>>,
}

impl BehaviorTree {
    /// A tree with just a root. Index 0 is always the root.
    pub fn new(name: &str, root: Box<dyn BehaviorNode>) -> Self {
        Self {
            nodes: vec![TreeNode {
                name: name.to_owned(),
                node: root,
                parent: None,
                position: 0,
                children: Vec::new(),
            }],
            current: TypedArray::new(0),
        }
    }

    /// Append `node` as the last child of `parent`. Returns the new node's
    /// index.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a node of this tree.
    pub fn add_child(&mut self, parent: usize, name: &str, mut node: Box<dyn BehaviorNode>) -> usize {
        assert!(parent < self.nodes.len(), "behavior node {parent} does not exist");
        node.set_capacity(self.current.capacity());
        let index = self.nodes.len();
        let position = self.nodes[parent].children.len();
        self.nodes[parent].children.push(index);
        self.nodes.push(TreeNode {
            name: name.to_owned(),
            node,
            parent: Some(parent),
            position,
            children: Vec::new(),
        });
        index
    }

    /// Instantiate `recipe` through the registry, breadth-first.
    pub fn build(recipe: &BehaviorNodeRecipe, registry: &Registry) -> Result<Self, PoolError> {
        let root = registry.parse_behavior_node(&recipe.node, &recipe.params)?;
        let mut tree = Self::new(&recipe.node, root);
        let mut queue: VecDeque<(usize, &BehaviorNodeRecipe)> = VecDeque::new();
        queue.push_back((0, recipe));
        while let Some((index, recipe)) = queue.pop_front() {
            for child in &recipe.children {
                let node = registry.parse_behavior_node(&child.node, &child.params)?;
                let child_index = tree.add_child(index, &child.node, node);
                queue.push_back((child_index, child));
            }
        }
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_name(&self, index: usize) -> &str {
        &self.nodes[index].name
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes[index].parent
    }

    pub fn children(&self, index: usize) -> &[usize] {
        &self.nodes[index].children
    }

    /// Current node of `object`, `None` before the root starts.
    pub fn current_node(&self, object: usize) -> Option<usize> {
        let current: Option<u32> = *self.current.get(object);
        current.map(|index| index as usize)
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.current.set_capacity(capacity);
        for entry in &mut self.nodes {
            entry.node.set_capacity(capacity);
        }
    }

    pub fn handle_destructions(&mut self, destroyed: &[bool], write_index: usize, end_index: usize) {
        let new_end = self
            .current
            .handle_destructions(destroyed, write_index, end_index);
        // Objects created in freed slots start at the root.
        self.current.reset_range(new_end..end_index);
        for entry in &mut self.nodes {
            entry.node.handle_destructions(destroyed, write_index, end_index);
        }
    }

    /// Advance every live object in `[0, active)` by one tick.
    pub fn update(&mut self, data: &mut PoolData, active: usize, random: &mut Random, dt: f32) {
        if self.nodes.is_empty() {
            return;
        }
        for object in 0..active {
            self.step(data, object, random, dt);
        }
    }

    fn step(&mut self, data: &mut PoolData, object: usize, random: &mut Random, dt: f32) {
        let nodes = &mut self.nodes;
        let mut ctx = BehaviorContext {
            data,
            random,
            dt,
            object,
            num_children: 0,
        };

        let (mut index, mut state) = match *self.current.get(object) {
            None => {
                ctx.num_children = nodes[0].children.len();
                (0, nodes[0].node.start(&mut ctx))
            }
            Some(index) => {
                let index = index as usize;
                ctx.num_children = nodes[index].children.len();
                (index, nodes[index].node.update(&mut ctx))
            }
        };

        loop {
            match state {
                BehaviorState::Running => {
                    self.current.set(object, Some(index as u32));
                    return;
                }
                BehaviorState::Transfer(position) => {
                    let Some(&child) = nodes[index].children.get(position) else {
                        panic!(
                            "behavior node '{}' transferred to missing child {position}",
                            nodes[index].name
                        );
                    };
                    index = child;
                    ctx.num_children = nodes[index].children.len();
                    state = nodes[index].node.start(&mut ctx);
                }
                BehaviorState::Success | BehaviorState::Failure => {
                    let Some(parent) = nodes[index].parent else {
                        self.current.set(object, None);
                        return;
                    };
                    let position = nodes[index].position;
                    index = parent;
                    ctx.num_children = nodes[index].children.len();
                    state = nodes[index].node.child_finished(&mut ctx, position, state);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Core nodes
// ---------------------------------------------------------------------------

/// Run children in order; fail on the first failure.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Sequence;

impl BehaviorNode for Sequence {
    fn start(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorState {
        if ctx.num_children == 0 {
            BehaviorState::Success
        } else {
            BehaviorState::Transfer(0)
        }
    }

    fn child_finished(
        &mut self,
        ctx: &mut BehaviorContext<'_>,
        child: usize,
        state: BehaviorState,
    ) -> BehaviorState {
        match state {
            BehaviorState::Success if child + 1 < ctx.num_children => BehaviorState::Transfer(child + 1),
            other => other,
        }
    }

    fn clone_node(&self) -> Box<dyn BehaviorNode> {
        Box::new(*self)
    }
}

/// Run children in order; succeed on the first success.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Selector;

impl BehaviorNode for Selector {
    fn start(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorState {
        if ctx.num_children == 0 {
            BehaviorState::Failure
        } else {
            BehaviorState::Transfer(0)
        }
    }

    fn child_finished(
        &mut self,
        ctx: &mut BehaviorContext<'_>,
        child: usize,
        state: BehaviorState,
    ) -> BehaviorState {
        match state {
            BehaviorState::Failure if child + 1 < ctx.num_children => BehaviorState::Transfer(child + 1),
            other => other,
        }
    }

    fn clone_node(&self) -> Box<dyn BehaviorNode> {
        Box::new(*self)
    }
}

/// Succeed immediately.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Succeed;

impl BehaviorNode for Succeed {
    fn start(&mut self, _ctx: &mut BehaviorContext<'_>) -> BehaviorState {
        BehaviorState::Success
    }

    fn clone_node(&self) -> Box<dyn BehaviorNode> {
        Box::new(*self)
    }
}

/// Succeed `ticks` ticks after starting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wait {
    pub ticks: u32,
    #[serde(skip)]
    remaining: TypedArray<u32>,
}

impl Wait {
    pub fn new(ticks: u32) -> Self {
        Self {
            ticks,
            remaining: TypedArray::new(0),
        }
    }
}

impl BehaviorNode for Wait {
    fn start(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorState {
        if self.ticks == 0 {
            return BehaviorState::Success;
        }
        self.remaining.set(ctx.object, self.ticks);
        BehaviorState::Running
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorState {
        let remaining = self.remaining.get_mut(ctx.object);
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            BehaviorState::Success
        } else {
            BehaviorState::Running
        }
    }

    fn clone_node(&self) -> Box<dyn BehaviorNode> {
        Box::new(self.clone())
    }

    fn set_capacity(&mut self, capacity: usize) {
        self.remaining.set_capacity(capacity);
    }

    fn handle_destructions(&mut self, destroyed: &[bool], write_index: usize, end_index: usize) {
        self.remaining
            .handle_destructions(destroyed, write_index, end_index);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Adds one to the object's `count` slot and succeeds.
    #[derive(Debug, Clone)]
    struct Count;

    impl BehaviorNode for Count {
        fn start(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorState {
            *ctx.data.component_array_mut::<u32>("count").get_mut(ctx.object) += 1;
            BehaviorState::Success
        }

        fn clone_node(&self) -> Box<dyn BehaviorNode> {
            Box::new(self.clone())
        }
    }

    #[derive(Debug, Clone)]
    struct Fail;

    impl BehaviorNode for Fail {
        fn start(&mut self, _ctx: &mut BehaviorContext<'_>) -> BehaviorState {
            BehaviorState::Failure
        }

        fn clone_node(&self) -> Box<dyn BehaviorNode> {
            Box::new(self.clone())
        }
    }

    fn counting_data(capacity: usize) -> PoolData {
        let mut data = PoolData::new();
        data.add_component_array("count", Box::new(TypedArray::<u32>::new(capacity)));
        data
    }

    fn counts(data: &PoolData) -> &[u32] {
        data.component_array::<u32>("count").as_slice()
    }

    #[test]
    fn sequence_runs_children_in_one_tick() {
        let mut tree = BehaviorTree::new("seq", Box::new(Sequence));
        tree.add_child(0, "a", Box::new(Count));
        tree.add_child(0, "b", Box::new(Count));
        tree.set_capacity(2);

        let mut data = counting_data(2);
        let mut random = Random::new(1);
        tree.update(&mut data, 2, &mut random, 1.0);
        assert_eq!(counts(&data), &[2, 2]);
        assert_eq!(tree.current_node(0), None);
    }

    #[test]
    fn sequence_stops_at_failure() {
        let mut tree = BehaviorTree::new("seq", Box::new(Sequence));
        tree.add_child(0, "fail", Box::new(Fail));
        tree.add_child(0, "count", Box::new(Count));
        tree.set_capacity(1);

        let mut data = counting_data(1);
        tree.update(&mut data, 1, &mut Random::new(1), 1.0);
        assert_eq!(counts(&data), &[0]);
    }

    #[test]
    fn selector_stops_at_success() {
        let mut tree = BehaviorTree::new("sel", Box::new(Selector));
        tree.add_child(0, "fail", Box::new(Fail));
        tree.add_child(0, "count", Box::new(Count));
        tree.add_child(0, "count", Box::new(Count));
        tree.set_capacity(1);

        let mut data = counting_data(1);
        tree.update(&mut data, 1, &mut Random::new(1), 1.0);
        assert_eq!(counts(&data), &[1]);
    }

    #[test]
    fn wait_holds_the_object_then_resumes() {
        let mut tree = BehaviorTree::new("seq", Box::new(Sequence));
        let wait = tree.add_child(0, "wait", Box::new(Wait::new(2)));
        tree.add_child(0, "count", Box::new(Count));
        tree.set_capacity(1);

        let mut data = counting_data(1);
        let mut random = Random::new(1);
        tree.update(&mut data, 1, &mut random, 1.0);
        assert_eq!(tree.current_node(0), Some(wait));
        tree.update(&mut data, 1, &mut random, 1.0);
        assert_eq!(counts(&data), &[0]);
        tree.update(&mut data, 1, &mut random, 1.0);
        assert_eq!(counts(&data), &[1]);
        assert_eq!(tree.current_node(0), None);
    }

    #[test]
    fn current_node_follows_compaction() {
        let mut tree = BehaviorTree::new("seq", Box::new(Sequence));
        tree.add_child(0, "count", Box::new(Count));
        let wait = tree.add_child(0, "wait", Box::new(Wait::new(5)));
        tree.set_capacity(3);
        tree.current.set(1, Some(wait as u32));

        tree.handle_destructions(&[true, false, false], 0, 3);
        assert_eq!(tree.current_node(0), Some(wait));
        assert_eq!(tree.current_node(1), None);
    }

    #[test]
    fn empty_composites_finish_immediately() {
        let mut data = counting_data(1);
        let mut random = Random::new(1);
        let mut sequence = BehaviorTree::new("seq", Box::new(Sequence));
        sequence.set_capacity(1);
        sequence.update(&mut data, 1, &mut random, 1.0);
        assert_eq!(sequence.current_node(0), None);

        let mut selector = BehaviorTree::new("sel", Box::new(Selector));
        selector.set_capacity(1);
        selector.update(&mut data, 1, &mut random, 1.0);
        assert_eq!(selector.current_node(0), None);
    }

    #[test]
    fn build_linearizes_breadth_first() {
        let registry = Registry::new();
        let recipe = BehaviorNodeRecipe::new("Sequence")
            .with_child(BehaviorNodeRecipe::new("Selector").with_child(BehaviorNodeRecipe::new("Succeed")))
            .with_child(BehaviorNodeRecipe::new("Wait").with_params(serde_json::json!({"ticks": 3})));
        let tree = BehaviorTree::build(&recipe, &registry).unwrap();
        let names: Vec<&str> = (0..tree.len()).map(|i| tree.node_name(i)).collect();
        assert_eq!(names, vec!["Sequence", "Selector", "Wait", "Succeed"]);
        assert_eq!(tree.children(0), &[1, 2]);
        assert_eq!(tree.parent(3), Some(1));
    }

    #[test]
    fn build_rejects_unknown_nodes() {
        let registry = Registry::new();
        let recipe = BehaviorNodeRecipe::new("Sequence").with_child(BehaviorNodeRecipe::new("Dance"));
        let err = BehaviorTree::build(&recipe, &registry).unwrap_err();
        assert!(matches!(err, PoolError::UnknownBehaviorNode { .. }));
    }
}
