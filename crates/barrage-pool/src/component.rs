//! Per-pool components: single values owned by a pool rather than one per
//! object (a spawner's schedule, a collider radius shared by every bullet).

use std::any::Any;
use std::fmt;

use crate::array::Element;

/// A single type-erased value owned by a pool.
///
/// Blanket-implemented for every [`Element`] type, so any plain-data struct
/// registered with the registry can be stored as a pool component.
pub trait Component: fmt::Debug + Send + Sync {
    /// Deep copy with the same dynamic type.
    fn clone_component(&self) -> Box<dyn Component>;

    /// Export the value as JSON.
    fn to_json(&self) -> serde_json::Value;

    /// Rust type name of the value, for diagnostics.
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Element> Component for T {
    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Clone for Box<dyn Component> {
    fn clone(&self) -> Self {
        self.clone_component()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
