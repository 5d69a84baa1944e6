//! Testing utilities and harness for fiber-rs

pub mod testing;

// Re-export testing utilities
pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use fiber_core::{
        component, deps, h, text, use_effect, use_state, Component, Element, EffectResult,
        EventHandler, Props, StateSetter,
    };
}
