#![doc = r"Resumable fiber reconciler with state and effect hooks."]

pub mod collections;
pub mod commit;
pub mod config;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod platform;
pub mod reconciler;
pub mod root;
pub mod runtime;
pub mod same_value;
pub mod scheduler;

pub use commit::CommitReport;
pub use config::RootConfig;
pub use element::{
    component, h, text, Component, Element, ElementBuilder, ElementType, Event, EventHandler,
    PropValue, Props, RenderFn,
};
pub use error::RenderError;
pub use fiber::{EffectTag, Fiber, FiberId, FiberTree};
pub use hooks::{use_effect, use_state, Cleanup, DepValue, Deps, EffectResult, StateSetter};
pub use host::{Host, HostError, MemoryHost, MemoryNodeId, MemoryNodeKind};
pub use platform::{Clock, ClockDeadline, Deadline, RuntimeScheduler, Unbounded};
pub use root::{FiberRoot, ROOT_TAG};
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};
pub use same_value::SameValue;
pub use scheduler::WorkStatus;

#[cfg(test)]
pub use runtime::TestScheduler;
