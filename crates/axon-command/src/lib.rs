//! Command and event dispatch primitives for AXON.
//!
//! This crate provides the typed, named, invocable units that flow
//! between components:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  axon-types     : states, policies, ErrorCode                │
//! │  axon-command   : Callable, Command shapes, events ◄── HERE  │
//! │  axon-interface : Mailbox, Provided/Required interfaces      │
//! │  axon-runtime   : Component lifecycle, registry, run loop    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Commands
//!
//! A command binds a name to a callable — a closure, typically capturing
//! an `Arc` of the owning component's state — plus the argument/result
//! prototypes ([`ArgSpec`]) used for call-time type checking. Six shapes
//! cover the argument/result matrix; see the [`command`] module table.
//!
//! # Events
//!
//! [`EventVoid`] and [`EventWrite`] are multicast generators: one
//! subscriber per connected required interface, fired in subscription
//! order with failure isolation.
//!
//! # Errors
//!
//! Every invocation returns an [`ExecuteResult`]; see [`ExecuteError`]
//! for the taxonomy. Type mismatches are per-call failures — the engine
//! never panics on a wrong argument type.

mod arg;
pub mod command;
mod error;
mod event;
mod shape;

pub use arg::ArgSpec;
pub use command::{
    CommandQualifiedRead, CommandRead, CommandVoid, CommandVoidReturn, CommandWrite,
    CommandWriteReturn,
};
pub use error::{ExecuteError, ExecuteResult};
pub use event::{ErasedVoidHandler, ErasedWriteHandler, EventVoid, EventWrite};
pub use shape::CommandShape;

#[cfg(test)]
mod tests {
    use super::*;
    use axon_types::QueueingPolicy;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// The §8 scenario in miniature: a component-owned value with one
    /// write and one read command, default value −1.
    #[test]
    fn write_then_read_round_trip() {
        let value = Arc::new(Mutex::new(-1i32));

        let v = Arc::clone(&value);
        let set = CommandWrite::new("SetValue", QueueingPolicy::default(), move |x: &i32| {
            *v.lock() = *x;
            Ok(())
        });
        let v = Arc::clone(&value);
        let get = CommandRead::new("GetValue", move || Ok(*v.lock()));

        assert_eq!(get.execute::<i32>().unwrap(), -1);
        set.execute(&42i32).unwrap();
        assert_eq!(get.execute::<i32>().unwrap(), 42);
    }

    #[test]
    fn state_change_event_fan_out() {
        use axon_types::ComponentState;

        let event = EventWrite::new::<ComponentState>("ChangeState");
        let observed = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&observed);
        event
            .subscribe("manager", move |s: &ComponentState| {
                o.lock().push(*s);
                Ok(())
            })
            .unwrap();

        event.fire(&ComponentState::Ready).unwrap();
        event.fire(&ComponentState::Active).unwrap();
        assert_eq!(
            *observed.lock(),
            vec![ComponentState::Ready, ComponentState::Active]
        );
    }
}
