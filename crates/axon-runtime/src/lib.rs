//! Component runtime for AXON: lifecycle, run loops, and the
//! connection registry.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  axon-types     : states, policies, ErrorCode                │
//! │  axon-command   : Callable, Command shapes, events           │
//! │  axon-interface : Mailbox, Provided/Required interfaces      │
//! │  axon-runtime   : Component lifecycle, registry    ◄── HERE  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! A server task offering a value, a client driving it through the
//! registry:
//!
//! ```
//! use axon_runtime::{Behavior, Component, ComponentRegistry, NullBehavior};
//! use axon_interface::Requirement;
//! use axon_types::{ComponentState, InterfacePolicy, QueueingPolicy};
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let registry = ComponentRegistry::new();
//!
//! // Server: one queueing interface with a write and a read command.
//! let value = Arc::new(Mutex::new(-1i32));
//! let server = Component::task("robot", NullBehavior);
//! let ctl = server
//!     .add_provided_interface("ctl", InterfacePolicy::QueueCommands)
//!     .unwrap();
//! let v = Arc::clone(&value);
//! ctl.add_command_write("SetValue", QueueingPolicy::default(), move |x: &i32| {
//!     *v.lock() = *x;
//!     Ok(())
//! })
//! .unwrap();
//! let v = Arc::clone(&value);
//! ctl.add_command_read("GetValue", move || Ok(*v.lock())).unwrap();
//!
//! // Client: matching function slots.
//! let client = Component::device("operator", NullBehavior);
//! let robot = client.add_required_interface("robot").unwrap();
//! let set = robot.add_function_write::<i32>("SetValue", Requirement::Required).unwrap();
//! let get = robot.add_function_read::<i32>("GetValue", Requirement::Required).unwrap();
//!
//! registry.add_component(Arc::clone(&server)).unwrap();
//! registry.add_component(Arc::clone(&client)).unwrap();
//! registry.connect("operator", "robot", "robot", "ctl").unwrap();
//!
//! registry.create_all().unwrap();
//! registry.start_all().unwrap();
//! assert!(server.wait_for_state(ComponentState::Active, Duration::from_secs(1)));
//!
//! set.execute_blocking(&42i32).unwrap();
//! assert_eq!(get.execute::<i32>().unwrap(), 42);
//!
//! registry.kill_all();
//! ```

mod behavior;
mod component;
mod error;
mod registry;

pub use behavior::{Behavior, NullBehavior};
pub use component::{
    Component, ComponentKind, CHANGE_STATE_EVENT, GET_STATE_COMMAND, LIFECYCLE_INTERFACE,
};
pub use error::{ConnectError, LifecycleError};
pub use registry::ComponentRegistry;
