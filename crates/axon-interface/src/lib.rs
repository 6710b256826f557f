//! Interface plumbing for AXON: mailboxes, provided/required
//! interfaces, function handles, and the end-user interface factory.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  axon-types     : states, policies, ErrorCode                │
//! │  axon-command   : Callable, Command shapes, events           │
//! │  axon-interface : Mailbox, Provided/Required      ◄── HERE   │
//! │  axon-runtime   : Component lifecycle, registry, run loop    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # The connection picture
//!
//! ```text
//!  client component                    server component
//!  ┌──────────────────┐               ┌────────────────────────┐
//!  │ RequiredInterface │   connect    │ ProvidedInterface      │
//!  │  FunctionWrite ───┼──────────────┼─► end-user copy "cli"  │
//!  │  FunctionRead  ───┼──────────────┼─►   ├─ Mailbox (SPSC)  │
//!  │  event handlers ◄─┼──────────────┼──   └─ shared cmd maps │
//!  └──────────────────┘               └────────────────────────┘
//! ```
//!
//! The provided side owns the canonical command and event maps; each
//! connection gets a private end-user copy with its own mailbox, so
//! every queue stays single-producer/single-consumer. The required side
//! declares function slots and event handlers, which the connection
//! broker binds all-or-nothing at connect time.
//!
//! # Example
//!
//! ```
//! use axon_interface::{ProvidedInterface, RequiredInterface, Requirement};
//! use axon_types::{InterfacePolicy, QueueingPolicy};
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//!
//! // Server side: one write command over a queueing interface.
//! let value = Arc::new(Mutex::new(0i32));
//! let provided = ProvidedInterface::new("Robot", InterfacePolicy::QueueCommands);
//! let v = Arc::clone(&value);
//! provided
//!     .add_command_write("SetValue", QueueingPolicy::default(), move |x: &i32| {
//!         *v.lock() = *x;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! // Client side: a matching function slot, bound through a copy.
//! let required = RequiredInterface::new("RobotClient");
//! let set = required
//!     .add_function_write::<i32>("SetValue", Requirement::Required)
//!     .unwrap();
//! let copy = provided.get_end_user_interface("RobotClient").unwrap();
//! required.bind("RobotClient", &copy).unwrap();
//!
//! set.execute(&42i32).unwrap();     // queued, not yet applied
//! assert_eq!(*value.lock(), 0);
//! copy.process_mailbox();           // the server's run loop does this
//! assert_eq!(*value.lock(), 42);
//! ```

mod error;
mod function;
mod mailbox;
mod provided;
mod required;

pub use error::InterfaceError;
pub use function::{
    FunctionQualifiedRead, FunctionRead, FunctionVoid, FunctionVoidReturn, FunctionWrite,
    FunctionWriteReturn,
};
pub use mailbox::{CompletionSender, Mailbox, QueueSizes, QueuedCall, ReturnSender};
pub use provided::{ProvidedInterface, StateProbe};
pub use required::{Requirement, RequiredInterface};
