//! Typed, named command objects.
//!
//! A command wraps a callable — in Rust terms a closure, usually one
//! capturing an `Arc` of the owning component's state — together with a
//! name, a queueing policy, and argument/result prototypes used for type
//! checking. Commands are created once at interface-population time and
//! live as long as their owning provided interface.
//!
//! # Shapes
//!
//! | Type | Argument | Result |
//! |------|----------|--------|
//! | [`CommandVoid`] | – | – |
//! | [`CommandRead`] | – | one |
//! | [`CommandWrite`] | one | – |
//! | [`CommandQualifiedRead`] | one | one |
//! | [`CommandVoidReturn`] | – | one |
//! | [`CommandWriteReturn`] | one | one |
//!
//! Filtered writes — a qualified-read filter immediately followed by a
//! write on the filter's output — are built with
//! [`CommandWrite::filtered`] and stored under the write shape.
//!
//! # Example
//!
//! ```
//! use axon_command::{CommandWrite, CommandRead};
//! use axon_types::QueueingPolicy;
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//!
//! let value = Arc::new(Mutex::new(-1i32));
//!
//! let v = Arc::clone(&value);
//! let set = CommandWrite::new("SetValue", QueueingPolicy::default(), move |x: &i32| {
//!     *v.lock() = *x;
//!     Ok(())
//! });
//!
//! let v = Arc::clone(&value);
//! let get = CommandRead::new("GetValue", move || Ok(*v.lock()));
//!
//! set.execute(&42i32).unwrap();
//! assert_eq!(get.execute::<i32>().unwrap(), 42);
//!
//! // A wrong argument type is a per-call failure, not a crash.
//! assert!(set.execute(&1.0f64).is_err());
//! ```

mod qualified_read;
mod read;
mod returning;
mod void;
mod write;

pub use qualified_read::CommandQualifiedRead;
pub use read::CommandRead;
pub use returning::{CommandVoidReturn, CommandWriteReturn};
pub use void::CommandVoid;
pub use write::CommandWrite;
