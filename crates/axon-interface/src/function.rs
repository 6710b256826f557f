//! Client-side function handles.
//!
//! A function is the required interface's stand-in for a command it
//! expects the remote side to provide. Component code holds the handle;
//! at connection time the broker binds it to the same-named, same-shaped
//! command in the provider's map (through that connection's end-user
//! interface copy), and at disconnection it is unbound again.
//!
//! Handles are cheap to clone and safe to call from any thread. Calling
//! an unbound handle fails with
//! [`InterfaceDisabled`](ExecuteError::InterfaceDisabled) — never a
//! panic — so component code can run before its connections exist.
//!
//! | Handle | Bound shape | Queued path |
//! |--------|-------------|-------------|
//! | [`FunctionVoid`] | void | yes, optional blocking |
//! | [`FunctionRead`] | read | no, always inline |
//! | [`FunctionWrite`] | write | yes, optional blocking |
//! | [`FunctionQualifiedRead`] | qualified read | no, always inline |
//! | [`FunctionVoidReturn`] | void return | yes, always blocking |
//! | [`FunctionWriteReturn`] | write return | yes, always blocking |

use crate::provided::ProvidedInterface;
use axon_command::{
    CommandQualifiedRead, CommandRead, CommandVoid, CommandVoidReturn, CommandWrite,
    CommandWriteReturn, ExecuteError, ExecuteResult,
};
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;

struct Binding<C> {
    interface: Arc<ProvidedInterface>,
    command: Arc<C>,
}

impl<C> Clone for Binding<C> {
    fn clone(&self) -> Self {
        Self {
            interface: Arc::clone(&self.interface),
            command: Arc::clone(&self.command),
        }
    }
}

struct Slot<C> {
    name: String,
    binding: RwLock<Option<Binding<C>>>,
}

impl<C> Slot<C> {
    fn new(name: String) -> Arc<Self> {
        Arc::new(Self {
            name,
            binding: RwLock::new(None),
        })
    }

    fn bind(&self, interface: Arc<ProvidedInterface>, command: Arc<C>) {
        *self.binding.write() = Some(Binding { interface, command });
    }

    fn unbind(&self) {
        *self.binding.write() = None;
    }

    fn is_bound(&self) -> bool {
        self.binding.read().is_some()
    }

    fn get(&self) -> ExecuteResult<Binding<C>> {
        self.binding
            .read()
            .clone()
            .ok_or(ExecuteError::InterfaceDisabled)
    }
}

macro_rules! handle_common {
    ($handle:ident, $command:ty) => {
        impl $handle {
            pub(crate) fn new(name: impl Into<String>) -> Self {
                Self {
                    slot: Slot::new(name.into()),
                }
            }

            pub(crate) fn bind(&self, interface: Arc<ProvidedInterface>, command: Arc<$command>) {
                self.slot.bind(interface, command);
            }

            pub(crate) fn unbind(&self) {
                self.slot.unbind();
            }

            /// Returns the command name this handle binds to.
            #[must_use]
            pub fn name(&self) -> &str {
                &self.slot.name
            }

            /// Returns `true` while a connection binds this handle.
            #[must_use]
            pub fn is_bound(&self) -> bool {
                self.slot.is_bound()
            }
        }

        impl std::fmt::Debug for $handle {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($handle))
                    .field("name", &self.slot.name)
                    .field("bound", &self.is_bound())
                    .finish()
            }
        }
    };
}

/// Handle for a void command.
#[derive(Clone)]
pub struct FunctionVoid {
    slot: Arc<Slot<CommandVoid>>,
}

handle_common!(FunctionVoid, CommandVoid);

impl FunctionVoid {
    /// Invokes the bound command, non-blocking.
    ///
    /// Under a queueing interface this enqueues and returns once the
    /// call is accepted; `Ok` means *queued*, not *executed*.
    pub fn execute(&self) -> ExecuteResult {
        let b = self.slot.get()?;
        b.interface.call_void(&b.command, false)
    }

    /// Invokes the bound command and waits for it to execute.
    pub fn execute_blocking(&self) -> ExecuteResult {
        let b = self.slot.get()?;
        b.interface.call_void(&b.command, true)
    }
}

/// Handle for a read command. Reads never queue.
#[derive(Clone)]
pub struct FunctionRead {
    slot: Arc<Slot<CommandRead>>,
}

handle_common!(FunctionRead, CommandRead);

impl FunctionRead {
    /// Reads the provider's current value, inline on the calling
    /// thread.
    pub fn execute<R: Any + Send>(&self) -> ExecuteResult<R> {
        let b = self.slot.get()?;
        if !b.interface.accepts_commands() {
            return Err(ExecuteError::InterfaceDisabled);
        }
        b.command.execute::<R>()
    }
}

/// Handle for a write command.
#[derive(Clone)]
pub struct FunctionWrite {
    slot: Arc<Slot<CommandWrite>>,
}

handle_common!(FunctionWrite, CommandWrite);

impl FunctionWrite {
    /// Invokes the bound command with `arg`, non-blocking.
    ///
    /// Under a queueing interface the argument is cloned into the
    /// mailbox envelope; `Ok` means *queued*, not *executed*.
    pub fn execute<T: Any + Send + Clone>(&self, arg: &T) -> ExecuteResult {
        let b = self.slot.get()?;
        b.interface.call_write(&b.command, arg, false)
    }

    /// Invokes the bound command with `arg` and waits for it to
    /// execute.
    pub fn execute_blocking<T: Any + Send + Clone>(&self, arg: &T) -> ExecuteResult {
        let b = self.slot.get()?;
        b.interface.call_write(&b.command, arg, true)
    }
}

/// Handle for a qualified-read command. Never queues.
#[derive(Clone)]
pub struct FunctionQualifiedRead {
    slot: Arc<Slot<CommandQualifiedRead>>,
}

handle_common!(FunctionQualifiedRead, CommandQualifiedRead);

impl FunctionQualifiedRead {
    /// Runs the provider's query inline with `arg`.
    pub fn execute<T: Any + Send, R: Any + Send>(&self, arg: &T) -> ExecuteResult<R> {
        let b = self.slot.get()?;
        if !b.interface.accepts_commands() {
            return Err(ExecuteError::InterfaceDisabled);
        }
        b.command.execute::<T, R>(arg)
    }
}

/// Handle for a void-return command. Always blocks through the queue.
#[derive(Clone)]
pub struct FunctionVoidReturn {
    slot: Arc<Slot<CommandVoidReturn>>,
}

handle_common!(FunctionVoidReturn, CommandVoidReturn);

impl FunctionVoidReturn {
    /// Invokes the bound command and waits for its result.
    pub fn execute<R: Any + Send>(&self) -> ExecuteResult<R> {
        let b = self.slot.get()?;
        b.interface.call_void_return::<R>(&b.command)
    }
}

/// Handle for a write-return command. Always blocks through the queue.
#[derive(Clone)]
pub struct FunctionWriteReturn {
    slot: Arc<Slot<CommandWriteReturn>>,
}

handle_common!(FunctionWriteReturn, CommandWriteReturn);

impl FunctionWriteReturn {
    /// Invokes the bound command with `arg` and waits for its result.
    pub fn execute<T: Any + Send + Clone, R: Any + Send>(&self, arg: &T) -> ExecuteResult<R> {
        let b = self.slot.get()?;
        b.interface.call_write_return::<T, R>(&b.command, arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_types::{InterfacePolicy, QueueingPolicy};

    #[test]
    fn unbound_handle_fails_without_panicking() {
        let f = FunctionVoid::new("Start");
        assert!(!f.is_bound());
        assert_eq!(f.execute(), Err(ExecuteError::InterfaceDisabled));
    }

    #[test]
    fn clones_share_one_binding() {
        let interface = ProvidedInterface::new("p", InterfacePolicy::DoNotQueueCommands);
        let command = interface
            .add_command_void("Start", QueueingPolicy::default(), || Ok(()))
            .unwrap();

        let f = FunctionVoid::new("Start");
        let clone = f.clone();
        f.bind(Arc::clone(&interface), command);

        assert!(clone.is_bound());
        assert!(clone.execute().is_ok());

        clone.unbind();
        assert!(!f.is_bound());
    }

    #[test]
    fn read_handle_returns_typed_value() {
        let interface = ProvidedInterface::new("p", InterfacePolicy::DoNotQueueCommands);
        let command = interface.add_command_read("GetValue", || Ok(7i32)).unwrap();

        let f = FunctionRead::new("GetValue");
        f.bind(interface, command);
        assert_eq!(f.execute::<i32>().unwrap(), 7);
        assert!(f.execute::<String>().is_err());
    }

    #[test]
    fn qualified_read_runs_inline() {
        let interface = ProvidedInterface::new("p", InterfacePolicy::QueueCommands);
        let command = interface
            .add_command_qualified_read("Double", |v: &i32| Ok(v * 2))
            .unwrap();

        let copy = interface.get_end_user_interface("client").unwrap();
        let f = FunctionQualifiedRead::new("Double");
        f.bind(copy, command);

        // No drain needed: qualified reads bypass the mailbox.
        assert_eq!(f.execute::<i32, i32>(&21).unwrap(), 42);
    }
}
