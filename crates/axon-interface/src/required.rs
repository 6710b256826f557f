//! Required interfaces: function slots and event handlers.
//!
//! A required interface is the service-consuming side of a connection.
//! Before connection it is a declaration: named function slots (each a
//! cloneable handle the component's code calls through) and named event
//! handlers. At connection time the broker matches every slot against
//! the provider's command of the same name, shape, and argument/result
//! types, and binds it through that connection's end-user interface
//! copy.
//!
//! # All-or-Nothing Matching
//!
//! Slots declared [`Requirement::Required`] must all match or the bind
//! fails with no partial state; [`Requirement::Optional`] slots simply
//! stay unbound. Event handlers never block a bind — an unmatched
//! handler is logged and skipped.
//!
//! # Event Delivery
//!
//! By default handlers run inline on the *provider's* thread at fire
//! time. A required interface built with [`RequiredInterface::new_queued`]
//! instead owns an event mailbox: fire clones the payload into the
//! mailbox and the handler runs when the owning component drains it via
//! [`process_events`](RequiredInterface::process_events), keeping
//! handler execution on the subscriber's thread.

use crate::error::InterfaceError;
use crate::function::{
    FunctionQualifiedRead, FunctionRead, FunctionVoid, FunctionVoidReturn, FunctionWrite,
    FunctionWriteReturn,
};
use crate::mailbox::{Mailbox, QueuedCall};
use crate::provided::ProvidedInterface;
use axon_command::{
    ArgSpec, CommandShape, ErasedVoidHandler, ErasedWriteHandler, ExecuteError, ExecuteResult,
};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether a function slot must match at connection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requirement {
    /// The bind fails unless a same-named, same-shaped command exists.
    #[default]
    Required,
    /// The slot stays unbound if unmatched; calls then fail per-call.
    Optional,
}

/// Clones an event payload for mailbox delivery.
type PayloadCloner = Arc<dyn Fn(&dyn Any) -> Option<Box<dyn Any + Send>> + Send + Sync>;

struct WriteHandler {
    payload: ArgSpec,
    handler: ErasedWriteHandler,
    cloner: PayloadCloner,
}

/// A declared function slot with the prototypes it was declared for.
struct Declared<F> {
    function: F,
    requirement: Requirement,
    arg: Option<ArgSpec>,
    result: Option<ArgSpec>,
}

impl<F> Declared<F> {
    /// Declared prototypes match the command's, where declared.
    fn spec_ok(&self, arg: Option<ArgSpec>, result: Option<ArgSpec>) -> bool {
        fn ok(declared: Option<ArgSpec>, actual: Option<ArgSpec>) -> bool {
            match (declared, actual) {
                (Some(d), Some(a)) => d == a,
                _ => true,
            }
        }
        ok(self.arg, arg) && ok(self.result, result)
    }
}

#[derive(Default)]
struct Slots {
    void: HashMap<String, Declared<FunctionVoid>>,
    read: HashMap<String, Declared<FunctionRead>>,
    write: HashMap<String, Declared<FunctionWrite>>,
    qualified_read: HashMap<String, Declared<FunctionQualifiedRead>>,
    void_return: HashMap<String, Declared<FunctionVoidReturn>>,
    write_return: HashMap<String, Declared<FunctionWriteReturn>>,
    void_handlers: HashMap<String, ErasedVoidHandler>,
    write_handlers: HashMap<String, WriteHandler>,
}

struct Bound {
    user: String,
    provided: Arc<ProvidedInterface>,
}

/// The service-consuming side of a connection.
pub struct RequiredInterface {
    name: String,
    slots: Mutex<Slots>,
    bound: RwLock<Option<Bound>>,
    /// Present only for queued event delivery.
    event_mailbox: Option<Arc<Mailbox>>,
}

impl RequiredInterface {
    /// Creates an empty required interface with inline event delivery.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            slots: Mutex::new(Slots::default()),
            bound: RwLock::new(None),
            event_mailbox: None,
        })
    }

    /// Creates an empty required interface whose event handlers run on
    /// the subscriber's thread, via an event mailbox of `capacity`.
    #[must_use]
    pub fn new_queued(name: impl Into<String>, capacity: usize) -> Arc<Self> {
        let name = name.into();
        let mailbox = Arc::new(Mailbox::new(format!("{name}/events"), capacity));
        Arc::new(Self {
            name,
            slots: Mutex::new(Slots::default()),
            bound: RwLock::new(None),
            event_mailbox: Some(mailbox),
        })
    }

    /// Returns the interface's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` while connected to a provider.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.read().is_some()
    }

    /// Returns the end-user interface copy this side is bound to.
    #[must_use]
    pub fn bound_provider(&self) -> Option<Arc<ProvidedInterface>> {
        self.bound.read().as_ref().map(|b| Arc::clone(&b.provided))
    }

    /// Returns the event mailbox, if delivery is queued.
    #[must_use]
    pub fn event_mailbox(&self) -> Option<&Mailbox> {
        self.event_mailbox.as_deref()
    }

    fn ensure_unbound(&self) -> Result<(), InterfaceError> {
        if self.is_bound() {
            return Err(InterfaceError::AlreadyBound(self.name.clone()));
        }
        Ok(())
    }

    // === Declaration (before connection) ===

    fn declare<F: Clone>(
        &self,
        name: String,
        requirement: Requirement,
        arg: Option<ArgSpec>,
        result: Option<ArgSpec>,
        map: impl FnOnce(&mut Slots) -> &mut HashMap<String, Declared<F>>,
        make: impl FnOnce(String) -> F,
    ) -> Result<F, InterfaceError> {
        self.ensure_unbound()?;
        let mut slots = self.slots.lock();
        let map = map(&mut slots);
        if map.contains_key(&name) {
            return Err(InterfaceError::DuplicateFunction(name));
        }
        let function = make(name.clone());
        map.insert(
            name,
            Declared {
                function: function.clone(),
                requirement,
                arg,
                result,
            },
        );
        Ok(function)
    }

    /// Declares a void function slot and returns its handle.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate slot name within the void shape, or while
    /// bound.
    pub fn add_function_void(
        &self,
        command_name: impl Into<String>,
        requirement: Requirement,
    ) -> Result<FunctionVoid, InterfaceError> {
        self.declare(
            command_name.into(),
            requirement,
            None,
            None,
            |s| &mut s.void,
            FunctionVoid::new,
        )
    }

    /// Declares a read function slot for result type `R` and returns
    /// its handle.
    ///
    /// The declared type is enforced at connection time: a same-named
    /// read command with a different result type fails the match.
    pub fn add_function_read<R: Any + Send>(
        &self,
        command_name: impl Into<String>,
        requirement: Requirement,
    ) -> Result<FunctionRead, InterfaceError> {
        self.declare(
            command_name.into(),
            requirement,
            None,
            Some(ArgSpec::of::<R>()),
            |s| &mut s.read,
            FunctionRead::new,
        )
    }

    /// Declares a write function slot for argument type `T` and
    /// returns its handle.
    pub fn add_function_write<T: Any + Send>(
        &self,
        command_name: impl Into<String>,
        requirement: Requirement,
    ) -> Result<FunctionWrite, InterfaceError> {
        self.declare(
            command_name.into(),
            requirement,
            Some(ArgSpec::of::<T>()),
            None,
            |s| &mut s.write,
            FunctionWrite::new,
        )
    }

    /// Declares a qualified-read function slot for argument `T` and
    /// result `R`, and returns its handle.
    pub fn add_function_qualified_read<T: Any + Send, R: Any + Send>(
        &self,
        command_name: impl Into<String>,
        requirement: Requirement,
    ) -> Result<FunctionQualifiedRead, InterfaceError> {
        self.declare(
            command_name.into(),
            requirement,
            Some(ArgSpec::of::<T>()),
            Some(ArgSpec::of::<R>()),
            |s| &mut s.qualified_read,
            FunctionQualifiedRead::new,
        )
    }

    /// Declares a void-return function slot for result type `R` and
    /// returns its handle.
    pub fn add_function_void_return<R: Any + Send>(
        &self,
        command_name: impl Into<String>,
        requirement: Requirement,
    ) -> Result<FunctionVoidReturn, InterfaceError> {
        self.declare(
            command_name.into(),
            requirement,
            None,
            Some(ArgSpec::of::<R>()),
            |s| &mut s.void_return,
            FunctionVoidReturn::new,
        )
    }

    /// Declares a write-return function slot for argument `T` and
    /// result `R`, and returns its handle.
    pub fn add_function_write_return<T: Any + Send, R: Any + Send>(
        &self,
        command_name: impl Into<String>,
        requirement: Requirement,
    ) -> Result<FunctionWriteReturn, InterfaceError> {
        self.declare(
            command_name.into(),
            requirement,
            Some(ArgSpec::of::<T>()),
            Some(ArgSpec::of::<R>()),
            |s| &mut s.write_return,
            FunctionWriteReturn::new,
        )
    }

    /// Registers a handler for a void event.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate handler name, or while bound.
    pub fn add_handler_void(
        &self,
        event_name: impl Into<String>,
        handler: impl Fn() -> ExecuteResult + Send + Sync + 'static,
    ) -> Result<(), InterfaceError> {
        self.ensure_unbound()?;
        let name = event_name.into();
        let mut slots = self.slots.lock();
        if slots.void_handlers.contains_key(&name) {
            return Err(InterfaceError::DuplicateHandler(name));
        }
        slots.void_handlers.insert(name, Arc::new(handler));
        Ok(())
    }

    /// Registers a typed handler for a write event with payload `T`.
    ///
    /// `T: Clone` because queued delivery clones the payload into the
    /// event mailbox.
    pub fn add_handler_write<T: Any + Send + Clone>(
        &self,
        event_name: impl Into<String>,
        handler: impl Fn(&T) -> ExecuteResult + Send + Sync + 'static,
    ) -> Result<(), InterfaceError> {
        self.ensure_unbound()?;
        let name = event_name.into();
        let mut slots = self.slots.lock();
        if slots.write_handlers.contains_key(&name) {
            return Err(InterfaceError::DuplicateHandler(name));
        }
        let payload = ArgSpec::of::<T>();
        let erased: ErasedWriteHandler = Arc::new(move |any: &dyn Any| {
            let value = any
                .downcast_ref::<T>()
                .ok_or_else(|| ExecuteError::TypeMismatch {
                    expected: payload.type_name().to_string(),
                    found: "<erased>".to_string(),
                })?;
            handler(value)
        });
        let cloner: PayloadCloner = Arc::new(|any: &dyn Any| {
            any.downcast_ref::<T>()
                .map(|v| Box::new(v.clone()) as Box<dyn Any + Send>)
        });
        slots.write_handlers.insert(
            name,
            WriteHandler {
                payload,
                handler: erased,
                cloner,
            },
        );
        Ok(())
    }

    // === Connection protocol ===

    /// Returns the required function slots `provided` cannot satisfy.
    ///
    /// Empty means a bind would succeed. A slot matches only a command
    /// of the same name, shape, and declared argument/result types; an
    /// unmatched entry names the slot plus what was found instead (a
    /// different shape, a different prototype, or nothing).
    #[must_use]
    pub fn missing_requirements(&self, provided: &ProvidedInterface) -> Vec<String> {
        let slots = self.slots.lock();
        let mut missing = Vec::new();
        {
            let mut check = |requirement: Requirement, failure: Option<String>| {
                if requirement == Requirement::Required {
                    if let Some(failure) = failure {
                        missing.push(failure);
                    }
                }
            };

            for (name, slot) in &slots.void {
                let found = provided.find_command_void(name).map(|_| (None, None));
                check(
                    slot.requirement,
                    match_failure(provided, name, CommandShape::Void, slot, found),
                );
            }
            for (name, slot) in &slots.read {
                let found = provided
                    .find_command_read(name)
                    .map(|c| (None, Some(c.result_spec())));
                check(
                    slot.requirement,
                    match_failure(provided, name, CommandShape::Read, slot, found),
                );
            }
            for (name, slot) in &slots.write {
                let found = provided
                    .find_command_write(name)
                    .map(|c| (Some(c.arg_spec()), None));
                check(
                    slot.requirement,
                    match_failure(provided, name, CommandShape::Write, slot, found),
                );
            }
            for (name, slot) in &slots.qualified_read {
                let found = provided
                    .find_command_qualified_read(name)
                    .map(|c| (Some(c.arg_spec()), Some(c.result_spec())));
                check(
                    slot.requirement,
                    match_failure(provided, name, CommandShape::QualifiedRead, slot, found),
                );
            }
            for (name, slot) in &slots.void_return {
                let found = provided
                    .find_command_void_return(name)
                    .map(|c| (None, Some(c.result_spec())));
                check(
                    slot.requirement,
                    match_failure(provided, name, CommandShape::VoidReturn, slot, found),
                );
            }
            for (name, slot) in &slots.write_return {
                let found = provided
                    .find_command_write_return(name)
                    .map(|c| (Some(c.arg_spec()), Some(c.result_spec())));
                check(
                    slot.requirement,
                    match_failure(provided, name, CommandShape::WriteReturn, slot, found),
                );
            }
        }

        missing.sort();
        missing
    }

    /// Binds every slot to `provided` — this connection's end-user
    /// interface copy — and subscribes every event handler under
    /// `user`.
    ///
    /// All-or-nothing: on any failure nothing is bound or subscribed.
    ///
    /// # Errors
    ///
    /// [`InterfaceError::AlreadyBound`] if connected,
    /// [`InterfaceError::MissingCommand`] naming the unmatched required
    /// slots.
    pub fn bind(
        &self,
        user: impl Into<String>,
        provided: &Arc<ProvidedInterface>,
    ) -> Result<(), InterfaceError> {
        let user = user.into();
        let mut bound = self.bound.write();
        if bound.is_some() {
            return Err(InterfaceError::AlreadyBound(self.name.clone()));
        }

        let missing = self.missing_requirements(provided);
        if !missing.is_empty() {
            return Err(InterfaceError::MissingCommand(missing.join(", ")));
        }

        let slots = self.slots.lock();
        for (name, slot) in &slots.void {
            match provided.find_command_void(name) {
                Some(command) => slot.function.bind(Arc::clone(provided), command),
                None => log_optional_unmatched(&self.name, name, slot.requirement),
            }
        }
        for (name, slot) in &slots.read {
            match provided.find_command_read(name) {
                Some(command) if slot.spec_ok(None, Some(command.result_spec())) => {
                    slot.function.bind(Arc::clone(provided), command);
                }
                _ => log_optional_unmatched(&self.name, name, slot.requirement),
            }
        }
        for (name, slot) in &slots.write {
            match provided.find_command_write(name) {
                Some(command) if slot.spec_ok(Some(command.arg_spec()), None) => {
                    slot.function.bind(Arc::clone(provided), command);
                }
                _ => log_optional_unmatched(&self.name, name, slot.requirement),
            }
        }
        for (name, slot) in &slots.qualified_read {
            match provided.find_command_qualified_read(name) {
                Some(command)
                    if slot.spec_ok(Some(command.arg_spec()), Some(command.result_spec())) =>
                {
                    slot.function.bind(Arc::clone(provided), command);
                }
                _ => log_optional_unmatched(&self.name, name, slot.requirement),
            }
        }
        for (name, slot) in &slots.void_return {
            match provided.find_command_void_return(name) {
                Some(command) if slot.spec_ok(None, Some(command.result_spec())) => {
                    slot.function.bind(Arc::clone(provided), command);
                }
                _ => log_optional_unmatched(&self.name, name, slot.requirement),
            }
        }
        for (name, slot) in &slots.write_return {
            match provided.find_command_write_return(name) {
                Some(command)
                    if slot.spec_ok(Some(command.arg_spec()), Some(command.result_spec())) =>
                {
                    slot.function.bind(Arc::clone(provided), command);
                }
                _ => log_optional_unmatched(&self.name, name, slot.requirement),
            }
        }

        for (name, handler) in &slots.void_handlers {
            let Some(event) = provided.find_event_void(name) else {
                warn!(interface = %self.name, event = %name, "no matching void event for handler");
                continue;
            };
            match &self.event_mailbox {
                Some(mailbox) => {
                    let mailbox = Arc::clone(mailbox);
                    let inner = Arc::clone(handler);
                    let event_name = name.clone();
                    event.subscribe(user.clone(), move || {
                        mailbox.enqueue(QueuedCall::EventVoid {
                            name: event_name.clone(),
                            handler: Arc::clone(&inner),
                        })
                    });
                }
                None => {
                    let inner = Arc::clone(handler);
                    event.subscribe(user.clone(), move || inner());
                }
            }
        }
        for (name, entry) in &slots.write_handlers {
            let Some(event) = provided.find_event_write(name) else {
                warn!(interface = %self.name, event = %name, "no matching write event for handler");
                continue;
            };
            if event.payload_spec() != entry.payload {
                warn!(
                    interface = %self.name,
                    event = %name,
                    expected = event.payload_spec().type_name(),
                    found = entry.payload.type_name(),
                    "event handler payload type mismatch, not subscribed"
                );
                continue;
            }
            match &self.event_mailbox {
                Some(mailbox) => {
                    let mailbox = Arc::clone(mailbox);
                    let inner = Arc::clone(&entry.handler);
                    let cloner = Arc::clone(&entry.cloner);
                    let event_name = name.clone();
                    let expected = entry.payload;
                    event.subscribe_erased(
                        user.clone(),
                        Arc::new(move |any: &dyn Any| {
                            let payload =
                                cloner(any).ok_or_else(|| ExecuteError::TypeMismatch {
                                    expected: expected.type_name().to_string(),
                                    found: "<erased>".to_string(),
                                })?;
                            mailbox.enqueue(QueuedCall::Event {
                                name: event_name.clone(),
                                handler: Arc::clone(&inner),
                                payload,
                            })
                        }),
                    );
                }
                None => {
                    event.subscribe_erased(user.clone(), Arc::clone(&entry.handler));
                }
            }
        }

        debug!(interface = %self.name, user = %user, provider = provided.name(), "bound");
        *bound = Some(Bound {
            user,
            provided: Arc::clone(provided),
        });
        Ok(())
    }

    /// Unbinds every slot and unsubscribes every handler.
    ///
    /// Pending queued events are discarded. Idempotent; returns `true`
    /// if a binding was torn down.
    pub fn unbind(&self) -> bool {
        let Some(Bound { user, provided }) = self.bound.write().take() else {
            return false;
        };

        let slots = self.slots.lock();
        for slot in slots.void.values() {
            slot.function.unbind();
        }
        for slot in slots.read.values() {
            slot.function.unbind();
        }
        for slot in slots.write.values() {
            slot.function.unbind();
        }
        for slot in slots.qualified_read.values() {
            slot.function.unbind();
        }
        for slot in slots.void_return.values() {
            slot.function.unbind();
        }
        for slot in slots.write_return.values() {
            slot.function.unbind();
        }
        drop(slots);

        provided.unsubscribe_all(&user);
        if let Some(mailbox) = &self.event_mailbox {
            mailbox.flush_terminated();
        }
        debug!(interface = %self.name, user = %user, provider = provided.name(), "unbound");
        true
    }

    /// Drains the event mailbox, running each queued handler.
    ///
    /// Returns the number of events delivered; zero (and a no-op) for
    /// inline-delivery interfaces.
    pub fn process_events(&self) -> usize {
        self.event_mailbox
            .as_ref()
            .map_or(0, |mailbox| mailbox.process_all())
    }
}

fn log_optional_unmatched(interface: &str, slot: &str, requirement: Requirement) {
    debug_assert_eq!(requirement, Requirement::Optional);
    debug!(interface = %interface, slot = %slot, "optional function left unbound");
}

/// Why `name` cannot bind to `provided`, or `None` if it can.
///
/// `found` is the command's (argument, result) prototypes when a
/// same-named, same-shaped command exists.
fn match_failure<F>(
    provided: &ProvidedInterface,
    name: &str,
    shape: CommandShape,
    slot: &Declared<F>,
    found: Option<(Option<ArgSpec>, Option<ArgSpec>)>,
) -> Option<String> {
    let Some((arg, result)) = found else {
        return Some(match provided.command_shape(name) {
            Some(other) => format!("{name} (shape {other}, declared {shape})"),
            None => name.to_string(),
        });
    };
    if let (Some(declared), Some(actual)) = (slot.arg, arg) {
        if declared != actual {
            return Some(format!(
                "{name} (argument {}, declared {})",
                actual.type_name(),
                declared.type_name()
            ));
        }
    }
    if let (Some(declared), Some(actual)) = (slot.result, result) {
        if declared != actual {
            return Some(format!(
                "{name} (result {}, declared {})",
                actual.type_name(),
                declared.type_name()
            ));
        }
    }
    None
}

impl std::fmt::Debug for RequiredInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequiredInterface")
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .field("queued_events", &self.event_mailbox.is_some())
            .finish_non_exhaustive()
    }
}
