//! The component registry and connection broker.
//!
//! A [`ComponentRegistry`] owns the process's components by name and
//! brokers connections between their interfaces. It is an explicit
//! value — embedding code creates one and passes it around (typically
//! as `Arc<ComponentRegistry>`); nothing here is a process singleton.
//!
//! # Connect protocol
//!
//! `connect(client, required, server, provided)`:
//!
//! 1. Resolve both components and both interfaces.
//! 2. Match every required function slot against the provider's
//!    canonical maps — all-or-nothing, by name, shape, and declared
//!    argument/result types.
//! 3. Obtain the client's end-user interface copy from the provider's
//!    factory (a fresh mailbox per connection).
//! 4. Bind slots and subscribe event handlers, then record the
//!    connection under a fresh [`ConnectionId`].
//!
//! Any failure leaves every interface exactly as it was. Connect and
//! disconnect serialize against each other on the registry's
//! interface-lifecycle lock, never against command execution.

use crate::component::Component;
use crate::error::{ConnectError, LifecycleError};
use axon_interface::InterfaceError;
use axon_types::ConnectionId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

struct Connection {
    client: String,
    required: String,
    server: String,
    provided: String,
    /// End-user name registered with the provider's factory.
    user: String,
}

/// Process-wide component registry and connection broker.
#[derive(Default)]
pub struct ComponentRegistry {
    components: RwLock<HashMap<String, Arc<Component>>>,
    /// Interface-lifecycle lock: serializes connect/disconnect and
    /// guards the connection table.
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a component under its name.
    ///
    /// # Errors
    ///
    /// Fails [`ConnectError::DuplicateComponent`] if the name is taken.
    pub fn add_component(&self, component: Arc<Component>) -> Result<(), ConnectError> {
        let name = component.name().to_string();
        let mut components = self.components.write();
        if components.contains_key(&name) {
            return Err(ConnectError::DuplicateComponent(name));
        }
        info!(component = %name, "registered");
        components.insert(name, component);
        Ok(())
    }

    /// Removes a component, disconnecting anything attached to it
    /// first.
    ///
    /// # Errors
    ///
    /// Fails [`ConnectError::ComponentNotFound`] if no such component
    /// is registered.
    pub fn remove_component(&self, name: &str) -> Result<Arc<Component>, ConnectError> {
        let involved: Vec<ConnectionId> = {
            let connections = self.connections.lock();
            connections
                .iter()
                .filter(|(_, c)| c.client == name || c.server == name)
                .map(|(id, _)| *id)
                .collect()
        };
        for id in involved {
            if let Err(err) = self.disconnect_id(id) {
                warn!(component = %name, connection = %id, %err, "disconnect during removal failed");
            }
        }

        let removed = self
            .components
            .write()
            .remove(name)
            .ok_or_else(|| ConnectError::ComponentNotFound(name.to_string()))?;
        info!(component = %name, "removed");
        Ok(removed)
    }

    /// Looks up a component by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<Arc<Component>> {
        self.components.read().get(name).cloned()
    }

    /// Returns the number of recorded connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Connects `client`'s required interface to `server`'s provided
    /// interface. All-or-nothing; see the module docs for the protocol.
    ///
    /// # Errors
    ///
    /// [`ConnectError::ComponentNotFound`],
    /// [`ConnectError::InterfaceNotFound`],
    /// [`ConnectError::IncompatibleInterfaces`] naming every unmatched
    /// required slot, or [`ConnectError::AlreadyConnected`].
    pub fn connect(
        &self,
        client: &str,
        required_name: &str,
        server: &str,
        provided_name: &str,
    ) -> Result<ConnectionId, ConnectError> {
        let client_component = self
            .component(client)
            .ok_or_else(|| ConnectError::ComponentNotFound(client.to_string()))?;
        let server_component = self
            .component(server)
            .ok_or_else(|| ConnectError::ComponentNotFound(server.to_string()))?;
        let required = client_component
            .required_interface(required_name)
            .ok_or_else(|| {
                ConnectError::InterfaceNotFound(format!("{client}:{required_name}"))
            })?;
        let provided = server_component
            .provided_interface(provided_name)
            .ok_or_else(|| {
                ConnectError::InterfaceNotFound(format!("{server}:{provided_name}"))
            })?;

        let mut connections = self.connections.lock();
        if required.is_bound() {
            return Err(ConnectError::AlreadyConnected(format!(
                "{client}:{required_name}"
            )));
        }

        // Match before touching the factory so a failed connect leaves
        // no end-user copy behind.
        let missing = required.missing_requirements(&provided);
        if !missing.is_empty() {
            return Err(ConnectError::IncompatibleInterfaces(missing.join(", ")));
        }

        let user = format!("{client}:{required_name}");
        let copy = provided
            .get_end_user_interface(user.clone())
            .map_err(|err| ConnectError::IncompatibleInterfaces(err.to_string()))?;
        match required.bind(user.clone(), &copy) {
            Ok(()) => {}
            Err(InterfaceError::AlreadyBound(name)) => {
                return Err(ConnectError::AlreadyConnected(name));
            }
            Err(err) => {
                // Roll the fresh copy back before reporting.
                if let Err(remove_err) = provided.remove_end_user_interface(&user) {
                    warn!(%user, %remove_err, "rollback of end-user copy failed");
                }
                return Err(ConnectError::IncompatibleInterfaces(err.to_string()));
            }
        }

        let id = ConnectionId::new();
        connections.insert(
            id,
            Connection {
                client: client.to_string(),
                required: required_name.to_string(),
                server: server.to_string(),
                provided: provided_name.to_string(),
                user,
            },
        );
        info!(
            connection = %id,
            client = %client,
            required = %required_name,
            server = %server,
            provided = %provided_name,
            "connected"
        );
        Ok(id)
    }

    /// Disconnects a previously recorded connection by its endpoints.
    ///
    /// Function slots become unavailable (calls fail per-call, nothing
    /// dangles), event subscriptions are removed, and the provider's
    /// end-user copy is destroyed.
    ///
    /// # Errors
    ///
    /// Fails [`ConnectError::NotConnected`] if no such connection
    /// exists.
    pub fn disconnect(
        &self,
        client: &str,
        required_name: &str,
        server: &str,
        provided_name: &str,
    ) -> Result<(), ConnectError> {
        let id = {
            let connections = self.connections.lock();
            connections
                .iter()
                .find(|(_, c)| {
                    c.client == client
                        && c.required == required_name
                        && c.server == server
                        && c.provided == provided_name
                })
                .map(|(id, _)| *id)
        }
        .ok_or_else(|| {
            ConnectError::NotConnected(format!(
                "{client}:{required_name} -> {server}:{provided_name}"
            ))
        })?;
        self.disconnect_id(id)
    }

    /// Disconnects a previously recorded connection by id.
    ///
    /// # Errors
    ///
    /// Fails [`ConnectError::NotConnected`] for an unknown id.
    pub fn disconnect_id(&self, id: ConnectionId) -> Result<(), ConnectError> {
        let mut connections = self.connections.lock();
        let connection = connections
            .remove(&id)
            .ok_or_else(|| ConnectError::NotConnected(id.to_string()))?;

        if let Some(client) = self.component(&connection.client) {
            if let Some(required) = client.required_interface(&connection.required) {
                required.unbind();
            }
        }
        if let Some(server) = self.component(&connection.server) {
            if let Some(provided) = server.provided_interface(&connection.provided) {
                // No producer remains after unbind, so the copy can only
                // drain. A busy copy means the server is mid-drain; that
                // pass finishes, so retry until the factory lets go.
                loop {
                    provided.flush_terminated();
                    match provided.remove_end_user_interface(&connection.user) {
                        Ok(()) => break,
                        Err(InterfaceError::CopyBusy(_)) => std::thread::yield_now(),
                        Err(err) => {
                            warn!(connection = %id, %err, "end-user copy not removed");
                            break;
                        }
                    }
                }
            }
        }
        info!(
            connection = %id,
            client = %connection.client,
            server = %connection.server,
            "disconnected"
        );
        Ok(())
    }

    // === Bulk lifecycle conveniences ===

    /// Calls `create()` on every registered component.
    ///
    /// # Errors
    ///
    /// Stops at the first failure.
    pub fn create_all(&self) -> Result<(), LifecycleError> {
        for component in self.snapshot() {
            component.create()?;
        }
        Ok(())
    }

    /// Calls `start()` on every registered component.
    ///
    /// # Errors
    ///
    /// Stops at the first failure.
    pub fn start_all(&self) -> Result<(), LifecycleError> {
        for component in self.snapshot() {
            component.start()?;
        }
        Ok(())
    }

    /// Kills every registered component. Infallible; kill is idempotent
    /// per component.
    pub fn kill_all(&self) {
        for component in self.snapshot() {
            component.kill();
        }
    }

    fn snapshot(&self) -> Vec<Arc<Component>> {
        self.components.read().values().cloned().collect()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.components.read().len())
            .field("connections", &self.connection_count())
            .finish()
    }
}
