//! End-to-end connection tests: two components wired through the
//! registry, commands queued across threads, events fanned out.

use axon_interface::Requirement;
use axon_runtime::{Component, ComponentRegistry, ConnectError, NullBehavior};
use axon_types::{ComponentState, InterfacePolicy, QueueingPolicy};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Server task with a value behind one queueing interface.
fn value_server(name: &str) -> (Arc<Component>, Arc<Mutex<i32>>) {
    let value = Arc::new(Mutex::new(-1i32));
    let server = Component::task(name, NullBehavior);
    let ctl = server
        .add_provided_interface("ctl", InterfacePolicy::QueueCommands)
        .unwrap();

    let v = Arc::clone(&value);
    ctl.add_command_write("SetValue", QueueingPolicy::default(), move |x: &i32| {
        *v.lock() = *x;
        Ok(())
    })
    .unwrap();
    let v = Arc::clone(&value);
    ctl.add_command_read("GetValue", move || Ok(*v.lock()))
        .unwrap();

    (server, value)
}

#[test]
fn write_then_read_across_components() {
    let registry = ComponentRegistry::new();
    let (server, _) = value_server("robot");

    let client = Component::device("operator", NullBehavior);
    let robot = client.add_required_interface("robot").unwrap();
    let set = robot
        .add_function_write::<i32>("SetValue", Requirement::Required)
        .unwrap();
    let get = robot
        .add_function_read::<i32>("GetValue", Requirement::Required)
        .unwrap();

    registry.add_component(Arc::clone(&server)).unwrap();
    registry.add_component(Arc::clone(&client)).unwrap();

    // Commands are rejected until the server reaches Ready.
    registry
        .connect("operator", "robot", "robot", "ctl")
        .unwrap();
    assert!(set.execute(&1i32).is_err());

    registry.create_all().unwrap();
    registry.start_all().unwrap();
    assert!(server.wait_for_state(ComponentState::Active, Duration::from_secs(1)));

    // Default value first, then a blocking write, then read it back.
    assert_eq!(get.execute::<i32>().unwrap(), -1);
    set.execute_blocking(&42i32).unwrap();
    assert_eq!(get.execute::<i32>().unwrap(), 42);

    registry.kill_all();
}

#[test]
fn queued_writes_execute_in_fifo_order() {
    let registry = ComponentRegistry::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let server = Component::task("server", NullBehavior);
    let ctl = server
        .add_provided_interface("ctl", InterfacePolicy::QueueCommands)
        .unwrap();
    let o = Arc::clone(&order);
    ctl.add_command_write("Push", QueueingPolicy::default(), move |x: &i32| {
        o.lock().push(*x);
        Ok(())
    })
    .unwrap();

    let client = Component::device("client", NullBehavior);
    let required = client.add_required_interface("ctl").unwrap();
    let push = required
        .add_function_write::<i32>("Push", Requirement::Required)
        .unwrap();

    registry.add_component(Arc::clone(&server)).unwrap();
    registry.add_component(Arc::clone(&client)).unwrap();
    registry.connect("client", "ctl", "server", "ctl").unwrap();
    registry.create_all().unwrap();

    // Queue a burst before the consumer thread exists, then start it.
    for i in 0..10 {
        push.execute(&i).unwrap();
    }
    registry.start_all().unwrap();
    // The final blocking write fences all earlier non-blocking ones.
    push.execute_blocking(&10i32).unwrap();

    assert_eq!(*order.lock(), (0..=10).collect::<Vec<i32>>());
    registry.kill_all();
}

#[test]
fn event_fans_out_and_disconnect_removes_one_subscriber() {
    let registry = ComponentRegistry::new();

    let server = Component::device("server", NullBehavior);
    let ctl = server
        .add_provided_interface("ctl", InterfacePolicy::QueueCommands)
        .unwrap();
    let changed = ctl.add_event_write::<i32>("ValueChanged").unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    let mut clients = Vec::new();
    for name in ["a", "b", "c"] {
        let client = Component::device(name, NullBehavior);
        let required = client.add_required_interface("ctl").unwrap();
        let h = Arc::clone(&hits);
        required
            .add_handler_write("ValueChanged", move |_: &i32| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        registry.add_component(Arc::clone(&client)).unwrap();
        clients.push(client);
    }
    registry.add_component(Arc::clone(&server)).unwrap();
    registry.create_all().unwrap();

    for name in ["a", "b", "c"] {
        registry.connect(name, "ctl", "server", "ctl").unwrap();
    }
    assert_eq!(changed.fire(&1i32).unwrap(), 3);
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    registry.disconnect("b", "ctl", "server", "ctl").unwrap();
    assert_eq!(changed.fire(&2i32).unwrap(), 2);
    assert_eq!(hits.load(Ordering::SeqCst), 5);

    registry.kill_all();
}

#[test]
fn connect_is_all_or_nothing() {
    let registry = ComponentRegistry::new();
    let (server, _) = value_server("robot");

    let client = Component::device("operator", NullBehavior);
    let robot = client.add_required_interface("robot").unwrap();
    let set = robot
        .add_function_write::<i32>("SetValue", Requirement::Required)
        .unwrap();
    robot
        .add_function_void("EmergencyStop", Requirement::Required)
        .unwrap();

    registry.add_component(Arc::clone(&server)).unwrap();
    registry.add_component(Arc::clone(&client)).unwrap();

    assert_eq!(
        registry.connect("operator", "robot", "robot", "ctl"),
        Err(ConnectError::IncompatibleInterfaces("EmergencyStop".into()))
    );
    // Nothing half-bound: matched slots stay unbound too.
    assert!(!set.is_bound());
    assert_eq!(registry.connection_count(), 0);
    assert_eq!(
        server.provided_interface("ctl").unwrap().end_user_count(),
        0
    );
}

#[test]
fn per_connection_mailboxes_are_independent() {
    let registry = ComponentRegistry::new();

    let server = Component::device("server", NullBehavior);
    let ctl = server
        .add_provided_interface("ctl", InterfacePolicy::QueueCommands)
        .unwrap();
    ctl.set_queue_sizes(axon_interface::QueueSizes {
        mailbox: 2,
        argument_queue: 16,
    })
    .unwrap();
    ctl.add_command_void("Tick", QueueingPolicy::default(), || Ok(()))
        .unwrap();
    registry.add_component(Arc::clone(&server)).unwrap();

    let mut ticks = Vec::new();
    for name in ["a", "b"] {
        let client = Component::device(name, NullBehavior);
        let required = client.add_required_interface("ctl").unwrap();
        ticks.push(
            required
                .add_function_void("Tick", Requirement::Required)
                .unwrap(),
        );
        registry.add_component(client).unwrap();
        registry.connect(name, "ctl", "server", "ctl").unwrap();
    }
    registry.create_all().unwrap();

    // Fill a's mailbox; b's stays usable.
    ticks[0].execute().unwrap();
    ticks[0].execute().unwrap();
    assert!(ticks[0].execute().is_err());
    assert!(ticks[1].execute().is_ok());

    registry.kill_all();
}

#[test]
fn disconnect_removes_copy_despite_concurrent_drain() {
    let registry = ComponentRegistry::new();

    let server = Component::device("server", NullBehavior);
    let ctl = server
        .add_provided_interface("ctl", InterfacePolicy::QueueCommands)
        .unwrap();
    ctl.add_command_void("Tick", QueueingPolicy::default(), || Ok(()))
        .unwrap();

    let client = Component::device("client", NullBehavior);
    let required = client.add_required_interface("ctl").unwrap();
    let tick = required
        .add_function_void("Tick", Requirement::Required)
        .unwrap();

    registry.add_component(Arc::clone(&server)).unwrap();
    registry.add_component(Arc::clone(&client)).unwrap();
    registry.create_all().unwrap();

    // Hammer the server's drain path while connections come and go, so
    // disconnect races the copy's processing window.
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let drainer = {
        let server = Arc::clone(&server);
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                server.process_mailboxes();
            }
        })
    };

    let factory = server.provided_interface("ctl").unwrap();
    for _ in 0..50 {
        registry.connect("client", "ctl", "server", "ctl").unwrap();
        for _ in 0..4 {
            let _ = tick.execute();
        }
        registry
            .disconnect("client", "ctl", "server", "ctl")
            .unwrap();
        assert_eq!(factory.end_user_count(), 0);
    }

    stop.store(true, Ordering::SeqCst);
    drainer.join().unwrap();
    registry.kill_all();
}

#[test]
fn lifecycle_event_observed_through_connection() {
    let registry = ComponentRegistry::new();
    let (server, _) = value_server("robot");

    let observer = Component::device("observer", NullBehavior);
    let lifecycle = observer.add_required_interface("robot-lifecycle").unwrap();
    let observed = Arc::new(Mutex::new(Vec::new()));
    let o = Arc::clone(&observed);
    lifecycle
        .add_handler_write("ChangeState", move |s: &ComponentState| {
            o.lock().push(*s);
            Ok(())
        })
        .unwrap();

    registry.add_component(Arc::clone(&server)).unwrap();
    registry.add_component(Arc::clone(&observer)).unwrap();
    registry
        .connect("observer", "robot-lifecycle", "robot", "Lifecycle")
        .unwrap();

    server.create().unwrap();
    server.start().unwrap();
    assert_eq!(
        *observed.lock(),
        vec![
            ComponentState::Initializing,
            ComponentState::Ready,
            ComponentState::Active,
        ]
    );
    registry.kill_all();
}
