//! Integration tests for the registry-and-reduction engine

use parking_lot::Mutex;
use sidefx_engine::prelude::*;
use sidefx_engine::Revision;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn title(t: &str) -> PropsBag {
    PropsBag::new().with("title", t)
}

fn join_titles(props: &[PropsBag]) -> String {
    props
        .iter()
        .filter_map(|p| p.get("title").and_then(|v| v.to_text()))
        .collect::<Vec<_>>()
        .join(" ")
}

type TitleManager = Wrapped<sidefx_engine::FnUnit<fn(&PropsBag)>, PropsBag, String>;

fn noop_render(_: &PropsBag) {}

/// Title manager that records every dispatched state
fn recording_manager(env: Environment) -> (TitleManager, Arc<Mutex<Vec<String>>>) {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = recorded.clone();
    let manager = create(join_titles, move |state: &String| sink.lock().push(state.clone()))
        .with_environment(env)
        .wrap(unit_fn(noop_render as fn(&PropsBag)).labeled("Title"))
        .unwrap();
    (manager, recorded)
}

#[test]
fn test_interactive_title_scenario() {
    let (manager, recorded) = recording_manager(Environment::Interactive);

    let a = manager.attach(title("A"));
    assert_eq!(recorded.lock().last().map(String::as_str), Some("A"));

    let b = manager.attach(title("B"));
    assert_eq!(recorded.lock().last().map(String::as_str), Some("A B"));

    manager.detach(a);
    assert_eq!(recorded.lock().last().map(String::as_str), Some("B"));

    manager.detach(b);
    assert_eq!(recorded.lock().last().map(String::as_str), Some(""));

    assert_eq!(*recorded.lock(), ["A", "A B", "B", ""]);
}

#[test]
fn test_non_interactive_title_scenario() {
    let (manager, recorded) = recording_manager(Environment::NonInteractive);

    let a = manager.attach(title("A"));
    let b = manager.attach(title("B"));
    manager.detach(a);
    manager.detach(b);

    assert_eq!(manager.peek().as_deref(), Some(""));
    assert_eq!(manager.finalize().unwrap().as_deref(), Some(""));
    assert!(manager.is_empty());
    assert_eq!(manager.finalize().unwrap(), None);

    // Dispatch never runs outside the interactive context
    assert!(recorded.lock().is_empty());
}

#[test]
fn test_attachment_order_survives_updates() {
    let seen = Arc::new(Mutex::new(Vec::<Vec<String>>::new()));
    let sink = seen.clone();
    let manager = create(
        move |props: &[PropsBag]| {
            let titles: Vec<String> = props
                .iter()
                .filter_map(|p| p.get("title").and_then(|v| v.to_text()))
                .collect();
            sink.lock().push(titles.clone());
            titles.len()
        },
        |_: &usize| {},
    )
    .wrap(unit_fn(|_: &PropsBag| ()))
    .unwrap();

    let a = manager.attach(title("A"));
    let b = manager.attach(title("B"));
    assert!(manager.update(b, title("B2")));
    assert!(manager.update(a, title("A2")));

    assert_eq!(seen.lock().last().unwrap(), &["A2", "B2"]);
    assert_eq!(manager.instance_ids(), [a, b]);
}

#[test]
fn test_shallow_equal_update_is_a_no_op() {
    let reduces = Arc::new(AtomicUsize::new(0));
    let dispatches = Arc::new(AtomicUsize::new(0));
    let (r, d) = (reduces.clone(), dispatches.clone());

    let manager = create(
        move |props: &[PropsBag]| {
            r.fetch_add(1, Ordering::SeqCst);
            join_titles(props)
        },
        move |_: &String| {
            d.fetch_add(1, Ordering::SeqCst);
        },
    )
    .wrap(unit_fn(|_: &PropsBag| ()))
    .unwrap();

    let a = manager.attach(PropsBag::new().with("title", "A").with("lang", "en"));
    assert_eq!(reduces.load(Ordering::SeqCst), 1);
    assert_eq!(dispatches.load(Ordering::SeqCst), 1);

    let committed = manager.update(a, PropsBag::new().with("lang", "en").with("title", "A"));
    assert!(!committed);
    assert_eq!(reduces.load(Ordering::SeqCst), 1);
    assert_eq!(dispatches.load(Ordering::SeqCst), 1);

    let metrics = manager.metrics();
    assert_eq!(metrics.skipped_updates, 1);
    assert_eq!(metrics.committed_updates, 0);
}

#[test]
fn test_finalize_rejected_when_interactive() {
    let (manager, _) = recording_manager(Environment::Interactive);
    manager.attach(title("A"));

    let err = manager.finalize().unwrap_err();
    assert!(matches!(err, PreconditionError::FinalizeInInteractive { .. }));
    assert!(err.to_string().contains("SideEffect(Title)"));

    assert_eq!(manager.len(), 1);
    assert_eq!(manager.peek().as_deref(), Some("A"));
}

#[test]
fn test_peek_is_side_effect_free() {
    let (manager, _) = recording_manager(Environment::NonInteractive);
    manager.attach(title("A"));
    manager.attach(title("B"));

    let revision = manager.revision();
    let peeks: Vec<_> = (0..5).map(|_| manager.peek()).collect();

    assert!(peeks.iter().all(|p| p.as_deref() == Some("A B")));
    assert_eq!(manager.revision(), revision);
    assert_eq!(manager.len(), 2);
}

#[test]
fn test_detaching_last_instance_reduces_empty_sequence() {
    let lengths = Arc::new(Mutex::new(Vec::new()));
    let sink = lengths.clone();
    let manager = create(
        move |props: &[PropsBag]| {
            sink.lock().push(props.len());
            props.len()
        },
        |_: &usize| {},
    )
    .wrap(unit_fn(|_: &PropsBag| ()))
    .unwrap();

    let a = manager.attach(title("A"));
    manager.detach(a);

    assert_eq!(*lengths.lock(), [1, 0]);
    assert_eq!(manager.peek(), Some(0));
}

#[test]
fn test_server_mapper_applies_only_when_non_interactive() {
    let factory = create_with_server_mapper(join_titles, |_: &String| {}, |state: String| {
        format!("<title>{state}</title>")
    });

    let server = factory
        .wrap(unit_fn(|_: &PropsBag| ()))
        .unwrap();
    server.set_environment(Environment::NonInteractive);
    server.attach(title("Home"));
    assert_eq!(server.finalize().unwrap().as_deref(), Some("<title>Home</title>"));

    let client = factory.wrap(unit_fn(|_: &PropsBag| ())).unwrap();
    client.attach(title("Home"));
    assert_eq!(client.peek().as_deref(), Some("Home"));
    assert_eq!(client.metrics().server_maps, 0);
}

#[test]
fn test_finalize_prevents_leak_between_passes() {
    let (manager, _) = recording_manager(Environment::NonInteractive);

    // First pass
    manager.attach(title("First"));
    assert_eq!(manager.finalize().unwrap().as_deref(), Some("First"));

    // Second pass starts from an empty registry
    manager.attach(title("Second"));
    assert_eq!(manager.finalize().unwrap().as_deref(), Some("Second"));
}

#[test]
fn test_missing_finalize_leaks_instances() {
    let (manager, _) = recording_manager(Environment::NonInteractive);

    manager.attach(title("First"));
    // No finalize here: the first pass stays registered
    manager.attach(title("Second"));
    assert_eq!(manager.peek().as_deref(), Some("First Second"));
}

#[test]
fn test_detach_after_finalize_is_ignored() {
    let (manager, _) = recording_manager(Environment::NonInteractive);
    let a = manager.attach(title("A"));
    manager.finalize().unwrap();

    let revision = manager.revision();
    manager.detach(a);
    assert_eq!(manager.revision(), revision);
    assert_eq!(manager.finalize().unwrap(), None);
}

#[test]
fn test_state_matches_reduce_of_live_instances() {
    let (manager, _) = recording_manager(Environment::NonInteractive);
    let mut live = Vec::new();

    for (step, name) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        live.push((manager.attach(title(name)), name.to_string()));
        if step % 2 == 1 {
            let (id, _) = live.remove(0);
            manager.detach(id);
        }
        if let Some((id, name)) = live.last_mut() {
            *name = format!("{name}!");
            manager.update(*id, title(name));
        }

        let expected = live
            .iter()
            .map(|(_, n)| n.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(manager.peek(), Some(expected));
    }
    assert!(manager.revision() > Revision::ZERO);
}

#[test]
fn test_panicking_reducer_propagates_and_recovers() {
    let manager = create(
        |props: &[PropsBag]| {
            if props.iter().any(|p| p.contains_key("boom")) {
                panic!("reducer exploded");
            }
            props.len()
        },
        |_: &usize| {},
    )
    .wrap(unit_fn(|_: &PropsBag| ()))
    .unwrap();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        manager.attach(PropsBag::new().with("boom", true));
    }));
    assert!(result.is_err());

    // The registry mutation happened before the reducer ran
    assert_eq!(manager.len(), 1);
    let boom = manager.instance_ids()[0];
    manager.detach(boom);
    assert_eq!(manager.peek(), Some(0));

    manager.attach(title("ok"));
    assert_eq!(manager.peek(), Some(1));
}

#[test]
fn test_reentrant_mutation_panics() {
    use std::sync::OnceLock;

    let slot: Arc<OnceLock<Arc<Wrapped<sidefx_engine::FnUnit<fn(&PropsBag)>, PropsBag, usize>>>> =
        Arc::new(OnceLock::new());
    let inner = slot.clone();

    let manager = Arc::new(
        create(|props: &[PropsBag]| props.len(), move |_: &usize| {
            if let Some(manager) = inner.get() {
                manager.attach(PropsBag::new());
            }
        })
        .wrap(unit_fn(noop_render as fn(&PropsBag)))
        .unwrap(),
    );
    let _ = slot.set(manager.clone());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        manager.attach(title("A"));
    }));
    assert!(result.is_err());
}

#[test]
fn test_concurrent_attach_waits_for_running_emit() {
    use std::thread;
    use std::time::Duration;

    let manager = Arc::new(
        create(
            |props: &[PropsBag]| {
                if props.len() == 1 && props[0].contains_key("slow") {
                    thread::sleep(Duration::from_millis(200));
                }
                props.len()
            },
            |_: &usize| {},
        )
        .wrap(unit_fn(noop_render as fn(&PropsBag)))
        .unwrap(),
    );

    let slow = {
        let manager = manager.clone();
        thread::spawn(move || manager.attach(PropsBag::new().with("slow", true)))
    };
    thread::sleep(Duration::from_millis(50));
    let fast = {
        let manager = manager.clone();
        thread::spawn(move || manager.attach(title("B")))
    };

    let a = slow.join().expect("slow attach panicked");
    let b = fast.join().expect("fast attach panicked");

    assert_ne!(a, b);
    assert_eq!(manager.len(), 2);
    assert_eq!(manager.peek(), Some(2));
    assert_eq!(manager.revision(), Revision(2));
}
