use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use keylime::{ErrorKind, Keylime, KeylimeConfig, KeylimeError, Registry, Value};

fn setup() -> (Arc<Registry>, Keylime) {
    let registry = Arc::new(Registry::new());
    let keylime = Keylime::new(Arc::clone(&registry), KeylimeConfig::default());
    (registry, keylime)
}

#[test]
fn test_invoke_runs_the_extension_with_arguments() {
    let (registry, keylime) = setup();
    registry
        .register("defaults", |model, args| {
            for name in args.iter().filter_map(|a| a.as_str()) {
                model.attr(name, Value::Null)?;
            }
            Ok(())
        })
        .unwrap();

    let user = keylime.create_named("User").unwrap();
    let chained = user
        .invoke("defaults", &[Value::from("name"), Value::from("email")])
        .unwrap();
    assert!(chained.ptr_eq(&user));

    let instance = user.create(&[]).unwrap();
    assert_eq!(instance.keys(), vec!["name", "email"]);
}

#[test]
fn test_extensions_are_opt_in() {
    let (registry, keylime) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    registry
        .register("counted", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    let plain = keylime.create_named("Plain").unwrap();
    plain.create(&[]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let opted = keylime.create_named("Opted").unwrap();
    opted.invoke("counted", &[]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unregistered_extension_is_not_found() {
    let (registry, keylime) = setup();
    registry
        .register("flag", |model, _| {
            model.attr("flagged", true)?;
            Ok(())
        })
        .unwrap();

    let before = keylime.create_named("Before").unwrap();
    before.invoke("flag", &[]).unwrap();

    assert!(registry.unregister("flag"));

    let after = keylime.create_named("After").unwrap();
    let err = after.invoke("flag", &[]).unwrap_err();
    assert_eq!(err, KeylimeError::ExtensionNotFound("flag".into()));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // What the extension already did stays done.
    assert_eq!(
        before.create(&[]).unwrap().get("flagged"),
        Some(Value::from(true))
    );
}

#[test]
fn test_register_conflicts_with_surface_and_existing_names() {
    let (registry, _) = setup();
    registry.register("audit", |_, _| Ok(())).unwrap();

    let err = registry.register("audit", |_, _| Ok(())).unwrap_err();
    assert!(err.to_string().contains("already"));
    assert_eq!(
        registry.register("attr", |_, _| Ok(())).unwrap_err().kind(),
        ErrorKind::Conflict
    );
}

#[test]
fn test_extension_errors_propagate() {
    let (registry, keylime) = setup();
    registry
        .register("broken", |model, _| {
            Err(KeylimeError::handler(format!("cannot extend {}", model.name())))
        })
        .unwrap();

    let model = keylime.create_named("Target").unwrap();
    let err = model.invoke("broken", &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Handler);
    assert!(err.to_string().contains("Target"));
}

#[test]
fn test_registries_are_isolated() {
    let (registry, _) = setup();
    let (_, other) = setup();
    registry.register("only_here", |_, _| Ok(())).unwrap();

    let model = other.create_named("Elsewhere").unwrap();
    assert_eq!(
        model.invoke("only_here", &[]).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_registry_is_shareable_across_threads() {
    let (registry, _) = setup();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry
                    .register(&format!("ext{}", i), |_, _| Ok(()))
                    .is_ok()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(registry.names(), vec!["ext0", "ext1", "ext2", "ext3"]);
}
