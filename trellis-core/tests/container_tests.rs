use std::sync::Arc;
use trellis_core::{
    ClassRegistry, Container, ContainerOptions, Error, ParameterSpec, TypeDescriptor,
};

struct Greeter {
    greeting: String,
}

struct Config {
    name: String,
}

struct Mailer {
    config: Arc<Config>,
}

struct Newsletter {
    mailer: Arc<Mailer>,
    config: Arc<Config>,
}

struct Clock;

// Each references the other through its constructor.
struct Chicken;
struct Egg;

fn registry() -> ClassRegistry {
    ClassRegistry::new()
        .with(
            TypeDescriptor::new("Greeter", |args| {
                Ok(Greeter {
                    greeting: args.cloned::<String>(0)?,
                })
            })
            .with_constructor(vec![ParameterSpec::untyped("greeting")]),
        )
        .with(
            TypeDescriptor::new("Config", |args| {
                Ok(Config {
                    name: args.cloned::<String>(0)?,
                })
            })
            .with_constructor(vec![ParameterSpec::typed("name", "string")]),
        )
        .with(
            TypeDescriptor::new("Mailer", |args| {
                Ok(Mailer {
                    config: args.arc::<Config>(0)?,
                })
            })
            .with_constructor(vec![ParameterSpec::typed("config", "Config")]),
        )
        .with(
            TypeDescriptor::new("Newsletter", |args| {
                Ok(Newsletter {
                    mailer: args.arc::<Mailer>(0)?,
                    config: args.arc::<Config>(1)?,
                })
            })
            .with_constructor(vec![
                ParameterSpec::typed("mailer", "Mailer"),
                ParameterSpec::typed("config", "Config"),
            ]),
        )
        .with(TypeDescriptor::new("Clock", |_args| Ok(Clock)))
        .with(
            TypeDescriptor::new("Chicken", |_args| Ok(Chicken))
                .with_constructor(vec![ParameterSpec::typed("egg", "Egg")]),
        )
        .with(
            TypeDescriptor::new("Egg", |_args| Ok(Egg))
                .with_constructor(vec![ParameterSpec::typed("chicken", "Chicken")]),
        )
}

#[test]
fn test_get_returns_identical_instance() {
    let mut container = Container::with_registry(registry());

    let first = container.get("Clock").unwrap();
    let second = container.get("Clock").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_untyped_parameter_resolved_by_name() {
    let mut container = Container::with_registry(registry());
    container.set_value("greeting", "hello".to_string()).unwrap();

    let greeter = container.get_as::<Greeter>("Greeter").unwrap();
    assert_eq!(greeter.greeting, "hello");
}

#[test]
fn test_primitive_parameter_resolved_by_name_not_type() {
    let mut container = Container::with_registry(registry());
    container.set_value("name", "weekly".to_string()).unwrap();

    let config = container.get_as::<Config>("Config").unwrap();
    assert_eq!(config.name, "weekly");
    assert!(!container.has("string"));
}

#[test]
fn test_missing_required_untyped_parameter() {
    let mut container = Container::with_registry(registry());

    let result = container.get("Greeter");
    assert!(matches!(
        result,
        Err(Error::CannotResolveParameter { ref parameter, ref owner })
            if parameter == "greeting" && owner == "Greeter"
    ));
}

#[test]
fn test_shared_dependencies_are_singletons() {
    let mut container = Container::with_registry(registry());
    container.set_value("name", "digest".to_string()).unwrap();

    let newsletter = container.get_as::<Newsletter>("Newsletter").unwrap();
    assert!(Arc::ptr_eq(&newsletter.mailer.config, &newsletter.config));
    assert_eq!(newsletter.config.name, "digest");
}

#[test]
fn test_failed_resolution_keeps_earlier_instances() {
    let mut container = Container::with_registry(registry());
    let clock = container.get("Clock").unwrap();

    assert!(container.get("Newsletter").is_err());

    assert!(container.has("Clock"));
    assert!(Arc::ptr_eq(&clock, &container.get("Clock").unwrap()));
    assert!(!container.has("Newsletter"));
}

#[test]
fn test_cycle_reported_and_container_still_usable() {
    let mut container = Container::with_registry(registry());

    let err = container.get("Chicken").err().unwrap();
    match err {
        Error::CyclicDependency { limit, path, .. } => {
            assert_eq!(limit, 64);
            assert!(path.starts_with("Chicken -> Egg -> Chicken"));
        }
        other => panic!("expected a cycle, got {}", other),
    }

    container.set_value("greeting", "still here".to_string()).unwrap();
    let greeter = container.get_as::<Greeter>("Greeter").unwrap();
    assert_eq!(greeter.greeting, "still here");
}

#[test]
fn test_depth_limit_is_configurable() {
    let mut container = Container::with_registry(registry())
        .with_options(ContainerOptions { max_depth: 2 });
    container.set_value("name", "n".to_string()).unwrap();

    // Newsletter -> Mailer -> Config needs three levels.
    assert!(matches!(
        container.get("Newsletter"),
        Err(Error::CyclicDependency { limit: 2, .. })
    ));
    assert!(container.get("Config").is_ok());
}

#[test]
fn test_factory_can_autowire() {
    let mut container = Container::with_registry(registry());
    container.set_value("name", "from-factory".to_string()).unwrap();
    container
        .set_factory("mailer.primary", |c: &mut Container| {
            let config = c.get_as::<Config>("Config")?;
            Ok(Mailer { config })
        })
        .unwrap();

    let mailer = container.get_as::<Mailer>("mailer.primary").unwrap();
    assert_eq!(mailer.config.name, "from-factory");
}

#[test]
fn test_clear_forgets_everything() {
    let mut container = Container::with_registry(registry());
    container.set_value("greeting", "hi".to_string()).unwrap();
    container.get("Greeter").unwrap();
    container.get("Clock").unwrap();

    container.clear();

    for id in ["greeting", "Greeter", "Clock"] {
        assert!(!container.has(id));
    }
    assert!(container.is_empty());
}

#[test]
fn test_remove_unknown_is_noop() {
    let mut container = Container::new();
    assert!(!container.remove("never-registered"));
    assert!(container.is_empty());
}
