//! Component registry
//!
//! Maps `(kind, identifier)` to a factory that binds a line's options into a
//! fresh component. Identifiers are resolved once while compiling; compiled
//! nodes hold the created component directly.
//!
//! A component may also be registered under aliases. An alias never replaces
//! an existing key, while a primary identifier always does.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use trellis_core::{
    bind, Action, BindResult, Configurable, DirectiveKind, DynAction, DynRequirement, DynTrigger,
    Requirement, Trigger,
};

/// Description of one declared component option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionMeta {
    pub key: String,
    pub position: Option<usize>,
    pub required: bool,
    pub description: Option<String>,
}

/// What a registered component is and which options it takes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMeta {
    pub kind: DirectiveKind,
    pub identifier: String,
    pub target_type: &'static str,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub options: Vec<OptionMeta>,
}

impl ComponentMeta {
    fn of<C: Configurable>(
        kind: DirectiveKind,
        identifier: &str,
        target_type: &'static str,
    ) -> Self {
        let options = C::schema()
            .options()
            .iter()
            .map(|option| OptionMeta {
                key: option.key().to_string(),
                position: option.position(),
                required: option.is_required(),
                description: option.description().map(str::to_string),
            })
            .collect();
        Self {
            kind,
            identifier: identifier.to_string(),
            target_type,
            aliases: Vec::new(),
            description: None,
            options,
        }
    }

    fn with(mut self, aliases: &[&str], description: Option<&str>) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self.description = description.map(str::to_string);
        self
    }

    /// The primary identifier followed by every alias
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.identifier.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

type CreateFn<T> = dyn Fn(&str) -> BindResult<Arc<T>> + Send + Sync;

/// Creates components of one identifier from raw option text
pub struct Factory<T: ?Sized> {
    meta: ComponentMeta,
    create: Box<CreateFn<T>>,
}

impl<T: ?Sized> Factory<T> {
    pub fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    pub fn create(&self, options: &str) -> BindResult<Arc<T>> {
        (self.create)(options)
    }
}

impl<T: ?Sized> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory").field("meta", &self.meta).finish()
    }
}

pub type ActionFactory = Factory<dyn DynAction>;
pub type RequirementFactory = Factory<dyn DynRequirement>;
pub type TriggerFactory = Factory<dyn DynTrigger>;

/// A factory of any kind, as returned by [`Registry::get`]
#[derive(Debug, Clone)]
pub enum AnyFactory {
    Action(Arc<ActionFactory>),
    Requirement(Arc<RequirementFactory>),
    Trigger(Arc<TriggerFactory>),
}

impl AnyFactory {
    pub fn kind(&self) -> DirectiveKind {
        self.meta().kind
    }

    pub fn meta(&self) -> &ComponentMeta {
        match self {
            AnyFactory::Action(f) => f.meta(),
            AnyFactory::Requirement(f) => f.meta(),
            AnyFactory::Trigger(f) => f.meta(),
        }
    }
}

/// Registry of component factories, keyed case-insensitively by identifier
#[derive(Default)]
pub struct Registry {
    actions: DashMap<String, Arc<ActionFactory>>,
    requirements: DashMap<String, Arc<RequirementFactory>>,
    triggers: DashMap<String, Arc<TriggerFactory>>,
}

fn key(identifier: &str) -> String {
    identifier.to_lowercase()
}

fn insert<T: ?Sized>(map: &DashMap<String, Arc<Factory<T>>>, factory: Factory<T>) {
    let meta = factory.meta.clone();
    let factory = Arc::new(factory);
    map.insert(key(&meta.identifier), Arc::clone(&factory));

    for alias in &meta.aliases {
        match map.entry(key(alias)) {
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&factory));
            }
            Entry::Occupied(_) => {
                debug!(
                    identifier = %meta.identifier,
                    alias = %alias,
                    "Alias already taken, skipping"
                );
            }
        }
    }
    debug!(
        kind = %meta.kind,
        identifier = %meta.identifier,
        target = meta.target_type,
        aliases = meta.aliases.len(),
        "Registered component"
    );
}

fn remove<T: ?Sized>(map: &DashMap<String, Arc<Factory<T>>>, identifier: &str) -> bool {
    let Some((_, factory)) = map.remove(&key(identifier)) else {
        return false;
    };
    map.retain(|_, other| !Arc::ptr_eq(other, &factory));
    true
}

fn primaries<T: ?Sized>(map: &DashMap<String, Arc<Factory<T>>>) -> Vec<String> {
    map.iter()
        .filter(|e| *e.key() == key(&e.meta().identifier))
        .map(|e| e.meta().identifier.clone())
        .collect()
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action type under `identifier`, replacing any previous one
    pub fn register_action<A: Action>(&self, identifier: &str) {
        self.register_action_with::<A>(identifier, &[], None);
    }

    /// Register an action type with aliases and a description
    ///
    /// Aliases are only inserted where no component of this kind is
    /// registered under that name yet.
    pub fn register_action_with<A: Action>(
        &self,
        identifier: &str,
        aliases: &[&str],
        description: Option<&str>,
    ) {
        let factory = Factory {
            meta: ComponentMeta::of::<A>(
                DirectiveKind::Action,
                identifier,
                type_name::<A::Target>(),
            )
            .with(aliases, description),
            create: Box::new(|raw: &str| Ok(Arc::new(bind::<A>(raw)?) as Arc<dyn DynAction>)),
        };
        insert(&self.actions, factory);
    }

    /// Register a requirement type under `identifier`
    pub fn register_requirement<R: Requirement>(&self, identifier: &str) {
        self.register_requirement_with::<R>(identifier, &[], None);
    }

    pub fn register_requirement_with<R: Requirement>(
        &self,
        identifier: &str,
        aliases: &[&str],
        description: Option<&str>,
    ) {
        let factory = Factory {
            meta: ComponentMeta::of::<R>(
                DirectiveKind::Requirement,
                identifier,
                type_name::<R::Target>(),
            )
            .with(aliases, description),
            create: Box::new(|raw: &str| {
                Ok(Arc::new(bind::<R>(raw)?) as Arc<dyn DynRequirement>)
            }),
        };
        insert(&self.requirements, factory);
    }

    /// Register a trigger type under `identifier`
    pub fn register_trigger<T: Trigger>(&self, identifier: &str) {
        self.register_trigger_with::<T>(identifier, &[], None);
    }

    pub fn register_trigger_with<T: Trigger>(
        &self,
        identifier: &str,
        aliases: &[&str],
        description: Option<&str>,
    ) {
        let factory = Factory {
            meta: ComponentMeta::of::<T>(
                DirectiveKind::Trigger,
                identifier,
                type_name::<T::Target>(),
            )
            .with(aliases, description),
            create: Box::new(|raw: &str| Ok(Arc::new(bind::<T>(raw)?) as Arc<dyn DynTrigger>)),
        };
        insert(&self.triggers, factory);
    }

    pub fn action(&self, identifier: &str) -> Option<Arc<ActionFactory>> {
        self.actions.get(&key(identifier)).map(|f| f.value().clone())
    }

    pub fn requirement(&self, identifier: &str) -> Option<Arc<RequirementFactory>> {
        self.requirements.get(&key(identifier)).map(|f| f.value().clone())
    }

    pub fn trigger(&self, identifier: &str) -> Option<Arc<TriggerFactory>> {
        self.triggers.get(&key(identifier)).map(|f| f.value().clone())
    }

    /// Look up the factory for a directive kind and identifier
    pub fn get(&self, kind: DirectiveKind, identifier: &str) -> Option<AnyFactory> {
        match kind {
            DirectiveKind::Action => self.action(identifier).map(AnyFactory::Action),
            DirectiveKind::Requirement => {
                self.requirement(identifier).map(AnyFactory::Requirement)
            }
            DirectiveKind::Trigger => self.trigger(identifier).map(AnyFactory::Trigger),
        }
    }

    pub fn contains(&self, kind: DirectiveKind, identifier: &str) -> bool {
        let identifier = key(identifier);
        match kind {
            DirectiveKind::Action => self.actions.contains_key(&identifier),
            DirectiveKind::Requirement => self.requirements.contains_key(&identifier),
            DirectiveKind::Trigger => self.triggers.contains_key(&identifier),
        }
    }

    /// Remove a registration along with all its aliases; returns whether one existed
    pub fn unregister(&self, kind: DirectiveKind, identifier: &str) -> bool {
        let removed = match kind {
            DirectiveKind::Action => remove(&self.actions, identifier),
            DirectiveKind::Requirement => remove(&self.requirements, identifier),
            DirectiveKind::Trigger => remove(&self.triggers, identifier),
        };
        if removed {
            debug!(kind = %kind, identifier, "Unregistered component");
        }
        removed
    }

    /// Primary identifiers of a kind, sorted; aliases are not listed
    pub fn identifiers(&self, kind: DirectiveKind) -> Vec<String> {
        let mut identifiers = match kind {
            DirectiveKind::Action => primaries(&self.actions),
            DirectiveKind::Requirement => primaries(&self.requirements),
            DirectiveKind::Trigger => primaries(&self.triggers),
        };
        identifiers.sort();
        identifiers
    }

    pub fn describe(&self, kind: DirectiveKind, identifier: &str) -> Option<ComponentMeta> {
        self.get(kind, identifier).map(|f| f.meta().clone())
    }

    /// Total number of registered components, not counting aliases
    pub fn len(&self) -> usize {
        primaries(&self.actions).len()
            + primaries(&self.requirements).len()
            + primaries(&self.triggers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("actions", &self.actions.len())
            .field("requirements", &self.requirements.len())
            .field("triggers", &self.triggers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{parse_value, ConfigSchema, ExecutionContext, Outcome, Target};

    #[derive(Debug, Default)]
    struct Greet {
        message: String,
    }

    impl Configurable for Greet {
        fn schema() -> ConfigSchema<Self> {
            ConfigSchema::new()
                .option("message", |c: &mut Greet, v| {
                    c.message = parse_value(v)?;
                    Ok(())
                })
                .at(0)
                .required()
                .describe("text to send")
        }
    }

    impl Action for Greet {
        type Target = String;

        fn execute(&self, _target: &String, _ctx: &ExecutionContext) -> Outcome {
            Outcome::success_with(self.message.clone())
        }
    }

    #[test]
    fn test_register_and_create() {
        let registry = Registry::new();
        registry.register_action::<Greet>("Greet");

        assert!(registry.contains(DirectiveKind::Action, "greet"));
        assert!(!registry.contains(DirectiveKind::Requirement, "greet"));
        assert_eq!(registry.len(), 1);

        let factory = registry.action("GREET").unwrap();
        let action = factory.create("hello").unwrap();
        let target = Target::new("steve", "steve".to_string());
        assert_eq!(
            action.execute(&target, &ExecutionContext::new()).messages(),
            ["hello"]
        );
    }

    #[test]
    fn test_create_reports_bind_errors() {
        let registry = Registry::new();
        registry.register_action::<Greet>("greet");
        let factory = registry.action("greet").unwrap();
        assert!(matches!(
            factory.create(""),
            Err(trellis_core::BindError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_describe() {
        let registry = Registry::new();
        registry.register_action::<Greet>("greet");

        let meta = registry.describe(DirectiveKind::Action, "greet").unwrap();
        assert_eq!(meta.kind, DirectiveKind::Action);
        assert_eq!(meta.identifier, "greet");
        assert!(meta.target_type.contains("String"));
        assert_eq!(meta.options.len(), 1);
        assert_eq!(meta.options[0].key, "message");
        assert_eq!(meta.options[0].position, Some(0));
        assert!(meta.options[0].required);
    }

    #[derive(Debug, Default)]
    struct Wave;

    impl Configurable for Wave {
        fn schema() -> ConfigSchema<Self> {
            ConfigSchema::new()
                .option("to", |_c: &mut Wave, _v| Ok(()))
                .at(0)
        }
    }

    impl Action for Wave {
        type Target = String;

        fn execute(&self, _target: &String, _ctx: &ExecutionContext) -> Outcome {
            Outcome::success_with("wave")
        }
    }

    fn run(registry: &Registry, identifier: &str) -> Vec<String> {
        let action = registry.action(identifier).unwrap().create("hi").unwrap();
        let target = Target::new("steve", "steve".to_string());
        action.execute(&target, &ExecutionContext::new()).messages().to_vec()
    }

    #[test]
    fn test_aliases_resolve_to_component() {
        let registry = Registry::new();
        registry.register_action_with::<Greet>("greet", &["hello", "Hi"], Some("says hello"));

        assert_eq!(run(&registry, "hello"), ["hi"]);
        assert_eq!(run(&registry, "hi"), ["hi"]);
        assert_eq!(registry.identifiers(DirectiveKind::Action), vec!["greet"]);
        assert_eq!(registry.len(), 1);

        let meta = registry.describe(DirectiveKind::Action, "hello").unwrap();
        assert_eq!(meta.identifier, "greet");
        assert_eq!(meta.aliases, vec!["hello", "Hi"]);
        assert_eq!(meta.description.as_deref(), Some("says hello"));
        assert_eq!(meta.names().collect::<Vec<_>>(), ["greet", "hello", "Hi"]);
    }

    #[test]
    fn test_existing_identifier_wins_over_alias() {
        let registry = Registry::new();
        registry.register_action::<Wave>("wave");
        registry.register_action_with::<Greet>("greet", &["wave", "salute"], None);

        assert_eq!(run(&registry, "wave"), ["wave"]);
        assert_eq!(run(&registry, "salute"), ["hi"]);

        // A later primary identifier replaces an alias
        registry.register_action::<Wave>("salute");
        assert_eq!(run(&registry, "salute"), ["wave"]);
        assert_eq!(
            registry.identifiers(DirectiveKind::Action),
            vec!["greet", "salute", "wave"]
        );
    }

    #[test]
    fn test_unregister_removes_aliases() {
        let registry = Registry::new();
        registry.register_action::<Wave>("wave");
        registry.register_action_with::<Greet>("greet", &["hello", "wave"], None);

        assert!(registry.unregister(DirectiveKind::Action, "greet"));
        assert!(!registry.contains(DirectiveKind::Action, "hello"));
        assert!(registry.contains(DirectiveKind::Action, "wave"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_by_kind_and_unregister() {
        let registry = Registry::new();
        registry.register_action::<Greet>("greet");

        let factory = registry.get(DirectiveKind::Action, "greet").unwrap();
        assert_eq!(factory.kind(), DirectiveKind::Action);
        assert!(registry.get(DirectiveKind::Trigger, "greet").is_none());

        assert_eq!(registry.identifiers(DirectiveKind::Action), vec!["greet"]);
        assert!(registry.unregister(DirectiveKind::Action, "greet"));
        assert!(!registry.unregister(DirectiveKind::Action, "greet"));
        assert!(registry.is_empty());
    }
}
