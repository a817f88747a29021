//! Factory registries for algorithms and platforms.
//!
//! A registry maps a case-sensitive name, plus any number of aliases, to a
//! constructor. One [`Registries`] value is built per process and shared
//! with every Controller; nothing here is global.

use crate::algorithm::Algorithm;
use crate::error::{FactoryKind, MurmurError, Result};
use crate::platform::{Platform, PlatformRef};
use crate::store::SharedStore;
use crate::types::{AgentId, KnowledgeMap, Sensors};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Everything a constructor may use besides its argument map.
#[derive(Clone)]
pub struct FactoryContext {
    pub store: SharedStore,
    pub platform: PlatformRef,
    pub sensors: Arc<Sensors>,
    pub agent: AgentId,
    /// Known swarm roster, in agent order.
    pub agents: Arc<Vec<AgentId>>,
}

impl FactoryContext {
    /// A context with no platform, no sensors and an empty roster.
    pub fn new(store: SharedStore, agent: AgentId) -> Self {
        Self {
            store,
            platform: Weak::new(),
            sensors: Arc::new(Sensors::new()),
            agent,
            agents: Arc::new(Vec::new()),
        }
    }
}

/// Constructor stored in a registry.
pub type Constructor<T> =
    Box<dyn Fn(&KnowledgeMap, &FactoryContext) -> Result<Box<T>> + Send + Sync>;

/// Name-to-constructor lookup for one kind of product.
pub struct FactoryRegistry<T: ?Sized> {
    kind: FactoryKind,
    constructors: BTreeMap<String, Constructor<T>>,
    aliases: BTreeMap<String, String>,
}

/// Registry of algorithm constructors.
pub type AlgorithmRegistry = FactoryRegistry<dyn Algorithm>;

/// Registry of platform constructors.
pub type PlatformRegistry = FactoryRegistry<dyn Platform>;

impl<T: ?Sized> FactoryRegistry<T> {
    pub fn new(kind: FactoryKind) -> Self {
        Self {
            kind,
            constructors: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> FactoryKind {
        self.kind
    }

    /// Register `constructor` under `name` and each alias. Later
    /// registrations replace earlier ones with the same name.
    pub fn register<F>(&mut self, name: &str, aliases: &[&str], constructor: F)
    where
        F: Fn(&KnowledgeMap, &FactoryContext) -> Result<Box<T>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(name.to_string(), Box::new(constructor));
        for alias in aliases {
            self.aliases.insert(alias.to_string(), name.to_string());
        }
        debug!("registered {} '{}' ({} aliases)", self.kind, name, aliases.len());
    }

    /// Canonical name for `name`, following aliases.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if let Some((canonical, _)) = self.constructors.get_key_value(name) {
            return Some(canonical.as_str());
        }
        self.aliases.get(name).map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Canonical names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Build an instance registered as `name`.
    ///
    /// Unregistered names are an [`MurmurError::UnknownFactory`]; constructor
    /// failures are passed through unchanged.
    pub fn create(&self, name: &str, args: &KnowledgeMap, ctx: &FactoryContext) -> Result<Box<T>> {
        if name.is_empty() {
            return Err(MurmurError::EmptyName(self.kind));
        }
        let canonical = self.resolve(name).ok_or_else(|| MurmurError::UnknownFactory {
            kind: self.kind,
            name: name.to_string(),
        })?;
        let constructor = self
            .constructors
            .get(canonical)
            .ok_or_else(|| MurmurError::UnknownFactory {
                kind: self.kind,
                name: canonical.to_string(),
            })?;
        constructor(args, ctx)
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::new(FactoryKind::Algorithm)
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::new(FactoryKind::Platform)
    }
}

/// The process-wide pair of registries handed to every Controller.
#[derive(Default)]
pub struct Registries {
    pub algorithms: AlgorithmRegistry,
    pub platforms: PlatformRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze into a shareable handle.
    pub fn shared(self) -> Arc<Registries> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::AlgorithmCore;
    use crate::status::StatusCode;
    use crate::types::Value;

    struct Noop {
        core: AlgorithmCore,
    }

    impl Algorithm for Noop {
        fn core(&self) -> &AlgorithmCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut AlgorithmCore {
            &mut self.core
        }
        fn execute(&mut self) -> StatusCode {
            StatusCode::OK
        }
    }

    fn registry() -> AlgorithmRegistry {
        let mut registry = AlgorithmRegistry::default();
        registry.register("noop", &["nothing"], |args, ctx| {
            if args.get("fail").is_some_and(Value::is_true) {
                return Err(MurmurError::invalid_argument("noop", "fail", "1", "asked to fail"));
            }
            Ok(Box::new(Noop {
                core: AlgorithmCore::new("noop", ctx.store.clone(), ctx.agent.clone()),
            }))
        });
        registry
    }

    #[test]
    fn lookup_by_name_and_alias() {
        let registry = registry();
        let ctx = FactoryContext::new(SharedStore::new(), "agent.0".into());
        let algo = registry.create("noop", &KnowledgeMap::new(), &ctx).unwrap();
        assert_eq!(algo.name(), "noop");
        assert!(registry.create("nothing", &KnowledgeMap::new(), &ctx).is_ok());
        assert_eq!(registry.resolve("nothing"), Some("noop"));
    }

    #[test]
    fn names_are_case_sensitive() {
        let registry = registry();
        let ctx = FactoryContext::new(SharedStore::new(), "agent.0".into());
        let err = registry.create("NOOP", &KnowledgeMap::new(), &ctx).err();
        assert_eq!(err, Some(MurmurError::unknown_algorithm("NOOP")));
        assert_eq!(
            registry.create("", &KnowledgeMap::new(), &ctx).err(),
            Some(MurmurError::EmptyName(FactoryKind::Algorithm))
        );
    }

    #[test]
    fn constructor_errors_pass_through() {
        let registry = registry();
        let ctx = FactoryContext::new(SharedStore::new(), "agent.0".into());
        let mut args = KnowledgeMap::new();
        args.insert("fail".into(), Value::from(1));
        assert!(matches!(
            registry.create("noop", &args, &ctx),
            Err(MurmurError::InvalidArgument { .. })
        ));
    }
}
