//! Process-wide schema registry
//!
//! Typed schemas are keyed by `TypeId`, descriptions by full type name.
//! Lookups take a read lock only. A type is built outside the lock on first
//! use and inserted with first-writer-wins, so concurrent first use never
//! yields two divergent schemas.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::observability::{self, Event, Logger};

use super::errors::{SchemaError, SchemaResult};
use super::typed::{Indexable, TypeSchema};
use super::types::TypeDescription;

type AnySchema = Arc<dyn Any + Send + Sync>;

/// Registry of schemas, read-only after a type's first registration
#[derive(Default)]
pub struct SchemaRegistry {
    typed: RwLock<HashMap<TypeId, AnySchema>>,
    described: RwLock<HashMap<String, Arc<TypeDescription>>>,
}

static GLOBAL: OnceLock<SchemaRegistry> = OnceLock::new();

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process
    pub fn global() -> &'static SchemaRegistry {
        GLOBAL.get_or_init(SchemaRegistry::new)
    }

    /// Returns the schema of `T`, building and registering it on first use.
    pub fn resolve<T: Indexable>(&self) -> SchemaResult<Arc<TypeSchema<T>>> {
        if let Some(found) = self.lookup::<T>() {
            return Ok(found);
        }

        let built = T::type_schema()?;

        // The name must be free (or bound to an equal description) before the
        // typed schema becomes visible to `lookup`.
        self.bind_description(built.description_arc())?;

        let built: AnySchema = Arc::new(built);
        let winner = {
            let mut typed = self.typed.write().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(typed.entry(TypeId::of::<T>()).or_insert(built))
        };
        winner
            .downcast::<TypeSchema<T>>()
            .map_err(|_| SchemaError::unregistered_type(std::any::type_name::<T>()))
    }

    /// Returns the schema of `T` if it was already resolved
    pub fn lookup<T: 'static>(&self) -> Option<Arc<TypeSchema<T>>> {
        let typed = self.typed.read().unwrap_or_else(PoisonError::into_inner);
        typed
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|schema| schema.downcast::<TypeSchema<T>>().ok())
    }

    /// Registers a description for raw-document packing.
    ///
    /// Registering an identical description again is a no-op; a different
    /// description under the same name is a conflict.
    pub fn register_description(
        &self,
        description: TypeDescription,
    ) -> SchemaResult<Arc<TypeDescription>> {
        self.bind_description(Arc::new(description))
    }

    /// Returns the description registered under a full type name
    pub fn description(&self, type_name: &str) -> SchemaResult<Arc<TypeDescription>> {
        let described = self.described.read().unwrap_or_else(PoisonError::into_inner);
        described
            .get(type_name)
            .cloned()
            .ok_or_else(|| SchemaError::unregistered_type(type_name))
    }

    /// Names of all registered types, sorted
    pub fn type_names(&self) -> Vec<String> {
        let described = self.described.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = described.keys().cloned().collect();
        names.sort();
        names
    }

    fn bind_description(
        &self,
        description: Arc<TypeDescription>,
    ) -> SchemaResult<Arc<TypeDescription>> {
        let mut described = self.described.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = described.get(description.type_name()) {
            if **existing == *description {
                return Ok(Arc::clone(existing));
            }
            return Err(SchemaError::schema_conflict(description.type_name()));
        }

        described.insert(description.type_name().to_string(), Arc::clone(&description));
        drop(described);

        observability::metrics().increment_schemas_registered();
        Logger::log(
            Event::SchemaRegistered.default_severity(),
            Event::SchemaRegistered.as_str(),
            &[("type", description.type_name())],
        );

        Ok(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyKind;
    use crate::schema::SchemaErrorCode;
    use serde::{Deserialize, Serialize};
    use std::thread;

    #[derive(Debug, Serialize, Deserialize)]
    struct Account {
        id: i64,
        owner: String,
    }

    impl Indexable for Account {
        fn type_schema() -> SchemaResult<TypeSchema<Self>> {
            TypeSchema::builder("Bank.Account")
                .primary_key("Id", KeyKind::Integer, |a: &Account| a.id.into())
                .index("Owner", KeyKind::Text, |a: &Account| a.owner.as_str().into())
                .build()
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Keyless;

    impl Indexable for Keyless {
        fn type_schema() -> SchemaResult<TypeSchema<Self>> {
            TypeSchema::builder("Keyless").build()
        }
    }

    #[test]
    fn test_resolve_is_memoized() {
        let registry = SchemaRegistry::new();
        let first = registry.resolve::<Account>().unwrap();
        let second = registry.resolve::<Account>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_resolve_registers_description() {
        let registry = SchemaRegistry::new();
        registry.resolve::<Account>().unwrap();

        let description = registry.description("Bank.Account").unwrap();
        assert_eq!(description.primary_key().name, "Id");
        assert_eq!(registry.type_names(), vec!["Bank.Account".to_string()]);
    }

    #[test]
    fn test_keyless_type_is_unregistered() {
        let registry = SchemaRegistry::new();
        let err = registry.resolve::<Keyless>().err().unwrap();
        assert_eq!(err.code(), SchemaErrorCode::UnregisteredType);
        assert!(registry.lookup::<Keyless>().is_none());
    }

    #[test]
    fn test_unknown_description_is_unregistered() {
        let registry = SchemaRegistry::new();
        let err = registry.description("Nowhere").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::UnregisteredType);
    }

    #[test]
    fn test_identical_description_is_idempotent() {
        let registry = SchemaRegistry::new();
        let build = || {
            TypeDescription::builder("Doc")
                .primary_key("Id", KeyKind::Text)
                .build()
                .unwrap()
        };

        let first = registry.register_description(build()).unwrap();
        let second = registry.register_description(build()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_conflicting_description_rejected() {
        let registry = SchemaRegistry::new();
        registry
            .register_description(
                TypeDescription::builder("Doc")
                    .primary_key("Id", KeyKind::Text)
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let err = registry
            .register_description(
                TypeDescription::builder("Doc")
                    .primary_key("Id", KeyKind::Integer)
                    .build()
                    .unwrap(),
            )
            .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::SchemaConflict);
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Clashing {
        id: i64,
    }

    impl Indexable for Clashing {
        fn type_schema() -> SchemaResult<TypeSchema<Self>> {
            TypeSchema::builder("Bank.Clash")
                .primary_key("Id", KeyKind::Integer, |c: &Clashing| c.id.into())
                .build()
        }
    }

    #[test]
    fn test_conflicting_type_never_cached() {
        let registry = SchemaRegistry::new();
        registry
            .register_description(
                TypeDescription::builder("Bank.Clash")
                    .primary_key("Id", KeyKind::Text)
                    .build()
                    .unwrap(),
            )
            .unwrap();

        for _ in 0..2 {
            let err = registry.resolve::<Clashing>().err().unwrap();
            assert_eq!(err.code(), SchemaErrorCode::SchemaConflict);
        }
        assert!(registry.lookup::<Clashing>().is_none());
        assert_eq!(
            registry.description("Bank.Clash").unwrap().primary_key().kind,
            KeyKind::Text
        );
    }

    #[test]
    fn test_concurrent_first_use_yields_one_schema() {
        let registry = Arc::new(SchemaRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.resolve::<Account>().unwrap())
            })
            .collect();

        let schemas: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for schema in &schemas[1..] {
            assert!(Arc::ptr_eq(&schemas[0], schema));
        }
    }
}
