//! Service container: one shared instance per concrete type.
//!
//! Components register themselves with [`ServiceContainer::provide`] during
//! bootstrap; consumers resolve by type. The container itself is stored in
//! the [`DataStore`](crate::store::DataStore) under a well-known key.

use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{Result, SiloError};

struct Registration {
    instance: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

#[derive(Default)]
pub struct ServiceContainer {
    services: DashMap<TypeId, Registration>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register `instance` as the `T` service, replacing any earlier one.
    pub fn provide<T: Any + Send + Sync>(&self, instance: Arc<T>) {
        tracing::debug!(service = type_name::<T>(), "service registered");
        self.services.insert(
            TypeId::of::<T>(),
            Registration {
                instance,
                type_name: type_name::<T>(),
            },
        );
    }

    pub fn try_resolve<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let instance = self
            .services
            .get(&TypeId::of::<T>())
            .map(|r| Arc::clone(&r.value().instance))?;
        instance.downcast::<T>().ok()
    }

    /// Resolve the `T` service or fail with `ServiceNotConfigured`.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.try_resolve::<T>()
            .ok_or(SiloError::ServiceNotConfigured {
                service: type_name::<T>(),
            })
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    pub fn registered(&self) -> Vec<&'static str> {
        self.services.iter().map(|e| e.value().type_name).collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    struct Mailer {
        from: &'static str,
    }

    #[test]
    fn resolve_by_type() {
        let c = ServiceContainer::new();
        c.provide(Arc::new(Mailer { from: "ops@" }));
        assert_eq!(c.resolve::<Mailer>().unwrap().from, "ops@");
        assert!(c.contains::<Mailer>());
    }

    #[test]
    fn missing_service_is_reported() {
        let c = ServiceContainer::new();
        let err = c.resolve::<Mailer>().err().unwrap();
        assert_eq!(err.code().as_str(), "SERVICE_NOT_CONFIGURED");
    }
}
