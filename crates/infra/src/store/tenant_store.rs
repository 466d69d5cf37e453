use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use forgescan_core::{Entity, TenantId};

/// Tenant-isolated store for domain records.
///
/// Keys come from the record itself via [`Entity::id`]; callers pass the
/// tenant explicitly so cross-tenant reads never happen by accident.
pub trait TenantStore<V: Entity>: Send + Sync {
    fn get(&self, tenant_id: TenantId, id: &V::Id) -> Option<V>;
    fn save(&self, tenant_id: TenantId, entity: V);
    fn list(&self, tenant_id: TenantId) -> Vec<V>;
}

impl<V, S> TenantStore<V> for Arc<S>
where
    V: Entity,
    S: TenantStore<V> + ?Sized,
{
    fn get(&self, tenant_id: TenantId, id: &V::Id) -> Option<V> {
        (**self).get(tenant_id, id)
    }

    fn save(&self, tenant_id: TenantId, entity: V) {
        (**self).save(tenant_id, entity)
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        (**self).list(tenant_id)
    }
}

/// In-memory tenant-isolated store for tests/dev.
#[derive(Debug)]
pub struct InMemoryTenantStore<V: Entity> {
    inner: RwLock<HashMap<(TenantId, V::Id), V>>,
}

impl<V: Entity> InMemoryTenantStore<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl<V: Entity> Default for InMemoryTenantStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TenantStore<V> for InMemoryTenantStore<V>
where
    V: Entity + Clone + Send + Sync + 'static,
    V::Id: Send + Sync,
{
    fn get(&self, tenant_id: TenantId, id: &V::Id) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(&(tenant_id, id.clone())).cloned()
    }

    fn save(&self, tenant_id: TenantId, entity: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, entity.id().clone()), entity);
        }
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter()
            .filter_map(|((t, _id), v)| if *t == tenant_id { Some(v.clone()) } else { None })
            .collect()
    }
}
