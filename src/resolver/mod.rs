use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroU32;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::api::{ApiClient, ApiError};
use crate::entity::{Entity, EntityId, ForeignKeyField};
use crate::source;

/// Referenced entities for one load cycle, per foreign-key field.
///
/// Built whole by [`RelatedEntityResolver::resolve`] and replaced whole on the
/// next load; nothing is ever evicted from it individually.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelatedEntityCache {
    by_field: HashMap<String, HashMap<EntityId, Entity>>,
    missing: HashMap<String, BTreeSet<EntityId>>,
}

impl RelatedEntityCache {
    pub fn get(&self, field: &str, id: &str) -> Option<&Entity> {
        self.by_field.get(field).and_then(|m| m.get(id))
    }

    pub fn insert(&mut self, field: &str, id: EntityId, entity: Entity) {
        self.by_field
            .entry(field.to_string())
            .or_default()
            .insert(id, entity);
    }

    pub fn resolved_count(&self, field: &str) -> usize {
        self.by_field.get(field).map(|m| m.len()).unwrap_or(0)
    }

    /// Ids of `field` that were referenced but could not be fetched.
    pub fn missing(&self, field: &str) -> Vec<EntityId> {
        self.missing
            .get(field)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn mark_missing(&mut self, field: &str, id: EntityId) {
        self.missing.entry(field.to_string()).or_default().insert(id);
    }
}

/// Distinct non-null ids held by `field` across `entities`, in sorted order.
pub fn distinct_ids(entities: &[Entity], field: &str) -> BTreeSet<EntityId> {
    entities.iter().filter_map(|e| e.foreign_id(field)).collect()
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct RelatedEntityResolver<'a, C: ApiClient + ?Sized> {
    api: &'a C,
    limiter: Option<Arc<DirectLimiter>>,
}

impl<'a, C: ApiClient + ?Sized> RelatedEntityResolver<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api, limiter: None }
    }

    /// Caps related lookups at `per_second` requests. Zero means unlimited.
    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.limiter = NonZeroU32::new(per_second)
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))));
        self
    }

    /// One fetch per distinct id per field; all of them in flight together.
    ///
    /// Lookups that fail are logged and left out of the cache so their rows
    /// render as "no data". Only an expired session aborts the whole cycle.
    pub async fn resolve(
        &self,
        entities: &[Entity],
        fields: &[ForeignKeyField],
    ) -> Result<RelatedEntityCache, ApiError> {
        let mut per_field: FuturesUnordered<_> = fields
            .iter()
            .map(|fk| async move { (fk, self.resolve_field(entities, fk).await) })
            .collect();

        let mut cache = RelatedEntityCache::default();
        while let Some((fk, outcomes)) = per_field.next().await {
            for (id, outcome) in outcomes {
                match outcome {
                    Ok(entity) => cache.insert(&fk.field, id, entity),
                    Err(ApiError::Auth) => return Err(ApiError::Auth),
                    Err(e) => {
                        tracing::warn!(
                            field = %fk.field,
                            collection = %fk.collection,
                            id = %id,
                            error = %e,
                            "related entity unavailable"
                        );
                        cache.mark_missing(&fk.field, id);
                    }
                }
            }
        }
        tracing::debug!(fields = fields.len(), "related entities resolved");
        Ok(cache)
    }

    async fn resolve_field(
        &self,
        entities: &[Entity],
        fk: &ForeignKeyField,
    ) -> Vec<(EntityId, Result<Entity, ApiError>)> {
        let lookups: FuturesUnordered<_> = distinct_ids(entities, &fk.field)
            .into_iter()
            .map(|id| async move {
                if let Some(lim) = self.limiter.as_ref() {
                    lim.until_ready().await;
                }
                let outcome =
                    source::fetch_entity(self.api, &fk.collection, &id, fk.response_key.as_deref())
                        .await;
                (id, outcome)
            })
            .collect();
        lookups.collect().await
    }
}
