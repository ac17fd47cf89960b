//! Declarative component queries and the incremental query engine.
//!
//! A [`QuerySpec`] names the component types an entity must have — and the
//! ones it must *not* have — to match. The [`QueryEngine`] resolves specs
//! into [`Query`] objects keyed by their normalized signature, seeds a new
//! query from the live entity set, and thereafter updates every query
//! incrementally as components are attached and detached. Each query exposes
//! its matched entity vector and a membership event dispatcher.
//!
//! Queries never rescan: the engine is notified of every mutation and
//! adjusts only the affected memberships, firing [`ENTITY_ADDED`] /
//! [`ENTITY_REMOVED`] at the moment the index changes. Entities keep
//! back-edges to the queries they currently sit in, so removing an entity
//! touches exactly its own queries.

use std::collections::HashMap;

use weft_core::{Component, ComponentTypeId, Entity, EventDispatcher, ListenerId};

use crate::entity_store::{EntityRecord, EntityStore};
use crate::error::WorldError;
use crate::events::{COMPONENT_CHANGED, ENTITY_ADDED, ENTITY_REMOVED, EntityEvent};
use crate::registry::ComponentRegistry;

/// Registers a component type on demand and returns its id.
///
/// Query terms carry one of these instead of a resolved id so a spec can be
/// built before (or without) explicit registration.
pub(crate) type Registrar = fn(&mut ComponentRegistry) -> ComponentTypeId;

#[derive(Clone, Copy)]
struct QueryTerm {
    register: Registrar,
    negated: bool,
}

/// A declarative component predicate: every `with` type present, no
/// `without` type present.
///
/// ```rust
/// # use weft_core::Component;
/// # use weft_world::QuerySpec;
/// # #[derive(Clone, Default)] struct Position;
/// # impl Component for Position { fn type_name() -> &'static str { "Position" } }
/// # #[derive(Clone, Default)] struct Frozen;
/// # impl Component for Frozen { fn type_name() -> &'static str { "Frozen" } }
/// let movable = QuerySpec::new().with::<Position>().without::<Frozen>();
/// ```
#[derive(Clone, Default)]
pub struct QuerySpec {
    terms: Vec<QueryTerm>,
}

impl QuerySpec {
    /// Creates an empty spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires component `T` to be attached.
    #[must_use]
    pub fn with<T: Component>(mut self) -> Self {
        self.terms.push(QueryTerm {
            register: ComponentRegistry::register::<T>,
            negated: false,
        });
        self
    }

    /// Requires component `T` to be absent.
    #[must_use]
    pub fn without<T: Component>(mut self) -> Self {
        self.terms.push(QueryTerm {
            register: ComponentRegistry::register::<T>,
            negated: true,
        });
        self
    }
}

/// Canonical identity of a query: the sorted required and negated type ids.
///
/// Term order and duplicate terms do not affect the signature, so two specs
/// naming the same type sets resolve to the same query object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature {
    positive: Vec<ComponentTypeId>,
    negated: Vec<ComponentTypeId>,
}

impl QuerySignature {
    pub(crate) fn resolve(
        spec: &QuerySpec,
        registry: &mut ComponentRegistry,
    ) -> Result<Self, WorldError> {
        let mut positive = Vec::new();
        let mut negated = Vec::new();
        for term in &spec.terms {
            let tid = (term.register)(registry);
            if term.negated {
                negated.push(tid);
            } else {
                positive.push(tid);
            }
        }
        positive.sort_unstable();
        positive.dedup();
        negated.sort_unstable();
        negated.dedup();
        if positive.is_empty() {
            return Err(WorldError::EmptyQuery);
        }
        Ok(Self { positive, negated })
    }

    /// Human-readable normalized key: lower-cased type names, negated names
    /// prefixed with `!`, sorted and joined with `-`.
    pub(crate) fn key(&self, registry: &ComponentRegistry) -> String {
        let mut terms: Vec<String> = self
            .positive
            .iter()
            .map(|&tid| registry.key(tid).to_string())
            .chain(self.negated.iter().map(|&tid| format!("!{}", registry.key(tid))))
            .collect();
        terms.sort_unstable();
        terms.join("-")
    }
}

/// Index of a query within its engine; stable for the life of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(pub(crate) u32);

impl QueryId {
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A live query: matched entities plus a membership event dispatcher.
pub struct Query {
    signature: QuerySignature,
    key: String,
    entities: Vec<Entity>,
    pub(crate) dispatcher: EventDispatcher<EntityEvent>,
    reactive: bool,
}

impl Query {
    /// The entities currently matching this query, in match order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The normalized signature key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of required component types.
    #[must_use]
    pub fn num_components(&self) -> usize {
        self.signature.positive.len()
    }

    /// Whether any consumer subscribed to change events.
    #[must_use]
    pub fn is_reactive(&self) -> bool {
        self.reactive
    }

    fn matches(&self, record: &EntityRecord) -> bool {
        self.signature
            .positive
            .iter()
            .all(|tid| record.instances.contains_key(tid))
            && self
                .signature
                .negated
                .iter()
                .all(|tid| !record.instances.contains_key(tid))
    }

    fn include(&mut self, id: QueryId, entity: Entity, record: &mut EntityRecord) {
        self.entities.push(entity);
        record.queries.push(id);
        self.dispatcher.dispatch(ENTITY_ADDED, EntityEvent::entity(entity));
    }

    fn exclude(&mut self, id: QueryId, entity: Entity, record: &mut EntityRecord) {
        if let Some(pos) = self.entities.iter().position(|e| *e == entity) {
            self.entities.remove(pos);
        }
        record.queries.retain(|q| *q != id);
        self.dispatcher
            .dispatch(ENTITY_REMOVED, EntityEvent::entity(entity));
    }
}

/// Owns all queries, keyed by signature, and keeps them consistent with the
/// entity index.
#[derive(Default)]
pub struct QueryEngine {
    queries: Vec<Query>,
    by_signature: HashMap<QuerySignature, QueryId>,
}

impl QueryEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Returns `true` if no queries exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Returns the query for `id`.
    #[must_use]
    pub fn query(&self, id: QueryId) -> &Query {
        &self.queries[id.index()]
    }

    pub(crate) fn query_mut(&mut self, id: QueryId) -> &mut Query {
        &mut self.queries[id.index()]
    }

    /// Iterates queries in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Query> {
        self.queries.iter()
    }

    /// Resolves a spec to its query, creating and seeding it on first use.
    ///
    /// Seeding scans the current live entities and records matches without
    /// firing membership events.
    pub(crate) fn get_or_create(
        &mut self,
        spec: &QuerySpec,
        registry: &mut ComponentRegistry,
        entities: &mut EntityStore,
    ) -> Result<QueryId, WorldError> {
        let signature = QuerySignature::resolve(spec, registry)?;
        if let Some(&id) = self.by_signature.get(&signature) {
            return Ok(id);
        }

        let id = QueryId(self.queries.len() as u32);
        let mut query = Query {
            key: signature.key(registry),
            signature,
            entities: Vec::new(),
            dispatcher: EventDispatcher::new(),
            reactive: false,
        };
        for entity in entities.entities().to_vec() {
            if let Some(record) = entities.record_mut(entity)
                && query.matches(record)
            {
                query.entities.push(entity);
                record.queries.push(id);
            }
        }
        self.by_signature.insert(query.signature.clone(), id);
        self.queries.push(query);
        Ok(id)
    }

    /// Reindexes after `tid` was attached to `entity`.
    pub(crate) fn on_component_added(
        &mut self,
        entity: Entity,
        tid: ComponentTypeId,
        record: &mut EntityRecord,
    ) {
        for (index, query) in self.queries.iter_mut().enumerate() {
            let id = QueryId(index as u32);
            let listed = record.queries.contains(&id);
            if query.signature.negated.contains(&tid) {
                if listed {
                    query.exclude(id, entity, record);
                }
            } else if query.signature.positive.contains(&tid)
                && !listed
                && query.matches(record)
            {
                query.include(id, entity, record);
            }
        }
    }

    /// Reindexes after `tid` was logically detached from `entity`.
    pub(crate) fn on_component_removed(
        &mut self,
        entity: Entity,
        tid: ComponentTypeId,
        record: &mut EntityRecord,
    ) {
        for (index, query) in self.queries.iter_mut().enumerate() {
            let id = QueryId(index as u32);
            let listed = record.queries.contains(&id);
            if query.signature.negated.contains(&tid) && !listed && query.matches(record) {
                query.include(id, entity, record);
            } else if query.signature.positive.contains(&tid) && listed && !query.matches(record) {
                query.exclude(id, entity, record);
            }
        }
    }

    /// Drops `entity` from every query it sits in, via its back-edges.
    pub(crate) fn on_entity_removed(&mut self, entity: Entity, record: &mut EntityRecord) {
        for id in std::mem::take(&mut record.queries) {
            let query = &mut self.queries[id.index()];
            if let Some(pos) = query.entities.iter().position(|e| *e == entity) {
                query.entities.remove(pos);
            }
            query
                .dispatcher
                .dispatch(ENTITY_REMOVED, EntityEvent::entity(entity));
        }
    }

    /// Fires a change event on every reactive query `entity` belongs to.
    pub(crate) fn notify_changed(
        &mut self,
        entity: Entity,
        tid: ComponentTypeId,
        record: &EntityRecord,
    ) {
        for &id in &record.queries {
            let query = &mut self.queries[id.index()];
            if query.reactive {
                query
                    .dispatcher
                    .dispatch(COMPONENT_CHANGED, EntityEvent::component(entity, tid));
            }
        }
    }

    /// Marks a query as paying the change-delivery cost.
    pub(crate) fn mark_reactive(&mut self, id: QueryId) {
        self.queries[id.index()].reactive = true;
    }

    /// Subscribes a listener buffer to one of `id`'s membership events.
    pub(crate) fn subscribe(&mut self, id: QueryId, event: &str) -> ListenerId {
        self.queries[id.index()].dispatcher.add_listener(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Position;
    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Velocity;
    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Frozen;
    impl Component for Frozen {
        fn type_name() -> &'static str {
            "Frozen"
        }
    }

    #[test]
    fn test_signature_ignores_term_order() {
        let mut registry = ComponentRegistry::new();
        let a = QuerySignature::resolve(
            &QuerySpec::new().with::<Position>().with::<Velocity>(),
            &mut registry,
        )
        .unwrap();
        let b = QuerySignature::resolve(
            &QuerySpec::new().with::<Velocity>().with::<Position>(),
            &mut registry,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_distinguishes_negation() {
        let mut registry = ComponentRegistry::new();
        let plain = QuerySignature::resolve(
            &QuerySpec::new().with::<Position>().with::<Frozen>(),
            &mut registry,
        )
        .unwrap();
        let negated = QuerySignature::resolve(
            &QuerySpec::new().with::<Position>().without::<Frozen>(),
            &mut registry,
        )
        .unwrap();
        assert_ne!(plain, negated);
    }

    #[test]
    fn test_signature_dedups_repeated_terms() {
        let mut registry = ComponentRegistry::new();
        let single = QuerySignature::resolve(&QuerySpec::new().with::<Position>(), &mut registry)
            .unwrap();
        let repeated = QuerySignature::resolve(
            &QuerySpec::new().with::<Position>().with::<Position>(),
            &mut registry,
        )
        .unwrap();
        assert_eq!(single, repeated);
    }

    #[test]
    fn test_empty_positive_set_is_rejected() {
        let mut registry = ComponentRegistry::new();
        let err = QuerySignature::resolve(&QuerySpec::new().without::<Frozen>(), &mut registry)
            .unwrap_err();
        assert_eq!(err, WorldError::EmptyQuery);
    }

    #[test]
    fn test_key_is_lowercased_and_sorted() {
        let mut registry = ComponentRegistry::new();
        let signature = QuerySignature::resolve(
            &QuerySpec::new()
                .with::<Velocity>()
                .with::<Position>()
                .without::<Frozen>(),
            &mut registry,
        )
        .unwrap();
        assert_eq!(signature.key(&registry), "!frozen-position-velocity");
    }

    #[test]
    fn test_engine_dedups_by_signature() {
        let mut registry = ComponentRegistry::new();
        let mut entities = EntityStore::new(0);
        let mut engine = QueryEngine::new();
        let a = engine
            .get_or_create(
                &QuerySpec::new().with::<Position>().with::<Velocity>(),
                &mut registry,
                &mut entities,
            )
            .unwrap();
        let b = engine
            .get_or_create(
                &QuerySpec::new().with::<Velocity>().with::<Position>(),
                &mut registry,
                &mut entities,
            )
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(engine.len(), 1);
    }
}
