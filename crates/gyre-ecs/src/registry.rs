//! The component registry and per-tick processor pipeline.
//!
//! [`Registry`] owns all entity/component state and the processor list.
//! It is a plain [`Send`] value: every mutating operation takes
//! `&mut self`, and one `update()` call executes exactly one tick:
//! deferred-deletion flush first, then every processor in dependency
//! order. Free-running operation is layered on top by the engine crate,
//! which locks the registry for one tick at a time.
//!
//! # Storage
//!
//! Two structures are kept consistent at all times:
//!
//! - the **type index**, mapping each component type to the set of
//!   entities currently holding it, and
//! - the **entity map**, mapping each entity to its component records.
//!
//! An entity appears in a type's index entry iff its record holds a
//! component of that type. Both use insertion-ordered maps so iteration
//! order (and therefore processor-observed order) is reproducible
//! between runs.

use std::any::TypeId;
use std::mem;
use std::time::Instant;

use indexmap::{IndexMap, IndexSet};

use gyre_core::{Component, Entity, RegistryError, ScheduleError, StepError, TickId};

use crate::metrics::TickMetrics;
use crate::processor::Processor;
use crate::query::ComponentSet;
use crate::scheduler::sorted_order;

/// Component records of one entity, keyed by concrete type.
type EntityRecord = IndexMap<TypeId, Box<dyn Component>>;

/// The entity/component store plus processor scheduler.
///
/// # Examples
///
/// ```
/// use gyre_core::{components, Component};
/// use gyre_ecs::Registry;
///
/// #[derive(Debug, PartialEq)]
/// struct Health(i32);
/// impl Component for Health {}
///
/// let mut registry = Registry::new();
/// let hero = registry.create_entity(components![Health(100)]);
/// assert_eq!(registry.component_of::<Health>(hero), Some(&Health(100)));
/// ```
pub struct Registry {
    processors: Vec<Box<dyn Processor>>,
    index: IndexMap<TypeId, IndexSet<Entity>>,
    entities: IndexMap<Entity, EntityRecord>,
    next_entity: u64,
    dead: IndexSet<Entity>,
    tick: TickId,
}

impl Registry {
    /// An empty registry. Entity IDs start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
            index: IndexMap::new(),
            entities: IndexMap::new(),
            next_entity: 1,
            dead: IndexSet::new(),
            tick: TickId(0),
        }
    }

    /// Number of ticks executed so far.
    #[must_use]
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// Number of entity records, including entities pending deletion.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of registered processors.
    #[must_use]
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Drop every entity, component, processor, and pending deletion and
    /// restart the ID counter. Begins a new run: IDs handed out before
    /// the reset may be seen again.
    pub fn full_reset(&mut self) {
        log::info!("registry full reset");
        self.processors.clear();
        self.index.clear();
        self.entities.clear();
        self.next_entity = 1;
        self.dead.clear();
        self.tick = TickId(0);
    }

    // ── Entities ────────────────────────────────────────────────────

    /// Allocate the next entity ID and attach the given components.
    ///
    /// Duplicate component types within the bundle resolve
    /// first-attached-wins. Never fails.
    pub fn create_entity<I>(&mut self, bundle: I) -> Entity
    where
        I: IntoIterator<Item = Box<dyn Component>>,
    {
        let entity = Entity(self.next_entity);
        self.next_entity += 1;

        let mut record = EntityRecord::new();
        for component in bundle {
            let key = component.type_key();
            self.index.entry(key).or_default().insert(entity);
            record.entry(key).or_insert(component);
        }
        self.entities.insert(entity, record);
        entity
    }

    /// Mark `entity` for deletion at the start of the next tick.
    pub fn delete_entity(&mut self, entity: Entity) {
        self.dead.insert(entity);
    }

    /// Strip all of `entity`'s components from every index and drop its
    /// record synchronously. Unknown entities are a no-op.
    pub fn delete_entity_immediate(&mut self, entity: Entity) {
        if let Some(record) = self.entities.shift_remove(&entity) {
            for key in record.keys() {
                if let Some(holders) = self.index.get_mut(key) {
                    holders.shift_remove(&entity);
                    if holders.is_empty() {
                        self.index.shift_remove(key);
                    }
                }
            }
        }
        self.dead.shift_remove(&entity);
    }

    /// Whether `entity` has a record and is not pending deletion.
    #[must_use]
    pub fn entity_exists(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity) && !self.dead.contains(&entity)
    }

    // ── Components ──────────────────────────────────────────────────

    /// Attach `component` to `entity`, overwriting any existing component
    /// of the same type.
    ///
    /// Unknown entities are treated as newly seen: a backing record is
    /// created and the ID allocator is bumped past the foreign ID so
    /// allocation stays monotonic.
    pub fn add_component<C: Component>(&mut self, entity: Entity, component: C) {
        self.add_boxed_component(entity, Box::new(component));
    }

    /// Type-erased variant of [`add_component`](Registry::add_component),
    /// keyed by the boxed value's runtime type.
    pub fn add_boxed_component(&mut self, entity: Entity, component: Box<dyn Component>) {
        if !self.entities.contains_key(&entity) {
            self.next_entity = self.next_entity.max(entity.0 + 1);
        }
        let key = component.type_key();
        self.entities.entry(entity).or_default().insert(key, component);
        self.index.entry(key).or_default().insert(entity);
    }

    /// Detach and return `entity`'s component of type `C`.
    ///
    /// The type's index entry is pruned when the last holder goes.
    /// Fails with [`RegistryError::ComponentNotFound`] if the entity does
    /// not currently hold one.
    pub fn remove_component<C: Component>(&mut self, entity: Entity) -> Result<C, RegistryError> {
        let not_found = RegistryError::ComponentNotFound {
            entity,
            component: std::any::type_name::<C>(),
        };
        let key = TypeId::of::<C>();
        let record = self.entities.get_mut(&entity).ok_or(not_found.clone())?;
        let boxed = record.shift_remove(&key).ok_or(not_found.clone())?;

        if let Some(holders) = self.index.get_mut(&key) {
            holders.shift_remove(&entity);
            if holders.is_empty() {
                self.index.shift_remove(&key);
            }
        }

        let any: Box<dyn std::any::Any> = boxed;
        any.downcast::<C>().map(|c| *c).map_err(|_| not_found)
    }

    /// Whether `entity` currently holds a component of type `C`.
    #[must_use]
    pub fn has_component<C: Component>(&self, entity: Entity) -> bool {
        self.raw_component(entity, TypeId::of::<C>()).is_some()
    }

    /// Number of entities currently holding a component of type `C`.
    #[must_use]
    pub fn holder_count<C: Component>(&self) -> usize {
        self.index
            .get(&TypeId::of::<C>())
            .map_or(0, IndexSet::len)
    }

    /// Whether `entity` currently holds every component type in `Q`.
    #[must_use]
    pub fn has_components<Q: ComponentSet>(&self, entity: Entity) -> bool {
        Q::type_keys()
            .iter()
            .all(|key| self.raw_component(entity, *key).is_some())
    }

    /// `entity`'s component of type `C`, if present.
    #[must_use]
    pub fn component_of<C: Component>(&self, entity: Entity) -> Option<&C> {
        self.raw_component(entity, TypeId::of::<C>())
            .and_then(|c| c.downcast_ref::<C>())
    }

    /// Mutable access to `entity`'s component of type `C`, if present.
    #[must_use]
    pub fn component_of_mut<C: Component>(&mut self, entity: Entity) -> Option<&mut C> {
        self.entities
            .get_mut(&entity)?
            .get_mut(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast_mut::<C>())
    }

    /// `entity`'s component of type `C`, or the caller-supplied fallback.
    #[must_use]
    pub fn component_of_or<'a, C: Component>(&'a self, entity: Entity, default: &'a C) -> &'a C {
        self.component_of::<C>(entity).unwrap_or(default)
    }

    /// Each component type in `Q` for `entity`, independently optional.
    #[must_use]
    pub fn components_of<Q: ComponentSet>(&self, entity: Entity) -> Q::OptRefs<'_> {
        Q::fetch_optional(self, entity)
    }

    /// All `(entity, component)` pairs for component type `C`.
    ///
    /// The holder set is snapshotted when the call is made; the iterator
    /// itself is lazy.
    pub fn components<'a, C: Component>(&'a self) -> impl Iterator<Item = (Entity, &'a C)> + 'a {
        let holders: Vec<Entity> = self
            .index
            .get(&TypeId::of::<C>())
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        holders
            .into_iter()
            .filter_map(move |entity| self.component_of::<C>(entity).map(|c| (entity, c)))
    }

    /// Mutable variant of [`components`](Registry::components).
    pub fn components_mut<'a, C: Component>(
        &'a mut self,
    ) -> impl Iterator<Item = (Entity, &'a mut C)> + 'a {
        self.entities.iter_mut().filter_map(|(entity, record)| {
            record
                .get_mut(&TypeId::of::<C>())
                .and_then(|boxed| boxed.downcast_mut::<C>())
                .map(|c| (*entity, c))
        })
    }

    /// All `(entity, components)` tuples for the entities holding every
    /// type in `Q`, computed fresh at call time.
    ///
    /// ```
    /// use gyre_core::{components, Component};
    /// use gyre_ecs::Registry;
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct Pos(f32);
    /// impl Component for Pos {}
    /// #[derive(Debug, PartialEq)]
    /// struct Vel(f32);
    /// impl Component for Vel {}
    ///
    /// let mut registry = Registry::new();
    /// let mover = registry.create_entity(components![Pos(0.0), Vel(1.0)]);
    /// registry.create_entity(components![Pos(5.0)]);
    ///
    /// let hits: Vec<_> = registry.query::<(Pos, Vel)>().collect();
    /// assert_eq!(hits, vec![(mover, (&Pos(0.0), &Vel(1.0)))]);
    /// ```
    pub fn query<'a, Q: ComponentSet>(
        &'a self,
    ) -> impl Iterator<Item = (Entity, Q::Refs<'a>)> + 'a {
        self.entities_with::<Q>()
            .into_iter()
            .filter_map(move |entity| Q::fetch(self, entity).map(|refs| (entity, refs)))
    }

    /// IDs of the entities currently holding every type in `Q`, in type
    /// index order of `Q`'s first component.
    #[must_use]
    pub fn entities_with<Q: ComponentSet>(&self) -> Vec<Entity> {
        let keys = Q::type_keys();
        let Some(first) = self.index.get(&keys[0]) else {
            return Vec::new();
        };
        first
            .iter()
            .copied()
            .filter(|entity| {
                keys[1..]
                    .iter()
                    .all(|key| self.index.get(key).is_some_and(|set| set.contains(entity)))
            })
            .collect()
    }

    pub(crate) fn raw_component(&self, entity: Entity, key: TypeId) -> Option<&dyn Component> {
        self.entities.get(&entity)?.get(&key).map(|b| b.as_ref())
    }

    // ── Processors ──────────────────────────────────────────────────

    /// Register a processor and re-run the dependency sort.
    ///
    /// On a cycle the registration is rejected and the registry is left
    /// exactly as before the call.
    pub fn add_processor(&mut self, processor: Box<dyn Processor>) -> Result<(), ScheduleError> {
        let name = processor.name();
        self.processors.push(processor);
        match sorted_order(&self.processors) {
            Ok(order) => {
                self.apply_order(order);
                log::debug!(
                    "registered processor '{name}'; order now [{}]",
                    self.processor_names().join(", ")
                );
                Ok(())
            }
            Err(err) => {
                self.processors.pop();
                log::warn!("rejected processor '{name}': {err}");
                Err(err)
            }
        }
    }

    /// Remove every registered instance of processor type `P`.
    ///
    /// Removal cannot invalidate the existing order, so no re-sort runs.
    pub fn remove_processor<P: Processor>(&mut self) {
        let before = self.processors.len();
        self.processors.retain(|p| !p.is::<P>());
        if self.processors.len() != before {
            log::debug!(
                "removed processor type {}; order now [{}]",
                std::any::type_name::<P>(),
                self.processor_names().join(", ")
            );
        }
    }

    /// The first registered instance of processor type `P`, if any.
    #[must_use]
    pub fn processor<P: Processor>(&self) -> Option<&P> {
        self.processors.iter().find_map(|p| p.downcast_ref::<P>())
    }

    fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    fn apply_order(&mut self, order: Vec<usize>) {
        let mut slots: Vec<Option<Box<dyn Processor>>> =
            self.processors.drain(..).map(Some).collect();
        self.processors = order.into_iter().filter_map(|i| slots[i].take()).collect();
        debug_assert_eq!(self.processors.len(), slots.len());
    }

    // ── Tick ────────────────────────────────────────────────────────

    /// Execute one tick: flush pending deletions, then run every
    /// processor in dependency order against this registry.
    ///
    /// A processor error aborts the tick; mutations applied before the
    /// failure stay applied. Processors registered from inside a tick
    /// join the pipeline when the tick ends; removals of currently
    /// running processors take effect the next tick.
    pub fn update(&mut self) -> Result<TickMetrics, StepError> {
        let tick_start = Instant::now();
        self.tick.0 += 1;

        let flush_start = Instant::now();
        let entities_flushed = self.flush_dead();
        let flush_us = flush_start.elapsed().as_micros() as u64;

        let mut processor_us = Vec::with_capacity(self.processors.len());
        let mut failure = None;

        // Detach the pipeline so processors can take `&mut self`.
        let mut processors = mem::take(&mut self.processors);
        for processor in processors.iter_mut() {
            let start = Instant::now();
            let result = processor.process(self);
            processor_us.push((processor.name(), start.elapsed().as_micros() as u64));
            if let Err(reason) = result {
                failure = Some(StepError::ProcessorFailed {
                    name: processor.name().to_string(),
                    reason,
                });
                break;
            }
        }

        // Reinstall, then fold in anything registered mid-tick.
        let added = mem::replace(&mut self.processors, processors);
        for processor in added {
            if let Err(err) = self.add_processor(processor) {
                log::warn!("dropping processor registered mid-tick: {err}");
            }
        }

        match failure {
            Some(err) => Err(err),
            None => {
                log::trace!(
                    "tick {} complete ({} entities flushed)",
                    self.tick,
                    entities_flushed
                );
                Ok(TickMetrics {
                    tick: self.tick,
                    total_us: tick_start.elapsed().as_micros() as u64,
                    flush_us,
                    entities_flushed,
                    processor_us,
                })
            }
        }
    }

    fn flush_dead(&mut self) -> usize {
        let dead = mem::take(&mut self.dead);
        let count = dead.len();
        for entity in dead {
            self.delete_entity_immediate(entity);
        }
        count
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gyre_core::{components, ProcessError};

    #[derive(Debug, PartialEq)]
    struct Health(i32);
    impl Component for Health {}

    #[derive(Debug, PartialEq)]
    struct Armor(u8);
    impl Component for Armor {}

    #[test]
    fn entity_ids_are_monotonic_from_one() {
        let mut registry = Registry::new();
        let a = registry.create_entity(components![]);
        let b = registry.create_entity(components![Health(1)]);
        assert_eq!(a, Entity(1));
        assert_eq!(b, Entity(2));
    }

    #[test]
    fn create_entity_first_component_wins() {
        let mut registry = Registry::new();
        let e = registry.create_entity(components![Health(1), Health(2)]);
        assert_eq!(registry.component_of::<Health>(e), Some(&Health(1)));
    }

    #[test]
    fn add_component_overwrites() {
        let mut registry = Registry::new();
        let e = registry.create_entity(components![Health(1)]);
        registry.add_component(e, Health(9));
        assert_eq!(registry.component_of::<Health>(e), Some(&Health(9)));
    }

    #[test]
    fn add_component_to_unknown_entity_creates_record_and_bumps_allocator() {
        let mut registry = Registry::new();
        registry.add_component(Entity(10), Health(5));
        assert!(registry.entity_exists(Entity(10)));
        assert_eq!(registry.component_of::<Health>(Entity(10)), Some(&Health(5)));

        // The allocator must never revisit the foreign ID.
        let next = registry.create_entity(components![]);
        assert_eq!(next, Entity(11));
    }

    #[test]
    fn remove_component_returns_value_and_prunes_index() {
        let mut registry = Registry::new();
        let e = registry.create_entity(components![Health(7)]);
        assert_eq!(registry.remove_component::<Health>(e), Ok(Health(7)));
        assert!(!registry.has_component::<Health>(e));
        // Index entry for a type with no holders must disappear.
        assert!(registry.components::<Health>().next().is_none());
    }

    #[test]
    fn remove_component_missing_fails() {
        let mut registry = Registry::new();
        let e = registry.create_entity(components![]);
        let err = registry.remove_component::<Health>(e).unwrap_err();
        let RegistryError::ComponentNotFound { entity, .. } = err;
        assert_eq!(entity, e);
    }

    #[test]
    fn deferred_delete_takes_effect_on_next_tick() {
        let mut registry = Registry::new();
        let e = registry.create_entity(components![Health(1), Armor(2)]);
        registry.delete_entity(e);

        // Marked but not yet flushed: invisible to existence checks,
        // still present in the store.
        assert!(!registry.entity_exists(e));
        assert_eq!(registry.entity_count(), 1);

        registry.update().unwrap();
        assert_eq!(registry.entity_count(), 0);
        assert!(registry.components::<Health>().next().is_none());
        assert!(registry.components::<Armor>().next().is_none());
    }

    #[test]
    fn immediate_delete_is_synchronous() {
        let mut registry = Registry::new();
        let e = registry.create_entity(components![Health(1)]);
        registry.delete_entity_immediate(e);
        assert!(!registry.entity_exists(e));
        assert_eq!(registry.entity_count(), 0);
    }

    #[test]
    fn components_snapshot_tolerates_mid_iteration_state() {
        let mut registry = Registry::new();
        registry.create_entity(components![Health(1)]);
        registry.create_entity(components![Health(2)]);
        let seen: Vec<i32> = registry.components::<Health>().map(|(_, h)| h.0).collect();
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn components_mut_edits_in_place() {
        let mut registry = Registry::new();
        let e = registry.create_entity(components![Health(10)]);
        for (_, health) in registry.components_mut::<Health>() {
            health.0 -= 4;
        }
        assert_eq!(registry.component_of::<Health>(e), Some(&Health(6)));
    }

    #[test]
    fn component_of_or_falls_back() {
        let mut registry = Registry::new();
        let e = registry.create_entity(components![]);
        let fallback = Health(-1);
        assert_eq!(registry.component_of_or(e, &fallback), &Health(-1));
    }

    #[test]
    fn full_reset_restarts_the_run() {
        let mut registry = Registry::new();
        registry.create_entity(components![Health(1)]);
        registry.update().unwrap();
        registry.full_reset();
        assert_eq!(registry.entity_count(), 0);
        assert_eq!(registry.tick(), TickId(0));
        assert_eq!(registry.create_entity(components![]), Entity(1));
    }

    // ── Processor pipeline ──────────────────────────────────────────

    struct Recorder {
        label: &'static str,
        log: std::sync::Arc<std::sync::Mutex<Vec<&'static str>>>,
    }
    impl Processor for Recorder {
        fn name(&self) -> &'static str {
            self.label
        }
        fn process(&mut self, _: &mut Registry) -> Result<(), ProcessError> {
            self.log.lock().unwrap().push(self.label);
            Ok(())
        }
    }

    struct Failing;
    impl Processor for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn process(&mut self, _: &mut Registry) -> Result<(), ProcessError> {
            Err(ProcessError::Failed {
                reason: "synthetic".into(),
            })
        }
    }

    #[test]
    fn update_runs_processors_and_reports_metrics() {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        registry
            .add_processor(Box::new(Recorder {
                label: "only",
                log: log.clone(),
            }))
            .unwrap();

        let metrics = registry.update().unwrap();
        assert_eq!(metrics.tick, TickId(1));
        assert_eq!(metrics.processor_us.len(), 1);
        assert_eq!(metrics.processor_us[0].0, "only");
        assert_eq!(log.lock().unwrap().as_slice(), &["only"]);
    }

    #[test]
    fn failing_processor_aborts_the_tick() {
        let mut registry = Registry::new();
        registry.add_processor(Box::new(Failing)).unwrap();
        let err = registry.update().unwrap_err();
        let StepError::ProcessorFailed { name, .. } = err;
        assert_eq!(name, "failing");
        // The pipeline survives the fault.
        assert_eq!(registry.processor_count(), 1);
    }

    #[test]
    fn processor_lookup_finds_first_instance() {
        let mut registry = Registry::new();
        registry.add_processor(Box::new(Failing)).unwrap();
        assert!(registry.processor::<Failing>().is_some());
        registry.remove_processor::<Failing>();
        assert!(registry.processor::<Failing>().is_none());
        assert_eq!(registry.processor_count(), 0);
    }
}
