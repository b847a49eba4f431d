//! Fixed-arity component queries.
//!
//! [`ComponentSet`] is implemented for component tuples of arity 1–5,
//! giving [`Registry::query`](crate::Registry::query) and the per-entity
//! lookups a statically typed surface without reflection. The trait is
//! sealed: the tuple family is the whole query language.

use std::any::TypeId;

use smallvec::SmallVec;

use gyre_core::{Component, Entity};

use crate::registry::Registry;

/// Type keys of a query, in declared order. Inline up to the maximum
/// arity of five.
pub type TypeKeySet = SmallVec<[TypeId; 5]>;

mod sealed {
    pub trait Sealed {}
}

/// A set of component types usable as one query.
///
/// Implemented for tuples `(A,)` through `(A, B, C, D, E)` where each
/// element is a [`Component`].
pub trait ComponentSet: sealed::Sealed + 'static {
    /// Shared references to every component in the set.
    type Refs<'a>;
    /// Independent optional references, one per component type.
    type OptRefs<'a>;

    /// The [`TypeId`] of each component type, in declared order.
    fn type_keys() -> TypeKeySet;

    /// All components for `entity`, or `None` unless it holds every type.
    fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Refs<'_>>;

    /// Each component for `entity` independently; missing types yield
    /// `None` without failing the rest.
    fn fetch_optional(registry: &Registry, entity: Entity) -> Self::OptRefs<'_>;
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> sealed::Sealed for ($($name,)+) {}

        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            type Refs<'a> = ($(&'a $name,)+);
            type OptRefs<'a> = ($(Option<&'a $name>,)+);

            fn type_keys() -> TypeKeySet {
                [$(TypeId::of::<$name>()),+].into_iter().collect()
            }

            fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Refs<'_>> {
                Some(($(registry.component_of::<$name>(entity)?,)+))
            }

            fn fetch_optional(registry: &Registry, entity: Entity) -> Self::OptRefs<'_> {
                ($(registry.component_of::<$name>(entity),)+)
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
