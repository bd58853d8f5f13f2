//! Capability-keyed component storage.
//!
//! Components are not looked up through runtime type reflection. Instead, a
//! crate using the store declares a closed *slot* enum with one variant per
//! component type, plus a matching *kind* tag enum that names each capability.
//! Entities hold at most one slot per kind. The [`component_slot!`] macro
//! generates both enums and the [`ComponentSlot`] / [`Component`] impls that
//! give typed `get_component::<T>()` access on top of them.
//!
//! [`component_slot!`]: crate::component_slot

use std::fmt;
use std::hash::Hash;

// ---------------------------------------------------------------------------
// ComponentSlot
// ---------------------------------------------------------------------------

/// A closed sum type holding exactly one component value.
pub trait ComponentSlot: Clone + fmt::Debug {
    /// The capability tag that keys this slot inside an entity.
    type Kind: Copy + Ord + Eq + Hash + fmt::Debug;

    /// Which capability this slot carries.
    fn kind(&self) -> Self::Kind;
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A concrete component type that can be stored in slot enum `S`.
pub trait Component<S: ComponentSlot>: Sized {
    /// The capability tag this component is stored under.
    const KIND: S::Kind;

    /// Wrap the value into its slot variant.
    fn into_slot(self) -> S;

    /// Borrow the value if `slot` holds this component type.
    fn from_slot(slot: &S) -> Option<&Self>;

    /// Mutably borrow the value if `slot` holds this component type.
    fn from_slot_mut(slot: &mut S) -> Option<&mut Self>;

    /// Take the value out of `slot` if it holds this component type.
    fn from_slot_owned(slot: S) -> Option<Self>;
}

// ---------------------------------------------------------------------------
// component_slot!
// ---------------------------------------------------------------------------

/// Declare a slot enum and its capability tag enum.
///
/// ```
/// use toki_ecs::component_slot;
/// use toki_ecs::prelude::*;
///
/// #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// pub struct Health(u32);
///
/// #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// pub struct Speed(u32);
///
/// component_slot! {
///     pub enum Slot keyed by Tag {
///         Health(Health),
///         Speed(Speed),
///     }
/// }
///
/// let mut entity: Entity<Slot> = Entity::new(EntityId::new(0), "slime");
/// entity.add_component(Health(10));
/// assert_eq!(entity.get_component::<Health>(), Some(&Health(10)));
/// assert!(entity.get_component::<Speed>().is_none());
/// assert_eq!(<Health as Component<Slot>>::KIND, Tag::Health);
/// ```
///
/// The calling crate must depend on `serde` (with `derive`); the generated
/// enums derive `Serialize`/`Deserialize` so entities can be snapshotted.
#[macro_export]
macro_rules! component_slot {
    (
        $(#[$slot_meta:meta])*
        $vis:vis enum $slot:ident keyed by $kind:ident {
            $( $(#[$var_meta:meta])* $variant:ident($ty:ty) ),+ $(,)?
        }
    ) => {
        $(#[$slot_meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        $vis enum $slot {
            $( $(#[$var_meta])* $variant($ty), )+
        }

        /// Capability tag naming one component slot.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        $vis enum $kind {
            $( $variant, )+
        }

        impl $crate::component::ComponentSlot for $slot {
            type Kind = $kind;

            fn kind(&self) -> $kind {
                match self {
                    $( $slot::$variant(_) => $kind::$variant, )+
                }
            }
        }

        $(
            impl $crate::component::Component<$slot> for $ty {
                const KIND: $kind = $kind::$variant;

                fn into_slot(self) -> $slot {
                    $slot::$variant(self)
                }

                #[allow(unreachable_patterns)]
                fn from_slot(slot: &$slot) -> Option<&Self> {
                    match slot {
                        $slot::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                #[allow(unreachable_patterns)]
                fn from_slot_mut(slot: &mut $slot) -> Option<&mut Self> {
                    match slot {
                        $slot::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                #[allow(unreachable_patterns)]
                fn from_slot_owned(slot: $slot) -> Option<Self> {
                    match slot {
                        $slot::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )+
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    pub struct Pos {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    pub struct Vel {
        dx: f32,
        dy: f32,
    }

    crate::component_slot! {
        pub enum TestSlot keyed by TestKind {
            Pos(Pos),
            Vel(Vel),
        }
    }

    #[test]
    fn slot_reports_its_kind() {
        let slot = Pos { x: 1.0, y: 2.0 }.into_slot();
        assert_eq!(slot.kind(), TestKind::Pos);
    }

    #[test]
    fn from_slot_matches_only_own_variant() {
        let slot = Vel { dx: 1.0, dy: 0.0 }.into_slot();
        assert!(<Pos as Component<TestSlot>>::from_slot(&slot).is_none());
        assert_eq!(
            <Vel as Component<TestSlot>>::from_slot(&slot),
            Some(&Vel { dx: 1.0, dy: 0.0 })
        );
    }

    #[test]
    fn kinds_are_ordered_by_declaration() {
        assert!(TestKind::Pos < TestKind::Vel);
    }

    #[test]
    fn owned_extraction() {
        let slot: TestSlot = Pos { x: 3.0, y: 4.0 }.into_slot();
        assert_eq!(
            <Pos as Component<TestSlot>>::from_slot_owned(slot),
            Some(Pos { x: 3.0, y: 4.0 })
        );
    }
}
