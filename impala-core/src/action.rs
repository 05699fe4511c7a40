//! Discrete action bijection.

/// A value from a finite discrete action set of size [`DiscreteAction::NUM_ACTIONS`],
/// bijectively convertible to an integer id in `[0, NUM_ACTIONS)`.
///
/// Implement this directly, or derive it for a plain enum with
/// [`discrete_action!`].
pub trait DiscreteAction: Clone + std::fmt::Debug {
    /// The number of distinct actions.
    const NUM_ACTIONS: i64;

    /// Converts this action to its integer id.
    fn to_id(&self) -> i64;

    /// Converts an integer id in `[0, NUM_ACTIONS)` back to an action.
    ///
    /// # Panics
    ///
    /// Implementations should panic if `id` is out of range; the
    /// scheduler only calls this with ids already validated against
    /// `NUM_ACTIONS` (see `ImpalaError::ActionIdOutOfRange`).
    fn from_id(id: i64) -> Self;
}

/// Defines a unit-only enum and implements [`DiscreteAction`] for it,
/// mapping variants to ids in declaration order.
///
/// # Example
///
/// ```
/// use impala_core::discrete_action;
/// use impala_core::DiscreteAction;
///
/// discrete_action!(FourDirections, [Up, Down, Left, Right]);
///
/// assert_eq!(FourDirections::NUM_ACTIONS, 4);
/// assert_eq!(FourDirections::Left.to_id(), 2);
/// assert!(matches!(FourDirections::from_id(3), FourDirections::Right));
/// ```
#[macro_export]
macro_rules! discrete_action {
    ($name_:ident, [$($variant_:ident),+ $(,)?]) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        #[allow(missing_docs)]
        pub enum $name_ {
            $($variant_),+
        }

        impl $crate::DiscreteAction for $name_ {
            const NUM_ACTIONS: i64 = $crate::discrete_action!(@count $($variant_),+);

            fn to_id(&self) -> i64 {
                let variants = [$(Self::$variant_),+];
                variants.iter().position(|v| v == self).expect("unreachable: exhaustive variant list") as i64
            }

            fn from_id(id: i64) -> Self {
                let variants = [$(Self::$variant_),+];
                variants[id as usize]
            }
        }
    };
    (@count $($variant_:ident),+) => {
        <[()]>::len(&[$($crate::discrete_action!(@unit $variant_)),+]) as i64
    };
    (@unit $variant_:ident) => { () };
}
