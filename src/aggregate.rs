use crate::entity::Entity;

/// A consistency boundary: business state plus the entity bookkeeping that
/// ties its mutations to the events they raise.
///
/// `state()` is the row snapshot the store persists; implement the trait with
/// [`impl_aggregate!`](crate::impl_aggregate) on any serde struct that embeds
/// an [`Entity`].
pub trait Aggregate {
    fn entity(&self) -> &Entity;
    fn entity_mut(&mut self) -> &mut Entity;

    /// Serialize the business state to its stored row form.
    fn state(&self) -> Result<String, serde_json::Error>;
}

#[macro_export]
macro_rules! impl_aggregate {
    ($ty:ty, $entity:ident) => {
        impl $crate::Aggregate for $ty {
            fn entity(&self) -> &$crate::Entity {
                &self.$entity
            }

            fn entity_mut(&mut self) -> &mut $crate::Entity {
                &mut self.$entity
            }

            fn state(
                &self,
            ) -> ::std::result::Result<::std::string::String, $crate::serde_json::Error> {
                $crate::serde_json::to_string(self)
            }
        }
    };
}
