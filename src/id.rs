//! Code for handling IDs
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use std::borrow::Borrow;
use std::collections::HashSet;

/// A trait alias for ID types
pub trait IDLike:
    Eq + std::hash::Hash + Borrow<str> + Clone + std::fmt::Display + From<String>
{
}
impl<T> IDLike for T where
    T: Eq + std::hash::Hash + Borrow<str> + Clone + std::fmt::Display + From<String>
{
}

/// Define a newtype ID wrapping a cheaply clonable string
macro_rules! define_id_type {
    ($name:ident) => {
        /// An ID type (e.g. `BuildingCategoryID`, `HeatingSystemID`, etc.)
        #[derive(
            Clone, Debug, PartialEq, Eq, std::hash::Hash, serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(pub std::rc::Rc<str>);

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                Self(id.into())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id.into())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}
pub(crate) use define_id_type;

#[cfg(test)]
define_id_type!(GenericID);

/// Indicates that the struct has an ID field
pub trait HasID<ID: IDLike> {
    /// Get the struct's ID
    fn get_id(&self) -> &ID;
}

/// Implement the `HasID` trait for the given type, assuming it has a field called `id`
macro_rules! define_id_getter {
    ($t:ty, $id_ty:ty) => {
        impl crate::id::HasID<$id_ty> for $t {
            fn get_id(&self) -> &$id_ty {
                &self.id
            }
        }
    };
}
pub(crate) use define_id_getter;

/// A data structure containing a set of IDs
pub trait IDCollection<ID: IDLike> {
    /// Get the ID from the collection by its string representation.
    ///
    /// # Arguments
    ///
    /// * `id` - The string representation of the ID
    ///
    /// # Returns
    ///
    /// A copy of the ID in `self`, or an error if not found.
    fn get_id_by_str(&self, id: &str) -> Result<ID>;

    /// Check if the ID is in the collection, returning a copy of it if found.
    fn get_id(&self, id: &ID) -> Result<ID> {
        self.get_id_by_str(id.borrow())
    }
}

impl<ID: IDLike> IDCollection<ID> for HashSet<ID> {
    fn get_id_by_str(&self, id: &str) -> Result<ID> {
        let found = self
            .get(id)
            .with_context(|| format!("Unknown ID {id} found"))?;
        Ok(found.clone())
    }
}

impl<ID: IDLike> IDCollection<ID> for IndexSet<ID> {
    fn get_id_by_str(&self, id: &str) -> Result<ID> {
        let found = self
            .get(id)
            .with_context(|| format!("Unknown ID {id} found"))?;
        Ok(found.clone())
    }
}

/// Look up IDs in a keyed map, returning copies of the stored keys.
pub trait MapIDCollection<ID: IDLike> {
    /// Get the map key matching the string `id`, or an error if not found.
    fn get_key_by_str(&self, id: &str) -> Result<ID>;
}

impl<ID: IDLike, V> MapIDCollection<ID> for IndexMap<ID, V> {
    fn get_key_by_str(&self, id: &str) -> Result<ID> {
        let (found, _) = self
            .get_key_value(id)
            .with_context(|| format!("Unknown ID {id} found"))?;
        Ok(found.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_id_by_str() {
        let ids: HashSet<GenericID> = ["house".into(), "office".into()].into_iter().collect();
        assert_eq!(ids.get_id_by_str("house").unwrap(), "house".into());
        assert!(ids.get_id_by_str("school").is_err());
    }

    #[test]
    fn test_get_id() {
        let ids: IndexSet<GenericID> = ["house".into()].into_iter().collect();
        assert_eq!(ids.get_id(&"house".into()).unwrap(), "house".into());
        assert!(ids.get_id(&"school".into()).is_err());
    }

    #[test]
    fn test_get_key_by_str() {
        let map: IndexMap<GenericID, u32> = [("house".into(), 1)].into_iter().collect();
        assert_eq!(map.get_key_by_str("house").unwrap(), "house".into());
        assert!(map.get_key_by_str("school").is_err());
    }
}
