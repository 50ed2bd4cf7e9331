//! Building categories, building groups and construction-period cohorts.
use crate::id::{define_id_getter, define_id_type};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;

define_id_type! {BuildingCategoryID}
define_id_type! {BuildingGroupID}
define_id_type! {BuildingCodeID}

/// A top-level class of buildings (house, apartment block, office, school, etc.)
#[derive(PartialEq, Clone, Debug, Deserialize)]
pub struct BuildingCategory {
    /// Unique identifier for the building category (e.g. "house")
    pub id: BuildingCategoryID,
    /// Text description of the category (e.g. "Small houses")
    pub description: String,
    /// The coarser grouping used in aggregated reports (e.g. "residential")
    pub building_group: BuildingGroupID,
}
define_id_getter! {BuildingCategory, BuildingCategoryID}

/// A construction-period cohort, named after the building code in force when
/// its buildings were erected.
#[derive(PartialEq, Clone, Debug, Deserialize)]
pub struct BuildingCode {
    /// Unique identifier for the building code (e.g. "tek69")
    pub id: BuildingCodeID,
    /// First construction year covered by the cohort
    pub period_start_year: u32,
    /// Representative (midpoint) construction year for the cohort
    pub building_year: u32,
    /// Last construction year covered by the cohort
    pub period_end_year: u32,
}
define_id_getter! {BuildingCode, BuildingCodeID}

/// A map of [`BuildingCategory`]s, keyed by category ID
pub type BuildingCategoryMap = IndexMap<BuildingCategoryID, BuildingCategory>;
/// A map of [`BuildingCode`]s, keyed by building code ID
pub type BuildingCodeMap = IndexMap<BuildingCodeID, BuildingCode>;

/// The distinct building groups referenced by a category map, in first-seen order.
pub fn building_group_ids(categories: &BuildingCategoryMap) -> IndexSet<BuildingGroupID> {
    categories
        .values()
        .map(|category| category.building_group.clone())
        .collect()
}

/// The cohort which absorbs new construction: the one with the most recent
/// construction period.
pub fn new_build_code(codes: &BuildingCodeMap) -> &BuildingCode {
    codes
        .values()
        .max_by_key(|code| code.period_start_year)
        .expect("Building code map cannot be empty")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{categories, codes};
    use rstest::rstest;

    #[rstest]
    fn test_building_group_ids(categories: BuildingCategoryMap) {
        let groups = building_group_ids(&categories);
        assert_eq!(
            Vec::from_iter(groups),
            vec![
                BuildingGroupID::new("residential"),
                BuildingGroupID::new("non_residential")
            ]
        );
    }

    #[rstest]
    fn test_new_build_code(codes: BuildingCodeMap) {
        assert_eq!(new_build_code(&codes).id, "tek17".into());
    }
}
