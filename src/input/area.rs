//! Code for reading the baseline floor-area inventory from CSV files.
use super::*;
use crate::building::{BuildingCategoryMap, BuildingCodeMap};
use crate::id::MapIDCollection;
use crate::model::BaselineAreaMap;
use crate::units::Area;
use itertools::Itertools;
use log::warn;
use serde::Deserialize;
use std::path::Path;

const AREA_PARAMETERS_FILE_NAME: &str = "area_parameters.csv";

/// Represents one row of the area parameters file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct AreaParameterRaw {
    /// The building category
    building_category_id: String,
    /// The construction-period cohort
    building_code_id: String,
    /// Floor area in m² at the projection start year
    area: f64,
}

/// Read the baseline floor-area inventory.
///
/// Category/cohort pairs without a row are taken to have zero area; a warning
/// lists how many pairs that affects.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `categories` - All building categories
/// * `codes` - All building codes
///
/// # Returns
///
/// Baseline areas grouped by category and building code, or an error.
pub fn read_area_parameters(
    model_dir: &Path,
    categories: &BuildingCategoryMap,
    codes: &BuildingCodeMap,
) -> Result<BaselineAreaMap> {
    let file_path = model_dir.join(AREA_PARAMETERS_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_area_parameters_from_iter(iter, categories, codes).with_context(|| input_err_msg(&file_path))
}

fn read_area_parameters_from_iter<I>(
    iter: I,
    categories: &BuildingCategoryMap,
    codes: &BuildingCodeMap,
) -> Result<BaselineAreaMap>
where
    I: Iterator<Item = AreaParameterRaw>,
{
    let mut map = BaselineAreaMap::new();
    for raw in iter {
        let category_id = categories.get_key_by_str(&raw.building_category_id)?;
        let code_id = codes.get_key_by_str(&raw.building_code_id)?;
        ensure!(
            raw.area.is_finite() && raw.area >= 0.0,
            "Area must be a non-negative number (category: {category_id}, building code: \
            {code_id})"
        );
        ensure!(
            map.insert((category_id.clone(), code_id.clone()), Area::from(raw.area))
                .is_none(),
            "Duplicate area entries (category: {category_id}, building code: {code_id})"
        );
    }

    let missing = categories
        .keys()
        .cartesian_product(codes.keys())
        .filter(|(category_id, code_id)| {
            !map.contains_key(&((*category_id).clone(), (*code_id).clone()))
        })
        .count();
    if missing > 0 {
        warn!("{missing} category/cohort pairs have no baseline area; assuming zero");
    }

    Ok(map)
}
