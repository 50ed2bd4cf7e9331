//! Code for reading S-curve parameters from CSV files.
use super::*;
use crate::building::BuildingCategoryMap;
use crate::id::MapIDCollection;
use crate::model::SCurveMap;
use crate::scurve::{Measure, SCurve, SCurveParameters};
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;
use strum::IntoEnumIterator;

const SCURVE_PARAMETERS_FILE_NAME: &str = "scurve_parameters.csv";

/// Represents one row of the S-curve parameters file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct SCurveParametersRaw {
    /// The building category the curve applies to
    building_category_id: String,
    /// The measure the curve describes
    measure: Measure,
    /// Age at which the first buildings undergo the measure
    earliest_age: f64,
    /// Average age at which the measure is undertaken
    average_age: f64,
    /// Width in years of the period of peak adoption
    rush_period: f64,
    /// Age by which adoption is complete
    last_age: f64,
    /// Fraction of the stock treated during the rush period
    #[serde(deserialize_with = "deserialise_proportion")]
    rush_share: f64,
    /// Fraction of the stock never treated
    #[serde(deserialize_with = "deserialise_proportion")]
    never_share: f64,
}

/// Read S-curve parameters and build the adoption curves.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `categories` - All building categories
/// * `building_lifetime` - Building lifetime in years
///
/// # Returns
///
/// Built [`SCurve`]s for every (category, measure) combination, or an error
/// if a curve is invalid or a combination is missing.
pub fn read_scurve_parameters(
    model_dir: &Path,
    categories: &BuildingCategoryMap,
    building_lifetime: u32,
) -> Result<SCurveMap> {
    let file_path = model_dir.join(SCURVE_PARAMETERS_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_scurve_parameters_from_iter(iter, categories, building_lifetime)
        .with_context(|| input_err_msg(&file_path))
}

fn read_scurve_parameters_from_iter<I>(
    iter: I,
    categories: &BuildingCategoryMap,
    building_lifetime: u32,
) -> Result<SCurveMap>
where
    I: Iterator<Item = SCurveParametersRaw>,
{
    let mut map = SCurveMap::new();
    for raw in iter {
        let category_id = categories.get_key_by_str(&raw.building_category_id)?;
        let params = SCurveParameters {
            earliest_age: raw.earliest_age,
            average_age: raw.average_age,
            rush_period: raw.rush_period,
            last_age: raw.last_age,
            rush_share: raw.rush_share,
            never_share: raw.never_share,
        };
        let curve = SCurve::new(&params, building_lifetime).with_context(|| {
            format!(
                "Bad s-curve (category: {category_id}, measure: {:?})",
                raw.measure
            )
        })?;
        ensure!(
            map.insert((category_id.clone(), raw.measure), curve).is_none(),
            "Duplicate s-curve parameters (category: {category_id}, measure: {:?})",
            raw.measure
        );
    }

    // Every category needs a curve for every measure
    for (category_id, measure) in categories.keys().cartesian_product(Measure::iter()) {
        ensure!(
            map.contains_key(&(category_id.clone(), measure)),
            "No s-curve parameters provided (category: {category_id}, measure: {measure:?})"
        );
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, categories};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn raw_row(category: &str, measure: Measure) -> SCurveParametersRaw {
        SCurveParametersRaw {
            building_category_id: category.to_string(),
            measure,
            earliest_age: 5.0,
            average_age: 20.0,
            rush_period: 20.0,
            last_age: 50.0,
            rush_share: 0.8,
            never_share: 0.1,
        }
    }

    fn all_rows() -> Vec<SCurveParametersRaw> {
        ["house", "office"]
            .into_iter()
            .flat_map(|category| Measure::iter().map(move |measure| raw_row(category, measure)))
            .collect()
    }

    #[rstest]
    fn test_read_scurve_parameters_from_iter(categories: BuildingCategoryMap) {
        let map = read_scurve_parameters_from_iter(all_rows().into_iter(), &categories, 130)
            .unwrap();
        assert_eq!(map.len(), 6);
    }

    #[rstest]
    fn test_read_scurve_parameters_from_iter_unknown_category(
        categories: BuildingCategoryMap,
    ) {
        let mut rows = all_rows();
        rows[0].building_category_id = "castle".to_string();
        assert_error!(
            read_scurve_parameters_from_iter(rows.into_iter(), &categories, 130),
            "Unknown ID castle found"
        );
    }

    #[rstest]
    fn test_read_scurve_parameters_from_iter_duplicate(categories: BuildingCategoryMap) {
        let mut rows = all_rows();
        rows.push(raw_row("house", Measure::Demolition));
        assert_error!(
            read_scurve_parameters_from_iter(rows.into_iter(), &categories, 130),
            "Duplicate s-curve parameters (category: house, measure: Demolition)"
        );
    }

    #[rstest]
    fn test_read_scurve_parameters_from_iter_missing_measure(
        categories: BuildingCategoryMap,
    ) {
        let rows: Vec<_> = all_rows()
            .into_iter()
            .filter(|row| {
                !(row.building_category_id == "office" && row.measure == Measure::Renovation)
            })
            .collect();
        assert_error!(
            read_scurve_parameters_from_iter(rows.into_iter(), &categories, 130),
            "No s-curve parameters provided (category: office, measure: Renovation)"
        );
    }

    #[rstest]
    fn test_read_scurve_parameters(categories: BuildingCategoryMap) {
        let dir = tempdir().unwrap();
        {
            let file_path = dir.path().join(SCURVE_PARAMETERS_FILE_NAME);
            let mut file = File::create(file_path).unwrap();
            writeln!(
                file,
                "building_category_id,measure,earliest_age,average_age,rush_period,last_age,rush_share,never_share"
            )
            .unwrap();
            for category in ["house", "office"] {
                for measure in ["small_measure", "renovation", "demolition"] {
                    writeln!(file, "{category},{measure},5,20,20,50,0.8,0.1").unwrap();
                }
            }
        }

        let map = read_scurve_parameters(dir.path(), &categories, 130).unwrap();
        assert_eq!(map.len(), 6);
        let curve = &map[&("house".into(), Measure::SmallMeasure)];
        assert!(curve.rate(10) > 0.0);
    }
}
