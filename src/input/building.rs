//! Code for reading building categories and building codes from CSV files.
use super::*;
use crate::building::{BuildingCategoryMap, BuildingCodeMap};
use std::path::Path;

const CATEGORIES_FILE_NAME: &str = "building_categories.csv";
const CODES_FILE_NAME: &str = "building_codes.csv";

/// Reads building categories from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A map of building categories in file order, or an error
pub fn read_building_categories(model_dir: &Path) -> Result<BuildingCategoryMap> {
    read_csv_id_file(&model_dir.join(CATEGORIES_FILE_NAME))
}

/// Reads building codes (construction-period cohorts) from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A map of building codes in file order, or an error
pub fn read_building_codes(model_dir: &Path) -> Result<BuildingCodeMap> {
    let file_path = model_dir.join(CODES_FILE_NAME);
    let codes: BuildingCodeMap = read_csv_id_file(&file_path)?;

    for code in codes.values() {
        ensure!(
            code.period_start_year <= code.building_year
                && code.building_year <= code.period_end_year,
            "{}: building_year for {} must lie within the construction period",
            input_err_msg(&file_path),
            code.id
        );
    }

    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::BuildingCode;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    /// Create an example building codes file in dir_path
    fn create_codes_file(dir_path: &Path, rows: &str) {
        let file_path = dir_path.join(CODES_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(
            file,
            "id,period_start_year,building_year,period_end_year\n{rows}"
        )
        .unwrap();
    }

    #[test]
    fn test_read_building_categories() {
        let dir = tempdir().unwrap();
        {
            let file_path = dir.path().join(CATEGORIES_FILE_NAME);
            let mut file = File::create(file_path).unwrap();
            writeln!(
                file,
                "id,description,building_group\n\
                house,Small houses,residential\n\
                office,Office buildings,non_residential"
            )
            .unwrap();
        }

        let categories = read_building_categories(dir.path()).unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(
            categories["house"].building_group,
            "residential".into()
        );
    }

    #[test]
    fn test_read_building_codes() {
        let dir = tempdir().unwrap();
        create_codes_file(dir.path(), "tek49,1940,1955,1969\ntek17,2010,2025,2030");

        let codes = read_building_codes(dir.path()).unwrap();
        assert_eq!(
            codes["tek49"],
            BuildingCode {
                id: "tek49".into(),
                period_start_year: 1940,
                building_year: 1955,
                period_end_year: 1969,
            }
        );
    }

    #[test]
    fn test_read_building_codes_bad_building_year() {
        let dir = tempdir().unwrap();
        create_codes_file(dir.path(), "tek49,1940,1980,1969");
        assert!(read_building_codes(dir.path()).is_err());
    }

    #[test]
    fn test_read_building_codes_duplicate() {
        let dir = tempdir().unwrap();
        create_codes_file(dir.path(), "tek49,1940,1955,1969\ntek49,1940,1955,1969");
        assert!(read_building_codes(dir.path()).is_err());
    }
}
