//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::{fs::read_to_string, path::Path};
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (BABYROV_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "$BABYROV_SW_ROOT/params" directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let mut path = crate::host::get_babyrov_sw_root().map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    load_from(path)
}

/// Load a parameter file from an explicit path.
pub fn load_from<P, T>(path: T) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    T: AsRef<Path>,
{
    let params_str = read_to_string(path).map_err(LoadError::FileLoadError)?;

    toml::from_str(params_str.as_str()).map_err(LoadError::DeserialiseError)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Deserialize, Debug, PartialEq)]
    struct TestParams {
        spacing_deg: f64,
        red_slots: Vec<i32>,
    }

    #[test]
    fn test_load_from() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "spacing_deg = 40.0\nred_slots = [-2, -1]").unwrap();

        let p: TestParams = load_from(file.path()).unwrap();
        assert_eq!(
            p,
            TestParams {
                spacing_deg: 40.0,
                red_slots: vec![-2, -1]
            }
        );
    }

    #[test]
    fn test_load_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "spacing_deg = \"wide\"").unwrap();

        assert!(matches!(
            load_from::<TestParams, _>(file.path()),
            Err(LoadError::DeserialiseError(_))
        ));
        assert!(matches!(
            load_from::<TestParams, _>("/nonexistent/params.toml"),
            Err(LoadError::FileLoadError(_))
        ));
    }
}
