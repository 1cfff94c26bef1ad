use std::{
    fs,
    path::{Path, PathBuf},
    sync::Once,
};

use prism_shared::log::LevelFilter;

pub use spectral;

const TEST_RESULT_FOLDER: &str = "test_results";

/// Installs a logger for the tests. Can be called from every test because only the first call has an effect.
pub fn setup_logger() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        simple_logger::SimpleLogger::new()
            .with_level(LevelFilter::Trace)
            .init()
            .expect("failed to initialize the logger");
    });
}

/// Creates a folder for the given function in which a test can write its files.
///
/// The folder is emptied first so that a test always starts with a clean state.
pub fn create_test_result_folder_for_function(function_name: &str) -> PathBuf {
    let folder_name = function_name.replace("::", ".");
    let path = Path::new(TEST_RESULT_FOLDER).join(folder_name);
    if path.exists() {
        fs::remove_dir_all(&path).expect("failed to clear the test result folder");
    }
    fs::create_dir_all(&path).expect("failed to create the test result folder");
    path
}

#[cfg(test)]
mod tests {
    use prism_shared::function_name;

    use super::*;

    #[test]
    fn result_folder_is_created_empty() {
        let folder = create_test_result_folder_for_function(function_name!());
        fs::write(folder.join("leftover.txt"), "x").unwrap();
        let folder = create_test_result_folder_for_function(function_name!());
        assert!(folder.exists());
        assert_eq!(fs::read_dir(&folder).unwrap().count(), 0);
    }

    #[test]
    fn logger_can_be_set_up_twice() {
        setup_logger();
        setup_logger();
    }
}
