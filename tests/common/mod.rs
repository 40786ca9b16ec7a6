use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test helper for creating temporary directories with property files
pub struct TestFixture {
    _temp_dir: TempDir,
    pub base_path: PathBuf,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            base_path,
        }
    }

    /// Write a file relative to the fixture root and return its path
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.base_path.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// `file:` URL of a path inside the fixture
    pub fn file_url(&self, name: &str) -> String {
        url::Url::from_file_path(self.base_path.join(name))
            .unwrap()
            .to_string()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
