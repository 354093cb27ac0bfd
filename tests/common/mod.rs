//! Common test utilities for opkg integration tests

use std::path::{Path, PathBuf};

use opkg::operations::{InstallOperation, InstallOptions, InstallReport};
use opkg::package::ResolvedPackage;
use opkg::platform::PlatformLoader;
use opkg::workspace::Workspace;
use tempfile::TempDir;

/// A workspace plus a separate directory of packages, both temporary
#[allow(dead_code)]
pub struct TestWorkspace {
    pub temp: TempDir,
    /// Workspace root
    pub path: PathBuf,
    /// Where packages are written
    pub packages: PathBuf,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().join("workspace");
        let packages = temp.path().join("packages");
        std::fs::create_dir_all(&path).expect("Failed to create workspace directory");
        std::fs::create_dir_all(&packages).expect("Failed to create packages directory");
        std::fs::create_dir_all(temp.path().join("config")).expect("Failed to create config directory");

        let path = std::fs::canonicalize(&path).expect("Failed to canonicalize workspace");
        Self { temp, path, packages }
    }

    /// Create a platform directory so the platform is detected
    pub fn create_agent_dir(&self, dir: &str) {
        std::fs::create_dir_all(self.path.join(dir)).expect("Failed to create agent directory");
    }

    /// Write a package with an `opkg.yaml` naming it
    pub fn write_package(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir_name = name.trim_start_matches('@').replace('/', "-");
        let root = self.packages.join(dir_name);
        write_all(&root, &[("opkg.yaml", &format!("name: \"{name}\"\nversion: \"1.0.0\"\n"))]);
        write_all(&root, files);
        root
    }

    /// Write a file in the workspace
    pub fn write_file(&self, path: &str, content: &str) {
        write_all(&self.path, &[(path, content)]);
    }

    /// Read a file from the workspace
    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.path.join(path)).expect("Failed to read file")
    }

    pub fn read_json(&self, path: &str) -> serde_json::Value {
        serde_json::from_str(&self.read_file(path)).expect("Failed to parse JSON")
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    /// Open the workspace without any user-level platform overrides
    pub fn open(&self) -> Workspace {
        Workspace::open_with(&self.path, PlatformLoader::new(&self.path).with_global_path(None))
            .expect("Failed to open workspace")
    }

    /// Install package directories in order, the first with the lowest priority
    pub fn install(&self, dirs: &[&Path], options: InstallOptions) -> InstallReport {
        let packages = dirs
            .iter()
            .enumerate()
            .map(|(i, dir)| {
                ResolvedPackage::from_dir(dir)
                    .expect("Failed to resolve package")
                    .with_priority(i as i32)
            })
            .collect();
        let mut workspace = self.open();
        InstallOperation::new(&mut workspace, options)
            .execute(packages)
            .expect("Install failed")
    }

    /// The opkg binary, run inside the workspace with a private config dir
    #[allow(deprecated)]
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("opkg").expect("opkg binary");
        cmd.current_dir(&self.path);
        cmd.env_remove("OPKG_WORKSPACE");
        cmd.env_remove("OPKG_LOG");
        cmd.env("XDG_CONFIG_HOME", self.temp.path().join("config"));
        cmd
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Install options limited to the given platforms
#[allow(dead_code)]
pub fn for_platforms(platforms: &[&str]) -> InstallOptions {
    InstallOptions {
        platforms: platforms.iter().map(|p| p.to_string()).collect(),
        ..InstallOptions::default()
    }
}

fn write_all(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let file_path = root.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }
}
