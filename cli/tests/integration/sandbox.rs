//! Throwaway configuration and database directory for one test.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A bus address nothing listens on.
pub const DEAD_BUS: &str = "redis://127.0.0.1:1";

pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path();
        for sub in ["db", "images", "run", "templates"] {
            std::fs::create_dir_all(root.join(sub)).expect("mkdir");
        }
        let config = format!(
            "dbdir: {root}/db\nimages_dir: {root}/images\nrun_dir: {root}/run\n\
             resource_templates: {root}/templates\nbus_url: {DEAD_BUS}\n",
            root = root.display()
        );
        std::fs::write(root.join("config.yaml"), config).expect("write config");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.root().join("config.yaml")
    }

    pub fn db(&self, file: &str) -> PathBuf {
        self.root().join("db").join(file)
    }

    pub fn run_file(&self, file: &str) -> PathBuf {
        self.root().join("run").join(file)
    }

    /// Seed `db_assemblies.xml` with bare libvirt assemblies.
    pub fn seed_assemblies(&self, names: &[&str]) {
        let entries: String = names
            .iter()
            .map(|n| format!("<assembly name=\"{n}\" infrastructure=\"libvirt\"><resources/></assembly>"))
            .collect();
        let xml = format!("<assemblies pcmkc-version=\"0.1.0\">{entries}</assemblies>");
        std::fs::write(self.db("db_assemblies.xml"), xml).expect("seed assemblies");
    }

    /// `pcloudsh` bound to this sandbox's configuration.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pcloudsh"));
        cmd.env("NO_COLOR", "1")
            .env("PCLOUD_CONFIG", self.config_path())
            .env_remove("PCLOUD_DBDIR");
        cmd
    }

    /// Parse the JSON document a `--json` invocation printed.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run pcloudsh");
        serde_json::from_slice(&out.stdout).expect("stdout is JSON")
    }
}
