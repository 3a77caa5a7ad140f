#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};

/// Helpers for running the `vigil` binary and locating fixtures.
pub struct VigilProcess;

impl VigilProcess {
    /// Runs `vigil` with `args` to completion.
    pub fn spawn_command(args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_vigil"))
            .args(args)
            .env_remove("VIGIL_LOG_LEVEL")
            .env_remove("VIGIL_CONFIG")
            .env_remove("VIGIL_METRICS_PORT")
            .output()
            .expect("failed to run vigil")
    }

    /// Absolute path of a file under `tests/fixtures`.
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    /// Parses JSONL output, one value per non-empty line.
    pub fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
            .collect()
    }
}
