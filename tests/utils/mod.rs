// Shared helpers for integration tests

#![allow(dead_code)]

use huella::config::HuellaConfig;
use huella::Huella;
use tempfile::TempDir;

/// Deterministic behavioral vector of length `dim`
pub fn behavior_vector(dim: usize, offset: f64) -> Vec<f64> {
    (0..dim)
        .map(|i| offset + 0.03 * ((i * 7) % 11) as f64)
        .collect()
}

/// Seeded configuration rooted at `dir`
pub fn config_in(dir: &TempDir) -> HuellaConfig {
    let mut config = HuellaConfig::reproducible(2024);
    config.data_dir = dir.path().to_path_buf();
    config
}

/// Configuration with lighter families for property tests
pub fn fast_config() -> HuellaConfig {
    let mut config = HuellaConfig::reproducible(7);
    config.selection.params.forest.n_trees = 15;
    config.selection.params.mlp.max_iter = 60;
    config
}

/// Filesystem-backed engine in a fresh temporary directory
pub fn fs_engine() -> (TempDir, Huella) {
    let dir = TempDir::new().unwrap();
    let engine = Huella::open(config_in(&dir)).unwrap();
    (dir, engine)
}

/// Format a vector for the `--features` flag
pub fn feature_arg(features: &[f64]) -> String {
    features
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
