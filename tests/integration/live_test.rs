//! Live run against a real shell.
//!
//! Skipped unless BEELINE_LIVE_SHELL names the shell command and
//! BEELINE_LIVE_CONFIG points at a config file with the [beeline] settings.

use beeline_runner::config::Config;
use beeline_runner::query::{Completion, QueryRunner, RunOptions};
use beeline_runner::transport::ProcessConnector;
use std::path::PathBuf;
use std::time::Duration;

fn live_setup() -> Option<(Config, String)> {
    let shell = std::env::var("BEELINE_LIVE_SHELL").ok()?;
    let config_path = std::env::var("BEELINE_LIVE_CONFIG").ok()?;
    let config = Config::load_from_file(&PathBuf::from(config_path)).ok()?;
    Some((config, shell))
}

#[tokio::test]
async fn test_live_select_one() {
    let Some((mut config, shell)) = live_setup() else {
        eprintln!("Skipping test: BEELINE_LIVE_SHELL not set");
        return;
    };
    let logs = tempfile::tempdir().unwrap();
    config.runner.log_dir = logs.path().to_path_buf();
    config.runner.bell = false;

    let runner = QueryRunner::new(config, Box::new(ProcessConnector::new(shell)));
    let outcome = runner
        .run_query(
            "select 1",
            RunOptions::default()
                .with_timeout(Duration::from_secs(120))
                .quiet(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.completion, Completion::Success);
    assert_eq!(outcome.parsed().row_count(), Some(1));
    assert!(outcome.log_path.unwrap().exists());
}
