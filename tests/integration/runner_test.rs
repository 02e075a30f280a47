//! End-to-end query runs against scripted shells.

use beeline_runner::beeline::{launch_command, SessionState};
use beeline_runner::config::Config;
use beeline_runner::notify::CountingNotifier;
use beeline_runner::query::{Completion, QueryRunner, RunOptions};
use beeline_runner::transport::{MockChunk, MockConnector, MockShellChannel};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::time::Instant;

const CONNECTED: &str = "Connecting to jdbc:hive2://edge01:10000/default;principal=hive/_HOST@CORP\n";

fn config(log_dir: &Path) -> Config {
    let toml = r#"
[beeline]
env_path = "/opt/hive/env.sh"
keytab_path = "/home/analyst/analyst.keytab"
user = "analyst@CORP"
beeline_path = "/opt/hive/bin/beeline"
DEFAULT_QUEUE = "adhoc"

[runner]
reconnect_delay_ms = 0
bell = false
"#;
    let mut config: Config = toml::from_str(toml).unwrap();
    config.runner.log_dir = log_dir.to_path_buf();
    config
}

fn session_then(query_output: &[&str]) -> MockShellChannel {
    MockShellChannel::new()
        .with_banner("Last login: Mon Mar 11 09:00:01 2024 from 10.0.0.7\r\n[analyst@edge01 ~]$ ")
        .on_send_text(&[
            "SLF4J: Class path contains multiple SLF4J bindings.\r\n",
            CONNECTED,
            "Connected to: Apache Hive (version 3.1.3)\r\nBeeline version 3.1.3\r\n",
        ])
        .on_send_text(query_output)
}

#[tokio::test]
async fn test_default_queue_reaches_launch_command() {
    let dir = tempdir().unwrap();
    let cfg = config(dir.path());
    let channel = session_then(&["No rows selected (0.05 seconds)\r\n"]);
    let state = channel.state();

    let runner = QueryRunner::new(cfg.clone(), Box::new(MockConnector::new(vec![channel])));
    runner
        .run_query("select 1", RunOptions::default().quiet().without_log())
        .await
        .unwrap();

    let sent = state.lock().unwrap().sent.clone();
    assert_eq!(sent[0], format!("{}\n", launch_command(&cfg.beeline, "adhoc")));
    assert!(sent[0].contains("adhoc"));
}

#[tokio::test]
async fn test_crlf_table_transcript() {
    let dir = tempdir().unwrap();
    let channel = session_then(&[
        "0: jdbc:hive2://edge01:10000> select region, total from sales_by_region\r\n",
        ". . . . . . . . . . . . . . > ;\r\n",
        "+---------+----------+\r\n| region  |  total   |\r\n+---------+----------+\r\n",
        "| north   | 1200     |\r\n| south   | 980      |\r\n+---------+----------+\r\n",
        "2 rows selected (1.84 seconds)\r\n0: jdbc:hive2://edge01:10000> ",
    ]);
    let runner = QueryRunner::new(
        config(dir.path()),
        Box::new(MockConnector::new(vec![channel])),
    );

    let (body, status) = runner
        .run_query(
            "-- regional totals\nselect region, total from sales_by_region;",
            RunOptions::default().quiet().without_log(),
        )
        .await
        .unwrap()
        .into_parts();

    assert_eq!(
        body,
        "+---------+----------+\n| region  |  total   |\n+---------+----------+\n\
         | north   | 1200     |\n| south   | 980      |\n+---------+----------+"
    );
    assert_eq!(status, "2 rows selected (1.84 seconds)");
}

#[tokio::test]
async fn test_marker_split_across_reads_ends_query() {
    let dir = tempdir().unwrap();
    let channel = session_then(&["+---+\n| 1 |\n+---+\n1 row sel", "ected (0.1 seconds)\n"]);
    let runner = QueryRunner::new(
        config(dir.path()),
        Box::new(MockConnector::new(vec![channel])),
    );

    let outcome = runner
        .run_query(
            "select 1",
            RunOptions::default()
                .with_timeout(Duration::from_secs(30))
                .quiet()
                .without_log(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.completion, Completion::Success);
    assert_eq!(outcome.status_line, "1 row selected (0.1 seconds)");
}

#[tokio::test]
async fn test_two_runs_append_to_same_log() {
    let dir = tempdir().unwrap();
    let channels = vec![
        session_then(&["+---+\n| a |\n+---+\n1 row selected\n"]),
        session_then(&["+---+\n| b |\n+---+\n1 row selected\n"]),
    ];
    let connector = MockConnector::new(channels);
    let runner = QueryRunner::new(config(dir.path()), Box::new(connector));

    let first = runner
        .run_query("select 'a'", RunOptions::default().quiet())
        .await
        .unwrap();
    let path = first.log_path.clone().unwrap();
    let len_after_first = std::fs::metadata(&path).unwrap().len();

    let second = runner
        .run_query("select 'b'", RunOptions::default().quiet())
        .await
        .unwrap();
    let len_after_second = std::fs::metadata(&path).unwrap().len();

    // Both runs happen on the same day unless the test straddles midnight.
    if second.log_path.as_ref() == Some(&path) {
        assert!(len_after_second > len_after_first);
        let log = std::fs::read_to_string(&path).unwrap();
        assert_eq!(log.matches(&"-".repeat(70)).count(), 4);
        let a = log.find("select 'a'").unwrap();
        let b = log.find("select 'b'").unwrap();
        assert!(a < b);
    }
}

#[tokio::test]
async fn test_each_run_opens_a_new_shell() {
    let dir = tempdir().unwrap();
    let first = session_then(&["No rows selected\n"]);
    let second = session_then(&["No rows selected\n"]);
    let (first_state, second_state) = (first.state(), second.state());
    let runner = QueryRunner::new(
        config(dir.path()),
        Box::new(MockConnector::new(vec![first, second])),
    );

    for _ in 0..2 {
        runner
            .run_query("select 1", RunOptions::default().quiet().without_log())
            .await
            .unwrap();
    }

    assert!(first_state.lock().unwrap().closed);
    assert!(second_state.lock().unwrap().closed);
    assert_eq!(first_state.lock().unwrap().sent.len(), 2);
    assert_eq!(second_state.lock().unwrap().sent.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_bounds_wait() {
    let dir = tempdir().unwrap();
    let channel = MockShellChannel::new()
        .on_send_text(&[CONNECTED])
        .on_send(vec![MockChunk::now("INFO  : Executing command\n")]);
    let notifier = Arc::new(CountingNotifier::new());
    let runner = QueryRunner::new(
        config(dir.path()),
        Box::new(MockConnector::new(vec![channel])),
    )
    .with_notifier(notifier.clone());
    let poll = runner.config().runner.query_poll();

    let started = Instant::now();
    let outcome = runner
        .run_query(
            "select * from huge",
            RunOptions::default()
                .with_timeout(Duration::from_secs(2))
                .quiet(),
        )
        .await
        .unwrap();

    assert!(started.elapsed() <= Duration::from_secs(2) + poll * 2);
    assert_eq!(outcome.completion, Completion::Timeout);
    assert_eq!(outcome.session, SessionState::Connected);
    assert_eq!(notifier.count(), 1);

    // Timed-out runs are logged too.
    let log = std::fs::read_to_string(outcome.log_path.unwrap()).unwrap();
    assert!(log.contains("select * from huge\n\nINFO  : Executing command\n"));
}
