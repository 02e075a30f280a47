//! beerun - run a SQL statement through a remote Beeline session.

mod cli;

use beeline_runner::config::Config;
use beeline_runner::error::{Result, RunnerError};
use beeline_runner::logging;
use beeline_runner::query::{Completion, QueryRunner};
use beeline_runner::sql::clean_sql;
use beeline_runner::transport::ProcessConnector;
use cli::Cli;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A .env file may carry BEELINE_* settings and RUST_LOG.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    match run(&cli).await {
        Ok(Completion::Success) => {}
        Ok(_) => std::process::exit(2),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<Completion> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_defaults();
    cli.apply_overrides(&mut config);

    let sql = cli.read_sql()?;
    if clean_sql(&sql).is_empty() {
        return Err(RunnerError::config("SQL statement is empty"));
    }

    let connector = ProcessConnector::from_config(&config.shell);
    let runner = QueryRunner::new(config, Box::new(connector));
    let outcome = runner.run_query(&sql, cli.run_options()).await?;

    match outcome.completion {
        Completion::Success => {}
        Completion::ToolError => match &outcome.log_path {
            Some(path) => eprintln!("Query failed; see {}", path.display()),
            None => eprintln!("Query failed"),
        },
        Completion::Timeout => eprintln!("Query timed out after {}s", cli.timeout),
    }

    Ok(outcome.completion)
}
