use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "twitter-lists")]
#[command(about = "Audit which followed Twitter accounts are missing from your lists", long_about = None)]
struct Cli {
    /// Verbose output; specify twice for debug-level output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Config file (default: ./config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List followed users who are not in any of your lists
    Unlisted,
    /// Print the configured retry backoff schedule
    Backoff,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match &cli.config {
        Some(path) => throttled_invoker::Config::from_path(path)?,
        None => throttled_invoker::Config::new()?,
    };

    match cli.command {
        Commands::Unlisted => unlisted::run(config),
        Commands::Backoff => {
            backoff::print_schedule(&config);
            Ok(())
        }
    }
}

mod logging {
    use tracing_subscriber::EnvFilter;

    /// 0 → error, 1 → info, 2+ → debug. `RUST_LOG` wins when set.
    pub fn init(verbose: u8) {
        let level = match verbose {
            0 => "error",
            1 => "info",
            _ => "debug",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

mod unlisted {
    use anyhow::{Context, Result};
    use throttled_invoker::report::build_report;
    use throttled_invoker::{Config, TwitterApiClient, TwitterCredentials};
    use tracing::info;

    pub fn run(config: Config) -> Result<()> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
            .block_on(async_run(config))
    }

    async fn async_run(config: Config) -> Result<()> {
        let credentials = TwitterCredentials::from_env()?;
        let client = TwitterApiClient::new(&config, &credentials);

        let me = client
            .verify_credentials()
            .await
            .context("Invalid credentials / auth failed")?;
        info!("Authenticated as {} (id={})", me.screen_name, me.id);

        let report = build_report(&client, me.id).await?;
        for line in report.list_lines() {
            println!("{line}");
        }
        for line in report.user_lines() {
            println!("{line}");
        }
        Ok(())
    }
}

mod backoff {
    use std::time::Duration;
    use throttled_invoker::retry::cumulative_delay;
    use throttled_invoker::Config;

    pub fn print_schedule(config: &Config) {
        for line in schedule_lines(config) {
            println!("{line}");
        }
    }

    /// One header line, then one line per retry with the running total. With
    /// jitter configured each line also shows the worst-case total.
    pub fn schedule_lines(config: &Config) -> Vec<String> {
        let throttle = config.retry.throttle_config();
        let mut lines = vec![format!(
            "Retrying on \"{}\": up to {} retries, base delay {:?}",
            config.retry.throttle_message, throttle.max_retries, throttle.base_delay
        )];

        let mut max_total = Duration::ZERO;
        for (retry, delay) in throttle.schedule().iter().enumerate() {
            let total = cumulative_delay(throttle.base_delay, retry as u32 + 1);
            max_total = max_total.saturating_add(throttle.max_delay_for(retry as u32));
            match throttle.max_jitter {
                Some(_) => lines.push(format!(
                    "retry {}: sleep {:?} (total {:?}, at most {:?} with jitter)",
                    retry + 1,
                    delay,
                    total,
                    max_total
                )),
                None => lines.push(format!(
                    "retry {}: sleep {:?} (total {:?})",
                    retry + 1,
                    delay,
                    total
                )),
            }
        }
        if let Some(jitter) = throttle.max_jitter {
            lines.push(format!("each delay adds up to {jitter:?} of random jitter"));
        }
        lines
    }

}
