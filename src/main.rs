use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pricebot::bot::Bot;
use pricebot::config::{self, Settings};
use pricebot::error::{Error, Result};
use pricebot::transport::ReplySink;
use pricebot::transport::console::Console;
use pricebot::transport::telegram::Telegram;
use pricebot::worker;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const APP_VERSION: &str = env!("PRICEBOT_VERSION");
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Parser)]
#[command(
    name = "pricebot",
    version = APP_VERSION,
    about = "Chat bot that answers crypto, fiat and stock price quotes"
)]
struct Cli {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Read commands from stdin and print replies instead of connecting to Telegram
    #[arg(long)]
    console: bool,

    /// Number of concurrent request workers (defaults to available parallelism)
    #[arg(long, env = "PRICEBOT_WORKERS")]
    workers: Option<usize>,

    /// Seconds a scraped listing price stays cached (0 disables the cache)
    #[arg(long, env = "PRICEBOT_CACHE_TTL", default_value_t = config::DEFAULT_CACHE_TTL_SECS)]
    cache_ttl: u64,

    /// Fee fraction deducted when converting fiat into crypto
    #[arg(long, default_value_t = config::DEFAULT_FEE_FRACTION)]
    fee: f64,

    /// Currency used when /quote is given only a ticker
    #[arg(long, default_value = config::DEFAULT_CURRENCY)]
    default_currency: String,

    /// Unprefixed messages with more tokens than this are ignored
    #[arg(long, default_value_t = config::DEFAULT_IMPLICIT_MAX_TOKENS)]
    implicit_max_tokens: usize,

    #[arg(long, env = "COINCAP_URL", default_value = config::DEFAULT_COINCAP_URL)]
    coincap_url: String,

    #[arg(long, env = "SHAPESHIFT_URL", default_value = config::DEFAULT_SHAPESHIFT_URL)]
    shapeshift_url: String,

    #[arg(long, env = "CEX_URL", default_value = config::DEFAULT_CEX_URL)]
    cex_url: String,

    #[arg(long, env = "JSE_URL", default_value = config::DEFAULT_JSE_URL)]
    jse_url: String,

    #[arg(long, env = "TELEGRAM_URL", default_value = config::DEFAULT_TELEGRAM_URL)]
    telegram_url: String,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        if !(0.0..1.0).contains(&self.fee) {
            return Err(Error::Config(format!(
                "fee must be in [0, 1), got {}",
                self.fee
            )));
        }

        Ok(Settings {
            default_currency: self.default_currency.to_uppercase(),
            fee_fraction: self.fee,
            cache_ttl: Duration::from_secs(self.cache_ttl),
            implicit_max_tokens: self.implicit_max_tokens,
            workers: self.workers.unwrap_or_else(config::default_workers).max(1),
            coincap_url: self.coincap_url.clone(),
            shapeshift_url: self.shapeshift_url.clone(),
            cex_url: self.cex_url.clone(),
            jse_url: self.jse_url.clone(),
            telegram_url: self.telegram_url.clone(),
        })
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env before CLI parsing so env-backed args (e.g. TELEGRAM_BOT_TOKEN) pick it up.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!(error = %e, "fatal error");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = cli.settings()?;
    let bot = Arc::new(Bot::from_settings(&settings));
    let (tx, rx) = worker::queue(settings.workers);

    if !settings.cache_ttl.is_zero() {
        let cache = bot.resolver().cache().clone();
        let period = settings.cache_ttl.min(MAX_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(period);
            loop {
                sweep.tick().await;
                cache.clear_expired().await;
            }
        });
    }

    info!(version = APP_VERSION, workers = settings.workers, "starting pricebot");

    if cli.console {
        let console = Console;
        let sink: Arc<dyn ReplySink> = Arc::new(console.clone());
        let pool = tokio::spawn(worker::run(settings.workers, rx, bot, sink));
        console.poll(tx).await?;
        if let Err(e) = pool.await {
            error!(error = %e, "worker pool failed");
        }
        return Ok(());
    }

    let token = cli.token.filter(|t| !t.is_empty()).ok_or_else(|| {
        Error::Config(
            "no bot token -- set TELEGRAM_BOT_TOKEN, pass --token, or use --console".into(),
        )
    })?;

    let telegram = Telegram::with_base_url(token, settings.telegram_url.as_str());
    let sink: Arc<dyn ReplySink> = Arc::new(telegram.clone());
    let pool = tokio::spawn(worker::run(settings.workers, rx, bot, sink));
    telegram.poll(tx).await?;
    if let Err(e) = pool.await {
        error!(error = %e, "worker pool failed");
    }

    Ok(())
}
