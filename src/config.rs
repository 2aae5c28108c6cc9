use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "actuaryboard", about = "Actuarial job board scraper and query service")]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true")]
    pub run_migrations: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the job query service (default when no subcommand given)
    Serve {
        /// Listen address
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
        listen_addr: String,
    },
    /// Scrape listings once and store the new ones
    Scrape(ScrapeArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ScrapeArgs {
    /// Collector name
    #[arg(long, default_value = "actuarylist")]
    pub collector: String,

    /// Listing page to load
    #[arg(long, env = "SCRAPE_URL", default_value = "https://www.actuarylist.com")]
    pub url: String,

    /// Stop after this many accepted listings
    #[arg(long, env = "MAX_JOBS", default_value = "50")]
    pub max_jobs: usize,

    /// Page load timeout in seconds
    #[arg(long, env = "SCRAPE_TIMEOUT_SECS", default_value = "10")]
    pub timeout_secs: u64,

    /// Load the page in headless Chrome so script-rendered listings appear
    #[arg(long, env = "SCRAPE_BROWSER", default_value = "false")]
    pub browser: bool,

    /// Extract and log listings without writing them
    #[arg(long)]
    pub dry_run: bool,
}

impl Config {
    /// Resolve the command, defaulting to Serve if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }
}
