use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, TimeZone, Utc};
use clap::{Parser, Subcommand};
use url::Url;

use calbridge_auth::{GoogleOAuth, TokenCache, TokenManager};
use calbridge_core::{Config, GaroonConfig, GoogleConfig};
use calbridge_garoon::GaroonClient;
use calbridge_gcal::GcalClient;
use calbridge_sync::{canonicalize_all, reconcile, Applier};

#[derive(Parser)]
#[command(name = "calbridge", version, about = "Sync a Garoon schedule into a Google Calendar")]
struct Cli {
    /// Garoon login user name
    #[arg(long = "grn-user", env = "GAROON_USER")]
    grn_user: String,

    /// Garoon login password
    #[arg(long = "grn-pass", env = "GAROON_PASS", hide_env_values = true)]
    grn_pass: String,

    /// Garoon target user id (defaults to the login user)
    #[arg(long = "grn-user-id", env = "GAROON_USER_ID")]
    grn_user_id: Option<String>,

    /// Garoon cloud tenant subdomain
    #[arg(long = "grn-subdomain", env = "GAROON_SUBDOMAIN")]
    grn_subdomain: Option<String>,

    /// Garoon package-version API base URL (overrides the subdomain)
    #[arg(long = "grn-url", env = "GAROON_URL")]
    grn_url: Option<Url>,

    /// Base URL for deep links back into Garoon
    #[arg(long = "grn-link-base", env = "GAROON_LINK_BASE")]
    grn_link_base: Url,

    /// Target Google calendar id
    #[arg(long = "gcal-id", env = "GCAL_ID")]
    gcal_id: String,

    /// Path of the cached OAuth token file
    #[arg(
        long = "gcal-token-path",
        env = "GCAL_TOKEN_PATH",
        default_value = "data/token.json"
    )]
    gcal_token_path: PathBuf,

    /// Google OAuth client id
    #[arg(long = "google-client-id", env = "GOOGLE_CLIENT_ID")]
    google_client_id: String,

    /// Google OAuth client secret
    #[arg(
        long = "google-client-secret",
        env = "GOOGLE_CLIENT_SECRET",
        hide_env_values = true
    )]
    google_client_secret: String,

    /// Loopback port for the authorization callback
    #[arg(long, env = "CALLBACK_PORT", default_value_t = 8080)]
    port: u16,

    /// Never start the interactive authorization flow
    #[arg(long = "no-interactive")]
    no_interactive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile the sync window and apply the changes
    Sync,
    /// List calendars visible to the authorized account
    Calendars,
}

impl Cli {
    fn to_config(&self) -> Config {
        Config {
            garoon: GaroonConfig {
                user: self.grn_user.clone(),
                password: self.grn_pass.clone(),
                user_id: self.grn_user_id.clone(),
                subdomain: self.grn_subdomain.clone(),
                base_url: self.grn_url.clone(),
                link_base: self.grn_link_base.clone(),
            },
            google: GoogleConfig {
                client_id: self.google_client_id.clone(),
                client_secret: self.google_client_secret.clone(),
                calendar_id: self.gcal_id.clone(),
                token_path: self.gcal_token_path.clone(),
                interactive: !self.no_interactive,
                callback_port: self.port,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.to_config();
    config.validate()?;

    match cli.command {
        Command::Sync => run_sync(&config).await,
        Command::Calendars => run_calendars(&config).await,
    }
}

async fn run_sync(config: &Config) -> Result<()> {
    let token = token_manager(config).obtain().await?;
    let gcal = GcalClient::new(&token.access_token);
    let garoon = garoon_client(config)?;

    let (start, end) = sync_window(Utc::now().with_timezone(&jst()?))?;
    tracing::info!(%start, %end, "sync window");

    let source_events = garoon
        .events_by_user(start, end, config.garoon.user_id.as_deref())
        .await
        .context("failed to list Garoon events")?;
    let dest_events = gcal
        .list_events(&config.google.calendar_id, start, end)
        .await
        .context("failed to list destination events")?;

    let canonical = canonicalize_all(&source_events, config.garoon.link_base.as_str());
    let plan = reconcile(&canonical, dest_events);

    let stats = Applier::new(&gcal, &config.google.calendar_id)
        .apply(plan)
        .await?;

    println!(
        "Done: {} inserted, {} updated, {} deleted, {} unchanged",
        stats.created, stats.updated, stats.deleted, stats.unchanged
    );
    Ok(())
}

async fn run_calendars(config: &Config) -> Result<()> {
    let token = token_manager(config).obtain().await?;
    let gcal = GcalClient::new(&token.access_token);

    for calendar in gcal.list_calendars().await? {
        let marker = if calendar.primary { " (primary)" } else { "" };
        println!("{}  {}{}", calendar.id, calendar.summary, marker);
    }
    Ok(())
}

fn token_manager(config: &Config) -> TokenManager {
    TokenManager::new(
        TokenCache::new(config.google.token_path.clone()),
        GoogleOAuth::new(
            config.google.client_id.clone(),
            config.google.client_secret.clone(),
        ),
        config.google.interactive,
        config.google.callback_port,
    )
}

fn garoon_client(config: &Config) -> Result<GaroonClient> {
    let garoon = &config.garoon;
    if let Some(base_url) = &garoon.base_url {
        Ok(GaroonClient::with_base_url(
            base_url.as_str(),
            &garoon.user,
            &garoon.password,
        ))
    } else if let Some(subdomain) = &garoon.subdomain {
        Ok(GaroonClient::new(subdomain, &garoon.user, &garoon.password))
    } else {
        anyhow::bail!("either grn-subdomain or grn-url must be configured");
    }
}

fn jst() -> Result<FixedOffset> {
    FixedOffset::east_opt(9 * 3600).context("invalid fixed offset")
}

/// The sync window: start of the current month through the end of the
/// month after next, both at midnight in the fixed +09:00 offset.
fn sync_window(
    now: DateTime<FixedOffset>,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let tz = now.timezone();
    let start = tz
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .context("invalid window start")?;

    let (end_year, end_month) = if now.month() >= 11 {
        (now.year() + 1, now.month() - 10)
    } else {
        (now.year(), now.month() + 2)
    };
    // Last day of next month at midnight: one day before the first of
    // the month after next.
    let end = tz
        .with_ymd_and_hms(end_year, end_month, 1, 0, 0, 0)
        .single()
        .context("invalid window end")?
        - Duration::days(1);

    Ok((start, end))
}
