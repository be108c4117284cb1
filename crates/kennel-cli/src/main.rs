//! Kennel CLI - booking coordination against a live backend
//!
//! Usage:
//!   kennel init                       Write a default .kennel/config.toml
//!   kennel kennels --start <date>     Show the kennel grid for a window
//!   kennel dashboard [--date <date>]  Check-ins, check-outs and overnights
//!   kennel book --anchor A05 --pet .. Book several pets into adjacent kennels
//!   kennel move --reservation .. --kennel A09 --start .. --end ..
//!                                     Move a stay to another kennel
//!   kennel report recent|distribution|imported
//!                                     Reservation summaries

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use kennel_booking::dashboard::tenant_today;
use kennel_booking::report::{
    imported_summary, kennel_distribution, range_summary, recent_summary,
};
use kennel_booking::{
    move_reservation, BookingDraft, BookingRequest, CellState, DashboardData, DashboardFilter, GridWindow,
    KennelGrid, OptionState,
};
use kennel_client::{
    list_all_reservations, EnvToken, HttpKennelApi, KennelApi, ReservationQuery, StaticToken,
    TokenProvider,
};
use kennel_core::{DateRange, KennelConfig, KennelError, ResourceType};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "kennel")]
#[command(author, version, about = "Kennel availability and booking coordination")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to .kennel/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override the tenant id
    #[arg(long, global = true)]
    tenant: Option<String>,

    /// Bearer token (otherwise read from the configured env var)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Show kennel availability for a date window
    Kennels {
        /// First day (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD, defaults to the configured window)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Only this suite type (standard, standard-plus, vip)
        #[arg(long = "type")]
        resource_type: Option<ResourceType>,
    },

    /// Show dashboard counts for a day
    Dashboard {
        /// Reference day (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// List filter (all, check-ins, check-outs, overnight)
        #[arg(long, default_value = "all")]
        filter: DashboardFilter,

        /// Print metrics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Book several pets into kennels starting at an anchor kennel
    Book {
        #[arg(long)]
        customer: String,

        #[arg(long)]
        service: String,

        /// Stay start (RFC 3339)
        #[arg(long)]
        start: DateTime<FixedOffset>,

        /// Stay end (RFC 3339)
        #[arg(long)]
        end: DateTime<FixedOffset>,

        /// Kennel for the first pet (id or name)
        #[arg(long)]
        anchor: String,

        /// Pet ids in order; repeat for each pet
        #[arg(long = "pet", required = true)]
        pets: Vec<String>,

        /// Manual override, `pet=kennel`
        #[arg(long = "assign")]
        assignments: Vec<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Move a committed reservation to another kennel
    Move {
        /// Reservation id
        #[arg(long)]
        reservation: String,

        /// Target kennel (id or name)
        #[arg(long)]
        kennel: String,

        /// First day of the stay (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the stay (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
    },

    /// Reservation summaries
    Report {
        #[command(subcommand)]
        action: ReportCommands,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Most recent reservations and how many lack a kennel
    Recent {
        #[arg(long, default_value = "20", value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
    },

    /// Reservations per kennel
    Distribution {
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Restrict to stays starting on or after this day
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Restrict to stays ending on or before this day
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Reservations brought in by the legacy import (those with an externalId)
    Imported {
        /// Sample reservations to list
        #[arg(long, default_value = "10")]
        samples: usize,

        /// Kennels to list in the distribution
        #[arg(long, default_value = "5")]
        limit: usize,
    },
}

/// Resolved settings shared by every command
struct AppContext {
    config: KennelConfig,
    tz: Tz,
    api: Arc<HttpKennelApi>,
}

fn build_context(cli: &Cli) -> Result<AppContext> {
    let mut config = match &cli.config {
        Some(path) => KennelConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => KennelConfig::load_or_default(&std::env::current_dir()?)
            .context("Failed to load .kennel/config.toml")?,
    };
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    if let Some(tenant) = &cli.tenant {
        config.tenant.id = tenant.clone();
    }

    let tokens: Arc<dyn TokenProvider> = match &cli.token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => Arc::new(EnvToken::new(config.api.token_env.clone())),
    };
    let tz = config.tenant.tz()?;
    let api = Arc::new(HttpKennelApi::from_config(&config, tokens)?);

    Ok(AppContext {
        config,
        tz,
        api,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Init { path } = &cli.command {
        return cmd_init(path.clone());
    }

    let ctx = build_context(&cli)?;
    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Kennels {
            start,
            end,
            resource_type,
        } => cmd_kennels(&ctx, start, end, resource_type).await,
        Commands::Dashboard { date, filter, json } => cmd_dashboard(&ctx, date, filter, json).await,
        Commands::Book {
            customer,
            service,
            start,
            end,
            anchor,
            pets,
            assignments,
            notes,
        } => {
            let request = BookingRequest {
                customer_id: customer,
                service_id: service,
                start_date: start.with_timezone(&Utc),
                end_date: end.with_timezone(&Utc),
                notes,
            };
            cmd_book(&ctx, request, anchor, pets, assignments).await
        }
        Commands::Move {
            reservation,
            kennel,
            start,
            end,
        } => cmd_move(&ctx, reservation, kennel, DateRange::new(start, end)?).await,
        Commands::Report { action } => cmd_report(&ctx, action).await,
    }
}

fn cmd_init(path: PathBuf) -> Result<()> {
    info!("Writing default configuration in {:?}", path);
    KennelConfig::write_default(&path).context("Failed to write .kennel/config.toml")?;
    println!("Created {}", path.join(".kennel/config.toml").display());
    Ok(())
}

async fn cmd_kennels(
    ctx: &AppContext,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    resource_type: Option<ResourceType>,
) -> Result<()> {
    let start = start.unwrap_or_else(|| tenant_today(&ctx.tz));
    let days = i64::from(ctx.config.grid.window_days.max(1)) - 1;
    let end = end.unwrap_or(start + Duration::days(days));
    let range = DateRange::new(start, end)?;

    let grid = KennelGrid::new(ctx.api.clone(), ctx.tz).with_page_limit(ctx.config.grid.page_limit);
    grid.load(GridWindow::new(range, resource_type)).await;
    let state = grid.snapshot().await;

    if let Some(message) = &state.last_error {
        println!("! {}", message);
    }

    print!("{:<10}", "Kennel");
    for day in range.days() {
        print!(" {}", day.format("%d"));
    }
    println!();

    for row in &state.rows {
        print!("{:<10}", row.resource.display_name());
        for day in range.days() {
            let mark = match row.cell(day, &ctx.tz) {
                CellState::Free => " ..",
                CellState::Occupied { .. } => " ##",
            };
            print!("{}", mark);
        }
        if !row.is_selectable() {
            print!("  (unavailable)");
        }
        println!();
    }
    println!("\n{} kennels, {} available", state.rows.len(), state.available_resources().len());
    Ok(())
}

async fn cmd_dashboard(
    ctx: &AppContext,
    date: Option<NaiveDate>,
    filter: DashboardFilter,
    json: bool,
) -> Result<()> {
    let date = date.unwrap_or_else(|| tenant_today(&ctx.tz));
    let mut dashboard =
        DashboardData::new(ctx.api.clone(), ctx.tz, date).with_page_limit(ctx.config.grid.page_limit);
    dashboard.load().await;

    if json {
        println!("{}", serde_json::to_string_pretty(dashboard.metrics())?);
        return Ok(());
    }

    if let Some(message) = dashboard.last_error() {
        println!("! {}", message);
    }
    let metrics = dashboard.metrics();
    println!("Dashboard for {}", date);
    println!("==================");
    println!("Check-ins:  {}", metrics.count(DashboardFilter::CheckIns));
    println!("Check-outs: {}", metrics.count(DashboardFilter::CheckOuts));
    println!("Overnight:  {}", metrics.count(DashboardFilter::Overnight));

    println!();
    for r in dashboard.reservations_for(filter) {
        println!(
            "  {}  {} -> {}  {}  {}",
            r.short_id(),
            r.local_start_date(&ctx.tz),
            r.local_end_date(&ctx.tz),
            r.resource_name().unwrap_or("-"),
            r.status
        );
    }
    Ok(())
}

async fn cmd_book(
    ctx: &AppContext,
    request: BookingRequest,
    anchor: String,
    pets: Vec<String>,
    overrides: Vec<String>,
) -> Result<()> {
    let range = DateRange::new(
        request.start_date.with_timezone(&ctx.tz).date_naive(),
        request.end_date.with_timezone(&ctx.tz).date_naive(),
    )?;

    let grid = KennelGrid::new(ctx.api.clone(), ctx.tz).with_page_limit(ctx.config.grid.page_limit);
    grid.load(GridWindow::new(range, None)).await;
    let state = grid.snapshot().await;
    if let Some(message) = &state.last_error {
        println!("! {}", message);
    }

    // Accept kennel names as well as ids
    let resolve = |key: &str| -> Option<String> {
        state
            .rows
            .iter()
            .find(|r| r.resource.id == key || r.resource.display_name().eq_ignore_ascii_case(key))
            .map(|r| r.resource.id.clone())
    };

    let anchor_id = resolve(&anchor).with_context(|| format!("Unknown kennel: {}", anchor))?;
    let mut draft = BookingDraft::from_grid(&state);
    for pet in &pets {
        draft.select_pet(pet.clone());
    }
    draft.prefill(&anchor_id, &state.available_resources());

    for entry in &overrides {
        let Some((pet, kennel)) = entry.split_once('=') else {
            bail!("Invalid --assign {:?}, expected pet=kennel", entry);
        };
        let kennel_id = resolve(kennel).with_context(|| format!("Unknown kennel: {}", kennel))?;
        draft.assign(pet, &kennel_id)?;
    }

    let resources: Vec<_> = state.rows.iter().map(|r| r.resource.clone()).collect();
    for pet in draft.selected_pets() {
        let label = draft
            .assignment(pet)
            .and_then(|id| state.row(id))
            .map(|r| r.resource.display_name().to_string())
            .unwrap_or_else(|| "(none)".to_string());
        let shared = draft
            .assignment(pet)
            .map(|id| draft.option_state(pet, id) == OptionState::SoftConflict)
            .unwrap_or(false);
        println!("  {:<12} -> {}{}", pet, label, if shared { "  (shared!)" } else { "" });
    }
    let free = draft
        .options_for(&pets[0], &resources)
        .iter()
        .filter(|o| o.state == OptionState::Available)
        .count();
    info!("{} kennels free for {}", free, range);

    match draft.submit(ctx.api.as_ref(), &request).await {
        Ok(created) => {
            println!("\nBooked {} reservations:", created.len());
            for r in &created {
                println!("  {} pet {} kennel {}", r.id, r.pet_id, r.assigned_resource_id().unwrap_or("-"));
            }
            grid.refresh().await;
            Ok(())
        }
        Err(KennelError::Validation(errors)) => {
            println!("\nBooking not submitted:");
            for e in errors.iter() {
                println!("  {}: {}", e.field, e.message);
            }
            bail!("{} validation error(s)", errors.len())
        }
        Err(e) => {
            println!("\nBooking failed: {}", e.user_message());
            Err(e.into())
        }
    }
}

async fn cmd_move(
    ctx: &AppContext,
    reservation_id: String,
    kennel: String,
    range: DateRange,
) -> Result<()> {
    let grid = KennelGrid::new(ctx.api.clone(), ctx.tz).with_page_limit(ctx.config.grid.page_limit);
    grid.load(GridWindow::new(range, None)).await;
    let state = grid.snapshot().await;
    if let Some(message) = &state.last_error {
        println!("! {}", message);
    }

    let target = state
        .rows
        .iter()
        .find(|r| r.resource.id == kennel || r.resource.display_name().eq_ignore_ascii_case(&kennel))
        .map(|r| r.resource.id.clone())
        .with_context(|| format!("Unknown kennel: {}", kennel))?;

    match move_reservation(ctx.api.as_ref(), &state, &reservation_id, &target).await {
        Ok(moved) => {
            println!(
                "Moved {} to kennel {}",
                moved.short_id(),
                moved.resource_name().unwrap_or(kennel.as_str())
            );
            Ok(())
        }
        Err(KennelError::Validation(errors)) => {
            for e in errors.iter() {
                println!("  {}: {}", e.field, e.message);
            }
            bail!("Reservation not moved")
        }
        Err(e) => {
            println!("Move failed: {}", e.user_message());
            Err(e.into())
        }
    }
}

async fn cmd_report(ctx: &AppContext, action: ReportCommands) -> Result<()> {
    match action {
        ReportCommands::Recent { limit } => {
            let query = ReservationQuery::recent(limit);
            let page = ctx.api.list_reservations(&query).await?;
            println!("{}", recent_summary(&page.items, limit as usize, &ctx.tz));
        }
        ReportCommands::Distribution { limit, start, end } => {
            let mut query = ReservationQuery::default().with_limit(ctx.config.grid.page_limit);
            if let (Some(start), Some(end)) = (start, end) {
                query = query.within(DateRange::new(start, end)?);
            } else if start.is_some() || end.is_some() {
                bail!("--start and --end must be given together");
            }

            let reservations = list_all_reservations(ctx.api.as_ref(), &query).await?;
            let summary = range_summary(&reservations);
            println!("Total in range: {}", summary.total);
            println!("Unique resources used: {}\n", summary.resource_ids.len());
            print!("{}", kennel_distribution(&reservations).render(limit));
        }
        ReportCommands::Imported { samples, limit } => {
            let query = ReservationQuery::default().with_limit(ctx.config.grid.page_limit);
            let reservations = list_all_reservations(ctx.api.as_ref(), &query).await?;
            print!("{}", imported_summary(&reservations, samples, &ctx.tz).render(limit));
        }
    }
    Ok(())
}
