use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use covers::clock::SystemClock;
use covers::config::Config;
use covers::engine::{Engine, FileStore};
use covers::model::{FloorState, Order, Reservation, Table, format_cents};
use covers::notify::NotifyHub;
use covers::request::{
    Amendment, OrderForm, ReservationForm, ValidationError, parse_duration, parse_party_size,
    parse_requested_time, parse_reservation_id, parse_status,
};

/// Restaurant floor: tables, reservations and orders.
#[derive(Parser, Debug)]
#[command(name = "covers", version, about)]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// Print listings as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed the sample floor and menu if the store is empty.
    Init,
    /// List tables with their current status.
    Tables,
    /// List reservations.
    Reservations,
    /// Book a table for a future time.
    Book {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        party: Option<String>,
        /// `YYYY-MM-DD HH:MM`
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        preference: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Seat a party that just walked in.
    WalkIn {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        party: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Set a reservation's status (Open, Seated, Completed, Cancelled).
    Status { id: String, status: String },
    /// Cancel a reservation and release its table.
    Cancel { id: String },
    /// Change the time or party size of an open reservation.
    Amend {
        id: String,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        party: Option<String>,
    },
    /// Record an order: `covers order <reservation> "Tiramisu|2" ...`
    Order { reservation: String, items: Vec<String> },
    /// Show the menu.
    Menu,
    /// List recorded orders.
    Orders,
    /// Manage tables.
    Table {
        #[command(subcommand)]
        action: TableAction,
    },
    /// Which tables are free at a time, and which one a party would get.
    Availability {
        #[arg(long)]
        time: String,
        #[arg(long)]
        party: Option<String>,
        /// Minutes; defaults to the configured duration.
        #[arg(long)]
        duration: Option<String>,
    },
    /// Keep statuses current and log floor events until interrupted.
    Watch,
}

#[derive(Subcommand, Debug)]
enum TableAction {
    Add { id: u32, capacity: u32, location: String },
    OutOfService { id: u32 },
    Restore { id: u32 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config;
    covers::observability::init(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let store = Arc::new(FileStore::new(config.snapshot_path()));
    let engine = Arc::new(
        Engine::open(
            store,
            Arc::new(NotifyHub::new()),
            Arc::new(SystemClock),
            config.default_duration,
        )
        .await?,
    );

    let json = cli.json;
    match cli.command {
        Command::Init => {
            if engine.seed_if_empty(FloorState::sample()).await? {
                info!("seeded sample floor at {}", config.snapshot_path().display());
            } else {
                info!("floor already has data; nothing seeded");
            }
        }
        Command::Tables => print_tables(&engine.tables().await, json)?,
        Command::Reservations => print_reservations(&engine.reservations().await, json)?,
        Command::Book {
            name,
            phone,
            party,
            time,
            email,
            preference,
            notes,
        } => {
            let form = ReservationForm {
                name,
                phone,
                email,
                preference,
                notes,
                party_size: party,
                time,
            };
            let reservation = engine.create_reservation(form.into_booking(false)?).await?;
            print_reservations(std::slice::from_ref(&reservation), json)?;
        }
        Command::WalkIn {
            name,
            phone,
            party,
            notes,
        } => {
            let form = ReservationForm {
                name,
                phone,
                notes,
                party_size: party,
                ..Default::default()
            };
            let reservation = engine.create_reservation(form.into_booking(true)?).await?;
            print_reservations(std::slice::from_ref(&reservation), json)?;
        }
        Command::Status { id, status } => {
            let reservation = engine
                .update_status(parse_reservation_id(&id)?, parse_status(&status)?)
                .await?;
            print_reservations(std::slice::from_ref(&reservation), json)?;
        }
        Command::Cancel { id } => {
            let reservation = engine.cancel_reservation(parse_reservation_id(&id)?).await?;
            print_reservations(std::slice::from_ref(&reservation), json)?;
        }
        Command::Amend { id, time, party } => {
            let amendment = Amendment::parse(time.as_deref(), party.as_deref())?;
            if amendment.is_empty() {
                return Err(ValidationError::MissingField("time or party size").into());
            }
            let reservation = engine
                .amend_reservation(parse_reservation_id(&id)?, amendment)
                .await?;
            print_reservations(std::slice::from_ref(&reservation), json)?;
        }
        Command::Order { reservation, items } => {
            let request = OrderForm {
                reservation_id: Some(reservation),
                items,
            }
            .into_order()?;
            let order = engine.record_order(request).await?;
            print_orders(std::slice::from_ref(&order), json)?;
        }
        Command::Menu => {
            let menu = engine.menu().await;
            if json {
                print_json(&menu)?;
            } else {
                for item in &menu {
                    println!("{:<20} {:<10} {:>8}", item.name, item.category, format_cents(item.price));
                }
            }
        }
        Command::Orders => print_orders(&engine.orders().await, json)?,
        Command::Table { action } => {
            let table = match action {
                TableAction::Add { id, capacity, location } => engine.add_table(id, capacity, location).await?,
                TableAction::OutOfService { id } => engine.set_out_of_service(id, true).await?,
                TableAction::Restore { id } => engine.set_out_of_service(id, false).await?,
            };
            print_tables(std::slice::from_ref(&table), json)?;
        }
        Command::Availability { time, party, duration } => {
            let start = parse_requested_time(&time)?;
            let duration = duration.as_deref().map(parse_duration).transpose()?;
            availability(&engine, start, party.as_deref(), duration, json).await?;
        }
        Command::Watch => watch(engine, &config).await?,
    }
    Ok(())
}

#[derive(Serialize)]
struct AvailabilityRow {
    table: u32,
    capacity: u32,
    available: bool,
}

async fn availability(
    engine: &Engine,
    start: chrono::NaiveDateTime,
    party: Option<&str>,
    duration: Option<u32>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rows = Vec::new();
    for table in engine.tables().await {
        rows.push(AvailabilityRow {
            table: table.id,
            capacity: table.capacity,
            available: engine.check_availability(table.id, start, duration, None).await?,
        });
    }
    let suggestion = match party {
        Some(raw) => engine.suggest_table(parse_party_size(raw)?, start, duration).await,
        None => None,
    };

    if json {
        return print_json(&serde_json::json!({ "tables": rows, "suggested": suggestion }));
    }
    for row in &rows {
        let state = if row.available { "free" } else { "taken" };
        println!("table {:>3}  seats {:>2}  {state}", row.table, row.capacity);
    }
    if party.is_some() {
        match suggestion {
            Some(id) => println!("suggested table: {id}"),
            None => println!("no table fits"),
        }
    }
    Ok(())
}

async fn watch(engine: Arc<Engine>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    for table in engine.tables().await {
        let mut rx = engine.notify.subscribe(table.id);
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                info!(?event, "floor event");
            }
        });
    }

    info!(
        data = %config.snapshot_path().display(),
        every = config.refresh_secs,
        "watching floor"
    );
    let refresher = tokio::spawn(covers::refresher::run_refresher(engine, config.refresh_period()));

    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await?;
    }

    info!("shutdown signal received, stopping refresher");
    refresher.abort();
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_tables(tables: &[Table], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        return print_json(tables);
    }
    for t in tables {
        println!("{:>3}  seats {:>2}  {:<10} {}", t.id, t.capacity, t.location, t.status);
    }
    Ok(())
}

fn print_reservations(reservations: &[Reservation], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        return print_json(reservations);
    }
    for r in reservations {
        let table = r.table_id.map_or_else(|| "-".to_string(), |id| id.to_string());
        let until = r.end_time().unwrap_or_else(|| "?".to_string());
        println!(
            "{}  {:<16} party {:>2}  {} → {}  table {:>3}  {}",
            r.id, r.contact.name, r.party_size, r.time, until, table, r.status
        );
    }
    Ok(())
}

fn print_orders(orders: &[Order], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        return print_json(orders);
    }
    for o in orders {
        let items: Vec<String> = o.lines.iter().map(|l| format!("{} x{}", l.name, l.quantity)).collect();
        println!(
            "{}  reservation {}  {}  total {}",
            o.id,
            o.reservation_id,
            items.join(", "),
            format_cents(o.total)
        );
    }
    Ok(())
}
