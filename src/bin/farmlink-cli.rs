use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use farmlink::client::logistics::{active_deliveries, available_transports, cancel_delivery};
use farmlink::client::{
    book_transport, ApiClient, ApiConfig, BookingState, FileStorage, SessionManager,
    DEFAULT_BASE_URL,
};
use farmlink::models::{
    LoginRequest, LogisticsQuery, LogisticsStatus, ProductCategory, ProductQuery, RegisterRequest,
    StatusUpdate,
};
use farmlink::telemetry::init_tracing;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "FarmLink command line client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL, including the /api prefix
    #[arg(long, env = "FARMLINK_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Session file (defaults to the local data directory)
    #[arg(long, env = "FARMLINK_SESSION_FILE")]
    session_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FARMLINK_PASSWORD")]
        password: String,
    },
    /// Create an account and store the session
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "FARMLINK_PASSWORD")]
        password: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Browse product listings
    Products {
        #[arg(long, value_parser = parse_wire::<ProductCategory>)]
        category: Option<ProductCategory>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Logistics requests and transport bookings
    #[command(subcommand)]
    Logistics(LogisticsCommand),
}

#[derive(Subcommand)]
enum LogisticsCommand {
    /// List your requests (all requests for admins)
    List {
        #[arg(long, value_parser = parse_wire::<LogisticsStatus>)]
        status: Option<LogisticsStatus>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show transport offers
    Transports,
    /// Show deliveries currently in progress
    Active,
    /// Book one of the offers listed by `transports`
    Book {
        /// Position in the `transports` listing, starting at 1
        #[arg(long, default_value_t = 1)]
        offer: usize,
        #[arg(long)]
        pickup: String,
        #[arg(long)]
        delivery: String,
        /// Days from now
        #[arg(long, default_value_t = 1)]
        in_days: i64,
    },
    /// Cancel a pending request
    Cancel { id: Uuid },
    /// Move a request along its lifecycle (admin only)
    Status {
        id: Uuid,
        #[arg(value_parser = parse_wire::<LogisticsStatus>)]
        status: LogisticsStatus,
        #[arg(long)]
        driver: Option<Uuid>,
    },
}

/// Parses a CLI value using the same spelling as the JSON API.
fn parse_wire<T: serde::de::DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unrecognised value '{value}'"))
}

async fn require_session(session: &SessionManager) -> Result<()> {
    if session.load_stored_auth().await?.is_none() {
        bail!("Not logged in. Run `farmlink-cli login` first.");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("farmlink=warn");

    let cli = Cli::parse();

    let api = ApiClient::new(ApiConfig::new(&cli.api_url))
        .with_context(|| format!("Invalid API URL {}", cli.api_url))?;
    let session_path = match cli.session_file {
        Some(path) => path,
        None => FileStorage::default_path()?,
    };
    let session = SessionManager::new(api.clone(), Arc::new(FileStorage::new(session_path)));

    match cli.command {
        Commands::Login { email, password } => {
            let user = session.login(LoginRequest { email, password }).await?;
            println!("Logged in as {} <{}>", user.name, user.email);
        }
        Commands::Register {
            name,
            email,
            password,
            phone,
            location,
        } => {
            let user = session
                .register(RegisterRequest {
                    name,
                    email,
                    password,
                    phone,
                    location,
                })
                .await?;
            println!("Registered {} <{}>", user.name, user.email);
        }
        Commands::Logout => {
            session.logout().await;
            println!("Logged out");
        }
        Commands::Whoami => {
            require_session(&session).await?;
            if let Some(user) = session.user().await {
                let role = if user.is_admin { "admin" } else { "user" };
                println!("{} <{}> ({}) id={}", user.name, user.email, role, user.id);
            }
        }
        Commands::Products {
            category,
            min_price,
            max_price,
            page,
        } => {
            let query = ProductQuery {
                category,
                min_price,
                max_price,
                page,
                ..ProductQuery::default()
            };
            let list = api.products().list(&query).await?;
            for product in &list.data {
                println!(
                    "{}  {:<24} {:>10.2}  {} {:?}  {}",
                    product.id,
                    product.name,
                    product.price,
                    product.quantity,
                    product.unit,
                    product.location.address
                );
            }
            println!(
                "page {}/{} ({} total)",
                list.pagination.current, list.pagination.pages, list.pagination.total
            );
        }
        Commands::Logistics(command) => {
            require_session(&session).await?;
            run_logistics(&api, command).await?;
        }
    }

    Ok(())
}

async fn run_logistics(api: &ApiClient, command: LogisticsCommand) -> Result<()> {
    match command {
        LogisticsCommand::List { status, page } => {
            let query = LogisticsQuery {
                status,
                page,
                ..LogisticsQuery::default()
            };
            let list = api.logistics().list(&query).await?;
            for request in &list.requests {
                println!(
                    "{}  {:<9} {:<12} {:<12} {:>8.2}",
                    request.id,
                    request.kind.as_str(),
                    request.status.as_str(),
                    request.vehicle_type.as_str(),
                    request.price
                );
            }
            println!(
                "page {}/{} ({} total)",
                list.meta.current_page, list.meta.total_pages, list.meta.total
            );
        }
        LogisticsCommand::Transports => {
            for (index, transport) in available_transports(api).await?.iter().enumerate() {
                let cold = transport
                    .temperature_control
                    .as_ref()
                    .map(|t| format!(" [{}]", t.range))
                    .unwrap_or_default();
                println!(
                    "{}. {} ({}) in {} for {:.2}{}, driver {}",
                    index + 1,
                    transport.label,
                    transport.capacity,
                    transport.location,
                    transport.price,
                    cold,
                    transport.driver.name
                );
            }
        }
        LogisticsCommand::Active => {
            for request in active_deliveries(api).await? {
                println!("{}  {}  {}", request.id, request.vehicle_type.as_str(), request.status);
            }
        }
        LogisticsCommand::Book {
            offer,
            pickup,
            delivery,
            in_days,
        } => {
            let transports = available_transports(api).await?;
            let Some(transport) = offer.checked_sub(1).and_then(|i| transports.get(i)) else {
                bail!("No transport offer #{offer}; {} available", transports.len());
            };
            let mut booking = BookingState::new();
            let scheduled = Utc::now() + Duration::days(in_days);
            let created =
                book_transport(api, &mut booking, transport, &pickup, &delivery, scheduled).await?;
            println!("Booked {} as request {} ({})", transport.label, created.id, created.status);
        }
        LogisticsCommand::Cancel { id } => {
            let request = cancel_delivery(api, id).await?;
            println!("Request {} is now {}", request.id, request.status);
        }
        LogisticsCommand::Status { id, status, driver } => {
            let update = StatusUpdate {
                status,
                assigned_driver: driver,
            };
            let request = api.logistics().update_status(id, &update).await?;
            println!("Request {} is now {}", request.id, request.status);
        }
    }
    Ok(())
}
