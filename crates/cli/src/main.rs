//! GameWar CLI - account and catalog management tools.
//!
//! # Usage
//!
//! ```bash
//! # Promote an account to seller
//! gw-cli user role client@gamewar.dz seller
//!
//! # Activate a pending account
//! gw-cli user status client@gamewar.dz active
//!
//! # Grant credit
//! gw-cli credit adjust client@gamewar.dz 500 --reason "Tournament prize"
//!
//! # Seed the catalog
//! gw-cli seed products data/products.yaml
//!
//! # List pending orders
//! gw-cli orders list --status pending
//! ```
//!
//! # Commands
//!
//! - `user` - Change account roles and statuses
//! - `credit` - Adjust account credit
//! - `seed` - Seed the catalog from YAML
//! - `orders` - List orders

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use gamewar_core::{OrderStatus, UserRole, UserStatus};

mod commands;

use commands::AdminSession;

#[derive(Parser)]
#[command(name = "gw-cli")]
#[command(author, version, about = "GameWar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage shop accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage account credit
    Credit {
        #[command(subcommand)]
        action: CreditAction,
    },
    /// Seed data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Inspect orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Set an account's role (`user`, `seller`, `admin`)
    Role {
        /// Account uid or email
        user: String,
        role: UserRole,
    },
    /// Set an account's status (`pending`, `active`, `suspended`)
    Status {
        /// Account uid or email
        user: String,
        status: UserStatus,
    },
}

#[derive(Subcommand)]
enum CreditAction {
    /// Add credit to an account, or remove it with a negative amount
    Adjust {
        /// Account uid or email
        user: String,

        /// Whole dinars, negative to deduct
        #[arg(allow_hyphen_values = true)]
        amount: i64,

        /// Reason recorded in the credit history
        #[arg(short, long)]
        reason: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Create catalog products from a YAML file
    Products {
        /// Path to the YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List orders, newest first
    List {
        /// Only orders in this status
        #[arg(short, long)]
        status: Option<OrderStatus>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::User { action } => {
            let session = AdminSession::connect().await?;
            match action {
                UserAction::Role { user, role } => {
                    commands::user::set_role(&session, &user, role).await?;
                }
                UserAction::Status { user, status } => {
                    commands::user::set_status(&session, &user, status).await?;
                }
            }
        }
        Commands::Credit { action } => match action {
            CreditAction::Adjust {
                user,
                amount,
                reason,
            } => {
                let session = AdminSession::connect().await?;
                commands::credit::adjust(&session, &user, amount, &reason).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => {
                // Validate the file before signing in
                let drafts = commands::seed::load(&file).await?;
                let session = AdminSession::connect().await?;
                let result = commands::seed::products(&session, drafts).await?;
                if !result.errors.is_empty() {
                    return Err(format!("{} products failed", result.errors.len()).into());
                }
            }
        },
        Commands::Orders { action } => match action {
            OrdersAction::List { status } => {
                let session = AdminSession::connect().await?;
                commands::orders::list(&session, status).await?;
            }
        },
    }
    Ok(())
}
