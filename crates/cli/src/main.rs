//! Joestar Peptide CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! joestar-cli migrate
//!
//! # Load products, discount codes, e-books and testimonials
//! joestar-cli seed --dir crates/api/seed
//!
//! # Create a discount code
//! joestar-cli discount create --code WELCOME10 --discount 10 --type percentage
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the database from JSON files
//! - `discount create` - Create a discount code

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use joestar_core::DiscountKind;

mod commands;

#[derive(Parser)]
#[command(name = "joestar-cli")]
#[command(author, version, about = "Joestar Peptide CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database from JSON files
    Seed {
        /// Directory holding the seed files
        #[arg(short, long, default_value = "crates/api/seed")]
        dir: PathBuf,
    },
    /// Manage discount codes
    Discount {
        #[command(subcommand)]
        action: DiscountAction,
    },
}

#[derive(Subcommand)]
enum DiscountAction {
    /// Create a new discount code
    Create {
        /// Code customers enter at checkout
        #[arg(short, long)]
        code: String,

        /// Percentage points or fixed amount, depending on --type
        #[arg(short, long)]
        discount: Decimal,

        /// Discount type
        #[arg(short = 't', long = "type", value_enum, default_value = "percentage")]
        kind: KindArg,

        /// Maximum number of uses
        #[arg(short, long)]
        max_uses: Option<i32>,

        /// Last valid moment (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        valid_until: Option<String>,

        /// Internal description
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Percentage,
    Fixed,
}

impl From<KindArg> for DiscountKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Percentage => Self::Percentage,
            KindArg::Fixed => Self::Fixed,
        }
    }
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { dir } => commands::seed::run(&dir).await?,
        Commands::Discount { action } => match action {
            DiscountAction::Create {
                code,
                discount,
                kind,
                max_uses,
                valid_until,
                description,
            } => {
                commands::discount::create(commands::discount::NewDiscount {
                    code,
                    discount,
                    kind: kind.into(),
                    max_uses,
                    valid_until,
                    description,
                })
                .await?;
            }
        },
    }
    Ok(())
}
