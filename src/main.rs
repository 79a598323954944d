use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod config;
mod error;
mod ui;
mod upload;

mod auth;
mod client;
mod documents;
mod listing;
mod session;
mod storage;
mod submit;

#[cfg(test)]
mod tests;

use cli::CliHandler;
use listing::ListingKind;

#[derive(Parser)]
#[command(
    name = "hearth",
    about = "Hearth property marketplace client",
    long_about = "Hearth - rent or sell a home from your terminal

OVERVIEW:
  This tool lets you publish and browse property listings on the Hearth
  marketplace.

WORKFLOW:
  1. Sign up (or log in) with your email
  2. Create a listing with up to 6 images
  3. Share the listing id; interested users contact you through it

QUICK START:
  hearth signup <EMAIL> --name <NAME>   # Create an account
  hearth login <EMAIL>                  # Authenticate
  hearth create --kind rent ...         # Publish a listing
  hearth show <LISTING_ID>              # View a listing
  hearth contact <LISTING_ID>           # Reach a listing's owner
  hearth status                         # Check authentication status",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account
    Signup(SignupArgs),

    /// Login with email and password
    Login(LoginArgs),

    /// Logout and forget the stored session
    Logout,

    /// Show authentication status
    #[command(aliases = &["st"])]
    Status,

    /// Publish a new listing
    Create(CreateArgs),

    /// Show a listing
    Show(ShowArgs),

    /// Contact a listing's owner
    Contact(ContactArgs),

    /// Configure settings
    #[command(aliases = &["cfg"])]
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct SignupArgs {
    pub email: String,

    /// Display name shown to other users
    #[arg(short, long)]
    pub name: String,

    /// Prompted for interactively when omitted
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Args)]
pub struct LoginArgs {
    pub email: String,

    /// Prompted for interactively when omitted
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Sale or rent
    #[arg(long, value_enum)]
    pub kind: ListingKind,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub bedrooms: u32,

    #[arg(long)]
    pub bathrooms: u32,

    #[arg(long)]
    pub parking: bool,

    #[arg(long)]
    pub furnished: bool,

    #[arg(long)]
    pub address: String,

    /// Offer a discounted price
    #[arg(long, requires = "discounted_price")]
    pub offer: bool,

    #[arg(long)]
    pub regular_price: u64,

    #[arg(long)]
    pub discounted_price: Option<u64>,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub latitude: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub longitude: f64,

    /// Image files, at most 6; the first becomes the cover
    #[arg(required = true)]
    pub images: Vec<PathBuf>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Args)]
pub struct ContactArgs {
    pub id: String,

    /// Message body included in the generated mail link
    #[arg(short, long)]
    pub message: Option<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    Show,
    SetApiEndpoint { url: String },
    SetStorageEndpoint { url: String },
    SetTimeout { seconds: u64 },
    SetVerbose { enabled: bool },
    Reset,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The persisted verbose setting and the flag both raise the level.
    let config = config::AppConfig::load().await.unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(format!("hearth={}", config.log_level(cli.verbose)))
        .init();

    let mut handler = CliHandler::new();
    if let Err(e) = handler.execute(cli.command).await {
        ui::UI::new().error(&format!("Error: {}", e));
        std::process::exit(1);
    }
}
