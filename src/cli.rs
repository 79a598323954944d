//! CLI command handlers

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::auth::{AuthService, IdentityClient, Session};
use crate::client::BaseClient;
use crate::config::{AppConfig, ConfigService};
use crate::documents::{DocumentStore, HttpDocumentStore};
use crate::error::{ErrorCode, HearthError, Result};
use crate::listing::{
    fetch_listing, fetch_profile, load_images, Listing, ListingDraft, ListingKind, UserProfile,
    USERS_COLLECTION,
};
use crate::session::SessionStoreConfig;
use crate::storage::ResumableStorageClient;
use crate::submit::SubmissionSequencer;
use crate::ui::{create_transfer_bar, format_price, format_price_colored, UI};
use crate::upload::{UploadProgress, UploadService};
use crate::{
    Commands, ConfigArgs, ConfigCommand, ContactArgs, CreateArgs, LoginArgs, ShowArgs, SignupArgs,
};

const SESSION_OBFUSCATION_KEY: &str = "hearth-session-v1";

/// CLI handler for processing commands
pub struct CliHandler {
    config_path: Option<PathBuf>,
    ui: UI,
}

impl CliHandler {
    pub fn new() -> Self {
        Self {
            config_path: None,
            ui: UI::new(),
        }
    }

    #[allow(dead_code)]
    pub fn with_config_path(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            ui: UI::new(),
        }
    }

    async fn load_config(&self) -> Result<AppConfig> {
        if let Some(path) = &self.config_path {
            AppConfig::load_from(path).await
        } else {
            AppConfig::load().await
        }
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Signup(args) => self.handle_signup(args).await,
            Commands::Login(args) => self.handle_login(args).await,
            Commands::Logout => self.handle_logout().await,
            Commands::Status => self.handle_status().await,
            Commands::Create(args) => self.handle_create(args).await,
            Commands::Show(args) => self.handle_show(args).await,
            Commands::Contact(args) => self.handle_contact(args).await,
            Commands::Config(args) => self.handle_config(args).await,
        }
    }

    fn auth_service(&self, config: &AppConfig) -> Result<AuthService<IdentityClient>> {
        let base = BaseClient::new(config.api_url(), config.timeout)?;
        let store_config = SessionStoreConfig {
            enabled: config.session_storage_enabled,
            storage_path: Some(config.session_path()),
            obfuscation_key: Some(SESSION_OBFUSCATION_KEY.to_string()),
        };
        AuthService::new(Arc::new(IdentityClient::new(base)), store_config)
    }

    fn document_store(&self, config: &AppConfig, session: &Session) -> Result<HttpDocumentStore> {
        let base = BaseClient::new(config.api_url(), config.timeout)?;
        Ok(HttpDocumentStore::new(base, session.id_token.clone()))
    }

    async fn handle_signup(&mut self, args: SignupArgs) -> Result<()> {
        let config = self.load_config().await?;
        let auth = self.auth_service(&config)?;

        let password = prompt_password(args.password)?;
        let session = auth.signup(&args.email, &password, &args.name).await?;

        // Mirror the account into the users collection so other users can
        // look the owner up when contacting a listing.
        let profile = UserProfile {
            name: args.name.clone(),
            email: session.email.clone(),
            created_at: None,
        };
        self.document_store(&config, &session)?
            .set(
                USERS_COLLECTION,
                &session.user_id,
                serde_json::to_value(&profile)?,
            )
            .await?;

        self.ui
            .success(&format!("Welcome to Hearth, {}!", args.name));
        Ok(())
    }

    async fn handle_login(&mut self, args: LoginArgs) -> Result<()> {
        let config = self.load_config().await?;
        let auth = self.auth_service(&config)?;

        let password = prompt_password(args.password)?;
        let session = auth.login(&args.email, &password).await?;

        let greeting = session
            .display_name
            .clone()
            .unwrap_or_else(|| session.email.clone());
        self.ui.success(&format!("Logged in as {}", greeting));
        Ok(())
    }

    async fn handle_logout(&mut self) -> Result<()> {
        let config = self.load_config().await?;
        self.auth_service(&config)?.logout()?;
        self.ui.success("Logged out");
        Ok(())
    }

    async fn handle_status(&mut self) -> Result<()> {
        let config = self.load_config().await?;
        let auth = self.auth_service(&config)?;

        let (authenticated, stale, email) = auth.status();
        let mut fields = vec![
            ("Version", env!("CARGO_PKG_VERSION").to_string()),
            (
                "Authentication",
                self.ui.format_auth_status(authenticated && !stale, stale),
            ),
        ];
        if authenticated {
            fields.push(("Email", self.ui.format_field(email)));
        }
        fields.push(("API endpoint", config.api_endpoint.clone()));

        self.ui.card("Status", fields);
        Ok(())
    }

    async fn handle_create(&mut self, args: CreateArgs) -> Result<()> {
        let config = self.load_config().await?;
        let auth = self.auth_service(&config)?;
        let session = auth.current_session().await?;

        let images = load_images(&args.images).await?;
        let total_bytes: u64 = images.iter().map(|i| i.bytes.len() as u64).sum();
        let image_count = images.len();

        let draft = ListingDraft {
            kind: args.kind,
            name: args.name,
            bedrooms: args.bedrooms,
            bathrooms: args.bathrooms,
            parking: args.parking,
            furnished: args.furnished,
            address: args.address,
            offer: args.offer,
            regular_price: args.regular_price,
            discounted_price: args.discounted_price,
            latitude: args.latitude,
            longitude: args.longitude,
            images,
        };

        let storage = ResumableStorageClient::new(
            config.storage_url(),
            config.timeout,
            session.id_token.clone(),
        )?;

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let bar = create_transfer_bar(
            total_bytes,
            &format!("uploading {} image(s)", image_count),
        );
        let bar_task = tokio::spawn(drive_transfer_bar(progress_rx, bar.clone()));

        let uploader = UploadService::new(Arc::new(storage)).with_observer(progress_tx);
        let documents = Arc::new(self.document_store(&config, &session)?);
        let sequencer = SubmissionSequencer::new(uploader, documents);

        let result = sequencer.submit(&session, draft).await;
        drop(sequencer);
        let _ = bar_task.await;

        let stored = match result {
            Ok(stored) => {
                bar.finish_and_clear();
                stored
            }
            Err(e) => {
                bar.abandon();
                // Storage detail is in the logs; the user-facing message
                // matches what the web form shows.
                return Err(match e.code() {
                    ErrorCode::UploadFailed | ErrorCode::UploadCancelled => {
                        tracing::debug!(error = %e, "image batch failed");
                        HearthError::upload("Images not uploaded")
                    }
                    _ => e,
                });
            }
        };

        self.ui.success("Listing created");
        self.render_listing(&stored.id, &stored.listing);
        Ok(())
    }

    async fn handle_show(&mut self, args: ShowArgs) -> Result<()> {
        let config = self.load_config().await?;
        let auth = self.auth_service(&config)?;
        let session = auth.current_session().await?;

        let documents = self.document_store(&config, &session)?;
        let listing = fetch_listing(&documents, &args.id).await?;

        self.render_listing(&args.id, &listing);
        if listing.user_ref != session.user_id {
            self.ui.info(&format!(
                "Run `hearth contact {}` to reach the owner",
                args.id
            ));
        }
        Ok(())
    }

    async fn handle_contact(&mut self, args: ContactArgs) -> Result<()> {
        let config = self.load_config().await?;
        let auth = self.auth_service(&config)?;
        let session = auth.current_session().await?;

        let documents = self.document_store(&config, &session)?;
        let listing = fetch_listing(&documents, &args.id).await?;

        if listing.user_ref == session.user_id {
            self.ui.warning("This is your own listing");
            return Ok(());
        }

        let owner = fetch_profile(&documents, &listing.user_ref).await?;

        self.ui.card(
            "Contact Landlord",
            vec![
                ("Name", owner.name.clone()),
                ("Email", owner.email.clone()),
                ("Listing", listing.name.clone()),
            ],
        );
        self.ui.info(&format!(
            "mailto:{}?Subject={}&body={}",
            owner.email,
            listing.name,
            args.message.unwrap_or_default()
        ));
        Ok(())
    }

    async fn handle_config(&mut self, args: ConfigArgs) -> Result<()> {
        let config = self.load_config().await?;
        let mut service = if let Some(path) = self.config_path.clone() {
            ConfigService::with_config_path(config, path)
        } else {
            ConfigService::new(config)
        };

        match args.command {
            ConfigCommand::Show => {
                service.show();
                Ok(())
            }
            ConfigCommand::SetApiEndpoint { url } => service.set_api_endpoint(url).await,
            ConfigCommand::SetStorageEndpoint { url } => service.set_storage_endpoint(url).await,
            ConfigCommand::SetTimeout { seconds } => service.set_timeout(seconds).await,
            ConfigCommand::SetVerbose { enabled } => service.set_verbose(enabled).await,
            ConfigCommand::Reset => service.reset().await,
        }
    }

    fn render_listing(&self, id: &str, listing: &Listing) {
        let price = match listing.kind {
            ListingKind::Rent => format!("{} / month", format_price_colored(listing.effective_price())),
            ListingKind::Sale => format_price_colored(listing.effective_price()),
        };
        let mut fields = vec![
            ("Id", id.to_string()),
            ("Name", listing.name.clone()),
            ("Kind", listing.kind.label().to_string()),
            ("Price", price),
        ];
        if let Some(discount) = listing.discount() {
            fields.push(("Discount", format!("${} off", format_price(discount))));
        }
        fields.push(("Bedrooms", pluralize(listing.bedrooms, "Bedroom")));
        fields.push(("Bathrooms", pluralize(listing.bathrooms, "Bathroom")));
        fields.push(("Parking", yes_no(listing.parking)));
        fields.push(("Furnished", yes_no(listing.furnished)));
        fields.push(("Location", listing.location.clone()));
        fields.push((
            "Geolocation",
            format!("{}, {}", listing.geolocation.lat, listing.geolocation.lng),
        ));
        fields.push(("Images", listing.image_urls.len().to_string()));

        self.ui.card(listing.kind.label(), fields);
        for url in &listing.image_urls {
            self.ui.info(url);
        }
        self.ui.blank_line();
    }
}

/// Feed batch progress events into an aggregate byte bar. Each event carries
/// the file's total so far; the bar position is the sum over files.
async fn drive_transfer_bar(
    mut rx: mpsc::UnboundedReceiver<UploadProgress>,
    bar: indicatif::ProgressBar,
) {
    let mut per_file: HashMap<usize, u64> = HashMap::new();
    while let Some(event) = rx.recv().await {
        per_file.insert(event.index, event.transfer.bytes_transferred);
        bar.set_position(per_file.values().sum());
        bar.set_message(event.file_name);
    }
}

fn prompt_password(given: Option<String>) -> Result<String> {
    match given {
        Some(password) => Ok(password),
        None => dialoguer::Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|e| HearthError::invalid_input(format!("could not read password: {}", e))),
    }
}

fn pluralize(count: u32, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}
