//! PinIdentity CLI: `pin` command.
//!
//! Manages the owner identity of a self-hosted profile instance: profile
//! fields, visibility flags, claimed domains and their verification, and
//! exports in every supported format.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use pin_identity::config::CONFIG_FILE_NAME;
use pin_identity::domains::{domains_to_text, record_verified_domains};
use pin_identity::identity::ScalarField;
use pin_identity::token::{domain_token, private_token};
use pin_identity::{
    parse_domains, project, DomainService, DomainVerificationStore, ExportFormat, ExportService,
    FileStore, Handle, HttpChallenger, Identity, IdentityStore, InstanceConfig, View, Visibility,
};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn default_data_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME not set; pass --data-dir")?;
    Ok(PathBuf::from(home).join(".pin"))
}

/// Everything a command needs, opened from one data directory.
struct Workspace {
    config_path: PathBuf,
    config: InstanceConfig,
    store: Arc<FileStore>,
}

impl Workspace {
    fn open(data_dir: &Path, base_url: Option<&str>) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        let mut config = InstanceConfig::load_or_default(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        config.apply_env_overrides();
        if let Some(url) = base_url {
            config.base_url = url.trim().to_string();
        }
        let store = FileStore::new(data_dir)
            .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;
        Ok(Self {
            config_path,
            config,
            store: Arc::new(store),
        })
    }

    fn save_config(&self) -> Result<()> {
        self.config
            .save(&self.config_path)
            .with_context(|| format!("failed to write {}", self.config_path.display()))
    }

    fn owner(&self) -> Result<Identity> {
        self.store
            .get_by_id(self.config.owner_identity_id)
            .context("no identity yet; run `pin init` first")
    }

    fn domain_service(&self) -> Result<DomainService> {
        let fetcher = HttpChallenger::new().context("failed to build HTTP client")?;
        Ok(DomainService::new(self.store.clone(), Arc::new(fetcher))
            .with_protected_domain(
                self.config.owner_identity_id,
                self.config.protected_domain.clone(),
            ))
    }

    fn export_service(&self) -> ExportService {
        ExportService::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.config.base_url(),
        )
    }
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// PinIdentity CLI: manage a self-hosted identity and its exports.
#[derive(Parser, Debug)]
#[command(
    name = "pin",
    about = "PinIdentity CLI",
    version,
    long_about = "pin, the PinIdentity CLI\n\nManage a self-hosted identity: profile fields, visibility,\ndomain verification and canonical exports."
)]
struct Cli {
    /// Data directory (default: ~/.pin)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the instance base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the owner identity
    Init {
        /// Handle (lowercase letters, digits, '.', '_', '-')
        #[arg(long)]
        handle: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Show the identity as a given view sees it
    Show {
        /// Show the private view instead of the public one
        #[arg(long)]
        private: bool,
    },

    /// Set a profile field (display_name, bio, email, location, ...)
    Set {
        field: String,
        value: String,
    },

    /// Render an export
    Export {
        /// Format: envelope, json, xml, txt, vcf
        #[arg(long, default_value = "envelope")]
        format: String,

        /// Export the private view
        #[arg(long)]
        private: bool,

        /// URL the export is served from, echoed as meta.self
        #[arg(long)]
        self_url: Option<String>,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Manage visibility flags
    Visibility {
        #[command(subcommand)]
        subcommand: VisibilityCommands,
    },

    /// Manage claimed domains
    Domains {
        #[command(subcommand)]
        subcommand: DomainCommands,
    },

    /// Inspect instance configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum VisibilityCommands {
    /// Set a flag, e.g. `email public` or `link:0 private`
    Set { key: String, value: String },

    /// Remove a flag, restoring the default
    Unset { key: String },

    /// List explicit flags
    List,
}

#[derive(Subcommand, Debug)]
enum DomainCommands {
    /// List claimed domains and their challenge tokens
    List,

    /// Replace the claimed set (comma or newline separated)
    Sync { domains: Vec<String> },

    /// Run the challenge for one domain
    Verify {
        domain: String,

        /// Deadline in seconds (default from config; 0 disables)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Remove one claimed domain
    Delete { domain: String },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let mut ws = Workspace::open(&data_dir, cli.base_url.as_deref())?;
    let verbose = cli.verbose;

    match cli.command {
        Commands::Init { handle, name } => cmd_init(&mut ws, &handle, name.as_deref()),
        Commands::Show { private } => cmd_show(&ws, private),
        Commands::Set { field, value } => cmd_set(&ws, &field, &value),
        Commands::Export {
            format,
            private,
            self_url,
            output,
        } => cmd_export(&ws, &format, private, self_url.as_deref(), output.as_deref()),
        Commands::Visibility { subcommand } => match subcommand {
            VisibilityCommands::Set { key, value } => cmd_visibility_set(&ws, &key, &value),
            VisibilityCommands::Unset { key } => cmd_visibility_unset(&ws, &key),
            VisibilityCommands::List => cmd_visibility_list(&ws),
        },
        Commands::Domains { subcommand } => match subcommand {
            DomainCommands::List => cmd_domains_list(&ws, verbose),
            DomainCommands::Sync { domains } => cmd_domains_sync(&ws, &domains),
            DomainCommands::Verify { domain, timeout } => {
                cmd_domains_verify(&ws, &domain, timeout)
            }
            DomainCommands::Delete { domain } => cmd_domains_delete(&ws, &domain),
        },
        Commands::Config { subcommand } => match subcommand {
            ConfigCommands::Show => cmd_config_show(&ws),
        },
    }
}

// ── Identity commands ─────────────────────────────────────────────────────────

fn cmd_init(ws: &mut Workspace, handle: &str, name: Option<&str>) -> Result<()> {
    let id = ws.config.owner_identity_id;
    if ws.store.get_by_id(id).is_ok() {
        return Err(anyhow!("identity {id} already exists"));
    }

    let handle = Handle::parse(handle)?;
    let mut identity = Identity::new(id, handle);
    identity.display_name = name.unwrap_or_default().trim().to_string();
    identity.private_token = private_token();
    identity.updated_at = Some(chrono::Utc::now());
    ws.store
        .insert_identity(&identity)
        .context("failed to save identity")?;
    log::info!("created identity {id} ({})", identity.handle);

    let mut service = ws.domain_service()?;
    let mut tokens = domain_token;
    if let Some(host) = service.ensure_server_domain(&mut ws.config, &mut tokens)? {
        log::info!("registered protected domain {host}");
        println!("  Protected domain: {host}");
    }
    ws.save_config()?;

    println!("Created identity '{}'", identity.handle);
    println!("  ID:            {id}");
    println!("  Private token: {}", identity.private_token);
    Ok(())
}

fn cmd_show(ws: &Workspace, private: bool) -> Result<()> {
    let identity = ws.owner()?;
    let view = if private { View::Private } else { View::Public };
    let projection = project(&identity, view);
    let shown = &projection.identity;

    println!("Identity: {} ({view} view)", shown.handle);
    for field in ScalarField::ALL {
        let value = shown.field(field);
        if !value.is_empty() {
            println!("  {:<14} {value}", format!("{}:", field.key()));
        }
    }
    for (i, link) in shown.links.iter().enumerate() {
        println!("  link[{i}]:       {} <{}>", link.label, link.url);
    }
    for profile in &shown.social_profiles {
        let mark = if profile.verified { " (verified)" } else { "" };
        println!("  social:        {} <{}>{mark}", profile.label, profile.url);
    }
    for (label, address) in &shown.wallets {
        println!("  wallet.{label}: {address}");
    }
    for (key, value) in &projection.custom_fields {
        println!("  custom.{key}: {value}");
    }
    if !shown.verified_domains.is_empty() {
        println!("  verified:      {}", shown.verified_domains.join(", "));
    }
    Ok(())
}

fn cmd_set(ws: &Workspace, field: &str, value: &str) -> Result<()> {
    let field = ScalarField::from_key(field.trim())
        .ok_or_else(|| anyhow!("unknown field '{field}'"))?;
    let mut identity = ws.owner()?;
    *identity.field_mut(field) = value.trim().to_string();
    identity.updated_at = Some(chrono::Utc::now());
    ws.store.update(&identity).context("failed to save identity")?;
    log::info!("updated {} on identity {}", field.key(), identity.id);
    println!("Set {} on '{}'", field.key(), identity.handle);
    Ok(())
}

fn cmd_export(
    ws: &Workspace,
    format: &str,
    private: bool,
    self_url: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let format: ExportFormat = format.parse()?;
    let view = if private { View::Private } else { View::Public };
    let identity = ws.owner()?;
    let rendered = ws
        .export_service()
        .render(&identity, view, format, self_url)
        .context("failed to render export")?;
    log::info!(
        "rendered {view} export as {} ({} bytes)",
        rendered.content_type,
        rendered.body.len()
    );

    match output {
        Some(path) => {
            std::fs::write(path, rendered.body.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Wrote {} ({})", path.display(), rendered.content_type);
        }
        None => println!("{}", rendered.body),
    }
    Ok(())
}

// ── Visibility commands ───────────────────────────────────────────────────────

fn cmd_visibility_set(ws: &Workspace, key: &str, value: &str) -> Result<()> {
    let mut identity = ws.owner()?;
    let visibility = Visibility::normalize(value);
    identity.visibility.set(key, visibility);
    ws.store.update(&identity).context("failed to save identity")?;
    log::info!("visibility {} set to {}", key.trim(), visibility.as_str());
    println!("{} = {}", key.trim(), visibility.as_str());
    Ok(())
}

fn cmd_visibility_unset(ws: &Workspace, key: &str) -> Result<()> {
    let mut identity = ws.owner()?;
    if identity.visibility.unset(key).is_none() {
        println!("{} has no explicit flag", key.trim());
        return Ok(());
    }
    ws.store.update(&identity).context("failed to save identity")?;
    println!("{} reset to default", key.trim());
    Ok(())
}

fn cmd_visibility_list(ws: &Workspace) -> Result<()> {
    let identity = ws.owner()?;
    if identity.visibility.is_empty() {
        println!("No explicit visibility flags.");
        return Ok(());
    }
    for (key, visibility) in identity.visibility.iter() {
        println!("{key:<32} {}", visibility.as_str());
    }
    Ok(())
}

// ── Domain commands ───────────────────────────────────────────────────────────

fn cmd_domains_list(ws: &Workspace, verbose: bool) -> Result<()> {
    let rows = ws.store.list_for_identity(ws.config.owner_identity_id)?;
    if rows.is_empty() {
        println!("No domains claimed.");
        return Ok(());
    }
    for row in &rows {
        let status = match row.verified_at {
            Some(at) => format!("verified {}", at.format("%Y-%m-%d %H:%M UTC")),
            None => "pending".to_string(),
        };
        let protected = if ws.config.protected_domain.as_deref() == Some(row.domain.as_str()) {
            " [protected]"
        } else {
            ""
        };
        println!("{:<32} {status}{protected}", row.domain);
        println!("    token: {}", row.token);
        if verbose {
            println!(
                "    serve at: https://{}/.well-known/pin-verify",
                row.domain
            );
        }
    }
    Ok(())
}

fn cmd_domains_sync(ws: &Workspace, domains: &[String]) -> Result<()> {
    let desired = parse_domains(&domains.join(","));
    let owner = ws.config.owner_identity_id;
    let service = ws.domain_service()?;
    let mut tokens = domain_token;
    let rows = service.sync_desired_domains(owner, &desired, &mut tokens)?;
    let verified = pin_identity::domains::verified_domains(&rows);
    record_verified_domains(ws.store.as_ref(), owner, &verified)?;
    log::info!("synced {} domains, {} verified", rows.len(), verified.len());
    println!("Domains: {}", domains_to_text(&rows));
    Ok(())
}

fn cmd_domains_verify(ws: &Workspace, domain: &str, timeout: Option<u64>) -> Result<()> {
    let owner = ws.config.owner_identity_id;
    let deadline = match timeout {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => ws.config.challenge_timeout(),
    };
    let service = ws.domain_service()?;
    log::info!("verifying {} (timeout {:?})", domain.trim(), deadline);
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let state = runtime.block_on(service.verify_domain(owner, domain, deadline))?;
    record_verified_domains(ws.store.as_ref(), owner, &state.verified)?;
    println!("Verified {}", domain.trim());
    println!("  Verified domains: {}", state.verified.join(", "));
    Ok(())
}

fn cmd_domains_delete(ws: &Workspace, domain: &str) -> Result<()> {
    let owner = ws.config.owner_identity_id;
    let state = ws.domain_service()?.delete_domain(owner, domain)?;
    log::info!("deleted domain {}", domain.trim());
    record_verified_domains(ws.store.as_ref(), owner, &state.verified)?;
    println!("Deleted {}", domain.trim());
    println!("  Remaining: {}", domains_to_text(&state.rows));
    Ok(())
}

// ── Config commands ───────────────────────────────────────────────────────────

fn cmd_config_show(ws: &Workspace) -> Result<()> {
    let json = serde_json::to_string_pretty(&ws.config)?;
    println!("{json}");
    println!("# file: {}", ws.config_path.display());
    Ok(())
}
