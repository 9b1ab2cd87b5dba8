use algotx_types::constants::{network_config, Network};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Compose, inspect and submit ledger transactions.
#[derive(Parser)]
#[command(name = "algotx")]
#[command(about = "Compose, validate, inspect and submit transactions")]
#[command(version)]
struct Cli {
    /// Network to use.
    #[arg(long, default_value = "testnet")]
    network: NetworkArg,

    /// Node REST URL (overrides default for the selected network).
    #[arg(long)]
    node: Option<String>,

    /// Node API token (falls back to $ALGOD_TOKEN).
    #[arg(long)]
    token: Option<String>,

    /// Settings file (JSON).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory holding the stored draft and signed transaction.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug)]
enum NetworkArg {
    Mainnet,
    Testnet,
    Betanet,
    Localnet,
}

impl std::fmt::Display for NetworkArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::Betanet => write!(f, "betanet"),
            Self::Localnet => write!(f, "localnet"),
        }
    }
}

impl std::str::FromStr for NetworkArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "testnet" | "test" => Ok(Self::Testnet),
            "betanet" | "beta" => Ok(Self::Betanet),
            "localnet" | "local" | "sandbox" => Ok(Self::Localnet),
            _ => Err(format!(
                "unknown network: {} (use mainnet, testnet, betanet, or localnet)",
                s
            )),
        }
    }
}

impl NetworkArg {
    fn to_network(&self) -> Network {
        match self {
            Self::Mainnet => Network::Mainnet,
            Self::Testnet => Network::Testnet,
            Self::Betanet => Network::Betanet,
            Self::Localnet => Network::Localnet,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the node's suggested transaction parameters.
    Params,

    /// Print a new draft shaped by a preset (use "list" to see presets).
    Preset {
        /// Preset name, e.g. transfer, asset_opt_in, app_call.
        name: String,

        /// Sender address.
        #[arg(long, default_value = "")]
        sender: String,

        /// Write the draft here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a draft file.
    Validate {
        draft: PathBuf,

        /// Preset whose extra requirements apply.
        #[arg(long)]
        preset: Option<String>,
    },

    /// Encode a draft into an unsigned transaction file.
    Compose {
        draft: PathBuf,

        /// Output file for the unsigned transaction.
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        preset: Option<String>,
    },

    /// Decode a transaction file (signed or unsigned) into a draft.
    Inspect {
        file: PathBuf,

        #[command(flatten)]
        decode: DecodeArgs,
    },

    /// Make a transaction file the current draft. Signed files are sent.
    Import {
        file: PathBuf,

        #[command(flatten)]
        decode: DecodeArgs,

        /// Store a signed file without sending it.
        #[arg(long)]
        no_send: bool,

        /// On timeout, keep waiting up to this many more times.
        #[arg(long, default_value = "0")]
        wait_longer: u32,
    },

    /// Submit a signed transaction file and wait for confirmation.
    Send {
        file: PathBuf,

        /// On timeout, keep waiting up to this many more times.
        #[arg(long, default_value = "0")]
        wait_longer: u32,
    },

    /// Resend the stored signed transaction.
    Resume {
        #[arg(long, default_value = "0")]
        wait_longer: u32,
    },

    /// Show or change settings.
    Settings {
        #[arg(long)]
        use_suggested_fee: Option<bool>,

        #[arg(long)]
        use_suggested_rounds: Option<bool>,

        /// Clear the stored draft and envelope after confirmation.
        #[arg(long)]
        clear_after_send: Option<bool>,

        /// Let composing proceed past validation errors.
        #[arg(long)]
        ignore_validation_errors: Option<bool>,

        /// Rounds to wait for confirmation before warning.
        #[arg(long)]
        confirmation_rounds: Option<u64>,

        /// Default the asset manager/freeze/clawback/reserve to the sender.
        #[arg(long)]
        asset_roles_are_sender: Option<bool>,
    },

    /// Clear the stored draft and signed transaction.
    Clear {
        /// Only clear the draft.
        #[arg(long, conflicts_with = "signed_only")]
        draft_only: bool,

        /// Only clear the signed transaction.
        #[arg(long)]
        signed_only: bool,
    },
}

#[derive(clap::Args)]
struct DecodeArgs {
    /// Accept a transaction built for another network.
    #[arg(long)]
    allow_cross_network: bool,

    /// Render the note as Base64.
    #[arg(long)]
    note_base64: bool,

    /// Render the lease as Base64.
    #[arg(long)]
    lease_base64: bool,
}

impl DecodeArgs {
    fn options(&self) -> algotx_tx::DecodeOptions {
        algotx_tx::DecodeOptions {
            reject_cross_network: !self.allow_cross_network,
            note_base64: self.note_base64,
            lease_base64: self.lease_base64,
            ..Default::default()
        }
    }
}

/// Application context shared across commands.
pub struct AppContext {
    pub network: Network,
    pub node_url: String,
    pub token: Option<String>,
    pub settings_path: PathBuf,
    pub state_dir: PathBuf,
}

impl AppContext {
    fn from_cli(cli: &Cli) -> Self {
        let network = cli.network.to_network();
        let config = network_config(network);
        let node_url = cli
            .node
            .clone()
            .unwrap_or_else(|| config.default_node_url.to_string());
        let token = cli
            .token
            .clone()
            .or_else(|| std::env::var("ALGOD_TOKEN").ok())
            .or_else(|| {
                (!config.default_token.is_empty()).then(|| config.default_token.to_string())
            });

        let base = default_data_dir();
        let settings_path = cli
            .settings
            .clone()
            .unwrap_or_else(|| base.join("settings.json"));
        let state_dir = cli
            .state_dir
            .clone()
            .unwrap_or_else(|| base.join(cli.network.to_string()));

        Self {
            network,
            node_url,
            token,
            settings_path,
            state_dir,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("algotx")
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let ctx = AppContext::from_cli(&cli);
    log::debug!("Using {:?} node {}", ctx.network, ctx.node_url);

    let result = match cli.command {
        Commands::Params => commands::show_params(&ctx).await,
        Commands::Preset {
            name,
            sender,
            output,
        } => commands::preset(&ctx, &name, &sender, output.as_deref()),
        Commands::Validate { draft, preset } => {
            commands::validate_draft(&draft, preset.as_deref())
        }
        Commands::Compose {
            draft,
            output,
            preset,
        } => commands::compose(&ctx, &draft, &output, preset.as_deref()).await,
        Commands::Inspect { file, decode } => {
            commands::inspect(&ctx, &file, &decode.options()).await
        }
        Commands::Import {
            file,
            decode,
            no_send,
            wait_longer,
        } => commands::import(&ctx, &file, &decode.options(), !no_send, wait_longer).await,
        Commands::Send { file, wait_longer } => commands::send(&ctx, &file, wait_longer).await,
        Commands::Resume { wait_longer } => commands::resume(&ctx, wait_longer).await,
        Commands::Settings {
            use_suggested_fee,
            use_suggested_rounds,
            clear_after_send,
            ignore_validation_errors,
            confirmation_rounds,
            asset_roles_are_sender,
        } => commands::settings(
            &ctx,
            commands::SettingsUpdate {
                use_suggested_fee,
                use_suggested_rounds,
                clear_after_send,
                ignore_validation_errors,
                confirmation_rounds,
                asset_roles_are_sender,
            },
        ),
        Commands::Clear {
            draft_only,
            signed_only,
        } => commands::clear(&ctx, !signed_only, !draft_only),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
