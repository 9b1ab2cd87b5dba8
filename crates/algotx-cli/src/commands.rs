//! CLI command implementations.

use crate::AppContext;
use algotx_rpc::{NodeRpc, RpcConfig};
use algotx_submit::{
    AssetLookup, Composer, EngineConfig, FileStore, Settings, StateStore, SubmissionEngine,
    SubmissionState,
};
use algotx_tx::{
    validate, DecodeOptions, NetworkParams, Preset, SignedEnvelope, TransactionDraft, TxFields,
    ValidationContext, ValidationResult,
};
use algotx_types::constants::NATIVE_DECIMALS;
use algotx_types::units::format_base_units;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

type Result = std::result::Result<(), Box<dyn std::error::Error>>;

// ─── Helpers ────────────────────────────────────────────────────────────────

fn node(ctx: &AppContext) -> NodeRpc {
    NodeRpc::with_config(RpcConfig {
        url: ctx.node_url.clone(),
        token: ctx.token.clone(),
        ..Default::default()
    })
}

fn load_settings(ctx: &AppContext) -> std::result::Result<Settings, Box<dyn std::error::Error>> {
    Ok(Settings::load(&ctx.settings_path)?)
}

fn open_store(ctx: &AppContext) -> std::result::Result<Arc<dyn StateStore>, Box<dyn std::error::Error>> {
    Ok(Arc::new(FileStore::open(&ctx.state_dir)?))
}

fn parse_preset(name: Option<&str>) -> std::result::Result<Option<Preset>, Box<dyn std::error::Error>> {
    Ok(name.map(str::parse::<Preset>).transpose()?)
}

fn read_draft(path: &Path) -> std::result::Result<TransactionDraft, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    Ok(TransactionDraft::from_json(&json)?)
}

/// Read a transaction file: raw msgpack or a Base64 data URL.
fn read_transaction_file(path: &Path) -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    if bytes.starts_with(b"data:") {
        let text = String::from_utf8(bytes)?;
        return Ok(SignedEnvelope::from_data_url(&text)?.bytes);
    }
    Ok(bytes)
}

async fn network_params(ctx: &AppContext) -> std::result::Result<NetworkParams, Box<dyn std::error::Error>> {
    log::debug!("Fetching suggested parameters from {}", ctx.node_url);
    Ok(node(ctx).network_params().await?)
}

fn print_validation(result: &ValidationResult) {
    for (field, error) in &result.fields {
        print!("  {:<20} {}", field.as_str(), error.key);
        for (name, value) in &error.values {
            print!(" {}={}", name, value);
        }
        println!();
    }
    for group in &result.groups {
        print!("  {:<20} {}", format!("{:?}", group.group), group.error.key);
        for (name, value) in &group.error.values {
            print!(" {}={}", name, value);
        }
        println!();
    }
}

/// Print the outcome of a submission; failures become an error.
fn report(state: &SubmissionState) -> Result {
    match state {
        SubmissionState::Confirmed { tx_id, response } => {
            println!("Transaction {} confirmed", tx_id);
            if let Some(round) = response.confirmed_round {
                println!("  Round:       {}", round);
            }
            if let Some(asset) = response.asset_index {
                println!("  Asset ID:    {}", asset);
            }
            if let Some(app) = response.application_index {
                println!("  App ID:      {}", app);
            }
            Ok(())
        }
        SubmissionState::FailedTimeoutWarning { tx_id, rounds } => {
            println!(
                "Transaction {} not confirmed after {} rounds; it may still confirm.",
                tx_id, rounds
            );
            println!("Run `algotx resume` to resend or pass --wait-longer to keep waiting.");
            Ok(())
        }
        SubmissionState::FailedError(err) => Err(format!("submission failed: {}", err).into()),
        other => Err(format!("submission ended in state {}", other.name()).into()),
    }
}

async fn drive<B: algotx_submit::Broadcaster>(
    engine: &SubmissionEngine<B>,
    mut state: SubmissionState,
    wait_longer: u32,
) -> Result {
    let mut extensions = 0;
    while matches!(state, SubmissionState::FailedTimeoutWarning { .. }) && extensions < wait_longer
    {
        extensions += 1;
        println!("Still pending, waiting longer ({}/{}) ...", extensions, wait_longer);
        state = engine.wait_longer().await?;
    }
    report(&state)
}

/// Look up the asset of an asset transfer and print the amount in its units.
async fn show_asset_amount(
    ctx: &AppContext,
    composer: &mut Composer,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let TxFields::AssetTransfer(transfer) = &composer.draft().fields else {
        return Ok(());
    };
    let Some(asset_id) = transfer.asset_id else {
        return Ok(());
    };
    let amount = transfer.amount;

    let lookup = AssetLookup::new(node(ctx), Duration::ZERO);
    let info = match lookup.lookup(asset_id).await {
        Some(Ok(info)) => info,
        Some(Err(e)) => {
            log::warn!("Asset {} lookup failed: {}", asset_id, e);
            return Ok(());
        }
        None => return Ok(()),
    };
    composer.apply_asset_info(&info)?;
    println!(
        "Amount:         {} {}",
        format_base_units(amount, info.params.decimals),
        info.params.unit_name.as_deref().unwrap_or_default()
    );
    Ok(())
}

// ─── Commands ───────────────────────────────────────────────────────────────

pub async fn show_params(ctx: &AppContext) -> Result {
    let node = node(ctx);
    println!("Connecting to {} ...", ctx.node_url);

    let params = node.transaction_params().await?;

    println!("Suggested parameters:");
    println!("  Genesis ID:   {}", params.genesis_id);
    println!("  Genesis hash: {}", params.genesis_hash);
    println!("  Last round:   {}", params.last_round);
    println!("  Fee/byte:     {}", params.fee);
    println!(
        "  Min fee:      {} ({})",
        params.min_fee,
        format_base_units(params.min_fee, NATIVE_DECIMALS)
    );
    if !params.consensus_version.is_empty() {
        println!("  Consensus:    {}", params.consensus_version);
    }
    Ok(())
}

pub fn preset(ctx: &AppContext, name: &str, sender: &str, output: Option<&Path>) -> Result {
    if name == "list" {
        for preset in Preset::ALL {
            println!("{:<16} {}", preset.as_str(), preset.kind().as_str());
        }
        return Ok(());
    }

    let preset: Preset = name.parse()?;
    let settings = load_settings(ctx)?;
    let draft = TransactionDraft::from_preset(preset, &settings.draft_seed(sender));
    let json = serde_json::to_string_pretty(&draft)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Wrote {} draft to {}", preset, path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn validate_draft(path: &Path, preset: Option<&str>) -> Result {
    let draft = read_draft(path)?;
    let ctx = ValidationContext {
        preset: parse_preset(preset)?,
    };
    let result = validate(&draft, &ctx);

    if result.is_valid() {
        println!("Draft is valid ({}).", draft.kind().as_str());
        return Ok(());
    }
    println!("{} validation error(s):", result.error_count());
    print_validation(&result);
    Err("draft is not valid".into())
}

pub async fn compose(ctx: &AppContext, draft: &Path, output: &Path, preset: Option<&str>) -> Result {
    let draft = read_draft(draft)?;
    let mut composer = Composer::with_draft(
        draft,
        parse_preset(preset)?,
        load_settings(ctx)?,
        open_store(ctx)?,
    )?;
    let params = network_params(ctx).await?;
    show_asset_amount(ctx, &mut composer).await?;

    let encoded = match composer.compose(&params) {
        Ok(encoded) => encoded,
        Err(algotx_submit::ComposeError::Blocked(result)) => {
            println!("{} validation error(s):", result.error_count());
            print_validation(&result);
            return Err("draft is not valid".into());
        }
        Err(e) => return Err(e.into()),
    };

    std::fs::write(output, &encoded.bytes)?;
    println!("Transaction ID: {}", encoded.id);
    println!(
        "Fee:            {} ({})",
        encoded.transaction.fee,
        if encoded.flat_fee { "flat" } else { "suggested" }
    );
    println!(
        "Valid rounds:   {} - {}",
        encoded.transaction.first_valid, encoded.transaction.last_valid
    );
    println!("Wrote {} bytes to {}", encoded.bytes.len(), output.display());
    Ok(())
}

pub async fn inspect(ctx: &AppContext, file: &Path, options: &DecodeOptions) -> Result {
    let bytes = read_transaction_file(file)?;
    let params = network_params(ctx).await?;

    let decoded = algotx_tx::decode_transaction(&bytes, &params, options)?;
    println!("{}", serde_json::to_string_pretty(&decoded.draft)?);
    match &decoded.envelope {
        Some(envelope) => println!("Signed transaction {}", envelope.tx_id),
        None => println!("Unsigned transaction"),
    }
    let result = validate(&decoded.draft, &ValidationContext::default());
    if !result.is_valid() {
        println!("{} validation warning(s):", result.error_count());
        print_validation(&result);
    }
    Ok(())
}

pub async fn import(
    ctx: &AppContext,
    file: &Path,
    options: &DecodeOptions,
    send: bool,
    wait_longer: u32,
) -> Result {
    let bytes = read_transaction_file(file)?;
    let params = network_params(ctx).await?;
    let settings = load_settings(ctx)?;
    let store = open_store(ctx)?;

    let (composer, envelope) =
        Composer::from_import(&bytes, &params, options, settings.clone(), store.clone())?;
    println!(
        "Imported {} transaction into {}",
        composer.draft().kind().as_str(),
        ctx.state_dir.display()
    );
    if !composer.validation().is_valid() {
        println!("{} validation warning(s):", composer.validation().error_count());
        print_validation(composer.validation());
    }

    let Some(envelope) = envelope else {
        println!("Unsigned transaction; any previously stored signed transaction was cleared.");
        return Ok(());
    };
    if !send {
        println!("Stored signed transaction {}", envelope.tx_id);
        return Ok(());
    }

    let engine = SubmissionEngine::new(node(ctx), store, EngineConfig::from(&settings));
    println!("Sending {} to {} ...", envelope.tx_id, ctx.node_url);
    let state = engine.transaction_imported(Some(envelope)).await?;
    drive(&engine, state, wait_longer).await
}

pub async fn send(ctx: &AppContext, file: &Path, wait_longer: u32) -> Result {
    let bytes = read_transaction_file(file)?;
    let envelope = SignedEnvelope::from_bytes(bytes)?;
    let settings = load_settings(ctx)?;
    let engine = SubmissionEngine::new(node(ctx), open_store(ctx)?, EngineConfig::from(&settings));

    println!("Sending {} to {} ...", envelope.tx_id, ctx.node_url);
    let state = engine.envelope_available(envelope).await?;
    drive(&engine, state, wait_longer).await
}

pub async fn resume(ctx: &AppContext, wait_longer: u32) -> Result {
    let settings = load_settings(ctx)?;
    let engine = SubmissionEngine::new(node(ctx), open_store(ctx)?, EngineConfig::from(&settings));

    println!("Resending stored transaction to {} ...", ctx.node_url);
    let state = engine.retry().await?;
    drive(&engine, state, wait_longer).await
}

/// Settings changes requested on the command line.
pub struct SettingsUpdate {
    pub use_suggested_fee: Option<bool>,
    pub use_suggested_rounds: Option<bool>,
    pub clear_after_send: Option<bool>,
    pub ignore_validation_errors: Option<bool>,
    pub confirmation_rounds: Option<u64>,
    pub asset_roles_are_sender: Option<bool>,
}

impl SettingsUpdate {
    fn is_empty(&self) -> bool {
        self.use_suggested_fee.is_none()
            && self.use_suggested_rounds.is_none()
            && self.clear_after_send.is_none()
            && self.ignore_validation_errors.is_none()
            && self.confirmation_rounds.is_none()
            && self.asset_roles_are_sender.is_none()
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = self.use_suggested_fee {
            settings.use_suggested_fee = v;
        }
        if let Some(v) = self.use_suggested_rounds {
            settings.use_suggested_rounds = v;
        }
        if let Some(v) = self.clear_after_send {
            settings.always_clear_after_send = v;
        }
        if let Some(v) = self.ignore_validation_errors {
            settings.ignore_validation_errors = v;
        }
        if let Some(v) = self.confirmation_rounds {
            settings.confirmation_rounds = v;
        }
        if let Some(v) = self.asset_roles_are_sender {
            settings.manager_is_sender = v;
            settings.freeze_is_sender = v;
            settings.clawback_is_sender = v;
            settings.reserve_is_sender = v;
        }
    }
}

pub fn settings(ctx: &AppContext, update: SettingsUpdate) -> Result {
    let mut settings = load_settings(ctx)?;
    if !update.is_empty() {
        update.apply(&mut settings);
        settings.save(&ctx.settings_path)?;
        println!("Saved {}", ctx.settings_path.display());
    }
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub fn clear(ctx: &AppContext, draft: bool, signed: bool) -> Result {
    let store = FileStore::open(&ctx.state_dir)?;
    if draft {
        store.clear_draft()?;
        println!("Cleared stored draft.");
    }
    if signed {
        store.clear_signed()?;
        println!("Cleared stored signed transaction.");
    }
    Ok(())
}
