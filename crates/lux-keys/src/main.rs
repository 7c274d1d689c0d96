use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use clap::{Parser, Subcommand, ValueEnum};
use lux_keys_core::backend::BackendKind;
use lux_keys_core::migrate::{MigrationOptions, MigrationOutcome};
use lux_keys_core::ring::{self, RingScheme, RingSignature};
use lux_keys_core::{batch, config, export, Core, KeyError};

#[derive(Parser, Debug)]
#[command(author, version, about = "Lux key management: HD key sets, encrypted keystores, ring and threshold signing")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate key sets with fresh mnemonics
    Generate {
        /// Name, or name prefix when --count is given
        name: String,
        /// Generate N sets named <name>-0 .. <name>-(N-1)
        #[arg(long)]
        count: Option<usize>,
        /// Worker threads for batch generation
        #[arg(long, default_value_t = batch::DEFAULT_WORKERS)]
        workers: usize,
        /// Print the mnemonic of each generated set
        #[arg(long)]
        show_mnemonic: bool,
    },
    /// Derive a key set from an existing mnemonic (arg or LUX_MNEMONIC)
    Derive {
        name: String,
        #[arg(long)]
        mnemonic: Option<String>,
        #[arg(long, default_value_t = 0)]
        index: u32,
    },
    /// List key sets in the default backend
    List,
    /// Show public material of a key set
    Show {
        name: String,
        /// Include proof of possession and full ML-DSA public key
        #[arg(long)]
        verbose: bool,
    },
    /// Export a key set as JSON (public only unless --include-mnemonic)
    Export {
        name: String,
        /// DANGER: writes the mnemonic in clear
        #[arg(long)]
        include_mnemonic: bool,
    },
    /// Write the raw 32-byte BLS signer file
    ExportSigner {
        name: String,
        /// Output path (default: <keys_root>/<name>/signer.key)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Sign a message with one of the set's keys
    Sign {
        name: String,
        #[arg(long)]
        message: String,
        /// Treat --message as hex bytes
        #[arg(long)]
        hex: bool,
        #[arg(long, value_enum, default_value = "secp256k1")]
        algorithm: SignAlgo,
    },
    /// Verify a signature against an explicit public key
    Verify {
        #[arg(long)]
        message: String,
        #[arg(long)]
        hex: bool,
        /// Hex signature
        #[arg(long)]
        signature: String,
        /// Hex public key
        #[arg(long)]
        public_key: String,
        #[arg(long, value_enum, default_value = "secp256k1")]
        algorithm: SignAlgo,
    },
    /// Linkable ring signatures
    Ring {
        #[command(subcommand)]
        action: RingAction,
    },
    /// Client operations against the threshold service
    Threshold {
        #[command(subcommand)]
        action: ThresholdAction,
        /// Service base URL (default http://localhost:9630)
        #[arg(long, global = true)]
        url: Option<String>,
    },
    /// Migrate a legacy plaintext key directory into the encrypted keystore
    Migrate {
        name: String,
        /// Overwrite an existing envelope
        #[arg(long)]
        force: bool,
        /// Zero-fill and unlink the legacy private files afterwards
        #[arg(long)]
        secure: bool,
    },
    /// Storage backend discovery and selection
    Backend {
        #[command(subcommand)]
        action: BackendAction,
    },
    /// Generate the P-256 staking certificate and node ID
    Staker { name: String },
    /// Delete a key set
    Delete {
        name: String,
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Cache a key set's secrets in the session (until the TTL fires)
    Unlock { name: String },
    /// Evict session secrets
    Lock {
        name: Option<String>,
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
enum RingAction {
    /// Sign as the ring member named by --name
    Sign {
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value = "lsag")]
        scheme: RingSchemeArg,
        #[arg(long)]
        message: String,
        /// JSON file: array of hex public keys forming the ring
        #[arg(long)]
        ring: String,
        /// Write the signature JSON here (default stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Verify a ring signature
    Verify {
        #[arg(long)]
        message: String,
        #[arg(long)]
        ring: String,
        /// Signature JSON file
        #[arg(long)]
        signature: String,
    },
    /// Print the deterministic key image for linkability checks
    KeyImage {
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value = "lsag")]
        scheme: RingSchemeArg,
    },
}

#[derive(Subcommand, Debug)]
enum ThresholdAction {
    /// Service liveness
    Health,
    /// Split a key into n shares, t required
    Distribute {
        key_id: String,
        #[arg(short = 't', long)]
        threshold: u32,
        #[arg(short = 'n', long)]
        shares: u32,
        /// Validator IDs, one per share
        #[arg(long, num_args = 1..)]
        validators: Vec<String>,
    },
    /// Poll shareholders
    Gather { key_id: String },
    /// Threshold-sign a message
    Sign {
        key_id: String,
        #[arg(long)]
        message: String,
        #[arg(long, default_value = "bls-threshold")]
        algorithm: String,
    },
    /// Verify a threshold signature
    Verify {
        key_id: String,
        #[arg(long)]
        message: String,
        /// Base64 signature
        #[arg(long)]
        signature: String,
        #[arg(long, default_value = "bls-threshold")]
        algorithm: String,
    },
    /// Encrypt to the key's ML-KEM public
    Encrypt {
        key_id: String,
        #[arg(long)]
        plaintext: String,
    },
    /// Threshold-decrypt a ciphertext
    Decrypt {
        key_id: String,
        #[arg(long)]
        ciphertext: String,
    },
    /// Rotate shares without changing the key
    Reshare {
        key_id: String,
        #[arg(short = 't', long)]
        threshold: Option<u32>,
        #[arg(short = 'n', long)]
        shares: Option<u32>,
        #[arg(long, num_args = 0..)]
        validators: Vec<String>,
    },
    /// List keys held by the service
    List {
        #[arg(long)]
        filter: Option<String>,
    },
    /// List algorithms the service supports
    Algorithms,
    /// Show one key by name
    Show { name: String },
}

#[derive(Subcommand, Debug)]
enum BackendAction {
    /// Capability table of every known backend
    List,
    /// Choose the default backend for new keys
    SetDefault { kind: String },
    /// Show the current default
    Show,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SignAlgo {
    Secp256k1,
    Bls,
    MlDsa65,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RingSchemeArg {
    Lsag,
    LatticeLsag,
}

impl From<RingSchemeArg> for RingScheme {
    fn from(arg: RingSchemeArg) -> Self {
        match arg {
            RingSchemeArg::Lsag => RingScheme::Lsag,
            RingSchemeArg::LatticeLsag => RingScheme::LatticeLsag,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LUX_LOG")
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_of(&err))
        }
    }
}

/// Exit-code contract: 0 success, 1 generic, 2 bad usage, 3 not found,
/// 4 name taken, 5 invalid password, 6 locked/expired, 7 service
/// unreachable.
fn exit_code_of(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<KeyError>() {
        Some(KeyError::BadUsage(_)) | Some(KeyError::InvalidMnemonic) => 2,
        Some(KeyError::NotFound(_)) => 3,
        Some(KeyError::NameTaken(_)) => 4,
        Some(KeyError::InvalidPassword) | Some(KeyError::PasswordRequired) => 5,
        Some(KeyError::Locked(_)) | Some(KeyError::Expired(_)) => 6,
        Some(KeyError::ServiceUnreachable(_)) | Some(KeyError::Timeout) => 7,
        _ => 1,
    }
}

/// `LUX_KEY_PASSWORD` wins; otherwise prompt, but only on a terminal.
fn resolve_password(confirm: bool) -> Result<String> {
    if let Ok(password) = std::env::var(config::ENV_PASSWORD) {
        return Ok(password);
    }
    if config::non_interactive() || !std::io::stdin().is_terminal() {
        return Err(KeyError::PasswordRequired.into());
    }
    let password = rpassword::prompt_password("Keystore password: ")?;
    if confirm {
        let again = rpassword::prompt_password("Confirm password: ")?;
        if password != again {
            anyhow::bail!("passwords do not match");
        }
    }
    Ok(password)
}

fn password_for(core: &Core, confirm: bool) -> Result<Option<String>> {
    if core.registry().default_backend().requires_password() {
        Ok(Some(resolve_password(confirm)?))
    } else {
        Ok(None)
    }
}

fn message_bytes(message: &str, is_hex: bool) -> Result<Vec<u8>> {
    if is_hex {
        hex::decode(message.trim_start_matches("0x")).context("message is not valid hex")
    } else {
        Ok(message.as_bytes().to_vec())
    }
}

fn read_ring_file(path: &str) -> Result<Vec<Vec<u8>>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading ring file {path}"))?;
    let hexes: Vec<String> = serde_json::from_str(&raw).context("ring file must be a JSON array of hex public keys")?;
    hexes
        .iter()
        .map(|h| hex::decode(h.trim_start_matches("0x")).context("ring member is not valid hex"))
        .collect()
}

fn run(cli: Cli) -> Result<()> {
    let mut core = Core::open()?;
    match cli.cmd {
        Cmd::Generate {
            name,
            count,
            workers,
            show_mnemonic,
        } => {
            let password = password_for(&core, true)?;
            match count {
                None => {
                    let ks = core.create(&name, None, 0, password.as_deref())?;
                    print_created(&ks, show_mnemonic)?;
                }
                Some(count) => {
                    let names: Vec<String> =
                        (0..count).map(|i| format!("{name}-{i}")).collect();
                    let existing = core.list()?;
                    if let Some(taken) = names.iter().find(|n| existing.contains(n)) {
                        return Err(KeyError::NameTaken(taken.clone()).into());
                    }
                    let results = batch::generate_batch(&names, workers, |done, total| {
                        eprint!("\rgenerated {done}/{total}");
                        if done == total {
                            eprintln!();
                        }
                    });
                    for (i, result) in results.into_iter().enumerate() {
                        let ks = result?;
                        core.save(&ks, password.as_deref())
                            .with_context(|| format!("saving {}", names[i]))?;
                        print_created(&ks, show_mnemonic)?;
                    }
                }
            }
        }
        Cmd::Derive {
            name,
            mnemonic,
            index,
        } => {
            let phrase = match mnemonic {
                Some(phrase) => phrase,
                None => std::env::var(config::ENV_MNEMONIC).map_err(|_| {
                    KeyError::BadUsage(format!(
                        "pass --mnemonic or set {}",
                        config::ENV_MNEMONIC
                    ))
                })?,
            };
            let password = password_for(&core, true)?;
            let ks = core.create(&name, Some(&phrase), index, password.as_deref())?;
            print_created(&ks, false)?;
        }
        Cmd::List => {
            for name in core.list()? {
                println!("{name}");
            }
        }
        Cmd::Show { name, verbose } => {
            let password = password_for(&core, false)?;
            let ks = core.load(&name, password.as_deref())?;
            let publics = ks.publics()?;
            println!("name:        {}", ks.name);
            println!("created:     {}", ks.created_at.to_rfc3339());
            println!("ec address:  {}", publics.ec_address);
            println!("ec public:   {}", hex::encode(publics.ec_compressed));
            println!("bls public:  {}", hex::encode(publics.bls_public));
            if let Some(node_id) = &ks.node_id {
                println!("node id:     {node_id}");
            }
            if verbose {
                println!("bls pop:     {}", hex::encode(publics.bls_pop));
                println!("ring public: {}", hex::encode(publics.ringtail_public));
                println!("mldsa public: {}", hex::encode(&publics.mldsa_public));
            }
        }
        Cmd::Export {
            name,
            include_mnemonic,
        } => {
            let password = password_for(&core, false)?;
            let ks = core.load(&name, password.as_deref())?;
            if include_mnemonic {
                eprintln!("!!! The output below contains the mnemonic. Anyone holding it");
                eprintln!("!!! controls every key derived from this set. Handle accordingly.");
                let payload = export::secret_export(&ks)?;
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                let payload = export::public_export(&ks)?;
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }
        }
        Cmd::ExportSigner { name, output } => {
            let ks = if core.list()?.contains(&name) {
                let password = password_for(&core, false)?;
                core.load(&name, password.as_deref())?
            } else {
                // No stored set under that name: fall back to LUX_MNEMONIC.
                let phrase = std::env::var(config::ENV_MNEMONIC).map_err(|_| {
                    KeyError::NotFound(format!(
                        "{name} (and {} is not set)",
                        config::ENV_MNEMONIC
                    ))
                })?;
                lux_keys_core::KeySet::derive(&name, &phrase, 0)?
            };
            let path = match output {
                Some(p) => std::path::PathBuf::from(p),
                None => core.paths().keyset_dir(&name).join(export::SIGNER_FILE),
            };
            if let Some(parent) = path.parent() {
                lux_keys_core::security::create_private_dir(parent)?;
            }
            export::write_signer_file(&ks, &path)?;
            println!("wrote BLS signer key: {}", path.display());
        }
        Cmd::Sign {
            name,
            message,
            hex: is_hex,
            algorithm,
        } => {
            let password = password_for(&core, false)?;
            let ks = core.load(&name, password.as_deref())?;
            let msg = message_bytes(&message, is_hex)?;
            let sig = match algorithm {
                SignAlgo::Secp256k1 => ks.ec()?.sign(&msg)?,
                SignAlgo::Bls => ks.bls()?.sign(&msg).to_vec(),
                SignAlgo::MlDsa65 => ks.mldsa()?.sign(&msg)?,
            };
            println!("{}", hex::encode(sig));
        }
        Cmd::Verify {
            message,
            hex: is_hex,
            signature,
            public_key,
            algorithm,
        } => {
            let msg = message_bytes(&message, is_hex)?;
            let sig = hex::decode(signature.trim_start_matches("0x"))
                .context("signature is not valid hex")?;
            let pk = hex::decode(public_key.trim_start_matches("0x"))
                .context("public key is not valid hex")?;
            let valid = match algorithm {
                SignAlgo::Secp256k1 => {
                    lux_keys_core::primitives::secp256k1::verify(&pk, &msg, &sig)
                }
                SignAlgo::Bls => lux_keys_core::primitives::bls::verify(&pk, &msg, &sig),
                SignAlgo::MlDsa65 => lux_keys_core::primitives::mldsa::verify(&pk, &msg, &sig),
            };
            if valid {
                println!("valid");
            } else {
                return Err(KeyError::VerifyFailed.into());
            }
        }
        Cmd::Ring { action } => run_ring(&core, action)?,
        Cmd::Threshold { action, url } => run_threshold(&core, action, url.as_deref())?,
        Cmd::Migrate {
            name,
            force,
            secure,
        } => {
            let password = password_for(&core, true)?;
            let outcome = core.migrate(
                &name,
                password.as_deref(),
                MigrationOptions {
                    force,
                    secure_wipe: secure,
                },
            )?;
            match outcome {
                MigrationOutcome::Migrated => println!("migrated {name}"),
                MigrationOutcome::Skipped => {
                    println!("skipped {name}: envelope already present (use --force to rewrite)")
                }
            }
        }
        Cmd::Backend { action } => match action {
            BackendAction::List => {
                println!(
                    "{:<16} {:>9} {:>9} {:>9} {:>7} {:>8}",
                    "backend", "password", "hardware", "remote", "avail", "default"
                );
                for row in core.registry().descriptors() {
                    println!(
                        "{:<16} {:>9} {:>9} {:>9} {:>7} {:>8}",
                        row.kind.name(),
                        row.requires_password,
                        row.requires_hardware,
                        row.supports_remote_signing,
                        row.available,
                        if row.default { "*" } else { "" }
                    );
                }
            }
            BackendAction::SetDefault { kind } => {
                let kind = BackendKind::from_name(&kind)
                    .ok_or_else(|| KeyError::BadUsage(format!("unknown backend: {kind}")))?;
                core.set_default_backend(kind)?;
                println!("default backend: {kind}");
            }
            BackendAction::Show => {
                println!("{}", core.registry().default_kind());
            }
        },
        Cmd::Staker { name } => {
            let password = password_for(&core, false)?;
            let node_id = core.generate_staker(&name, password.as_deref())?;
            println!("{node_id}");
        }
        Cmd::Delete { name, yes } => {
            if !yes {
                if config::non_interactive() || !std::io::stdin().is_terminal() {
                    return Err(KeyError::BadUsage(
                        "refusing to delete without --yes in non-interactive mode".to_string(),
                    )
                    .into());
                }
                eprint!("delete key set '{name}' permanently? [y/N] ");
                let mut line = String::new();
                std::io::stdin().read_line(&mut line)?;
                if !matches!(line.trim(), "y" | "Y" | "yes") {
                    println!("aborted");
                    return Ok(());
                }
            }
            core.delete(&name)?;
            println!("deleted {name}");
        }
        Cmd::Unlock { name } => {
            let password = password_for(&core, false)?;
            core.unlock(&name, password.as_deref())?;
            println!(
                "unlocked {name} (expires after {}s of inactivity)",
                core.sessions().ttl().as_secs()
            );
        }
        Cmd::Lock { name, all } => {
            if all {
                core.lock_all();
                println!("locked all sessions");
            } else if let Some(name) = name {
                core.lock(&name);
                println!("locked {name}");
            } else {
                return Err(
                    KeyError::BadUsage("pass a name or --all".to_string()).into(),
                );
            }
        }
    }
    Ok(())
}

fn print_created(ks: &lux_keys_core::KeySet, show_mnemonic: bool) -> Result<()> {
    let publics = ks.publics()?;
    println!("created {}", ks.name);
    println!("  ec address: {}", publics.ec_address);
    println!("  bls public: {}", hex::encode(publics.bls_public));
    if show_mnemonic {
        eprintln!("!!! Write this mnemonic down and store it offline:");
        println!("  mnemonic: {}", ks.mnemonic()?);
    }
    Ok(())
}

fn run_ring(core: &Core, action: RingAction) -> Result<()> {
    match action {
        RingAction::Sign {
            name,
            scheme,
            message,
            ring: ring_path,
            output,
        } => {
            let password = password_for(core, false)?;
            let ks = core.load(&name, password.as_deref())?;
            let scheme: RingScheme = scheme.into();
            let members = read_ring_file(&ring_path)?;

            let (own_public, secret): (Vec<u8>, Vec<u8>) = match scheme {
                RingScheme::Lsag => (
                    ks.publics()?.ringtail_public.to_vec(),
                    ks.ringtail_scalar()?.to_vec(),
                ),
                RingScheme::LatticeLsag => (
                    ks.publics()?.mldsa_public.clone(),
                    ks.mldsa_seed()?.to_vec(),
                ),
            };
            let signer_idx = members
                .iter()
                .position(|m| *m == own_public)
                .ok_or(KeyError::SignerNotInRing)?;

            let sig = ring::sign(scheme, message.as_bytes(), &members, signer_idx, &secret)?;
            let json = serde_json::to_string_pretty(&sig)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("wrote ring signature: {path}");
                }
                None => println!("{json}"),
            }
        }
        RingAction::Verify {
            message,
            ring: ring_path,
            signature,
        } => {
            let members = read_ring_file(&ring_path)?;
            let raw = std::fs::read_to_string(&signature)
                .with_context(|| format!("reading signature file {signature}"))?;
            let sig: RingSignature = serde_json::from_str(&raw)?;
            if ring::verify(message.as_bytes(), &members, &sig) {
                println!("valid");
                println!("key image: {}", hex::encode(&sig.key_image));
            } else {
                return Err(KeyError::VerifyFailed.into());
            }
        }
        RingAction::KeyImage { name, scheme } => {
            let password = password_for(core, false)?;
            let ks = core.load(&name, password.as_deref())?;
            let scheme: RingScheme = scheme.into();
            let secret = match scheme {
                RingScheme::Lsag => ks.ringtail_scalar()?.to_vec(),
                RingScheme::LatticeLsag => ks.mldsa_seed()?.to_vec(),
            };
            println!("{}", hex::encode(ring::key_image(scheme, &secret)?));
        }
    }
    Ok(())
}

fn run_threshold(core: &Core, action: ThresholdAction, url: Option<&str>) -> Result<()> {
    let client = core.threshold_client(url)?;
    match action {
        ThresholdAction::Health => {
            client.health()?;
            println!("ok");
        }
        ThresholdAction::Distribute {
            key_id,
            threshold,
            shares,
            validators,
        } => {
            let out = client.distribute(&key_id, threshold, shares, &validators)?;
            println!("group public key: {}", out.group_public_key);
            for share in out.share_ids {
                println!("share: {share}");
            }
        }
        ThresholdAction::Gather { key_id } => {
            let out = client.gather(&key_id)?;
            println!(
                "shares available: {}/{} (ready: {})",
                out.available, out.required, out.ready
            );
        }
        ThresholdAction::Sign {
            key_id,
            message,
            algorithm,
        } => {
            let out = client.threshold_sign(&key_id, message.as_bytes(), &algorithm)?;
            println!("signature: {}", out.signature);
            println!("participants: {}", out.participant_ids.join(", "));
        }
        ThresholdAction::Verify {
            key_id,
            message,
            signature,
            algorithm,
        } => {
            let sig = general_purpose::STANDARD
                .decode(&signature)
                .context("signature is not valid base64")?;
            let out = client.verify(&key_id, message.as_bytes(), &sig, &algorithm)?;
            if out.valid {
                println!("valid");
            } else {
                match out.reason {
                    Some(reason) => eprintln!("invalid: {reason}"),
                    None => eprintln!("invalid"),
                }
                return Err(KeyError::VerifyFailed.into());
            }
        }
        ThresholdAction::Encrypt { key_id, plaintext } => {
            let out = client.encrypt(&key_id, plaintext.as_bytes())?;
            println!("{}", out.ciphertext);
        }
        ThresholdAction::Decrypt { key_id, ciphertext } => {
            let plaintext = client.decrypt(&key_id, &ciphertext)?;
            match String::from_utf8(plaintext.clone()) {
                Ok(text) => println!("{text}"),
                Err(_) => println!("{}", general_purpose::STANDARD.encode(plaintext)),
            }
        }
        ThresholdAction::Reshare {
            key_id,
            threshold,
            shares,
            validators,
        } => {
            let validators = if validators.is_empty() {
                None
            } else {
                Some(validators.as_slice())
            };
            let out = client.reshare(&key_id, threshold, shares, validators)?;
            for share in out.share_ids {
                println!("share: {share}");
            }
        }
        ThresholdAction::List { filter } => {
            for key in client.list_keys(filter.as_deref())? {
                let state = key
                    .state
                    .map(|s| format!("{s:?}").to_lowercase())
                    .unwrap_or_else(|| "unknown".to_string());
                println!(
                    "{:<24} {:<12} {}",
                    key.key_id,
                    key.algorithm.unwrap_or_default(),
                    state
                );
            }
        }
        ThresholdAction::Algorithms => {
            for algo in client.list_algorithms()? {
                println!("{algo}");
            }
        }
        ThresholdAction::Show { name } => {
            let key = client.get_key_by_name(&name)?;
            println!("key id:    {}", key.key_id);
            if let Some(algo) = key.algorithm {
                println!("algorithm: {algo}");
            }
            if let (Some(t), Some(n)) = (key.threshold, key.shares) {
                println!("threshold: {t} of {n}");
            }
            if let Some(state) = key.state {
                println!("state:     {state:?}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_contract() {
        let cases: Vec<(anyhow::Error, u8)> = vec![
            (KeyError::BadUsage("x".into()).into(), 2),
            (KeyError::InvalidMnemonic.into(), 2),
            (KeyError::NotFound("x".into()).into(), 3),
            (KeyError::NameTaken("x".into()).into(), 4),
            (KeyError::InvalidPassword.into(), 5),
            (KeyError::PasswordRequired.into(), 5),
            (KeyError::Locked("x".into()).into(), 6),
            (KeyError::Expired("x".into()).into(), 6),
            (KeyError::ServiceUnreachable("x".into()).into(), 7),
            (KeyError::Timeout.into(), 7),
            (anyhow::anyhow!("anything else"), 1),
        ];
        for (err, code) in cases {
            assert_eq!(exit_code_of(&err), code);
        }
    }

    #[test]
    fn message_bytes_decodes_hex() {
        assert_eq!(message_bytes("0xdeadbeef", true).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(message_bytes("plain", false).unwrap(), b"plain");
        assert!(message_bytes("zz", true).is_err());
    }

    #[test]
    fn ring_file_parses_hex_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ring.json");
        std::fs::write(&path, r#"["02aabb", "0xccdd"]"#).unwrap();
        let members = read_ring_file(path.to_str().unwrap()).unwrap();
        assert_eq!(members, vec![vec![0x02, 0xaa, 0xbb], vec![0xcc, 0xdd]]);
    }
}
