use crate::keypair::KeyPair;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Load the node keypair from a hex-encoded secret file.
///
/// A missing file is created with a freshly generated key; `None` yields an
/// ephemeral key that is never written anywhere.
pub fn load_or_generate_keypair(path: Option<&Path>) -> Result<KeyPair> {
    let Some(path) = path else {
        let keypair = KeyPair::generate();
        info!(address = %keypair.address, "Using ephemeral keypair");
        return Ok(keypair);
    };

    if path.exists() {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file {:?}", path))?;
        let trimmed = contents.trim();
        let raw = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let secret = hex::decode(raw).with_context(|| format!("Key file {:?} is not hex", path))?;
        let keypair = KeyPair::from_secret_bytes(&secret)
            .with_context(|| format!("Key file {:?} does not hold a valid secp256k1 key", path))?;
        info!(address = %keypair.address, "Loaded keypair from {:?}", path);
        return Ok(keypair);
    }

    let keypair = KeyPair::generate();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create key directory {:?}", parent))?;
    }
    fs::write(path, hex::encode(keypair.to_bytes()))
        .with_context(|| format!("Failed to write key file {:?}", path))?;
    info!(address = %keypair.address, "Generated new keypair at {:?}", path);
    Ok(keypair)
}
