//! Key management commands.
//!
//! `tollgate keys generate` - Generate a new Ed25519 signing keypair.
//! `tollgate keys payload-key` - Generate a payload encryption key.

use std::fs;
use std::path::{Path, PathBuf};
use tollgate_token::{KeyPair, PayloadCodec};

/// Generate a new signing keypair.
pub fn generate(output: Option<PathBuf>) -> anyhow::Result<()> {
    let keypair = KeyPair::generate()?;

    if let Some(output_dir) = output {
        let (private_path, public_path) = write_keypair(&keypair, &output_dir)?;

        println!("Generated signing keypair:");
        println!("  Private key: {}", private_path.display());
        println!("  Public key:  {}", public_path.display());
        println!();
        println!("Keep the private key secret. Point keys.private_key_file at it, or:");
        println!("  export TOLLGATE_PRIVATE_KEY=$(cat {})", private_path.display());
        println!("  export TOLLGATE_PUBLIC_KEY=$(cat {})", public_path.display());
    } else {
        println!("Private key (keep secure!):");
        println!("{}", keypair.private_key_hex());
        println!();
        println!("Public key:");
        println!("{}", keypair.public_key_hex());
        println!();
        println!("Use --output <dir> to save keys to files.");
    }

    Ok(())
}

/// Print a fresh payload key. Rotating it invalidates every outstanding credential.
pub fn payload_key() -> anyhow::Result<()> {
    println!("{}", PayloadCodec::generate_key_hex());
    Ok(())
}

fn write_keypair(keypair: &KeyPair, output_dir: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output_dir)?;

    let private_path = output_dir.join("private.key");
    let public_path = output_dir.join("public.key");
    keypair.save_to_files(&private_path, &public_path)?;

    Ok((private_path, public_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_keys_to_files() {
        let dir = tempdir().unwrap();
        generate(Some(dir.path().join("keys"))).unwrap();

        let private_hex = fs::read_to_string(dir.path().join("keys/private.key")).unwrap();
        let loaded = KeyPair::from_private_key_hex(private_hex.trim()).unwrap();

        let public_hex = fs::read_to_string(dir.path().join("keys/public.key")).unwrap();
        assert_eq!(public_hex.trim(), loaded.public_key_hex());
        assert_eq!(public_hex.trim().len(), 64);
    }
}
