use std::path::PathBuf;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::Argon2;
use rand::RngCore;

use crate::config::DatabaseConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::fs::{atomic_write, sync_dir};

const MAGIC: &[u8; 4] = b"BMLK";
const VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = MAGIC.len() + 1 + SALT_LEN + NONCE_LEN;

const UNLOCK_ATTEMPTS: u32 = 3;

/// Whole-file symmetric encryption: `<name>.db` <-> `<name>.db.enc`.
/// Passphrase -> Argon2id (default profile) -> AES-256-GCM over the whole
/// file. The plaintext and ciphertext files never coexist after a
/// completed call.
pub struct LockerService;

impl LockerService {
    pub fn is_locked(db: &DatabaseConfig) -> bool {
        db.is_locked()
    }

    /// Encrypts `db.path` in place, leaving only the `.enc` sibling.
    pub fn lock(db: &DatabaseConfig, passphrase: &str) -> AppResult<PathBuf> {
        if db.is_locked() {
            return Err(AppError::DbLocked(db.name.clone()));
        }
        if !db.path.exists() {
            return Err(AppError::DbNotFound(db.name.clone()));
        }

        let plaintext = std::fs::read(&db.path)?;

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let key = derive_key(passphrase, &salt)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| AppError::CorruptCiphertext)?;

        let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);

        let enc_path = db.enc_path();
        atomic_write(&enc_path, &out)?;
        std::fs::remove_file(&db.path)?;
        if let Some(dir) = db.path.parent() {
            sync_dir(dir)?;
        }

        tracing::info!("locked {}", db.name);
        Ok(enc_path)
    }

    /// Decrypts the `.enc` sibling back into `db.path`.
    pub fn unlock(db: &DatabaseConfig, passphrase: &str) -> AppResult<PathBuf> {
        let enc_path = db.enc_path();
        let bytes = std::fs::read(&enc_path).map_err(|_| AppError::CorruptCiphertext)?;
        let plaintext = decrypt(&bytes, passphrase)?;

        atomic_write(&db.path, &plaintext)?;
        std::fs::remove_file(&enc_path)?;
        if let Some(dir) = db.path.parent() {
            sync_dir(dir)?;
        }

        tracing::info!("unlocked {}", db.name);
        Ok(db.path.clone())
    }

    /// Prompts for the passphrase up to three times. Used by every
    /// mutating command before opening a locked database.
    pub fn unlock_if_needed(db: &DatabaseConfig) -> AppResult<()> {
        if !db.is_locked() {
            return Ok(());
        }
        for attempt in 1..=UNLOCK_ATTEMPTS {
            let passphrase =
                rpassword::prompt_password(format!("passphrase for {}: ", db.name))?;
            match Self::unlock(db, &passphrase) {
                Ok(_) => return Ok(()),
                Err(AppError::WrongPassphrase) if attempt < UNLOCK_ATTEMPTS => {
                    tracing::warn!("wrong passphrase, attempt {}/{}", attempt, UNLOCK_ATTEMPTS);
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::WrongPassphrase)
    }
}

fn derive_key(passphrase: &str, salt: &[u8]) -> AppResult<[u8; 32]> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|_| AppError::CorruptCiphertext)?;
    Ok(key)
}

fn decrypt(bytes: &[u8], passphrase: &str) -> AppResult<Vec<u8>> {
    if bytes.len() < HEADER_LEN + TAG_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(AppError::CorruptCiphertext);
    }
    if bytes[MAGIC.len()] != VERSION {
        return Err(AppError::CorruptCiphertext);
    }

    let salt = &bytes[MAGIC.len() + 1..MAGIC.len() + 1 + SALT_LEN];
    let nonce = &bytes[HEADER_LEN - NONCE_LEN..HEADER_LEN];
    let ciphertext = &bytes[HEADER_LEN..];

    let key = derive_key(passphrase, salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| AppError::WrongPassphrase)
}
