use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

const SCHEME: &str = "pbkdf2-sha256";

/// Hash a password as `pbkdf2-sha256$<iterations>$<salt>$<hash>`
/// (salt and hash base64-encoded).
pub fn hash_password(password: &str) -> String {
    let salt = generate_salt();
    hash_with(password, &salt, PBKDF2_ITERATIONS)
}

fn hash_with(password: &str, salt: &[u8], iterations: u32) -> String {
    let hash = derive(password, salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        B64.encode(salt),
        B64.encode(hash.as_slice())
    )
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; HASH_LENGTH]> {
    let mut out = Zeroizing::new([0u8; HASH_LENGTH]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out[..]);
    out
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Stored password hash, parsed.
#[derive(Debug, PartialEq, Eq)]
pub enum StoredHash {
    Pbkdf2 {
        iterations: u32,
        salt: Vec<u8>,
        hash: Vec<u8>,
    },
    /// Unsalted hex SHA-256 written by older settings files.
    LegacySha256(Vec<u8>),
}

impl StoredHash {
    pub fn parse(stored: &str) -> Option<Self> {
        if let Some(rest) = stored.strip_prefix(SCHEME).and_then(|r| r.strip_prefix('$')) {
            let mut parts = rest.split('$');
            let iterations = parts.next()?.parse().ok().filter(|n| *n > 0)?;
            let salt = B64.decode(parts.next()?).ok()?;
            let hash = B64.decode(parts.next()?).ok()?;
            if parts.next().is_some() || hash.len() != HASH_LENGTH {
                return None;
            }
            return Some(Self::Pbkdf2 { iterations, salt, hash });
        }
        decode_hex(stored)
            .filter(|bytes| bytes.len() == HASH_LENGTH)
            .map(Self::LegacySha256)
    }

    /// Constant-time check of a candidate password.
    pub fn verify(&self, password: &str) -> bool {
        match self {
            Self::Pbkdf2 { iterations, salt, hash } => {
                let candidate = derive(password, salt, *iterations);
                candidate.as_slice().ct_eq(hash).into()
            }
            Self::LegacySha256(expected) => {
                let candidate = Sha256::digest(password.as_bytes());
                candidate.as_slice().ct_eq(expected).into()
            }
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::LegacySha256(_))
    }
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    let text = text.trim();
    if text.len() % 2 != 0 || !text.is_ascii() {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}
