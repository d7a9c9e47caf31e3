//! In-memory store of single-use admission tokens.

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use rand::Rng;
use tokio::time::Instant;
use tracing::debug;

/// Random bytes per token key (256 bits).
const TOKEN_BYTES: usize = 32;

/// A freshly issued admission token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimeToken {
    /// Opaque key handed to the client.
    pub key: String,
    /// When the token was issued.
    pub created_at: Instant,
}

/// Time-bounded set of single-use tokens.
///
/// A key is valid from [`issue`](Self::issue) until the first successful
/// [`verify_and_consume`](Self::verify_and_consume) or until it is older
/// than the retention window, whichever comes first.
#[derive(Debug)]
pub struct TokenStore {
    /// Key → issuance time.
    tokens: Mutex<HashMap<String, Instant>>,
    /// How long an unconsumed token stays valid.
    retention: Duration,
}

impl TokenStore {
    /// Creates an empty store with the given retention window.
    pub fn new(retention: Duration) -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            retention,
        }
    }

    /// Returns the retention window.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Mints and records a new token.
    pub fn issue(&self) -> OneTimeToken {
        let key = generate_key();
        let created_at = Instant::now();
        self.tokens.lock().insert(key.clone(), created_at);
        debug!("Issued one-time token");
        OneTimeToken { key, created_at }
    }

    /// Atomically checks and removes `key`.
    ///
    /// Returns `true` only for a live, unexpired key. Two concurrent callers
    /// presenting the same key can't both succeed: removal happens under
    /// the same lock as the lookup.
    pub fn verify_and_consume(&self, key: &str) -> bool {
        let issued_at = self.tokens.lock().remove(key);
        match issued_at {
            Some(issued_at) => issued_at.elapsed() <= self.retention,
            None => false,
        }
    }

    /// Evicts every token older than the retention window.
    ///
    /// Returns the number of evicted tokens.
    pub fn sweep(&self) -> usize {
        let mut tokens = self.tokens.lock();
        let before = tokens.len();
        tokens.retain(|_, issued_at| issued_at.elapsed() <= self.retention);
        before - tokens.len()
    }

    /// Number of tokens currently held.
    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    /// Whether the store holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn generate_key() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}
