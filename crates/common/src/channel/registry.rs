use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::task::spawn_blocking;

use super::access_code::{hash_code, verify_code};
use crate::crypto::{CryptoError, PublicKey, SealedText, WrappedSecret};

const HOST_TOKEN_SIZE: usize = 32;
const RECEIVER_ID_SIZE: usize = 16;

/// Channels whose host has been silent this long are dropped
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
/// Most receivers a single channel will admit
pub const DEFAULT_MAX_RECEIVERS: usize = 64;

#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("invalid request: {0}")]
    InvalidInput(String),
    #[error("channel name already in use: {0}")]
    ChannelTaken(String),
    #[error("channel not found: {0}")]
    NotFound(String),
    #[error("incorrect access code")]
    AuthFailed,
    #[error("host token does not match")]
    Unauthorized,
    #[error("unknown receiver: {0}")]
    UnknownReceiver(String),
    #[error("channel is full: {0}")]
    ChannelFull(String),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("unhandled channel registry error: {0}")]
    Provider(String),
}

/// A receiver that has published a public key and still waits for the
///  host to wrap the session secret to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReceiver {
    pub receiver_id: String,
    pub public_key: String,
}

/// Latest sealed text the host has pushed to a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelText {
    pub version: u64,
    pub ciphertext: SealedText,
}

#[derive(Debug)]
struct Channel {
    /// PHC hash of the access code
    code_hash: String,
    host_token: String,
    receivers: HashMap<String, Receiver>,
    text: Option<ChannelText>,
    /// Last time the host proved it is still around
    last_seen: Instant,
}

impl Channel {
    fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) >= ttl
    }
}

#[derive(Debug, Default)]
struct Receiver {
    public_key: Option<String>,
    wrapped_key: Option<WrappedSecret>,
}

/// Live channels keyed by normalized name
///
/// The registry only ever sees public keys, wrapped secrets and sealed text.
///  A host proves itself with the token it got from `host`; receivers prove
///  themselves with the id they got from `join`.
///
/// A host that stops calling `pending`, `offer` or `update_text` for longer
///  than the idle TTL is treated as gone: its channel is swept and the name
///  can be hosted again.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    inner: Arc<RwLock<HashMap<String, Channel>>>,
    idle_ttl: Duration,
    max_receivers: usize,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TTL, DEFAULT_MAX_RECEIVERS)
    }
}

/// Trim and lowercase a channel name, rejecting empty ones
pub fn normalize_channel_name(name: &str) -> Result<String, ChannelError> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(ChannelError::InvalidInput("channel name is required".into()));
    }
    Ok(name)
}

fn random_token(size: usize) -> String {
    let mut buff = vec![0u8; size];
    OsRng.fill_bytes(&mut buff);
    hex::encode(buff)
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_ttl: Duration, max_receivers: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
            max_receivers,
        }
    }

    fn read<T>(
        &self,
        name: &str,
        f: impl FnOnce(&Channel) -> Result<T, ChannelError>,
    ) -> Result<T, ChannelError> {
        let name = normalize_channel_name(name)?;
        let inner = self
            .inner
            .read()
            .map_err(|e| ChannelError::Provider(format!("failed to acquire read lock: {}", e)))?;
        let channel = inner
            .get(&name)
            .filter(|channel| !channel.is_idle(Instant::now(), self.idle_ttl))
            .ok_or(ChannelError::NotFound(name))?;
        f(channel)
    }

    fn write<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Channel) -> Result<T, ChannelError>,
    ) -> Result<T, ChannelError> {
        let name = normalize_channel_name(name)?;
        let mut inner = self
            .inner
            .write()
            .map_err(|e| ChannelError::Provider(format!("failed to acquire write lock: {}", e)))?;
        let idle_ttl = self.idle_ttl;
        let channel = inner
            .get_mut(&name)
            .filter(|channel| !channel.is_idle(Instant::now(), idle_ttl))
            .ok_or(ChannelError::NotFound(name))?;
        f(channel)
    }

    /// Open a channel protected by `code`, returning the host token
    pub async fn host(&self, name: &str, code: &str) -> Result<String, ChannelError> {
        let name = normalize_channel_name(name)?;
        if code.is_empty() {
            return Err(ChannelError::InvalidInput("access code is required".into()));
        }

        let code = code.to_string();
        let code_hash = spawn_blocking(move || hash_code(&code))
            .await
            .map_err(|e| ChannelError::Provider(format!("hash task failed: {}", e)))?
            .map_err(|e| ChannelError::Provider(e.to_string()))?;

        let mut inner = self
            .inner
            .write()
            .map_err(|e| ChannelError::Provider(format!("failed to acquire write lock: {}", e)))?;
        let now = Instant::now();
        sweep(&mut inner, now, self.idle_ttl);
        match inner.entry(name) {
            Entry::Occupied(entry) => Err(ChannelError::ChannelTaken(entry.key().clone())),
            Entry::Vacant(entry) => {
                let host_token = random_token(HOST_TOKEN_SIZE);
                tracing::info!(channel = %entry.key(), "channel opened");
                entry.insert(Channel {
                    code_hash,
                    host_token: host_token.clone(),
                    receivers: HashMap::new(),
                    text: None,
                    last_seen: now,
                });
                Ok(host_token)
            }
        }
    }

    /// Join a channel with its access code, returning a fresh receiver id
    pub async fn join(&self, name: &str, code: &str) -> Result<String, ChannelError> {
        if code.is_empty() {
            return Err(ChannelError::InvalidInput("access code is required".into()));
        }
        let code_hash = self.read(name, |channel| Ok(channel.code_hash.clone()))?;

        let code = code.to_string();
        let verified = spawn_blocking(move || verify_code(&code, &code_hash))
            .await
            .map_err(|e| ChannelError::Provider(format!("verify task failed: {}", e)))?;
        if !verified {
            tracing::warn!(channel = %name, "join rejected: incorrect access code");
            return Err(ChannelError::AuthFailed);
        }

        // the channel may have closed while we were verifying
        let max_receivers = self.max_receivers;
        self.write(name, |channel| {
            if channel.receivers.len() >= max_receivers {
                tracing::warn!(channel = %name, "join rejected: channel is full");
                return Err(ChannelError::ChannelFull(name.trim().to_lowercase()));
            }
            let receiver_id = random_token(RECEIVER_ID_SIZE);
            channel
                .receivers
                .insert(receiver_id.clone(), Receiver::default());
            tracing::info!(channel = %name, %receiver_id, "receiver joined");
            Ok(receiver_id)
        })
    }

    /// Publish a joined receiver's handshake public key
    pub fn announce(
        &self,
        name: &str,
        receiver_id: &str,
        public_key: &str,
    ) -> Result<(), ChannelError> {
        PublicKey::from_base64(public_key)?;
        self.write(name, |channel| {
            let receiver = channel
                .receivers
                .get_mut(receiver_id)
                .ok_or_else(|| ChannelError::UnknownReceiver(receiver_id.to_string()))?;
            receiver.public_key = Some(public_key.to_string());
            receiver.wrapped_key = None;
            Ok(())
        })
    }

    /// Receivers waiting for the host to offer them the session secret
    pub fn pending(
        &self,
        name: &str,
        host_token: &str,
    ) -> Result<Vec<PendingReceiver>, ChannelError> {
        self.write(name, |channel| {
            authorize_host(channel, host_token)?;
            let mut pending: Vec<PendingReceiver> = channel
                .receivers
                .iter()
                .filter(|(_, receiver)| receiver.wrapped_key.is_none())
                .filter_map(|(id, receiver)| {
                    receiver.public_key.as_ref().map(|key| PendingReceiver {
                        receiver_id: id.clone(),
                        public_key: key.clone(),
                    })
                })
                .collect();
            pending.sort_by(|a, b| a.receiver_id.cmp(&b.receiver_id));
            Ok(pending)
        })
    }

    /// Deliver a wrapped session secret to one receiver
    pub fn offer(
        &self,
        name: &str,
        host_token: &str,
        receiver_id: &str,
        wrapped_key: WrappedSecret,
    ) -> Result<(), ChannelError> {
        self.write(name, |channel| {
            authorize_host(channel, host_token)?;
            let receiver = channel
                .receivers
                .get_mut(receiver_id)
                .ok_or_else(|| ChannelError::UnknownReceiver(receiver_id.to_string()))?;
            receiver.wrapped_key = Some(wrapped_key);
            Ok(())
        })
    }

    /// The wrapped secret offered to a receiver, once there is one
    pub fn wrapped_key(
        &self,
        name: &str,
        receiver_id: &str,
    ) -> Result<Option<WrappedSecret>, ChannelError> {
        self.read(name, |channel| {
            channel
                .receivers
                .get(receiver_id)
                .map(|receiver| receiver.wrapped_key.clone())
                .ok_or_else(|| ChannelError::UnknownReceiver(receiver_id.to_string()))
        })
    }

    /// Replace the channel's text, returning its new version
    pub fn update_text(
        &self,
        name: &str,
        host_token: &str,
        ciphertext: SealedText,
    ) -> Result<u64, ChannelError> {
        self.write(name, |channel| {
            authorize_host(channel, host_token)?;
            let version = channel.text.as_ref().map_or(1, |text| text.version + 1);
            channel.text = Some(ChannelText {
                version,
                ciphertext,
            });
            Ok(version)
        })
    }

    /// The latest text, for a joined receiver
    pub fn text(
        &self,
        name: &str,
        receiver_id: &str,
    ) -> Result<Option<ChannelText>, ChannelError> {
        self.read(name, |channel| {
            if !channel.receivers.contains_key(receiver_id) {
                return Err(ChannelError::UnknownReceiver(receiver_id.to_string()));
            }
            Ok(channel.text.clone())
        })
    }

    /// Tear a channel down; every receiver loses access
    pub fn close(&self, name: &str, host_token: &str) -> Result<(), ChannelError> {
        let name = normalize_channel_name(name)?;
        let mut inner = self
            .inner
            .write()
            .map_err(|e| ChannelError::Provider(format!("failed to acquire write lock: {}", e)))?;
        let channel = inner
            .get(&name)
            .ok_or_else(|| ChannelError::NotFound(name.clone()))?;
        check_host(channel, host_token)?;
        inner.remove(&name);
        tracing::info!(channel = %name, "channel closed");
        Ok(())
    }

    /// Drop a receiver from a channel; its id stops working immediately
    pub fn leave(&self, name: &str, receiver_id: &str) -> Result<(), ChannelError> {
        self.write(name, |channel| {
            channel
                .receivers
                .remove(receiver_id)
                .map(|_| ())
                .ok_or_else(|| ChannelError::UnknownReceiver(receiver_id.to_string()))
        })
    }

    /// Remove every channel whose host has been idle past the TTL
    ///
    /// Returns how many channels were dropped.
    pub fn sweep_idle(&self) -> Result<usize, ChannelError> {
        self.sweep_idle_at(Instant::now())
    }

    /// `sweep_idle` as of `now`
    pub fn sweep_idle_at(&self, now: Instant) -> Result<usize, ChannelError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| ChannelError::Provider(format!("failed to acquire write lock: {}", e)))?;
        Ok(sweep(&mut inner, now, self.idle_ttl))
    }

    /// Number of live channels
    pub fn len(&self) -> Result<usize, ChannelError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| ChannelError::Provider(format!("failed to acquire read lock: {}", e)))?;
        Ok(inner.len())
    }

    pub fn is_empty(&self) -> Result<bool, ChannelError> {
        Ok(self.len()? == 0)
    }
}

fn sweep(channels: &mut HashMap<String, Channel>, now: Instant, ttl: Duration) -> usize {
    let before = channels.len();
    channels.retain(|name, channel| {
        let keep = !channel.is_idle(now, ttl);
        if !keep {
            tracing::info!(channel = %name, "idle channel dropped");
        }
        keep
    });
    before - channels.len()
}

/// Compare two tokens without short-circuiting on the first differing byte
fn tokens_match(expected: &str, presented: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let presented = Sha256::digest(presented.as_bytes());
    expected
        .iter()
        .zip(presented.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

fn check_host(channel: &Channel, host_token: &str) -> Result<(), ChannelError> {
    if !tokens_match(&channel.host_token, host_token) {
        return Err(ChannelError::Unauthorized);
    }
    Ok(())
}

/// `check_host`, marking the host as still present
fn authorize_host(channel: &mut Channel, host_token: &str) -> Result<(), ChannelError> {
    check_host(channel, host_token)?;
    channel.last_seen = Instant::now();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{KeyPair, Secret};

    #[tokio::test]
    async fn test_host_and_join() {
        let registry = ChannelRegistry::new();
        let host_token = registry.host("Demo", "123456").await.unwrap();
        assert_eq!(host_token.len(), HOST_TOKEN_SIZE * 2);

        // names are normalized
        let receiver = registry.join("  demo ", "123456").await.unwrap();
        assert_eq!(receiver.len(), RECEIVER_ID_SIZE * 2);
    }

    #[tokio::test]
    async fn test_host_validation() {
        let registry = ChannelRegistry::new();
        assert!(matches!(
            registry.host("   ", "123456").await,
            Err(ChannelError::InvalidInput(_))
        ));
        assert!(matches!(
            registry.host("demo", "").await,
            Err(ChannelError::InvalidInput(_))
        ));
        assert!(registry.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_name_taken() {
        let registry = ChannelRegistry::new();
        registry.host("demo", "123456").await.unwrap();
        assert!(matches!(
            registry.host("DEMO", "999999").await,
            Err(ChannelError::ChannelTaken(name)) if name == "demo"
        ));
    }

    #[tokio::test]
    async fn test_join_errors() {
        let registry = ChannelRegistry::new();
        assert!(matches!(
            registry.join("nowhere", "123456").await,
            Err(ChannelError::NotFound(_))
        ));

        registry.host("demo", "123456").await.unwrap();
        assert!(matches!(
            registry.join("demo", "000000").await,
            Err(ChannelError::AuthFailed)
        ));
    }

    #[tokio::test]
    async fn test_host_only_operations() {
        let registry = ChannelRegistry::new();
        registry.host("demo", "123456").await.unwrap();
        let sealed = Secret::generate().seal("text").unwrap();

        assert!(matches!(
            registry.pending("demo", "wrong"),
            Err(ChannelError::Unauthorized)
        ));
        assert!(matches!(
            registry.update_text("demo", "wrong", sealed),
            Err(ChannelError::Unauthorized)
        ));
        assert!(matches!(
            registry.close("demo", "wrong"),
            Err(ChannelError::Unauthorized)
        ));
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_announce_rejects_bad_key() {
        let registry = ChannelRegistry::new();
        registry.host("demo", "123456").await.unwrap();
        let receiver = registry.join("demo", "123456").await.unwrap();

        assert!(matches!(
            registry.announce("demo", &receiver, "bm90IGEga2V5"),
            Err(ChannelError::Crypto(CryptoError::KeyImportFailed(_)))
        ));
    }

    #[tokio::test]
    async fn test_unknown_receiver() {
        let registry = ChannelRegistry::new();
        registry.host("demo", "123456").await.unwrap();

        assert!(matches!(
            registry.wrapped_key("demo", "ghost"),
            Err(ChannelError::UnknownReceiver(_))
        ));
        assert!(matches!(
            registry.text("demo", "ghost"),
            Err(ChannelError::UnknownReceiver(_))
        ));
    }

    #[tokio::test]
    async fn test_relay_flow() {
        let registry = ChannelRegistry::new();
        let host_token = registry.host("demo", "123456").await.unwrap();
        let receiver = registry.join("demo", "123456").await.unwrap();

        // joined but not announced yet
        assert!(registry.pending("demo", &host_token).unwrap().is_empty());

        let keys = KeyPair::generate().unwrap();
        let public_key = keys.public().to_base64().unwrap();
        registry.announce("demo", &receiver, &public_key).unwrap();

        let pending = registry.pending("demo", &host_token).unwrap();
        assert_eq!(
            pending,
            vec![PendingReceiver {
                receiver_id: receiver.clone(),
                public_key: public_key.clone(),
            }]
        );
        assert_eq!(registry.wrapped_key("demo", &receiver).unwrap(), None);

        let secret = Secret::generate();
        let wrapped = PublicKey::from_base64(&pending[0].public_key)
            .unwrap()
            .wrap_secret(&secret)
            .unwrap();
        registry
            .offer("demo", &host_token, &receiver, wrapped)
            .unwrap();
        assert!(registry.pending("demo", &host_token).unwrap().is_empty());

        assert_eq!(registry.text("demo", &receiver).unwrap(), None);
        let v1 = registry
            .update_text("demo", &host_token, secret.seal("first").unwrap())
            .unwrap();
        let v2 = registry
            .update_text("demo", &host_token, secret.seal("second").unwrap())
            .unwrap();
        assert_eq!((v1, v2), (1, 2));

        let wrapped = registry.wrapped_key("demo", &receiver).unwrap().unwrap();
        let recovered = keys.private().unwrap_secret(&wrapped).unwrap();
        let text = registry.text("demo", &receiver).unwrap().unwrap();
        assert_eq!(text.version, 2);
        assert_eq!(recovered.open(&text.ciphertext).unwrap(), "second");

        registry.close("demo", &host_token).unwrap();
        assert!(matches!(
            registry.text("demo", &receiver),
            Err(ChannelError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_idle_channel_can_be_hosted_again() {
        let ttl = Duration::from_secs(60);
        let registry = ChannelRegistry::with_limits(ttl, 8);
        registry.host("demo", "123456").await.unwrap();
        let receiver = registry.join("demo", "123456").await.unwrap();
        let public_key = KeyPair::generate().unwrap().public().to_base64().unwrap();
        registry.announce("demo", &receiver, &public_key).unwrap();
        assert!(matches!(
            registry.host("demo", "999999").await,
            Err(ChannelError::ChannelTaken(_))
        ));

        assert_eq!(registry.sweep_idle_at(Instant::now() + ttl).unwrap(), 1);

        let host_token = registry.host("demo", "999999").await.unwrap();
        assert!(registry.pending("demo", &host_token).unwrap().is_empty());
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_idle_channel_is_gone_before_sweep() {
        let registry = ChannelRegistry::with_limits(Duration::from_millis(1), 8);
        let old_token = registry.host("demo", "123456").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(matches!(
            registry.join("demo", "123456").await,
            Err(ChannelError::NotFound(_))
        ));
        assert!(matches!(
            registry.pending("demo", &old_token),
            Err(ChannelError::NotFound(_))
        ));
        // hosting sweeps the stale entry out of the way
        registry.host("demo", "999999").await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_keeps_active_hosts() {
        let ttl = Duration::from_secs(60);
        let registry = ChannelRegistry::with_limits(ttl, 8);
        let host_token = registry.host("busy", "123456").await.unwrap();
        registry.host("quiet", "123456").await.unwrap();

        assert_eq!(registry.sweep_idle().unwrap(), 0);
        assert_eq!(registry.len().unwrap(), 2);

        let later = Instant::now() + ttl;
        assert_eq!(registry.sweep_idle_at(later).unwrap(), 2);
        assert!(registry.is_empty().unwrap());

        let host_token_again = registry.host("busy", "123456").await.unwrap();
        assert_ne!(host_token, host_token_again);
    }

    #[tokio::test]
    async fn test_host_activity_refreshes_channel() {
        let registry = ChannelRegistry::with_limits(Duration::from_secs(1), 8);
        let host_token = registry.host("demo", "123456").await.unwrap();

        for _ in 0..2 {
            tokio::time::sleep(Duration::from_millis(600)).await;
            registry.pending("demo", &host_token).unwrap();
        }
        assert_eq!(registry.sweep_idle().unwrap(), 0);
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_receiver_cap() {
        let registry = ChannelRegistry::with_limits(DEFAULT_IDLE_TTL, 3);
        let host_token = registry.host("Demo", "123456").await.unwrap();
        let keys = KeyPair::generate().unwrap();
        let public_key = keys.public().to_base64().unwrap();

        let mut receivers = Vec::new();
        for _ in 0..3 {
            let receiver = registry.join("demo", "123456").await.unwrap();
            registry.announce("demo", &receiver, &public_key).unwrap();
            receivers.push(receiver);
        }
        assert!(matches!(
            registry.join("demo", "123456").await,
            Err(ChannelError::ChannelFull(name)) if name == "demo"
        ));
        assert_eq!(registry.pending("demo", &host_token).unwrap().len(), 3);

        // leaving frees a slot
        registry.leave("demo", &receivers[0]).unwrap();
        registry.join("demo", "123456").await.unwrap();
    }

    #[tokio::test]
    async fn test_leave() {
        let registry = ChannelRegistry::new();
        let host_token = registry.host("demo", "123456").await.unwrap();
        let receiver = registry.join("demo", "123456").await.unwrap();
        let public_key = KeyPair::generate().unwrap().public().to_base64().unwrap();
        registry.announce("demo", &receiver, &public_key).unwrap();
        assert_eq!(registry.pending("demo", &host_token).unwrap().len(), 1);

        registry.leave("demo", &receiver).unwrap();
        assert!(registry.pending("demo", &host_token).unwrap().is_empty());
        assert!(matches!(
            registry.text("demo", &receiver),
            Err(ChannelError::UnknownReceiver(_))
        ));
        assert!(matches!(
            registry.leave("demo", &receiver),
            Err(ChannelError::UnknownReceiver(_))
        ));
    }

    #[test]
    fn test_tokens_match() {
        let token = random_token(HOST_TOKEN_SIZE);
        assert!(tokens_match(&token, &token.clone()));
        assert!(!tokens_match(&token, &token[..token.len() - 1]));
        assert!(!tokens_match(&token, ""));
        assert!(!tokens_match(&token, &random_token(HOST_TOKEN_SIZE)));
    }
}
