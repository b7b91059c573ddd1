//! Remembered wallet kind, for reconnecting on the next start.

use std::sync::Mutex;

use qube_core::WalletKind;

/// Where the orchestrator keeps the last connected wallet kind.
///
/// Store failures never fail a connect or disconnect; implementations log
/// and carry on.
pub trait SessionStore: Send + Sync {
    fn remembered_wallet(&self) -> Option<WalletKind>;
    fn remember_wallet(&self, kind: WalletKind);
    fn forget_wallet(&self);
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    kind: Mutex<Option<WalletKind>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn remembered_wallet(&self) -> Option<WalletKind> {
        self.kind.lock().ok().and_then(|k| *k)
    }

    fn remember_wallet(&self, kind: WalletKind) {
        if let Ok(mut k) = self.kind.lock() {
            *k = Some(kind);
        }
    }

    fn forget_wallet(&self) {
        if let Ok(mut k) = self.kind.lock() {
            *k = None;
        }
    }
}

#[cfg(feature = "persistence")]
pub use config_store::ConfigStore;

#[cfg(feature = "persistence")]
mod config_store {
    use std::path::PathBuf;

    use qube_core::WalletKind;
    use qube_core::config::{AppConfig, load_config_from, save_config_to};

    use super::SessionStore;

    /// Keeps the remembered wallet in the application config file.
    #[derive(Debug, Clone)]
    pub struct ConfigStore {
        path: PathBuf,
    }

    impl ConfigStore {
        pub fn new(path: PathBuf) -> Self {
            Self { path }
        }

        /// Store backed by the default config location.
        pub fn default_location() -> Result<Self, qube_core::ConfigError> {
            Ok(Self::new(qube_core::config::get_config_path()?))
        }

        fn update(&self, f: impl FnOnce(&mut AppConfig)) {
            let mut config = match load_config_from(&self.path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("Failed to load config: {}", e);
                    AppConfig::default()
                }
            };
            f(&mut config);
            if let Err(e) = save_config_to(&config, &self.path) {
                tracing::warn!("Failed to save config: {}", e);
            }
        }
    }

    impl SessionStore for ConfigStore {
        fn remembered_wallet(&self) -> Option<WalletKind> {
            load_config_from(&self.path)
                .map_err(|e| tracing::warn!("Failed to load config: {}", e))
                .ok()
                .and_then(|c| c.reconnect_target())
        }

        fn remember_wallet(&self, kind: WalletKind) {
            self.update(|c| c.last_wallet = Some(kind));
        }

        fn forget_wallet(&self) {
            self.update(|c| c.last_wallet = None);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_config_store_round_trip() {
            let dir = std::env::temp_dir().join(format!("qube-store-{}", std::process::id()));
            let store = ConfigStore::new(dir.join("config.json"));

            assert_eq!(store.remembered_wallet(), None);
            store.remember_wallet(WalletKind::Leap);
            assert_eq!(store.remembered_wallet(), Some(WalletKind::Leap));
            store.forget_wallet();
            assert_eq!(store.remembered_wallet(), None);

            let _ = std::fs::remove_dir_all(&dir);
        }
    }
}
