// src/blockchain/provider.rs

use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::{Http, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;

use crate::config::Config;
use crate::error::ChainError;

/// Seam to the user's wallet (the browser-extension stand-in). The embedding
/// UI layer injects an implementation; headless contexts run without one.
#[async_trait]
pub trait WalletBridge: Send + Sync {
    /// Accounts the user has already authorized (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    /// Prompt the user to authorize accounts (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError>;

    /// Signing key for the active account, when the bridge can sign.
    fn signer(&self) -> Option<LocalWallet>;
}

/// Wallet bridge backed by an in-process key. Useful for tools and tests;
/// authorization is implicit.
pub struct LocalWalletBridge {
    wallet: LocalWallet,
}

impl LocalWalletBridge {
    pub fn new(wallet: LocalWallet) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl WalletBridge for LocalWalletBridge {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(vec![self.wallet.address()])
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(vec![self.wallet.address()])
    }

    fn signer(&self) -> Option<LocalWallet> {
        Some(self.wallet.clone())
    }
}

/// A resolved read/write handle to the chain: the transport plus the
/// authorized wallet account, when one exists.
#[derive(Clone, Debug)]
pub struct ProviderHandle {
    pub provider: Provider<Http>,
    pub account: Option<Address>,
}

/// Obtains chain handles, preferring an authorized wallet account and
/// falling back to the configured RPC endpoint.
pub struct ProviderResolver {
    config: Arc<Config>,
    bridge: Option<Arc<dyn WalletBridge>>,
}

impl ProviderResolver {
    pub fn new(config: Arc<Config>, bridge: Option<Arc<dyn WalletBridge>>) -> Self {
        Self { config, bridge }
    }

    pub fn has_bridge(&self) -> bool {
        self.bridge.is_some()
    }

    /// The bridge's signing key, when a bridge is present and can sign.
    pub fn signer(&self) -> Option<LocalWallet> {
        self.bridge.as_ref().and_then(|b| b.signer())
    }

    fn provider(&self) -> Result<Provider<Http>, ChainError> {
        Provider::<Http>::try_from(self.config.rpc_url.as_str()).map_err(|err| {
            ChainError::Connection(format!(
                "invalid RPC endpoint {}: {}",
                self.config.rpc_url, err
            ))
        })
    }

    /// Resolve a handle. Interactive contexts ask the bridge for authorized
    /// accounts and bind the first one; everything else (no bridge, no
    /// authorized account, server mode) is plain RPC.
    pub async fn resolve(&self) -> Result<ProviderHandle, ChainError> {
        let provider = self.provider()?;

        if !self.config.execution_mode.is_interactive() {
            return Ok(ProviderHandle {
                provider,
                account: None,
            });
        }

        if let Some(bridge) = &self.bridge {
            let accounts = bridge.accounts().await?;
            if let Some(account) = accounts.first() {
                return Ok(ProviderHandle {
                    provider,
                    account: Some(*account),
                });
            }
        }

        Ok(ProviderHandle {
            provider,
            account: None,
        })
    }

    /// Ask the user to authorize an account and return it.
    pub async fn connect_wallet(&self) -> Result<Address, ChainError> {
        let bridge = self.bridge.as_ref().ok_or_else(|| {
            ChainError::Connection("no wallet available, please install one".to_string())
        })?;

        bridge
            .request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::Connection("no accounts authorized".to_string()))
    }

    /// The currently authorized account, or a connection error when the
    /// wallet is missing or locked.
    pub async fn check_wallet(&self) -> Result<Address, ChainError> {
        let bridge = self.bridge.as_ref().ok_or_else(|| {
            ChainError::Connection("no wallet available, please install one".to_string())
        })?;

        bridge
            .accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ChainError::Connection("please connect wallet, no accounts found".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use crate::error::ErrorKind;

    fn test_wallet() -> LocalWallet {
        LocalWallet::new(&mut rand::thread_rng())
    }

    #[tokio::test]
    async fn interactive_resolution_binds_the_authorized_account() {
        let wallet = test_wallet();
        let expected = wallet.address();
        let resolver = ProviderResolver::new(
            Arc::new(Config::default()),
            Some(Arc::new(LocalWalletBridge::new(wallet))),
        );

        let handle = resolver.resolve().await.unwrap();
        assert_eq!(handle.account, Some(expected));
    }

    #[tokio::test]
    async fn missing_bridge_falls_back_to_rpc_only() {
        let resolver = ProviderResolver::new(Arc::new(Config::default()), None);
        let handle = resolver.resolve().await.unwrap();
        assert_eq!(handle.account, None);
    }

    #[tokio::test]
    async fn server_mode_never_queries_the_bridge() {
        struct PanickingBridge;

        #[async_trait]
        impl WalletBridge for PanickingBridge {
            async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
                panic!("bridge queried in server mode");
            }
            async fn request_accounts(&self) -> Result<Vec<Address>, ChainError> {
                panic!("bridge queried in server mode");
            }
            fn signer(&self) -> Option<LocalWallet> {
                None
            }
        }

        let config = Config {
            execution_mode: ExecutionMode::Server,
            ..Config::default()
        };
        let resolver = ProviderResolver::new(Arc::new(config), Some(Arc::new(PanickingBridge)));

        let handle = resolver.resolve().await.unwrap();
        assert_eq!(handle.account, None);
    }

    #[tokio::test]
    async fn check_wallet_without_bridge_is_a_connection_error() {
        let resolver = ProviderResolver::new(Arc::new(Config::default()), None);
        let err = resolver.check_wallet().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
