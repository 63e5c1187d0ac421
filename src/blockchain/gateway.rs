// src/blockchain/gateway.rs

use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::Abi;
use ethers::contract::Contract;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::U256;

use crate::blockchain::models::{RawContestant, RawPoll};
use crate::blockchain::provider::ProviderResolver;
use crate::config::Config;
use crate::error::{ChainError, ErrorKind};

/// ABI of the deployed DappVotes contract, reads and writes both.
const DAPPVOTES_ABI: &str = r#"[
  {
    "type": "function",
    "name": "createPoll",
    "stateMutability": "nonpayable",
    "inputs": [
      { "name": "image", "type": "string" },
      { "name": "title", "type": "string" },
      { "name": "description", "type": "string" },
      { "name": "startsAt", "type": "uint256" },
      { "name": "endsAt", "type": "uint256" }
    ],
    "outputs": []
  },
  {
    "type": "function",
    "name": "updatePoll",
    "stateMutability": "nonpayable",
    "inputs": [
      { "name": "id", "type": "uint256" },
      { "name": "image", "type": "string" },
      { "name": "title", "type": "string" },
      { "name": "description", "type": "string" },
      { "name": "startsAt", "type": "uint256" },
      { "name": "endsAt", "type": "uint256" }
    ],
    "outputs": []
  },
  {
    "type": "function",
    "name": "deletePoll",
    "stateMutability": "nonpayable",
    "inputs": [{ "name": "id", "type": "uint256" }],
    "outputs": []
  },
  {
    "type": "function",
    "name": "contest",
    "stateMutability": "nonpayable",
    "inputs": [
      { "name": "id", "type": "uint256" },
      { "name": "name", "type": "string" },
      { "name": "image", "type": "string" }
    ],
    "outputs": []
  },
  {
    "type": "function",
    "name": "vote",
    "stateMutability": "nonpayable",
    "inputs": [
      { "name": "id", "type": "uint256" },
      { "name": "cid", "type": "uint256" }
    ],
    "outputs": []
  },
  {
    "type": "function",
    "name": "getPoll",
    "stateMutability": "view",
    "inputs": [{ "name": "id", "type": "uint256" }],
    "outputs": [
      {
        "name": "",
        "type": "tuple",
        "components": [
          { "name": "id", "type": "uint256" },
          { "name": "image", "type": "string" },
          { "name": "title", "type": "string" },
          { "name": "description", "type": "string" },
          { "name": "votes", "type": "uint256" },
          { "name": "contestants", "type": "uint256" },
          { "name": "deleted", "type": "bool" },
          { "name": "director", "type": "address" },
          { "name": "startsAt", "type": "uint256" },
          { "name": "endsAt", "type": "uint256" },
          { "name": "timestamp", "type": "uint256" },
          { "name": "voters", "type": "address[]" },
          { "name": "avatars", "type": "string[]" }
        ]
      }
    ]
  },
  {
    "type": "function",
    "name": "getPolls",
    "stateMutability": "view",
    "inputs": [],
    "outputs": [
      {
        "name": "",
        "type": "tuple[]",
        "components": [
          { "name": "id", "type": "uint256" },
          { "name": "image", "type": "string" },
          { "name": "title", "type": "string" },
          { "name": "description", "type": "string" },
          { "name": "votes", "type": "uint256" },
          { "name": "contestants", "type": "uint256" },
          { "name": "deleted", "type": "bool" },
          { "name": "director", "type": "address" },
          { "name": "startsAt", "type": "uint256" },
          { "name": "endsAt", "type": "uint256" },
          { "name": "timestamp", "type": "uint256" },
          { "name": "voters", "type": "address[]" },
          { "name": "avatars", "type": "string[]" }
        ]
      }
    ]
  },
  {
    "type": "function",
    "name": "getContestants",
    "stateMutability": "view",
    "inputs": [{ "name": "id", "type": "uint256" }],
    "outputs": [
      {
        "name": "",
        "type": "tuple[]",
        "components": [
          { "name": "id", "type": "uint256" },
          { "name": "image", "type": "string" },
          { "name": "name", "type": "string" },
          { "name": "voter", "type": "address" },
          { "name": "votes", "type": "uint256" },
          { "name": "voters", "type": "address[]" }
        ]
      }
    ]
  }
]"#;

/// Parse the bundled contract ABI.
pub fn dappvotes_abi() -> Result<Abi, ChainError> {
    serde_json::from_str(DAPPVOTES_ABI)
        .map_err(|err| ChainError::Critical(format!("invalid contract ABI: {}", err)))
}

pub type VotingMiddleware = SignerMiddleware<Provider<Http>, LocalWallet>;
pub type VotingContract = Contract<VotingMiddleware>;

/// Read-only contract surface the poll services call through. Lets tests
/// substitute the chain.
#[async_trait]
pub trait PollReader: Send + Sync {
    async fn fetch_polls(&self) -> Result<Vec<RawPoll>, ChainError>;
    async fn fetch_poll(&self, id: u64) -> Result<RawPoll, ChainError>;
    async fn fetch_contestants(&self, poll_id: u64) -> Result<Vec<RawContestant>, ChainError>;
}

/// Binds resolved providers to the voting contract, verifying deployment
/// before use in interactive contexts.
pub struct ContractGateway {
    config: Arc<Config>,
    resolver: Arc<ProviderResolver>,
    abi: Abi,
}

impl ContractGateway {
    pub fn new(config: Arc<Config>, resolver: Arc<ProviderResolver>) -> Result<Self, ChainError> {
        Ok(Self {
            config,
            resolver,
            abi: dappvotes_abi()?,
        })
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Acquire a bound contract handle. Interactive contexts verify the
    /// contract bytecode on every acquisition; server contexts bind
    /// unconditionally and accept the risk of a missing contract.
    ///
    /// Without a wallet signer an ephemeral key pair satisfies the signer
    /// shape for read calls; it is never used for funded writes.
    pub async fn contract(&self) -> Result<VotingContract, ChainError> {
        let handle = self.resolver.resolve().await?;

        if self.config.execution_mode.is_interactive() {
            self.verify_deployed(&handle.provider).await?;
        }

        let wallet = self
            .resolver
            .signer()
            .unwrap_or_else(|| LocalWallet::new(&mut rand::thread_rng()));

        Ok(self.bind(handle.provider, wallet))
    }

    /// Acquire a contract handle backed by the user's wallet signer, as
    /// required by every write path.
    pub async fn contract_with_wallet(&self) -> Result<VotingContract, ChainError> {
        let wallet = self.resolver.signer().ok_or_else(|| {
            ChainError::Connection("no wallet connected, please connect a wallet".to_string())
        })?;

        let handle = self.resolver.resolve().await?;

        if self.config.execution_mode.is_interactive() {
            self.verify_deployed(&handle.provider).await?;
        }

        Ok(self.bind(handle.provider, wallet))
    }

    /// Whether bytecode exists at the contract address. Server contexts
    /// assume deployment; errors read as not deployed.
    pub async fn is_deployed(&self) -> bool {
        if !self.config.execution_mode.is_interactive() {
            return true;
        }
        if !self.resolver.has_bridge() {
            return false;
        }

        let Ok(handle) = self.resolver.resolve().await else {
            return false;
        };
        match handle.provider.get_code(self.config.contract_address, None).await {
            Ok(code) => !code.0.is_empty(),
            Err(err) => {
                tracing::error!("error checking contract deployment: {}", err);
                false
            }
        }
    }

    async fn verify_deployed(&self, provider: &Provider<Http>) -> Result<(), ChainError> {
        let code = provider
            .get_code(self.config.contract_address, None)
            .await
            .map_err(ChainError::from_provider)?;

        if code.0.is_empty() {
            return Err(ChainError::Connection(format!(
                "smart contract not deployed at {:#x}, deploy it or check your connection",
                self.config.contract_address
            )));
        }
        Ok(())
    }

    fn bind(&self, provider: Provider<Http>, wallet: LocalWallet) -> VotingContract {
        let wallet = wallet.with_chain_id(self.config.chain_id);
        let client = SignerMiddleware::new(provider, wallet);
        Contract::new(self.config.contract_address, self.abi.clone(), Arc::new(client))
    }
}

fn abi_error(err: ethers::abi::AbiError) -> ChainError {
    ChainError::Critical(format!("contract ABI mismatch: {}", err))
}

#[async_trait]
impl PollReader for ContractGateway {
    async fn fetch_polls(&self) -> Result<Vec<RawPoll>, ChainError> {
        let contract = self.contract().await?;
        contract
            .method::<_, Vec<RawPoll>>("getPolls", ())
            .map_err(abi_error)?
            .call()
            .await
            .map_err(|err| ChainError::from_contract(err, ErrorKind::Critical))
    }

    async fn fetch_poll(&self, id: u64) -> Result<RawPoll, ChainError> {
        let contract = self.contract().await?;
        contract
            .method::<_, RawPoll>("getPoll", U256::from(id))
            .map_err(abi_error)?
            .call()
            .await
            .map_err(|err| ChainError::from_contract(err, ErrorKind::Critical))
    }

    async fn fetch_contestants(&self, poll_id: u64) -> Result<Vec<RawContestant>, ChainError> {
        let contract = self.contract().await?;
        contract
            .method::<_, Vec<RawContestant>>("getContestants", U256::from(poll_id))
            .map_err(abi_error)?
            .call()
            .await
            .map_err(|err| ChainError::from_contract(err, ErrorKind::Critical))
    }
}
