//! Chain holder - the surface an RPC layer calls into
//!
//! Ties the template cache and the seal acceptor to one chain engine and forwards chain
//! queries and account operations unchanged.

use crate::acceptor::SealAcceptor;
use crate::config::SealerConfig;
use crate::error::{Result, SealerError};
use crate::future_rule::FutureBlockRule;
use crate::outcome::SealOutcome;
use crate::template_cache::TemplateCache;
use sealer_types::{
    AccountManager, Address, BlockTemplate, ChainEngine, Clock, FutureTimestampValidator, Hash,
    ImportResult, SealedBlock, SystemClock, TransactionInfo,
};
use std::sync::Arc;

/// Block template coordination for one chain engine
pub struct ChainHolder {
    engine: Arc<dyn ChainEngine>,
    accounts: Arc<dyn AccountManager>,
    templates: TemplateCache,
    acceptor: SealAcceptor,
    config: SealerConfig,
}

impl ChainHolder {
    /// Mining template to seal against
    pub fn get_block_template(&self) -> Arc<BlockTemplate> {
        self.templates.mining_template()
    }

    /// Submit a proof of work for the mining template `header_hash`
    pub fn submit_block(&self, nonce: &[u8], solution: &[u8], header_hash: &Hash) -> SealOutcome {
        self.acceptor.submit_mining_seal(nonce, solution, header_hash)
    }

    /// Request a staking template; returns its mine hash
    ///
    /// `Ok(None)` when the engine could not build a template for these parameters.
    pub fn submit_seed(
        &self,
        seed: &[u8],
        signing_public_key: &[u8],
        coinbase: &Address,
    ) -> Result<Option<Hash>> {
        self.require_staking()?;
        Ok(self
            .templates
            .staking_template(seed, signing_public_key, coinbase))
    }

    /// Submit a staking signature for the template `seal_hash`
    pub fn submit_signature(&self, signature: &[u8], seal_hash: &Hash) -> Result<SealOutcome> {
        self.acceptor.submit_staking_signature(signature, seal_hash)
    }

    /// Seed the next staking block must sign over
    pub fn get_seed(&self) -> Result<Vec<u8>> {
        self.require_staking()?;
        Ok(self.engine.seed())
    }

    pub fn is_staking_active(&self) -> bool {
        self.engine.is_staking_active()
    }

    pub fn can_seal(&self, header_hash: &Hash) -> bool {
        self.acceptor.can_seal(header_hash)
    }

    pub fn add_new_block(&self, block: &SealedBlock) -> ImportResult {
        self.acceptor.add_new_block(block)
    }

    pub fn best_block(&self) -> SealedBlock {
        self.engine.best_block()
    }

    pub fn block_by_number(&self, number: u64) -> Option<SealedBlock> {
        self.engine.block_by_number(number)
    }

    pub fn block_by_hash(&self, hash: &Hash) -> Option<SealedBlock> {
        self.engine.block_by_hash(hash)
    }

    /// Height of the best block
    pub fn block_number(&self) -> u64 {
        self.engine.best_block().number()
    }

    pub fn best_mining_block(&self) -> Option<SealedBlock> {
        self.engine.best_mining_block()
    }

    pub fn best_staking_block(&self) -> Option<SealedBlock> {
        self.engine.best_staking_block()
    }

    pub fn total_difficulty_by_hash(&self, hash: &Hash) -> Option<u128> {
        self.engine.total_difficulty_by_hash(hash)
    }

    pub fn transaction_info(&self, tx_hash: &Hash) -> Option<TransactionInfo> {
        self.engine.transaction_info(tx_hash)
    }

    pub fn unlock_account(&self, address: &Address, password: &str, timeout_secs: u64) -> bool {
        self.accounts.unlock_account(address, password, timeout_secs)
    }

    pub fn lock_account(&self, address: &Address, password: &str) -> bool {
        self.accounts.lock_account(address, password)
    }

    pub fn new_account(&self, password: &str) -> Option<Address> {
        self.accounts.create_account(password)
    }

    pub fn list_accounts(&self) -> Vec<Address> {
        self.accounts.accounts()
    }

    pub fn address_exists(&self, address: &Address) -> bool {
        self.accounts.address_exists(address)
    }

    pub fn config(&self) -> &SealerConfig {
        &self.config
    }

    /// Cancel pending deferred submissions. Does not wait.
    pub fn shut_down(&self) {
        self.acceptor.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.acceptor.is_closed()
    }

    fn require_staking(&self) -> Result<()> {
        if self.engine.is_staking_active() {
            Ok(())
        } else {
            Err(SealerError::StakingInactive)
        }
    }
}

/// Builder for ChainHolder
pub struct ChainHolderBuilder {
    engine: Option<Arc<dyn ChainEngine>>,
    accounts: Option<Arc<dyn AccountManager>>,
    config: SealerConfig,
    clock: Option<Arc<dyn Clock>>,
    validator: Option<Arc<dyn FutureTimestampValidator>>,
}

impl ChainHolderBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            accounts: None,
            config: SealerConfig::default(),
            clock: None,
            validator: None,
        }
    }

    pub fn engine(mut self, engine: Arc<dyn ChainEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn account_manager(mut self, accounts: Arc<dyn AccountManager>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub fn config(mut self, config: SealerConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to the system clock
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to [`FutureBlockRule`] with the configured tolerance
    pub fn future_timestamp_validator(mut self, validator: Arc<dyn FutureTimestampValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Build the holder. Must be called inside a tokio runtime.
    pub fn build(self) -> Result<ChainHolder> {
        let engine = self.engine.ok_or(SealerError::MissingComponent("chain engine"))?;
        let accounts = self
            .accounts
            .ok_or(SealerError::MissingComponent("account manager"))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let validator = self.validator.unwrap_or_else(|| {
            Arc::new(FutureBlockRule::new(
                clock.clone(),
                self.config.future_block_tolerance_secs,
            ))
        });

        let templates = TemplateCache::new(
            engine.clone(),
            clock.clone(),
            self.config.staking_template_refresh(),
        );
        let acceptor = SealAcceptor::new(engine.clone(), validator, clock)?;

        tracing::info!(
            "Chain holder ready (staking refresh {}ms, future tolerance {}s)",
            self.config.staking_template_refresh_ms,
            self.config.future_block_tolerance_secs
        );

        Ok(ChainHolder {
            engine,
            accounts,
            templates,
            acceptor,
            config: self.config,
        })
    }
}

impl Default for ChainHolderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
