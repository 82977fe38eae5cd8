//! Shared fixtures for unit tests
//!
//! A mock ledger plus builders for the two transaction shapes the pipeline
//! accepts. The integration suite under `tests/` carries its own copies of
//! these since it cannot see `cfg(test)` items.

use async_trait::async_trait;
use dashmap::DashMap;
use solana_sdk::{
    hash::Hash,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};

use crate::config::TokenFee;
use crate::ledger::{LedgerClient, LedgerError, SimulationOutcome, TokenAccountState};

/// In-memory ledger stub with builder-style setup
#[derive(Default)]
pub struct MockLedger {
    token_accounts: DashMap<Pubkey, TokenAccountState>,
    existing_accounts: DashMap<Pubkey, ()>,
    simulation_error: Option<String>,
    units_consumed: Option<u64>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the fixture's source token account with `balance`.
    pub fn with_source(self, fixture: &TransferFixture, balance: u64) -> Self {
        self.token_accounts.insert(
            fixture.source,
            TokenAccountState {
                mint: fixture.token_fee.mint,
                owner: fixture.owner.pubkey(),
                amount: balance,
                is_frozen: false,
            },
        );
        self.existing_accounts.insert(fixture.source, ());
        self
    }

    pub fn frozen(self, address: &Pubkey) -> Self {
        if let Some(mut state) = self.token_accounts.get_mut(address) {
            state.is_frozen = true;
        }
        self
    }

    pub fn owned_by(self, address: &Pubkey, owner: Pubkey) -> Self {
        if let Some(mut state) = self.token_accounts.get_mut(address) {
            state.owner = owner;
        }
        self
    }

    pub fn with_existing_account(self, address: &Pubkey) -> Self {
        self.existing_accounts.insert(*address, ());
        self
    }

    pub fn with_simulation_error(mut self, error: &str) -> Self {
        self.simulation_error = Some(error.to_string());
        self
    }

    pub fn with_units_consumed(mut self, units: u64) -> Self {
        self.units_consumed = Some(units);
        self
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn token_account(&self, address: &Pubkey) -> Result<TokenAccountState, LedgerError> {
        self.token_accounts
            .get(address)
            .map(|state| *state)
            .ok_or(LedgerError::AccountNotFound(*address))
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, LedgerError> {
        Ok(self.existing_accounts.contains_key(address) || self.token_accounts.contains_key(address))
    }

    async fn simulate(&self, _transaction: &Transaction) -> Result<SimulationOutcome, LedgerError> {
        Ok(SimulationOutcome {
            error: self.simulation_error.clone(),
            units_consumed: self.units_consumed,
        })
    }

    async fn broadcast(&self, _raw: &[u8]) -> Result<Signature, LedgerError> {
        Ok(Signature::default())
    }
}

/// Keys and allow-list entry for one fee-paying scenario
pub struct TransferFixture {
    pub custody: Keypair,
    pub owner: Keypair,
    pub source: Pubkey,
    /// Destination the built transaction pays; defaults to the allow-listed
    /// custody token account, tests reassign it to model mismatches.
    pub destination: Pubkey,
    /// Decimals declared by the built instruction; defaults to the
    /// allow-listed precision.
    pub decimals: u8,
    pub token_fee: TokenFee,
    pub blockhash: Hash,
}

impl TransferFixture {
    pub fn new() -> Self {
        let token_fee = TokenFee {
            mint: Pubkey::new_unique(),
            account: Pubkey::new_unique(),
            fee: 100,
            decimals: 6,
        };
        Self {
            custody: Keypair::new(),
            owner: Keypair::new(),
            source: Pubkey::new_unique(),
            destination: token_fee.account,
            decimals: token_fee.decimals,
            token_fee,
            blockhash: Hash::new_unique(),
        }
    }
}

/// Unsigned-by-custody transaction carrying one checked fee transfer,
/// co-signed by the owner.
pub fn transfer_checked_transaction(fixture: &TransferFixture, amount: u64) -> Transaction {
    let ix = spl_token::instruction::transfer_checked(
        &spl_token::id(),
        &fixture.source,
        &fixture.token_fee.mint,
        &fixture.destination,
        &fixture.owner.pubkey(),
        &[],
        amount,
        fixture.decimals,
    )
    .unwrap();
    let message =
        Message::new_with_blockhash(&[ix], Some(&fixture.custody.pubkey()), &fixture.blockhash);
    let mut tx = Transaction::new_unsigned(message);
    tx.partial_sign(&[&fixture.owner], fixture.blockhash);
    tx
}

/// Two-instruction transaction: fee transfer at the allow-listed amount,
/// then canonical associated-account creation for `wallet`/`mint`.
pub fn create_account_transaction(
    fixture: &TransferFixture,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> Transaction {
    let transfer_ix = spl_token::instruction::transfer_checked(
        &spl_token::id(),
        &fixture.source,
        &fixture.token_fee.mint,
        &fixture.destination,
        &fixture.owner.pubkey(),
        &[],
        fixture.token_fee.fee,
        fixture.decimals,
    )
    .unwrap();
    let create_ix = spl_associated_token_account::instruction::create_associated_token_account(
        &fixture.custody.pubkey(),
        wallet,
        mint,
        &spl_token::id(),
    );
    let message = Message::new_with_blockhash(
        &[transfer_ix, create_ix],
        Some(&fixture.custody.pubkey()),
        &fixture.blockhash,
    );
    let mut tx = Transaction::new_unsigned(message);
    tx.partial_sign(&[&fixture.owner], fixture.blockhash);
    tx
}
