//! Custody-key exposure scan
//!
//! A validly co-signed transaction is only safe if no instruction can move
//! anything out of the custody key. The message header is the source of
//! truth for role flags; author-declared metadata is never trusted. The scan
//! fails fast on the first instruction account reference that names the
//! custody key as writable or signer. Slot zero of the signature table is not
//! an instruction account reference and is exempt by construction.

use solana_sdk::{pubkey::Pubkey, transaction::Transaction};

use crate::pipeline::errors::{KeyRole, PipelineError};

/// Reject any transaction whose instructions reference the custody key with
/// a writable or signer role.
pub fn validate_no_key_exposure(
    transaction: &Transaction,
    custody: &Pubkey,
) -> Result<(), PipelineError> {
    let message = &transaction.message;
    for instruction in &message.instructions {
        for &account_index in &instruction.accounts {
            let index = account_index as usize;
            let Some(pubkey) = message.account_keys.get(index) else {
                // An index past the account table is a malformed instruction.
                return Err(PipelineError::InvalidInstruction);
            };
            if pubkey != custody {
                continue;
            }
            if message.is_maybe_writable(index, None) {
                return Err(PipelineError::InvalidAccount {
                    role: KeyRole::Writable,
                });
            }
            if message.is_signer(index) {
                return Err(PipelineError::InvalidAccount {
                    role: KeyRole::Signer,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        message::Message,
    };

    fn transaction_with_instructions(payer: &Pubkey, instructions: &[Instruction]) -> Transaction {
        let message = Message::new_with_blockhash(instructions, Some(payer), &Hash::new_unique());
        Transaction::new_unsigned(message)
    }

    #[test]
    fn test_passes_when_custody_only_pays_fees() {
        let custody = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[0],
            vec![
                AccountMeta::new(Pubkey::new_unique(), false),
                AccountMeta::new_readonly(Pubkey::new_unique(), false),
            ],
        );
        let tx = transaction_with_instructions(&custody, &[ix]);
        assert!(validate_no_key_exposure(&tx, &custody).is_ok());
    }

    #[test]
    fn test_rejects_custody_key_in_any_instruction() {
        // The fee payer is signer+writable at the message level, so any
        // instruction that references it at all is a drain vector.
        let custody = Pubkey::new_unique();
        let benign = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[0],
            vec![AccountMeta::new(Pubkey::new_unique(), false)],
        );
        let hostile = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1],
            vec![AccountMeta::new(custody, false)],
        );
        let tx = transaction_with_instructions(&custody, &[benign, hostile]);

        let err = validate_no_key_exposure(&tx, &custody).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidAccount {
                role: KeyRole::Writable
            }
        ));
    }

    #[test]
    fn test_rejects_custody_key_declared_readonly() {
        // Author-declared flags do not matter; the header still marks the
        // fee payer writable and signer.
        let custody = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[],
            vec![AccountMeta::new_readonly(custody, false)],
        );
        let tx = transaction_with_instructions(&custody, &[ix]);
        assert!(validate_no_key_exposure(&tx, &custody).is_err());
    }
}
