use crate::error::ChainError;
use crate::miner::{valid_proof, Difficulty};

use super::chain::Block;

/// Walk consecutive pairs and check both link hash and proof continuity.
///
/// The proof check only looks at the two proof integers; it is independent of
/// the linked block's content. Index continuity and the genesis block itself
/// are not checked.
pub fn validate_chain(chain: &[Block], difficulty: Difficulty) -> Result<(), ChainError> {
    for pair in chain.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);

        if current.previous_hash != previous.hash() {
            return Err(ChainError::InvalidBlockLinkage(current.index));
        }

        if !valid_proof(previous.proof, current.proof, difficulty) {
            return Err(ChainError::InvalidProofOfWork(current.index));
        }
    }
    Ok(())
}

pub fn valid_chain(chain: &[Block], difficulty: Difficulty) -> bool {
    validate_chain(chain, difficulty).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Blockchain;
    use crate::transaction::Transaction;

    fn easy() -> Difficulty {
        Difficulty::new(1).unwrap()
    }

    fn mined_chain(blocks: usize) -> Vec<Block> {
        let mut chain = Blockchain::new(easy());
        for n in 1..blocks {
            chain
                .new_transaction(Transaction::new(format!("p{}", n), "asthma", "spirometry", 40))
                .unwrap();
            chain.mine().unwrap();
        }
        chain.blocks().to_vec()
    }

    #[test]
    fn test_mined_chain_is_valid() {
        let chain = mined_chain(5);
        assert!(valid_chain(&chain, easy()));
    }

    #[test]
    fn test_trivial_chains_are_valid() {
        assert!(valid_chain(&[], easy()));
        assert!(valid_chain(&mined_chain(1), easy()));
    }

    #[test]
    fn test_tampered_transaction_breaks_linkage() {
        let mut chain = mined_chain(4);
        chain[1].transactions[0].amount = 1_000_000;
        assert!(matches!(
            validate_chain(&chain, easy()),
            Err(ChainError::InvalidBlockLinkage(3))
        ));
    }

    #[test]
    fn test_tampered_proof_is_rejected() {
        let mut chain = mined_chain(3);
        let previous_proof = chain[1].proof;
        let bad_proof = (0..)
            .find(|p| !valid_proof(previous_proof, *p, easy()))
            .unwrap();
        chain[2].proof = bad_proof;
        assert!(matches!(
            validate_chain(&chain, easy()),
            Err(ChainError::InvalidProofOfWork(3))
        ));
    }

    #[test]
    fn test_tampered_tip_content_goes_unnoticed() {
        // Nothing links to the tip, so its transactions are not covered.
        let mut chain = mined_chain(3);
        chain[2].transactions[0].illness = "edited".to_string();
        assert!(valid_chain(&chain, easy()));
    }

    #[test]
    fn test_validation_uses_given_difficulty() {
        let chain = mined_chain(6);
        let strict = Difficulty::new(8).unwrap();
        assert!(!valid_chain(&chain, strict));
    }
}
