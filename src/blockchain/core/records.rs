use serde::Serialize;

use super::chain::Block;

/// One sealed medical record for a patient, tagged with the block holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientRecord {
    pub block_index: u64,
    pub illness: String,
    pub tests: String,
    pub amount: i64,
}

/// Every sealed record for `patient`, oldest block first. Pooled transactions
/// that have not been mined yet are not included.
pub fn records_for_patient(chain: &[Block], patient: &str) -> Vec<PatientRecord> {
    chain
        .iter()
        .flat_map(|block| {
            block
                .transactions
                .iter()
                .filter(|tx| tx.patient == patient)
                .map(move |tx| PatientRecord {
                    block_index: block.index,
                    illness: tx.illness.clone(),
                    tests: tx.tests.clone(),
                    amount: tx.amount,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Blockchain;
    use crate::miner::Difficulty;
    use crate::transaction::Transaction;

    #[test]
    fn test_records_span_blocks_and_skip_pending() {
        let mut chain = Blockchain::new(Difficulty::new(1).unwrap());
        chain.new_transaction(Transaction::new("alice", "flu", "swab", 20)).unwrap();
        chain.new_transaction(Transaction::new("bob", "fracture", "x-ray", 90)).unwrap();
        chain.mine().unwrap();
        chain.new_transaction(Transaction::new("alice", "migraine", "mri", 300)).unwrap();
        chain.mine().unwrap();
        chain.new_transaction(Transaction::new("alice", "pending", "none", 1)).unwrap();

        let records = records_for_patient(chain.blocks(), "alice");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].block_index, 2);
        assert_eq!(records[0].illness, "flu");
        assert_eq!(records[1].block_index, 3);
        assert_eq!(records[1].tests, "mri");

        assert!(records_for_patient(chain.blocks(), "carol").is_empty());
    }
}
