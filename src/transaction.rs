//! Medical record transactions
//!
//! No field validation happens here; whatever the submitting layer accepted
//! is pooled as-is.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub patient: String,
    pub illness: String,
    pub tests: String,
    pub amount: i64,
}

impl Transaction {
    pub fn new(
        patient: impl Into<String>,
        illness: impl Into<String>,
        tests: impl Into<String>,
        amount: i64,
    ) -> Self {
        Self {
            patient: patient.into(),
            illness: illness.into(),
            tests: tests.into(),
            amount,
        }
    }

    /// Field map fed to the canonical hasher. Kept separate from the serde
    /// representation so display formats can change without moving hashes.
    pub fn canonical_value(&self) -> Value {
        json!({
            "amount": self.amount,
            "illness": self.illness,
            "patient": self.patient,
            "tests": self.tests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_arbitrary_content() {
        let tx = Transaction::new("", "", "", -5);
        assert_eq!(tx.amount, -5);
        assert!(tx.patient.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let tx = Transaction::new("p-1", "flu", "blood panel", 120);
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["patient"], "p-1");
        assert_eq!(value["illness"], "flu");
        assert_eq!(value["tests"], "blood panel");
        assert_eq!(value["amount"], 120);
        assert_eq!(value, tx.canonical_value());
    }
}
