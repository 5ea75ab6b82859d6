use crate::address::Address;
use crate::crypto::{keccak256, u64_to_word};
use serde::{Deserialize, Serialize};

/// The signed content of a cheque.
///
/// `amount` is cumulative: a cheque with serial `n` replaces every earlier
/// cheque from the same issuer for redemption purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChequeParams {
    /// Issuer's settlement contract.
    pub contract: Address,
    /// Address entitled to cash the cheque.
    pub beneficiary: Address,
    pub serial: u64,
    /// Cumulative settlement-currency amount owed to the beneficiary.
    pub amount: u64,
    /// Honey debt that produced this cheque.
    pub honey: u64,
    /// Redemption delay in seconds.
    pub timeout: u64,
}

impl ChequeParams {
    /// Hash covered by the issuer's signature: keccak256 over the contract and
    /// beneficiary addresses followed by 32-byte words of serial, amount, honey
    /// and timeout.
    pub fn sig_hash(&self) -> [u8; 32] {
        let mut input = Vec::with_capacity(20 * 2 + 32 * 4);
        input.extend_from_slice(self.contract.as_bytes());
        input.extend_from_slice(self.beneficiary.as_bytes());
        input.extend_from_slice(&u64_to_word(self.serial));
        input.extend_from_slice(&u64_to_word(self.amount));
        input.extend_from_slice(&u64_to_word(self.honey));
        input.extend_from_slice(&u64_to_word(self.timeout));
        keccak256(&input)
    }
}

/// A cheque together with its recoverable issuer signature (`r || s || v`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cheque {
    pub params: ChequeParams,
    pub signature: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ChequeParams {
        ChequeParams {
            contract: Address([1; 20]),
            beneficiary: Address([2; 20]),
            serial: 1,
            amount: 500,
            honey: 500,
            timeout: 86_400,
        }
    }

    #[test]
    fn sig_hash_covers_every_field() {
        let base = params().sig_hash();

        let mut p = params();
        p.serial = 2;
        assert_ne!(p.sig_hash(), base);

        let mut p = params();
        p.amount += 1;
        assert_ne!(p.sig_hash(), base);

        let mut p = params();
        p.honey += 1;
        assert_ne!(p.sig_hash(), base);

        let mut p = params();
        p.beneficiary = Address([3; 20]);
        assert_ne!(p.sig_hash(), base);

        assert_eq!(params().sig_hash(), base);
    }

    #[test]
    fn test_bincode_and_json_encodings() {
        let cheque = Cheque {
            params: params(),
            signature: vec![7; 65],
        };

        let bytes = bincode::serialize(&cheque).unwrap();
        let decoded: Cheque = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, cheque);

        let json = serde_json::to_string(&cheque).unwrap();
        assert!(json.contains("\"serial\":1"));
        let decoded: Cheque = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, cheque);
    }
}
