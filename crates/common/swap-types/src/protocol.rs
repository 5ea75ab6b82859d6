use crate::cheque::Cheque;
use serde::{Deserialize, Serialize};

/// Message carrying a freshly issued cheque to its beneficiary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitChequeMsg {
    pub cheque: Cheque,
}
