use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    pub static ref SWAP_DEPLOY_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "swap_deploy_attempts_total",
        "Settlement contract deployment attempts by outcome",
        &["outcome"]
    )
    .unwrap();
}
