use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

lazy_static! {
    // Ledger
    pub static ref SWAP_BALANCE_UPDATES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "swap_balance_updates_total",
        "Balance updates applied through the ledger, by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref SWAP_DISCONNECT_REJECTIONS_TOTAL: IntCounter = register_int_counter!(
        "swap_disconnect_rejections_total",
        "Balance updates refused because the peer reached the disconnect threshold"
    ).unwrap();

    pub static ref SWAP_TRACKED_PEERS: IntGauge = register_int_gauge!(
        "swap_tracked_peers",
        "Peer balances loaded into the ledger cache this session"
    ).unwrap();

    // Cheques
    pub static ref SWAP_CHEQUES_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        "swap_cheques_sent_total",
        "Cheques issued to peers, by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref SWAP_CHEQUES_RECEIVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "swap_cheques_received_total",
        "Cheques received from peers, by outcome",
        &["outcome"]
    ).unwrap();

    // Store
    pub static ref SWAP_STORE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "swap_store_errors_total",
        "State store failures other than missing keys",
        &["operation"]
    ).unwrap();
}
