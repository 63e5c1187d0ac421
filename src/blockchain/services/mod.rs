// src/blockchain/services/mod.rs

pub mod history;
pub mod polls;
pub mod transactions;
