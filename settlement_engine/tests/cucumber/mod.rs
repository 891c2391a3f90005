mod setups;
mod world;

pub use world::{SettlementSystem, SettlementWorld};
