use cucumber::given;

use crate::cucumber::{SettlementSystem, SettlementWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut SettlementWorld) {
    let system = SettlementSystem::new().await;
    world.system = Some(system);
}
