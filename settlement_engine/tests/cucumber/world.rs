use cucumber::World;
use log::*;
use settlement_engine::{
    reconciliation_objects::ReconciliationReport,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    SqliteDatabase,
};

use crate::support::fakes::{FakeGateway, RecordingTransport};

#[derive(Default, Debug, World)]
pub struct SettlementWorld {
    pub system: Option<SettlementSystem>,
}

#[derive(Debug)]
pub struct SettlementSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub gateway: FakeGateway,
    pub transport: RecordingTransport,
    pub last_report: Option<ReconciliationReport>,
}

impl SettlementWorld {
    pub fn system(&mut self) -> &mut SettlementSystem {
        self.system.as_mut().expect("Settlement system not initialised")
    }
}

impl SettlementSystem {
    pub async fn new() -> Self {
        let db_path = random_db_path();
        create_database(&db_path).await;
        let db = run_migrations(&db_path).await;
        debug!("🚀️ Created database: {db_path}");
        Self {
            db_path,
            db,
            gateway: FakeGateway::default(),
            transport: RecordingTransport::default(),
            last_report: None,
        }
    }
}
