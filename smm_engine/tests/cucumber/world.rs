use cucumber::World;
use log::*;
use smm_engine::{
    db_types::{OrderStatusReport, Redemption},
    events::EventProducers,
    traits::PromoError,
    LedgerApi,
    OrderReconcilerApi,
    PromoApi,
    PurchaseApi,
    Quote,
    SqliteDatabase,
};

use crate::support::prepare_env::{prepare_test_env, random_db_path};

#[derive(Default, Debug, World)]
pub struct StoreWorld {
    pub system: Option<StoreSystem>,
    pub markup_percent: f64,
    pub pending_reports: Vec<OrderStatusReport>,
    pub last_quote: Option<Quote>,
    pub last_redemption: Option<Result<Redemption, PromoError>>,
}

#[derive(Debug)]
pub struct StoreSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
}

impl StoreWorld {
    pub fn db(&self) -> &SqliteDatabase {
        &self.system.as_ref().expect("Store not initialised").db
    }

    pub fn ledger(&self) -> LedgerApi<SqliteDatabase> {
        LedgerApi::new(self.db().clone())
    }

    pub fn promos(&self) -> PromoApi<SqliteDatabase> {
        PromoApi::new(self.db().clone(), EventProducers::default())
    }

    pub fn reconciler(&self) -> OrderReconcilerApi<SqliteDatabase> {
        OrderReconcilerApi::new(self.db().clone(), EventProducers::default())
    }

    pub fn purchases(&self) -> PurchaseApi<SqliteDatabase> {
        PurchaseApi::new(self.db().clone(), self.markup_percent)
    }
}

impl StoreSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {url}");
        Self { db_path: url, db }
    }
}
