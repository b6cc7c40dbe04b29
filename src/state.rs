use std::sync::Arc;

use crate::database::pool::Db;
use crate::geo::Geocoder;
use crate::stats::Recalculator;

/// Shared application state: the explicit database handle plus the two
/// services built on top of it.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub stats: Arc<Recalculator>,
    pub geocoder: Arc<Geocoder>,
}

impl AppState {
    pub fn new(db: Db) -> Self {
        Self {
            stats: Arc::new(Recalculator::new(db.clone())),
            geocoder: Arc::new(Geocoder::new()),
            db,
        }
    }
}
