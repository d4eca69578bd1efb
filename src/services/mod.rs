pub mod inventory_store;
pub mod locations;
pub mod movement_ledger;
pub mod stock;
