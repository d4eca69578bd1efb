pub mod inventory_record;
pub mod location;
pub mod product;
pub mod stock_movement;
