//! SeaORM entity definitions for the gmonitor database schema.

pub mod commit;
pub mod prelude;
pub mod repository;
