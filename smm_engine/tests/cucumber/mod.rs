mod setup;
mod steps;
pub mod world;

pub use world::StoreWorld;
