pub mod analysis;
pub mod blackout;
pub mod evaluate;
pub mod grid;
pub mod sample;
pub mod select;
pub mod slot;
pub mod tariff;
