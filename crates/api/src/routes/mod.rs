pub mod couriers;
pub mod health;
pub mod metrics;
pub mod orders;
