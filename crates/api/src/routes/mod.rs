pub mod firmware;
pub mod health;
