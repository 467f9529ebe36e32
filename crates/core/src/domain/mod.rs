pub mod catalog;
pub mod discount;
pub mod tax;
