pub mod factsheet;
pub mod session;
pub mod slot;
