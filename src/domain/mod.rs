pub mod commands;
pub mod errors;
pub mod loan;
pub mod reminder;
pub mod value_objects;

pub use errors::*;
pub use value_objects::*;
