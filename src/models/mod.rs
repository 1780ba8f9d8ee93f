pub mod milp;
pub mod siting;
pub mod utils;
