pub mod complete_status;
pub mod map;
pub mod merge;
pub mod subscribe_on;
pub mod zip;
