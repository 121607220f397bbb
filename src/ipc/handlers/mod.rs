pub mod attendance;
pub mod backup;
pub mod core;
pub mod students;
pub mod views;
