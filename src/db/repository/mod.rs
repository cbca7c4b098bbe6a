pub mod checkin;
pub mod medication;
pub mod plan;
pub mod supervision;
pub mod user;
