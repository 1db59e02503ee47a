pub mod chat;
pub mod checkin;
pub mod log;
pub mod memory;
pub mod persona;
pub mod runtime;
