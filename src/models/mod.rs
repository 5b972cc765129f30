pub mod chat;
pub mod driver;
pub mod order;
pub mod scheduled;
