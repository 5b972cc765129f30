pub mod chat;
pub mod dispatch;
pub mod lifecycle;
pub mod notify;
pub mod promotion;
