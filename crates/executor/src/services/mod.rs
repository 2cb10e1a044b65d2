pub mod broadcast_service;
pub mod messages;
pub mod signal_desk;
pub mod telegram_service;
