//! Outbound channels implementing [`tic_core::notify::port::Notifier`].

pub mod email;
pub mod fanout;
pub mod log;
pub mod telegram;

pub use email::EmailNotifier;
pub use fanout::FanoutNotifier;
pub use log::LogNotifier;
pub use telegram::TelegramNotifier;
