pub mod code;
pub mod entity;
pub mod error;
pub mod port;
