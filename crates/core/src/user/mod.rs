pub mod entity;
pub mod port;
pub mod registration;
pub mod verification;
