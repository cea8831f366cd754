pub mod entity;
pub mod port;
pub mod rules;
pub mod service;
