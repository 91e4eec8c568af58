pub mod channels;
pub mod config;
pub mod discord;
pub mod main_module;
pub mod shared;
pub mod tickets;
