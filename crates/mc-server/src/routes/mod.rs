pub mod activity;
pub mod config;
pub mod docs;
pub mod events;
pub mod tasks;
