pub mod api;
pub mod app;
pub mod auth;
pub mod background_tasks;
pub mod cli;
pub mod config;
pub mod error;
pub mod event_handler;
pub mod events;
pub mod gallery;
pub mod lightbox;
pub mod logging;
pub mod media;
pub mod state;
pub mod terminal;
pub mod ui;
pub mod upload;
