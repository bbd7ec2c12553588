// src/lib.rs

pub mod error;
pub mod clock;
pub mod config;
pub mod storage;
pub mod snapshot;
pub mod logsink;
pub mod events;
pub mod record;
pub mod service;
pub mod app_state;
