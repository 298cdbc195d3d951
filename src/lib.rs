// src/lib.rs

//! NewsTracker Library

pub mod collectors;
pub mod dedup;
pub mod error;
pub mod models;
pub mod notifiers;
pub mod pipeline;
pub mod processors;
pub mod storage;
pub mod utils;
