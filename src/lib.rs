//! Hybrid board-game recommendation service.
//!
//! Blends three scoring signals - collaborative filtering over item
//! embeddings, TF-IDF content similarity, and a free-text LLM signal - into
//! one ranked list, under hard user constraints.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
