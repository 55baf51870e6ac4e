//! # Broadcast Bot
//!
//! A Telegram bot that sends stored messages to a registry of chats, either on
//! an admin's command or on a fixed interval.
//!
//! ## Features
//! - Message templates with optional media and link buttons
//! - Target registry of groups, channels and users
//! - Sequential delivery with a pause between sends and a ledger row per run
//! - Inbox for private messages from non-admin users
//! - Health endpoints for container probes

/// Bot command handlers and message processing
pub mod bot;
/// Configuration loaded from environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Broadcast engine, scheduler, transport and health server
pub mod services;
/// Utility functions for datetime, validation, logging and feedback
pub mod utils;
