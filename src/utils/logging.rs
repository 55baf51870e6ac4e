use tracing::{debug, error, info, warn};

/// Logs command start with consistent format
pub fn log_command_start(command: &str, user: &str, user_id: i64, chat_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!("CMD_START: {} by {}({}) in chat {} - {}", command, user, user_id, chat_id, d),
        None => info!("CMD_START: {} by {}({}) in chat {}", command, user, user_id, chat_id),
    }
}

/// Logs command completion with consistent format
pub fn log_command_success(command: &str, user: &str, user_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!("CMD_SUCCESS: {} by {}({}) - {}", command, user, user_id, d),
        None => info!("CMD_SUCCESS: {} by {}({})", command, user, user_id),
    }
}

/// Logs command errors with consistent format
pub fn log_command_error(command: &str, user: &str, user_id: i64, error: &str) {
    error!("CMD_ERROR: {} by {}({}) - {}", command, user, user_id, error);
}

/// Logs a command refused because the sender is not an administrator
pub fn log_unauthorized(command: &str, user: &str, user_id: i64) {
    warn!("UNAUTHORIZED: {} attempted by {}({})", command, user, user_id);
}

pub fn log_database_operation(operation: &str, table: &str, details: Option<&str>) {
    match details {
        Some(d) => debug!("DB_OP: {} on {} - {}", operation, table, d),
        None => debug!("DB_OP: {} on {}", operation, table),
    }
}

pub fn log_database_error(operation: &str, table: &str, error: &str) {
    error!("DB_ERROR: {} on {} failed: {}", operation, table, error);
}

pub fn log_broadcast_start(message_id: i64, targets: usize, triggered_by: &str) {
    info!(
        "BROADCAST_START: message {} to {} targets, triggered by {}",
        message_id, targets, triggered_by
    );
}

pub fn log_delivery_failure(message_id: i64, chat_id: i64, reason: &str) {
    warn!(
        "BROADCAST_DELIVERY_FAILED: message {} to chat {} - {}",
        message_id, chat_id, reason
    );
}

pub fn log_broadcast_done(message_id: i64, total: usize, succeeded: usize, failed: usize) {
    info!(
        "BROADCAST_DONE: message {} - {} attempted, {} succeeded, {} failed",
        message_id, total, succeeded, failed
    );
}

/// Logs system events with consistent format
pub fn log_system_event(event: &str, details: Option<&str>) {
    match details {
        Some(d) => info!("SYSTEM: {} - {}", event, d),
        None => info!("SYSTEM: {}", event),
    }
}
