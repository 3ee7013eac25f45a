//! List command implementation.

use super::{format_millis, open, NoRemote};
use offsync_storage::{UserFilter, UserRecord};
use offsync_sync_engine::SyncConfig;
use std::path::Path;

/// Runs the list command.
pub fn run(path: &Path, filter: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = parse_filter(filter)?;
    let coordinator = open(path, SyncConfig::default(), NoRemote)?;
    let users = coordinator.users_matching(filter)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&users)?);
        }
        _ => {
            for user in &users {
                println!("{}", format_user(user));
            }
            println!("{} users", users.len());
        }
    }

    Ok(())
}

/// Parses a filter name.
pub fn parse_filter(name: &str) -> Result<UserFilter, String> {
    match name {
        "all" => Ok(UserFilter::All),
        "online" => Ok(UserFilter::Online),
        "cached" => Ok(UserFilter::Cached),
        other => Err(format!("unknown filter: {other}")),
    }
}

fn format_user(user: &UserRecord) -> String {
    let provenance = match (user.is_online, user.is_cached) {
        (true, _) => "online",
        (false, true) => "cached",
        (false, false) => "local",
    };
    let synced = user
        .last_sync_time
        .map(|at| format_millis(at.as_millis()))
        .unwrap_or_else(|| "never".to_string());
    format!(
        "[{:>3}] {:<20} {:<24} {:<7} synced {}",
        user.id.as_u64(),
        user.name,
        user.email,
        provenance,
        synced
    )
}
