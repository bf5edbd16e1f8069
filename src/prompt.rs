use crate::env::Environment;
use std::fs;

const HOSTNAME_FILES: [&str; 2] = ["/proc/sys/kernel/hostname", "/etc/hostname"];

/// Login name of the session user, `?` when unknown.
pub fn user(env: &Environment) -> String {
    env.get_var("USER")
        .or_else(|| env.get_var("LOGNAME"))
        .filter(|u| !u.is_empty())
        .unwrap_or("?")
        .to_string()
}

/// Short host name (up to the first dot).
pub fn host(env: &Environment) -> String {
    let from_system = HOSTNAME_FILES
        .iter()
        .find_map(|file| fs::read_to_string(file).ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let name = from_system
        .or_else(|| env.get_var("HOSTNAME").map(str::to_string))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string());
    short_host(&name).to_string()
}

fn short_host(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Render `[user@host cwd]$ ` with the home directory shown as `~`.
pub fn render(env: &Environment) -> String {
    format!("[{}@{} {}]$ ", user(env), host(env), env.unexpanded_cwd())
}
