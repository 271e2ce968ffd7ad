//! config-rs/lib.rs
//! Shared environment helpers for locating the agricultural backend.
//! Resolves the local-network endpoint and boolean switches so every
//! member of the workspace reads the environment the same way.

use std::env;

/// Default port of a locally hosted backend
pub const DEFAULT_LOCAL_PORT: u16 = 5000;

/// Default host of a locally hosted backend
pub const DEFAULT_LOCAL_HOST: &str = "localhost";

/// Path prefix the backend mounts its API under
pub const API_PREFIX: &str = "/api";

/// Load a `.env` file from the working directory or its parents, if any.
///
/// Variables already present in the process environment win.
pub fn load_env_file() {
    match dotenv::dotenv() {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => log::debug!("No .env file found"),
        Err(e) => log::warn!("Failed to load .env file: {}", e),
    }
}

/// Get a port from environment variables with proper fallback
///
/// # Arguments
/// * `prefix` - The variable prefix (e.g., "AGRI_LOCAL_API")
/// * `default_port` - The port to use if the variable is missing or invalid
///
/// # Returns
/// The port number read from `<PREFIX>_PORT`, or the default
pub fn get_port(prefix: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_PORT", prefix.to_uppercase());
    match env::var(&var_name) {
        Ok(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
            log::warn!("Invalid port in {}, using default {}", var_name, default_port);
            default_port
        }),
        Err(_) => default_port,
    }
}

/// Build a base URL for a backend reachable on the local network
///
/// Resolution order:
/// 1. `<PREFIX>_ADDR` as a full URL (`http://192.168.1.5:5000/api`), or a bare
///    `host:port` which is given the `http://` scheme and the API prefix
/// 2. `<PREFIX>_HOST` and `<PREFIX>_PORT`
/// 3. `http://localhost:5000/api`
pub fn get_local_api_url(prefix: &str) -> String {
    let addr_var = format!("{}_ADDR", prefix.to_uppercase());
    let host_var = format!("{}_HOST", prefix.to_uppercase());

    if let Ok(addr) = env::var(&addr_var) {
        let addr = addr.trim().trim_end_matches('/');
        if addr.starts_with("http://") || addr.starts_with("https://") {
            return addr.to_string();
        }
        if !addr.is_empty() {
            return format!("http://{}{}", addr, API_PREFIX);
        }
        log::warn!("Empty address in {}, falling back to host/port", addr_var);
    }

    let host = env::var(&host_var)
        .ok()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DEFAULT_LOCAL_HOST.to_string());
    let port = get_port(prefix, DEFAULT_LOCAL_PORT);

    format!("http://{}:{}{}", host, port, API_PREFIX)
}

/// Whether a flag variable is set to a truthy value
pub fn get_flag(var_name: &str) -> bool {
    env::var(var_name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
