use std::path::PathBuf;

pub const MIN_POST_LENGTH: usize = 10;
pub const MAX_POST_LENGTH: usize = 300;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 30;
pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 30;
pub const MIN_HANDLE_LENGTH: usize = 2;
pub const MAX_HANDLE_LENGTH: usize = 40;

pub fn server_port() -> u16 {
    std::env::var("DEVLINK_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(5000)
}

pub fn jwt_secret() -> String {
    std::env::var("DEVLINK_SECRET").unwrap_or_else(|_| "secret".to_string())
}

pub fn token_ttl_seconds() -> i64 {
    std::env::var("DEVLINK_TOKEN_TTL_SECONDS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(3600)
}

/// Snapshot file for the document store. Unset means memory only.
pub fn db_path() -> Option<PathBuf> {
    std::env::var("DEVLINK_DB_PATH").ok().map(PathBuf::from)
}

pub fn seed_demo() -> bool {
    std::env::var("DEVLINK_SEED")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
}
