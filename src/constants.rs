/// Package name.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
/// Settings file name inside the configuration directory.
pub const CONFIG_NAME: &str = "config.toml";
/// Default profile directory name inside the configuration directory.
pub const PROFILES_DIR_NAME: &str = "profiles";
/// Reserved archive entry holding the serialized profile.
pub const MANIFEST_NAME: &str = "profile.json";
/// Profile record version understood by this build.
pub const PROFILE_VERSION: u32 = 1;
/// Settings file version understood by this build.
pub const SETTINGS_VERSION: &str = "1";
/// Prefix of the temporary directory used while restoring.
pub const RESTORE_TEMP_PREFIX: &str = "crb-restore_";
/// Timestamp layout used in archive file names.
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";
/// Environment variable overriding the log filter.
pub const LOG_ENV: &str = "CRB_LOG";
