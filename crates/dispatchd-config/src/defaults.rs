use camino::Utf8PathBuf;

/// Interface bound by default; the server only accepts local connections.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port bound by default.
pub const DEFAULT_PORT: u16 = 8080;

/// Default destination for per-request captured output.
pub const DEFAULT_LOG_PATH: &str = "/tmp/dispatchd-output.log";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Bare environment variable that forces foreground execution when present,
/// whatever its value. Kept apart from the `DISPATCHD_` namespace so it never
/// shadows the parsed `foreground` setting.
pub const FOREGROUND_ENV_VAR: &str = "FOREGROUND";

/// Owned default host, for serde and `ortho_config` defaults.
#[must_use]
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default captured-output log path.
#[must_use]
pub fn default_log_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_LOG_PATH)
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}
