//! Command line constants
//!
//! Single source of truth for file names, environment variables and
//! defaults used by the host.

/// Environment variables
pub mod env {
    /// Path of the configuration file, used when `--config` is not given
    pub const CONFIG: &str = "RADIATION_RECIPE_CONFIG";
}

/// Configuration file location
pub mod paths {
    /// Directory under the user config dir
    pub const CONFIG_DIR: &str = "radiation-recipe";
    /// Configuration file name
    pub const CONFIG_FILE: &str = "config.json";
}

/// Logging filters by verbosity
pub mod logging {
    pub const DEFAULT_FILTER: &str = "info";
    pub const VERBOSE_FILTER: &str = "debug";
    pub const TRACE_FILTER: &str = "trace";
}
