// Logging setup for the host application.

//System:

//<Android>>>: android_logger, messages go to logcat under the "social_share" tag.

//<iOS, macOS, Linux, Windows>>>: env_logger to stderr, RUST_LOG still overrides per module.

// Level defaults to Warn when None is passed. Calling start twice is harmless.

pub struct Logger;

impl Logger {
    pub fn start(level: Option<log::Level>) {
        let level = level.unwrap_or(log::Level::Warn);
        #[cfg(target_os = "android")]
        {
            android_logger::init_once(
                android_logger::Config::default()
                    .with_max_level(level.to_level_filter())
                    .with_tag("social_share"),
            );
        }

        #[cfg(not(target_os = "android"))]
        {
            let _ = env_logger::builder()
                .filter_level(level.to_level_filter())
                .parse_default_env()
                .try_init();
        }
    }
}
