use reshelf::config::Settings;

/// Load settings, falling back to defaults. The reason for a fallback is
/// returned so it can be logged once logging is up.
pub fn load_settings() -> (Settings, Option<String>) {
    match Settings::load() {
        Ok(s) => match s.validate() {
            Ok(()) => (s, None),
            Err(e) => (Settings::default(), Some(format!("invalid config: {e}"))),
        },
        // Config is optional; failures should not prevent a run.
        Err(e) => (Settings::default(), Some(e.to_string())),
    }
}
