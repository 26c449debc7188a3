// Knobs for the external memory capture
#[derive(Clone, Debug)]
pub struct CaptureSettings {
    // Nanoseconds to wait on the staging fence before warning about a slow capture
    // The wait keeps going after the warning
    pub fence_warn_timeout: u64,

    // Log every captured region at debug level
    pub log_regions: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        // Debug builds are chattier about what gets captured
        #[cfg(debug_assertions)]
        let settings = Self {
            fence_warn_timeout: 1_000_000_000,
            log_regions: true,
        };

        #[cfg(not(debug_assertions))]
        let settings = Self {
            fence_warn_timeout: u64::MAX,
            log_regions: false,
        };

        settings
    }
}
