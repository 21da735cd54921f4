/// Traditional to simplified Chinese normalization.
///
/// Implementations must not panic; `None` means "leave the text alone".
pub trait ScriptConverter: Send + Sync {
    fn to_simplified(&self, text: &str) -> Option<String>;
}

/// Returns the input unchanged. Used when no conversion table is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl ScriptConverter for PassThrough {
    fn to_simplified(&self, text: &str) -> Option<String> {
        Some(text.to_string())
    }
}
