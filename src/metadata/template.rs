use super::model::AudioMeta;

/// Substitute `%artist%`, `%album%`, `%title%`, `%year%` and `%track%`.
/// Empty fields substitute as empty text; other `%...%` tokens are kept.
pub fn format(template: &str, meta: &AudioMeta) -> String {
    meta.fields()
        .iter()
        .fold(template.to_string(), |out, (key, value)| {
            out.replace(&format!("%{key}%"), value)
        })
}
