/// File extensions accepted by [`audio_predicate`].
pub const AUDIO_EXTENSIONS: [&str; 3] = [".wav", ".mp3", ".aac"];

/// Reports whether `path` names a supported audio file, by case-insensitive
/// suffix.
pub fn audio_predicate(path: &str) -> bool {
    let lower = path.to_lowercase();
    AUDIO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
