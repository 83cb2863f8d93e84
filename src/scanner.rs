//! Audio file discovery
//!
//! Enumerates the input directory for audio files by extension match only;
//! no content sniffing. Results come back in sorted order so batch runs are
//! deterministic. A missing input directory is created and yields an empty
//! list, which the caller treats as "nothing to process" (exit 0).

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Extensions the batch accepts, lowercase without the dot
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a"];

/// Audio file scanner
pub struct AudioScanner {
    recursive: bool,
}

impl AudioScanner {
    /// Scanner over the top level of the input directory only, matching the
    /// original batch workflow.
    pub fn new() -> Self {
        Self { recursive: false }
    }

    /// Scanner that also descends into subdirectories.
    pub fn recursive() -> Self {
        Self { recursive: true }
    }

    /// Enumerate audio files under `dir`, creating the directory if absent.
    pub fn scan(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            info!(dir = %dir.display(), "Input directory created");
            return Ok(Vec::new());
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(false)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| {
                // The root itself is always visited, whatever its name
                e.depth() == 0 || !is_hidden(e.file_name().to_string_lossy().as_ref())
            })
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    let path = entry.into_path();
                    if has_audio_extension(&path) {
                        Some(path)
                    } else {
                        None
                    }
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    None
                }
            })
            .collect();

        files.sort();
        debug!(dir = %dir.display(), count = files.len(), "Scan complete");
        Ok(files)
    }
}

impl Default for AudioScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name.len() > 1
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let lower = ext.to_lowercase();
            AUDIO_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn matches_supported_extensions_case_insensitively() {
        assert!(has_audio_extension(Path::new("song.mp3")));
        assert!(has_audio_extension(Path::new("song.FLAC")));
        assert!(has_audio_extension(Path::new("song.M4a")));
        assert!(!has_audio_extension(Path::new("song.txt")));
        assert!(!has_audio_extension(Path::new("song")));
    }

    #[test]
    fn scan_returns_sorted_audio_files_only() {
        let dir = tempdir().unwrap();
        for name in ["b.mp3", "a.wav", "notes.txt", "c.ogg"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = AudioScanner::new().scan(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.wav", "b.mp3", "c.ogg"]);
    }

    #[test]
    fn missing_directory_is_created_and_empty() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("incoming");
        assert!(!target.exists());

        let files = AudioScanner::new().scan(&target).unwrap();
        assert!(files.is_empty());
        assert!(target.is_dir());
    }

    #[test]
    fn top_level_scan_skips_subdirectories() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("top.mp3"), b"x").unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("nested.mp3"), b"x").unwrap();

        let flat = AudioScanner::new().scan(dir.path()).unwrap();
        assert_eq!(flat.len(), 1);

        let deep = AudioScanner::recursive().scan(dir.path()).unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn hidden_files_are_ignored() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".hidden.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("visible.mp3"), b"x").unwrap();

        let files = AudioScanner::new().scan(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("visible.mp3"));
    }
}
