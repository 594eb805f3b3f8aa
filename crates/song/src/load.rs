use crate::{Song, SongError, migrate, needs_migration, save_song};
use std::fs;
use std::path::{Path, PathBuf};

/// File in a songs directory that describes the format rather than a song.
const SCHEMA_FILE_NAME: &str = "song.schema.json";

fn looks_like_json(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{')
}

fn read_song_data(path: &Path) -> Result<Song, SongError> {
    let bytes = fs::read(path)?;

    // Try JSON first, fall back to MessagePack
    serde_json::from_slice(&bytes).or_else(|json_err| {
        if looks_like_json(&bytes) {
            return Err(SongError::from(json_err));
        }
        rmp_serde::from_slice(&bytes).map_err(SongError::from)
    })
}

/// Brings a freshly decoded song into playable shape: rejects songs that
/// cannot play at all, converts legacy events and logs what playback will
/// skip.
fn prepare(song: Song) -> Result<Song, SongError> {
    song.check_preconditions()?;

    let song = if needs_migration(&song) {
        tracing::info!(title = song.display_title(), "migrating legacy pattern events");
        migrate(&song)
    } else {
        song
    };

    for issue in song.validate() {
        tracing::warn!(title = song.display_title(), "{issue}");
    }
    Ok(song)
}

/// Loads a song file in JSON or MessagePack form.
pub fn load_song(path: &Path) -> Result<Song, SongError> {
    let song = prepare(read_song_data(path)?)?;
    tracing::info!(
        path = %path.display(),
        title = song.display_title(),
        patterns = song.patterns.len(),
        "loaded song"
    );
    Ok(song)
}

pub fn parse_song(json: &str) -> Result<Song, SongError> {
    prepare(serde_json::from_str(json)?)
}

/// Rewrites `input` in the current event format as pretty JSON at `output`.
/// Both may be the same path.
pub fn migrate_song_file(input: &Path, output: &Path) -> Result<(), SongError> {
    let song = read_song_data(input)?;
    save_song(output, &migrate(&song))
}

/// Migrates every `*.json` song in `dir` in place and returns the migrated
/// paths in name order.
pub fn migrate_songs_dir(dir: &Path) -> Result<Vec<PathBuf>, SongError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let is_schema = path.file_name().is_some_and(|name| name == SCHEMA_FILE_NAME);
        if path.is_file() && is_json && !is_schema {
            files.push(path);
        }
    }
    files.sort();

    for path in &files {
        tracing::info!(path = %path.display(), "migrating");
        migrate_song_file(path, path).map_err(|source| SongError::Migrate {
            path: path.clone(),
            source: Box::new(source),
        })?;
    }
    Ok(files)
}
