use crate::{Song, SongError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes `song` as pretty-printed JSON with a trailing newline.
pub fn save_song(path: &Path, song: &Song) -> Result<(), SongError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, song)?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}

/// Writes `song` as MessagePack with named fields, readable by
/// [`crate::load_song`].
pub fn save_song_binary(path: &Path, song: &Song) -> Result<(), SongError> {
    let bytes = rmp_serde::to_vec_named(song)?;
    std::fs::write(path, bytes)?;

    Ok(())
}
