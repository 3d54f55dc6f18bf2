use std::io;
use std::path::Path;

/// Build the listing body for `dir`: one entry per line, directories marked
/// with a trailing `/`, dot-prefixed entries left out. Symlinks are not
/// followed when classifying entries.
pub async fn build_listing(dir: &Path) -> io::Result<Vec<u8>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let is_dir = entry.file_type().await?.is_dir();
        entries.push((name, is_dir));
    }

    entries.sort();

    let mut listing = Vec::new();
    for (name, is_dir) in entries {
        listing.extend_from_slice(name.as_bytes());
        if is_dir {
            listing.push(b'/');
        }
        listing.push(b'\n');
    }
    Ok(listing)
}
