//! Project archive packing.

use std::fs::File;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::Builder;
use walkdir::WalkDir;

use crate::errors::ArchiveError;

/// Top-level directory name inside every archive. The provisioning bootstrap
/// extracts with `tar -C /opt/` and runs make from /opt/app, so this name is
/// part of the deploy contract.
pub const ARCHIVE_ROOT: &str = "app";

/// File name the archive is written and uploaded under.
pub const ARCHIVE_NAME: &str = "app.tar.gz";

/// Pack `src_dir` into a gzipped tar at `dest`, rooting every entry under
/// [`ARCHIVE_ROOT`]. Entries are appended in sorted path order, so equal
/// inputs produce equal listings. `dest` may live inside `src_dir`; the
/// archive never packs itself.
pub fn pack(src_dir: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = File::create(dest)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);

    for entry in WalkDir::new(src_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.path() == dest {
            continue;
        }
        let rel = entry.path().strip_prefix(src_dir).unwrap_or_else(|_| entry.path());
        let name = Path::new(ARCHIVE_ROOT).join(rel);
        if entry.file_type().is_dir() {
            builder.append_dir(&name, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), &name)?;
        }
    }

    builder.into_inner()?.finish()?;
    Ok(())
}
