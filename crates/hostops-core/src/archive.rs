use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use zip::ZipArchive;

use crate::errors::HostError;

fn archive_error(path: &Path, message: impl ToString) -> HostError {
    HostError::Archive {
        archive: path.display().to_string(),
        message: message.to_string(),
    }
}

/// Unpack `archive` into `dest`, overwriting files that already exist there.
/// Returns the number of files written.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<u64, HostError> {
    let file = fs::File::open(archive)
        .map_err(|err| HostError::io(format!("opening {}", archive.display()), err))?;
    let mut zip = ZipArchive::new(file).map_err(|err| archive_error(archive, err))?;

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|err| archive_error(archive, format!("entry #{index}: {err}")))?;
        let Some(rel_path) = entry.enclosed_name() else {
            warn!("skipping unsafe archive path {}", entry.name());
            continue;
        };
        let target = dest.join(rel_path);

        if entry.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|err| HostError::io(format!("creating {}", target.display()), err))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| HostError::io(format!("creating {}", parent.display()), err))?;
        }
        let mut out = fs::File::create(&target)
            .map_err(|err| HostError::io(format!("writing {}", target.display()), err))?;
        io::copy(&mut entry, &mut out)
            .map_err(|err| HostError::io(format!("extracting {}", target.display()), err))?;
        written += 1;
    }
    Ok(written)
}

/// Extract archives in order into one directory. Later archives win on collisions.
pub fn extract_chain(archives: &[PathBuf], dest: &Path) -> Result<u64, HostError> {
    fs::create_dir_all(dest)
        .map_err(|err| HostError::io(format!("creating {}", dest.display()), err))?;
    let mut written = 0;
    for archive in archives {
        info!("extracting {}", archive.display());
        written += extract_archive(archive, dest)?;
    }
    Ok(written)
}
