//! File-handling utilities for the needs of the commands.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the absolute path, preferably the canonical one.
pub fn absolute_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

/// Normalizes the path lexically, resolving `.` and `..` components
/// without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            component => result.push(component),
        }
    }

    result
}

/// Copies the source into the target directory, creating the target when
/// missing.
///
/// If the source is a file, it is copied into the target keeping its name.
/// If the source is a directory, its content is copied into the target.
pub fn copy_to(target: &Path, source: &Path) -> Result<()> {
    if source.is_dir() {
        copy_directory_content(source, target)
    } else if source.exists() {
        fs::create_dir_all(target)?;
        let name = source.file_name().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "source has no file name")
        })?;
        fs::copy(source, target.join(name))?;
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no such file: {}", source.display()),
        )
        .into())
    }
}

fn copy_directory_content(source: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(target)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let destination = target.join(entry.file_name());

        if path.is_dir() {
            copy_directory_content(&path, &destination)?;
        } else {
            fs::copy(&path, &destination)?;
        }
    }

    Ok(())
}

/// Deletes the path and its subtree.
pub fn delete(target: &Path) -> Result<()> {
    if delete_filtered(target, &|_| true)? {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("could not delete: {}", target.display())).into())
    }
}

/// Deletes the path and its subtree, keeping entries refused by the filter.
///
/// Returns `true` if the path exists no more, `false` when the filter chose
/// some entries to survive. Directories that keep a surviving entry are
/// kept themselves.
pub fn delete_filtered(target: &Path, filter: &dyn Fn(&Path) -> bool) -> Result<bool> {
    if !target.exists() {
        return Ok(true);
    }

    if target.is_dir() {
        let mut survivors = false;
        for entry in fs::read_dir(target)? {
            let entry = entry?;
            if !delete_filtered(&entry.path(), filter)? {
                survivors = true;
            }
        }

        if survivors {
            return Ok(false);
        }

        fs::remove_dir(target)?;
        return Ok(true);
    }

    if !filter(target) {
        return Ok(false);
    }

    fs::remove_file(target)?;
    Ok(true)
}
