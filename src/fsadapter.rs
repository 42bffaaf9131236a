//! Filesystem adapter (spec §6.3). Unlike the clipboard, these are thin,
//! fully-implemented wrappers over `std::fs` -- the "external collaborator"
//! framing in spec §1 is about keeping a named seam between the protocol
//! methods and raw I/O, not about deferring the implementation.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

pub fn open_file(path: &Path) -> io::Result<File> {
    File::open(path)
}

pub fn create_file(path: &Path) -> io::Result<File> {
    File::create(path)
}

pub fn stat(path: &Path) -> io::Result<fs::Metadata> {
    fs::metadata(path)
}

pub fn is_directory(path: &Path) -> bool {
    path.is_dir()
}

pub fn list_dir(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        entries.push(entry?.path());
    }
    Ok(entries)
}

pub fn mkdirs(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

pub fn rename(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

pub fn remove_file(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

pub fn remove_directory(path: &Path) -> io::Result<()> {
    fs::remove_dir_all(path)
}

pub fn getcwd() -> io::Result<PathBuf> {
    std::env::current_dir()
}
