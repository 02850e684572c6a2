mod config;
mod error;
mod fs;
mod lock;
mod manifest;
mod scan;
mod validate;

pub use crate::{
    config::LockerConfig,
    error::{LockerError, Mismatch},
    fs::{FileSystem, MemoryFs, OsFs},
    lock::{lock, unlock},
    manifest::{LockMarker, Manifest},
    scan::{get_all_dependencies, Dependency, ResolutionType},
    validate::validate,
};

use std::path::Path;

fn print_dependency(dep: &Dependency) {
    println!(
        "  {} ({}): {}",
        dep.dir_name,
        dep.release.as_deref().unwrap_or("undefined"),
        dep.commit.as_deref().unwrap_or("undefined")
    );
}

/// Locks the `bower.json` in `root` to what is installed in its components directory.
pub fn lock_project<P: AsRef<Path>>(root: P, verbose: bool) -> anyhow::Result<()> {
    if verbose {
        println!("Start locking ...");
    }

    let config = LockerConfig::discover(&OsFs, root)?;
    let dependencies = lock(&OsFs, &config)?;

    if verbose {
        dependencies.iter().for_each(print_dependency);
    }
    println!("Locking completed.");

    Ok(())
}

pub fn unlock_project<P: AsRef<Path>>(root: P) -> anyhow::Result<()> {
    let config = LockerConfig::discover(&OsFs, root)?;
    unlock(&OsFs, &config)?;

    println!("Unlocking completed.");

    Ok(())
}

pub fn validate_project<P: AsRef<Path>>(root: P, verbose: bool) -> anyhow::Result<()> {
    if verbose {
        println!("Start validating ...");
    }

    let config = LockerConfig::discover(&OsFs, root)?;
    let dependencies = validate(&OsFs, &config)?;

    if verbose {
        dependencies.iter().for_each(print_dependency);
    }
    println!("Validation completed, bower.json matches the installed dependencies.");

    Ok(())
}
