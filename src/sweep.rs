// Bulk room cleanup: fetch the room list, filter it down to deletable
// rooms, confirm with the operator, then delete one room at a time.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::{AdminClient, Room};
use crate::ui;

/// File listing room aliases the sweep must never touch, one per line.
pub const PROTECTED_FILE: &str = ".synadmin_protected";

#[derive(Debug, Default, Clone)]
pub struct SweepOptions {
    /// Also require the room to have no canonical alias.
    pub unaliased_only: bool,
    /// Route deletions through the older purge endpoint.
    pub purge: bool,
    /// Show the candidates and stop without deleting.
    pub dry_run: bool,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
}

/// Location of the protected-rooms file in the operator's home directory.
pub fn protected_rooms_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(PROTECTED_FILE)
}

/// Load the protected alias list. A missing file means nothing is
/// protected; blank lines are skipped.
pub fn load_protected(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read protected rooms from {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Pick the rooms eligible for deletion: no joined local members, and no
/// canonical alias when `unaliased_only` is set. Hitting a protected
/// alias aborts the whole sweep before anything is deleted.
pub fn plan_sweep(
    rooms: &[Room],
    protected: &HashSet<String>,
    unaliased_only: bool,
) -> Result<Vec<Room>> {
    let mut candidates = Vec::new();
    for room in rooms {
        // Only rooms with zero local members can be destroyed
        if room.joined_local_members != 0 {
            continue;
        }
        let alias = room.canonical_alias.as_deref().map(str::trim).unwrap_or("");
        if unaliased_only && !alias.is_empty() {
            continue;
        }
        if protected.contains(alias) {
            bail!(
                "protected room {} ({}) matched the sweep filter, aborting as failsafe",
                alias,
                room.room_id
            );
        }
        candidates.push(room.clone());
    }
    Ok(candidates)
}

/// Run the cleanup end to end. Individual delete failures are logged and
/// skipped; the sweep keeps going.
pub fn run_sweep(api: &AdminClient, opts: &SweepOptions) -> Result<()> {
    let listing = api.list_rooms()?;
    let protected = load_protected(&protected_rooms_path())?;
    tracing::debug!(
        "{} rooms listed, {} protected aliases",
        listing.rooms.len(),
        protected.len()
    );

    let candidates = plan_sweep(&listing.rooms, &protected, opts.unaliased_only)?;
    if candidates.is_empty() {
        println!("no rooms eligible for deletion");
        return Ok(());
    }

    println!("{} rooms to delete", candidates.len());
    for room in &candidates {
        println!(
            "\t{} : {}",
            room.name.as_deref().unwrap_or("<unnamed>"),
            room.room_id
        );
    }
    if opts.dry_run {
        return Ok(());
    }
    if !opts.assume_yes && !ui::confirm_sweep(candidates.len())? {
        println!("aborted");
        return Ok(());
    }

    let pb = ProgressBar::new(candidates.len() as u64);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}").unwrap());

    let mut deleted = 0usize;
    for room in &candidates {
        pb.set_message(room.room_id.clone());
        let outcome = if opts.purge {
            api.purge_room(&room.room_id)
        } else {
            api.delete_room(&room.room_id)
        };
        match outcome {
            Ok(_) => deleted += 1,
            Err(err) => tracing::warn!("failed to delete {}: {err:#}", room.room_id),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!("deleted {} rooms", deleted);
    Ok(())
}
