#[cfg(test)]
mod tests {
    use anyhow::Result;
    use std::collections::HashSet;
    use std::io::Write;
    use std::path::Path;
    use synadmin_cli::api::Room;
    use synadmin_cli::sweep::{load_protected, plan_sweep};
    use tempfile::NamedTempFile;

    // Helper to build a room record for the sweep
    fn room(room_id: &str, alias: Option<&str>, members: i64) -> Room {
        Room {
            room_id: room_id.to_string(),
            name: Some(format!("room {room_id}")),
            canonical_alias: alias.map(str::to_string),
            creator: Some("@admin:matrix.example.org".to_string()),
            encryption: None,
            joined_local_members: members,
        }
    }

    fn protected(aliases: &[&str]) -> HashSet<String> {
        aliases.iter().map(|a| a.to_string()).collect()
    }

    // Only rooms with zero joined local members are candidates
    #[test]
    fn sweep_selects_only_empty_rooms() -> Result<()> {
        let rooms = vec![
            room("!empty:x", None, 0),
            room("!busy:x", None, 3),
            room("!single:x", None, 1),
        ];

        let plan = plan_sweep(&rooms, &HashSet::new(), false)?;

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].room_id, "!empty:x");
        Ok(())
    }

    // An aliased empty room is still a candidate in the default mode
    #[test]
    fn sweep_keeps_aliased_empty_rooms_by_default() -> Result<()> {
        let rooms = vec![
            room("!a:x", Some("#stale:x"), 0),
            room("!b:x", None, 0),
        ];

        let plan = plan_sweep(&rooms, &HashSet::new(), false)?;

        assert_eq!(plan.len(), 2);
        Ok(())
    }

    // The unaliased mode drops empty rooms that still carry an alias
    #[test]
    fn sweep_unaliased_mode_filters_aliased_rooms() -> Result<()> {
        let rooms = vec![
            room("!a:x", Some("#stale:x"), 0),
            room("!b:x", None, 0),
            room("!c:x", Some(""), 0),
        ];

        let plan = plan_sweep(&rooms, &HashSet::new(), true)?;

        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|r| r.room_id != "!a:x"));
        Ok(())
    }

    // A protected room matching the filter aborts the whole sweep
    #[test]
    fn sweep_aborts_on_protected_room() {
        let rooms = vec![
            room("!a:x", None, 0),
            room("!keep:x", Some("#reporting:x"), 0),
        ];

        let result = plan_sweep(&rooms, &protected(&["#reporting:x"]), false);

        let err = result.unwrap_err().to_string();
        assert!(err.contains("#reporting:x"));
        assert!(err.contains("!keep:x"));
    }

    // Alias whitespace from the server must not defeat the failsafe
    #[test]
    fn sweep_trims_alias_before_protected_check() {
        let rooms = vec![room("!keep:x", Some(" #reporting:x "), 0)];

        let result = plan_sweep(&rooms, &protected(&["#reporting:x"]), false);

        assert!(result.is_err());
    }

    // Occupied protected rooms never reach the failsafe
    #[test]
    fn sweep_ignores_occupied_protected_rooms() -> Result<()> {
        let rooms = vec![
            room("!keep:x", Some("#reporting:x"), 12),
            room("!empty:x", None, 0),
        ];

        let plan = plan_sweep(&rooms, &protected(&["#reporting:x"]), false)?;

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].room_id, "!empty:x");
        Ok(())
    }

    // Protected file parsing: trims lines and skips blanks
    #[test]
    fn protected_file_parses_one_alias_per_line() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "#reporting:x\n\n  #scoping:x  \n")?;

        let set = load_protected(file.path())?;

        assert_eq!(set.len(), 2);
        assert!(set.contains("#reporting:x"));
        assert!(set.contains("#scoping:x"));
        Ok(())
    }

    // A missing protected file means nothing is protected
    #[test]
    fn protected_file_missing_means_empty() -> Result<()> {
        let set = load_protected(Path::new("/nonexistent/.synadmin_protected"))?;
        assert!(set.is_empty());
        Ok(())
    }
}
