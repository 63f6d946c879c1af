use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::{AdminClient, DEFAULT_URL};
use crate::sweep::{self, SweepOptions};
use crate::ui;

// CLI arguments parsing structure
#[derive(Parser)]
#[command(author, version, about, long_about = None, disable_help_subcommand = true)]
pub struct Cli {
    /// Homeserver URL (falls back to $SYNAPSE_URL, then http://localhost:8008)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every account on the homeserver
    ListUsers,
    /// Show a user's record with last seen IP and user agent
    Query {
        /// Full user id, eg @target:matrix.example.org
        user_id: String,
    },
    /// Deactivate an account and erase its data
    Deactivate {
        /// Full user id, eg @target:matrix.example.org
        user_id: String,
    },
    /// Set a new password on an account (prompted, echo suppressed)
    Reset {
        /// Full user id, eg @target:matrix.example.org
        user_id: String,
    },
    /// List every room on the homeserver
    ListRooms,
    /// Delete a room from the database so its alias can be reclaimed
    DeleteRoom {
        /// Room id, eg !oqhoCmLzNgkVlLgxQp:matrix.example.org
        room_id: String,
    },
    /// Delete a room through the older purge endpoint
    PurgeRoom {
        /// Room id, eg !oqhoCmLzNgkVlLgxQp:matrix.example.org
        room_id: String,
    },
    /// Force a local user into a room
    Join {
        /// Full user id, eg @target:matrix.example.org
        user_id: String,
        /// Room id; prompted for when omitted
        room_id: Option<String>,
    },
    /// Delete every room with no local members, after confirmation
    AutoDelete {
        /// Only consider rooms without a canonical alias
        #[arg(long)]
        unaliased: bool,

        /// Use the older purge endpoint for each room
        #[arg(long)]
        purge: bool,

        /// Show what would be deleted and stop
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Report rooms that do not have encryption enabled
    CheckEncryption,
    /// Purge local media older than the given number of days
    PurgeMedia {
        /// Age cutoff in days
        #[arg(long, default_value_t = 7)]
        days: u64,

        /// Server name; defaults to the homeserver of the admin account
        #[arg(long)]
        server: Option<String>,
    },
}

// Log in, run the selected command, then drop the token either way
pub fn execute_command(cli: &Cli) -> Result<()> {
    let base_url = resolve_url(cli);
    let mut api = AdminClient::new(&base_url)?;

    let (username, password) = ui::prompt_credentials()?;
    api.login(&username, &password)
        .context("login to homeserver failed")?;

    let outcome = dispatch(cli, &api);

    if let Err(err) = api.logout() {
        tracing::warn!("logout failed: {err:#}");
    }
    outcome
}

fn resolve_url(cli: &Cli) -> String {
    cli.url
        .clone()
        .or_else(|| std::env::var("SYNAPSE_URL").ok())
        .unwrap_or_else(|| DEFAULT_URL.to_string())
}

fn dispatch(cli: &Cli, api: &AdminClient) -> Result<()> {
    match &cli.command {
        Commands::ListUsers => cmd_show(api.list_users()?),
        Commands::Query { user_id } => cmd_show(api.query_user(user_id)?),
        Commands::Deactivate { user_id } => cmd_show(api.deactivate(user_id)?),
        Commands::Reset { user_id } => {
            let new_password = ui::prompt_new_password(user_id)?;
            cmd_show(api.reset_password(user_id, &new_password)?)
        }
        Commands::ListRooms => cmd_show(api.list_rooms_body()?),
        Commands::DeleteRoom { room_id } => cmd_show(api.delete_room(room_id)?),
        Commands::PurgeRoom { room_id } => cmd_show(api.purge_room(room_id)?),
        Commands::Join { user_id, room_id } => {
            let room = match room_id {
                Some(r) => r.clone(),
                None => ui::prompt_room_id()?,
            };
            cmd_show(api.force_join(user_id, &room)?)
        }
        Commands::AutoDelete {
            unaliased,
            purge,
            dry_run,
            yes,
        } => sweep::run_sweep(
            api,
            &SweepOptions {
                unaliased_only: *unaliased,
                purge: *purge,
                dry_run: *dry_run,
                assume_yes: *yes,
            },
        ),
        Commands::CheckEncryption => cmd_check_encryption(api),
        Commands::PurgeMedia { days, server } => cmd_purge_media(api, *days, server.as_deref()),
    }
}

fn cmd_show(body: String) -> Result<()> {
    println!("{}", ui::render_json(&body));
    Ok(())
}

fn cmd_check_encryption(api: &AdminClient) -> Result<()> {
    let listing = api.list_rooms()?;
    let mut unencrypted = 0usize;
    for room in &listing.rooms {
        let encryption = room.encryption.as_deref().unwrap_or("");
        // m.megolm.v1.aes-sha2 matches; anything without olm is reported
        if !encryption.contains("olm") {
            unencrypted += 1;
            println!("room id: {}", room.room_id);
            println!("  name: {}", room.name.as_deref().unwrap_or("<unnamed>"));
            println!("  creator: {}", room.creator.as_deref().unwrap_or("<unknown>"));
            println!(
                "  encryption: {}",
                if encryption.is_empty() { "<none>" } else { encryption }
            );
        }
    }
    tracing::info!(
        "checked {} rooms, {} without encryption",
        listing.rooms.len(),
        unencrypted
    );
    Ok(())
}

fn cmd_purge_media(api: &AdminClient, days: u64, server: Option<&str>) -> Result<()> {
    let server_name = match server {
        Some(s) => s.to_string(),
        None => api
            .home_server()
            .context("server name unknown, pass --server")?
            .to_string(),
    };
    let before_ts = media_cutoff_ms(SystemTime::now(), days)?;
    cmd_show(api.purge_media(&server_name, before_ts)?)
}

/// Unix-millisecond timestamp `days` days before `now`.
pub fn media_cutoff_ms(now: SystemTime, days: u64) -> Result<u64> {
    let now_ms = now
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?
        .as_millis() as u64;
    Ok(now_ms.saturating_sub(days * 24 * 60 * 60 * 1000))
}
