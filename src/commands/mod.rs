//! CLI command handlers.

mod auth;
mod playlists;
mod profiles;
mod search;
mod videos;
mod watching;

use anyhow::Result;
use family_cloud_core::AppContext;

use crate::cli::Command;

pub use auth::run_auth_command;
pub use playlists::run_playlists_command;
pub use profiles::run_profiles_command;
pub use search::run_search_command;
pub use videos::run_videos_command;
pub use watching::run_watching_command;

/// Runs one top-level command against `ctx`.
pub async fn dispatch(ctx: &AppContext, command: &Command, quiet: bool) -> Result<()> {
    match command {
        Command::Auth { command } => run_auth_command(ctx, command).await,
        Command::Videos { command } => run_videos_command(ctx, command, quiet).await,
        Command::Search(args) => run_search_command(ctx, args).await,
        Command::Profiles { command } => run_profiles_command(ctx, command).await,
        Command::Playlists { command } => run_playlists_command(ctx, command).await,
        Command::Watching { command } => run_watching_command(ctx, command).await,
    }
}
