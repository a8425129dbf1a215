//! Playlist command handlers.

use anyhow::{Result, bail};
use family_cloud_core::AppContext;
use family_cloud_core::playlists::{NewPlaylist, Playlist, PlaylistPatch};

use crate::cli::PlaylistsCommand;

pub async fn run_playlists_command(ctx: &AppContext, command: &PlaylistsCommand) -> Result<()> {
    let playlists = ctx.playlists();
    match command {
        PlaylistsCommand::List => {
            for playlist in playlists.list().await {
                println!("{}\t{}\t{} videos", playlist.id, playlist.name, playlist.video_count);
            }
        }
        PlaylistsCommand::Show { id } => {
            let playlist = found(id, playlists.get_by_id(id).await)?;
            println!("{} ({} videos)", playlist.name, playlist.video_count);
            if !playlist.description.is_empty() {
                println!("{}", playlist.description);
            }
            for video_id in &playlist.video_ids {
                println!("  {video_id}");
            }
        }
        PlaylistsCommand::Create { name, description } => {
            if name.trim().is_empty() {
                bail!("Playlist name is required");
            }
            let playlist = playlists
                .create(NewPlaylist {
                    name: name.clone(),
                    description: description.clone(),
                })
                .await;
            println!("Created playlist {} ({})", playlist.name, playlist.id);
        }
        PlaylistsCommand::Rename { id, name } => {
            let patch = PlaylistPatch {
                name: Some(name.clone()),
                ..PlaylistPatch::default()
            };
            let playlist = found(id, playlists.update(id, patch).await)?;
            println!("Renamed playlist {} to {}", playlist.id, playlist.name);
        }
        PlaylistsCommand::Delete { id } => {
            if !playlists.delete(id).await {
                bail!("No playlist with id '{id}'");
            }
            println!("Deleted playlist {id}");
        }
        PlaylistsCommand::Add { id, video } => {
            let playlist = found(id, playlists.add_video(id, video).await)?;
            println!("{} now has {} videos", playlist.name, playlist.video_count);
        }
        PlaylistsCommand::Remove { id, video } => {
            let playlist = found(id, playlists.remove_video(id, video).await)?;
            println!("{} now has {} videos", playlist.name, playlist.video_count);
        }
    }
    Ok(())
}

fn found(id: &str, playlist: Option<Playlist>) -> Result<Playlist> {
    match playlist {
        Some(playlist) => Ok(playlist),
        None => bail!("No playlist with id '{id}'"),
    }
}
