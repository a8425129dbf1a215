//! Continue-watching command handlers. All of them act on the active profile.

use anyhow::{Result, anyhow, bail};
use family_cloud_core::AppContext;
use family_cloud_core::continue_watching::VideoSnapshot;
use family_cloud_core::profiles::Profile;

use crate::cli::WatchingCommand;

pub async fn run_watching_command(ctx: &AppContext, command: &WatchingCommand) -> Result<()> {
    let profile = active_profile(ctx).await?;
    let store = ctx.continue_watching();

    match command {
        WatchingCommand::List => {
            let token = ctx.session_token().await;
            let entries = store.fetch(ctx.api(), token.as_deref(), &profile.id).await;
            if entries.is_empty() {
                println!("Nothing to continue for {}", profile.name);
            }
            for entry in entries {
                println!(
                    "{}\t{}\t{:.0}%\t{}",
                    entry.video.id,
                    entry.video.title,
                    entry.progress * 100.0,
                    entry.last_watched_at
                );
            }
        }
        WatchingCommand::Progress {
            video,
            fraction,
            title,
        } => {
            if !fraction.is_finite() {
                bail!("Progress must be a number between 0 and 1");
            }
            let snapshot = title.as_ref().map(|title| VideoSnapshot {
                title: title.clone(),
                ..VideoSnapshot::from_id(video)
            });
            let entries = store
                .upsert_progress(&profile.id, video, *fraction, snapshot)
                .await;
            println!("{} has {} videos in progress", profile.name, entries.len());
        }
        WatchingCommand::Remove { video } => {
            if !store.remove(&profile.id, video).await {
                bail!("Video '{video}' is not in {}'s list", profile.name);
            }
            println!("Removed {video}");
        }
        WatchingCommand::Clear => {
            store.clear(&profile.id).await;
            println!("Cleared continue watching for {}", profile.name);
        }
    }
    Ok(())
}

async fn active_profile(ctx: &AppContext) -> Result<Profile> {
    ctx.active_profile()
        .await
        .ok_or_else(|| {
            anyhow!("No active profile; pick one with `family-cloud profiles select <id>`")
        })
}
