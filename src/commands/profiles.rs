//! Profile command handlers.

use anyhow::{Result, bail};
use family_cloud_core::AppContext;
use family_cloud_core::profiles::{NewProfile, ProfilePatch, next_color};

use crate::cli::ProfilesCommand;

pub async fn run_profiles_command(ctx: &AppContext, command: &ProfilesCommand) -> Result<()> {
    let profiles = ctx.profiles();
    match command {
        ProfilesCommand::List => {
            let active_id = profiles.active().await.map(|profile| profile.id);
            for profile in profiles.list().await {
                let marker = if active_id.as_deref() == Some(profile.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                let kind = if profile.is_child { "child" } else { "adult" };
                println!(
                    "{marker} {}\t{}\t{kind}\t{}",
                    profile.id, profile.name, profile.color
                );
            }
        }
        ProfilesCommand::Add { name, color, child } => {
            let color = match color {
                Some(color) => color.clone(),
                None => next_color(&profiles.list().await).to_string(),
            };
            let profile = profiles
                .create(NewProfile {
                    name: name.clone(),
                    color: Some(color),
                    is_child: *child,
                })
                .await?;
            println!("Added profile {} ({})", profile.name, profile.id);
        }
        ProfilesCommand::Select { id } => {
            let Some(profile) = profiles.select(id).await else {
                bail!("No profile with id '{id}'");
            };
            println!("Watching as {}", profile.name);
        }
        ProfilesCommand::Rename { id, name } => {
            let patch = ProfilePatch {
                name: Some(name.clone()),
                ..ProfilePatch::default()
            };
            let Some(profile) = profiles.update(id, patch).await? else {
                bail!("No profile with id '{id}'");
            };
            println!("Renamed profile {} to {}", profile.id, profile.name);
        }
        ProfilesCommand::Delete { id } => {
            if !profiles.delete(id).await {
                bail!("No profile with id '{id}'");
            }
            println!("Deleted profile {id}");
        }
    }
    Ok(())
}
