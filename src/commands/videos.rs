//! Video command handlers: listing, playback, categories, upload and edits.

use anyhow::{Context, Result, anyhow, bail};
use family_cloud_core::AppContext;
use family_cloud_core::api::{Video, VideoPatch};
use family_cloud_core::search::{Category, categories, category_data};
use family_cloud_core::upload::{UploadProgress, format_file_size, upload_video};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::cli::{VideoUpdateArgs, VideosCommand};

pub async fn run_videos_command(
    ctx: &AppContext,
    command: &VideosCommand,
    quiet: bool,
) -> Result<()> {
    let token = ctx.session_token().await;
    let token = token.as_deref();

    match command {
        VideosCommand::List => {
            let videos = load_videos(ctx, token).await?;
            if videos.is_empty() {
                println!("No videos yet. Upload one with `family-cloud videos upload <file>`.");
            }
            print_videos(&videos);
        }
        VideosCommand::Play { id } => {
            let url = ctx
                .api()
                .fetch_playback_url(token, id)
                .await
                .context("Failed to get playback URL")?;
            println!("{url}");
        }
        VideosCommand::Categories => {
            let videos = load_videos(ctx, token).await?;
            for name in categories() {
                let data = category_data(name, &videos);
                println!("{}\t{}", data.name, data.count);
            }
        }
        VideosCommand::Browse { category } => {
            let category: Category = category.parse().map_err(|error: String| anyhow!(error))?;
            let videos = load_videos(ctx, token).await?;
            let matching = category.videos(&videos);
            println!("{category}: {} videos", matching.len());
            print_videos(&matching);
        }
        VideosCommand::Upload { file, title } => {
            let bar = upload_progress_bar(quiet);
            let progress_bar = bar.clone();
            let result = upload_video(
                ctx.api(),
                token,
                file,
                title.as_deref(),
                move |progress: UploadProgress| {
                    progress_bar.set_length(progress.total);
                    progress_bar.set_position(progress.sent);
                },
            )
            .await;
            bar.finish_and_clear();

            let uploaded =
                result.with_context(|| format!("Failed to upload '{}'", file.display()))?;
            let size = uploaded
                .saved
                .as_ref()
                .and_then(|video| video.size)
                .map(format_file_size);
            match size {
                Some(size) => {
                    println!("Uploaded {} ({}, {size})", uploaded.title, uploaded.video_id);
                }
                None => println!("Uploaded {} ({})", uploaded.title, uploaded.video_id),
            }
        }
        VideosCommand::Update(args) => run_update(ctx, token, args).await?,
        VideosCommand::Delete { id } => {
            ctx.api()
                .delete_video(token, id)
                .await
                .context("Failed to delete video")?;
            println!("Deleted video {id}");
        }
    }
    Ok(())
}

async fn load_videos(ctx: &AppContext, token: Option<&str>) -> Result<Vec<Video>> {
    let videos = ctx
        .api()
        .fetch_videos(token)
        .await
        .context("Failed to load videos")?;
    debug!(count = videos.len(), "videos loaded");
    Ok(videos)
}

async fn run_update(ctx: &AppContext, token: Option<&str>, args: &VideoUpdateArgs) -> Result<()> {
    let patch = VideoPatch {
        title: args.title.clone(),
        description: args.description.clone(),
        tags: (!args.tags.is_empty()).then(|| args.tags.clone()),
        ..VideoPatch::default()
    };
    if patch.is_empty() {
        bail!("Nothing to update: pass --title, --description or --tag");
    }

    let saved = ctx
        .api()
        .save_video_metadata(token, &args.id, &patch)
        .await
        .context("Failed to update video")?;
    match saved {
        Some(video) => print_videos(std::slice::from_ref(&video)),
        None => println!("Updated video {}", args.id),
    }
    Ok(())
}

fn upload_progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner} [{bar:40}] {bytes}/{total_bytes} ({percent}%) {bytes_per_sec}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

fn print_videos(videos: &[Video]) {
    for video in videos {
        let title = if video.title.trim().is_empty() {
            "Untitled"
        } else {
            video.title.as_str()
        };
        println!(
            "{}\t{}\t{}\t{}",
            video.id,
            title,
            video.duration.as_deref().unwrap_or("-"),
            video.uploaded_at.as_deref().unwrap_or("-"),
        );
    }
}
