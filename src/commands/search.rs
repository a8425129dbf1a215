//! Search command handler: remote search with a local fallback.

use anyhow::Result;
use family_cloud_core::AppContext;
use family_cloud_core::search::search_videos_with;
use tracing::warn;

use crate::cli::SearchArgs;

pub async fn run_search_command(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        println!("Enter something to search for.");
        return Ok(());
    }

    let token = ctx.session_token().await;
    let token = token.as_deref();

    // The local fallback searches whatever library the API will still list.
    let results = search_videos_with(ctx.api(), token, query, || async {
        match token {
            Some(_) => ctx.api().fetch_videos(token).await.unwrap_or_else(|error| {
                warn!(%error, "could not load videos for local search");
                Vec::new()
            }),
            None => Vec::new(),
        }
    })
    .await;
    if results.is_empty() {
        println!("No videos match \"{query}\"");
        return Ok(());
    }
    for video in &results {
        println!("{}\t{}", video.id, video.title);
    }
    Ok(())
}
