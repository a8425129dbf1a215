//! Auth command handlers: hosted sign-in URLs, callback capture, sign-out.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use family_cloud_core::AppContext;
use family_cloud_core::auth::{CallbackOutcome, UserInfo, parse_callback_fragment};
use tracing::{info, warn};

use crate::cli::AuthCommand;

pub async fn run_auth_command(ctx: &AppContext, command: &AuthCommand) -> Result<()> {
    match command {
        AuthCommand::LoginUrl => println!("{}", ctx.hosted_ui().login_url()),
        AuthCommand::SignupUrl => println!("{}", ctx.hosted_ui().signup_url()),
        AuthCommand::LogoutUrl => println!("{}", ctx.hosted_ui().logout_url()),
        AuthCommand::Callback { fragment } => run_callback(ctx, fragment).await?,
        AuthCommand::Whoami => run_whoami(ctx).await,
        AuthCommand::Logout => {
            let logout_url = ctx.logout().await.context("Failed to clear stored tokens")?;
            println!("Signed out. To end the browser session too, open:");
            println!("{logout_url}");
        }
    }
    Ok(())
}

async fn run_callback(ctx: &AppContext, fragment: &str) -> Result<()> {
    let tokens = match parse_callback_fragment(fragment) {
        Some(CallbackOutcome::Tokens(tokens)) => tokens,
        Some(CallbackOutcome::Error { error, description }) => match description {
            Some(description) => bail!("Sign-in failed: {error}: {description}"),
            None => bail!("Sign-in failed: {error}"),
        },
        None => bail!("No tokens found in the redirect; paste the whole URL after sign-in"),
    };

    ctx.tokens()
        .save(&tokens)
        .await
        .context("Failed to store tokens")?;
    info!(expires_in = ?tokens.expires_in, "tokens stored");

    match ctx.user().await {
        Some(user) => println!(
            "Signed in as {}",
            user.name.or(user.email).unwrap_or_else(|| "unknown user".to_string())
        ),
        None => {
            warn!("identity token has no readable claims");
            println!("Signed in");
        }
    }
    Ok(())
}

async fn run_whoami(ctx: &AppContext) {
    let tokens = ctx.tokens();
    if !tokens.is_authenticated().await {
        println!("Not signed in");
        return;
    }

    let Some(claims) = tokens.claims().await else {
        println!("Signed in (identity token could not be decoded)");
        return;
    };
    let user = UserInfo::from(&claims);
    println!("Name:     {}", user.name.as_deref().unwrap_or("-"));
    println!("Username: {}", user.username.as_deref().unwrap_or("-"));
    println!("Email:    {}", user.email.as_deref().unwrap_or("-"));
    if let Some(expires_at) = claims.expires_at() {
        let state = if claims.is_expired_at(Utc::now()) {
            "expired"
        } else {
            "valid"
        };
        println!("Session:  {state} until {}", expires_at.to_rfc3339());
    }
    if let Some(profile) = ctx.active_profile().await {
        println!("Profile:  {} ({})", profile.name, profile.id);
    }
}
