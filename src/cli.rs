//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Family video cloud from the terminal.
///
/// Browse, upload and manage family videos, and keep per-profile playlists
/// and watch progress on this device.
#[derive(Parser, Debug)]
#[command(name = "family-cloud")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite file holding local state
    #[arg(long, value_name = "PATH", global = true)]
    pub storage_path: Option<PathBuf>,

    /// API base URL
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in, sign out and show who is signed in
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// List, play, upload and edit videos
    Videos {
        #[command(subcommand)]
        command: VideosCommand,
    },
    /// Search videos by title, description and tags
    Search(SearchArgs),
    /// Manage family member profiles
    Profiles {
        #[command(subcommand)]
        command: ProfilesCommand,
    },
    /// Manage playlists
    Playlists {
        #[command(subcommand)]
        command: PlaylistsCommand,
    },
    /// Continue-watching list of the active profile
    Watching {
        #[command(subcommand)]
        command: WatchingCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Print the hosted sign-in URL
    LoginUrl,
    /// Print the hosted sign-up URL
    SignupUrl,
    /// Print the hosted sign-out URL
    LogoutUrl,
    /// Store the tokens from a sign-in redirect
    Callback {
        /// Redirect URL or its `#...` fragment
        fragment: String,
    },
    /// Show the signed-in user
    Whoami,
    /// Forget tokens and the active profile
    Logout,
}

#[derive(Subcommand, Debug)]
pub enum VideosCommand {
    /// List all videos
    List,
    /// Print a playback URL
    Play {
        /// Video id
        id: String,
    },
    /// List browse categories with video counts
    Categories,
    /// List videos in a category
    Browse {
        /// Category name, e.g. "family-trips" or "Recently Added"
        category: String,
    },
    /// Upload a local video file
    Upload {
        /// Video file
        file: PathBuf,
        /// Title (defaults to the file name)
        #[arg(long)]
        title: Option<String>,
    },
    /// Change a video's metadata
    Update(VideoUpdateArgs),
    /// Delete a video
    Delete {
        /// Video id
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct VideoUpdateArgs {
    /// Video id
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New description
    #[arg(long)]
    pub description: Option<String>,
    /// Tag (repeat to set several; replaces existing tags)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search text
    pub query: String,
}

#[derive(Subcommand, Debug)]
pub enum ProfilesCommand {
    /// List profiles, marking the active one
    List,
    /// Add a profile
    Add {
        /// Display name (at most 20 characters)
        name: String,
        /// Accent color, e.g. "#ff6b00"
        #[arg(long)]
        color: Option<String>,
        /// Mark as a child's profile
        #[arg(long)]
        child: bool,
    },
    /// Make a profile the active one
    Select {
        /// Profile id
        id: String,
    },
    /// Rename a profile
    Rename {
        /// Profile id
        id: String,
        /// New name
        name: String,
    },
    /// Delete a profile
    Delete {
        /// Profile id
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlaylistsCommand {
    /// List playlists
    List,
    /// Show one playlist's videos
    Show {
        /// Playlist id
        id: String,
    },
    /// Create an empty playlist
    Create {
        /// Playlist name
        name: String,
        /// Description
        #[arg(long)]
        description: Option<String>,
    },
    /// Rename a playlist
    Rename {
        /// Playlist id
        id: String,
        /// New name
        name: String,
    },
    /// Delete a playlist
    Delete {
        /// Playlist id
        id: String,
    },
    /// Add a video to a playlist
    Add {
        /// Playlist id
        id: String,
        /// Video id
        video: String,
    },
    /// Remove a video from a playlist
    Remove {
        /// Playlist id
        id: String,
        /// Video id
        video: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum WatchingCommand {
    /// Show the continue-watching list
    List,
    /// Record watch progress
    Progress {
        /// Video id
        video: String,
        /// Fraction watched, 0.0 to 1.0
        fraction: f64,
        /// Title to remember for a new entry
        #[arg(long)]
        title: Option<String>,
    },
    /// Drop a video from the list
    Remove {
        /// Video id
        video: String,
    },
    /// Clear the whole list
    Clear,
}
