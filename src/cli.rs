//! Command-line interface parsing for LJPics
//!
//! Each subcommand corresponds to one of the service's views: the userpic
//! redirect target, the JSON payload, the info page, an explicit refresh and
//! the cached user count. Block and unblock are administrative actions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// LJPics - cached LiveJournal userpics and names
#[derive(Parser, Debug)]
#[command(name = "ljpics")]
#[command(about = "Cached LiveJournal userpics and profile names")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the XDG config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Database file, overriding the configured location
    #[arg(long, global = true, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// A username or a journal URL
#[derive(Args, Debug, Clone)]
pub struct UserArg {
    /// Username (e.g. `jace`) or journal URL (e.g. `http://jace.livejournal.com/`)
    #[arg(value_name = "USER_OR_URL")]
    pub user: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the userpic URL to redirect to
    Image(UserArg),
    /// Print the user's data as JSON
    Json {
        #[command(flatten)]
        target: UserArg,
        /// Wrap the payload as `CALLBACK(...)`
        #[arg(long, alias = "jsonp", value_name = "CALLBACK")]
        callback: Option<String>,
    },
    /// Print the user's info page
    Info(UserArg),
    /// Fetch the user's profile now, ignoring the cache age
    Refresh(UserArg),
    /// Print the number of cached users
    Count,
    /// Stop refreshing a user and hide their data
    Block(UserArg),
    /// Allow a blocked user to be refreshed again
    Unblock(UserArg),
}
