pub use clap::Parser;

use url::Url;

#[derive(Parser, Debug)]
#[command(name = "sheetvault")]
#[command(about = "Versioned, encrypted snapshots of spreadsheet files")]
pub struct Args {
    /// Remote daemon API to talk to (defaults to the local daemon)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    #[command(subcommand)]
    pub command: crate::Command,
}
