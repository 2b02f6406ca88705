use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize stored image references, verifying each asset on the CDN.
    Images {
        /// Write the resolved URLs back; default is a dry run.
        #[arg(long)]
        apply: bool,
    },
    /// Upload local image files and point matching products at the CDN.
    SyncMedia {
        /// Directory holding the image files.
        dir: PathBuf,

        /// Also re-upload files for products already pointing at the CDN.
        #[arg(long)]
        overwrite: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Images { apply } => repair::repair_images(apply).await,
        Command::SyncMedia { dir, overwrite } => repair::sync_media(&dir, overwrite).await,
    }
}
