//! CLI command definitions.

use clap::{Parser, Subcommand};
use imagery::{ImageFit, ImageFormat, ImageSize};
use std::path::PathBuf;
use uuid::Uuid;

/// Imagery - image upload, signed serving and variant caching
#[derive(Parser, Debug)]
#[command(name = "imagery")]
#[command(about = "Image upload, signed serving and variant caching", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file to use instead of ./imagery.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve signed image URLs over HTTP
    Serve,

    /// Upload image files and print their records
    Upload {
        /// Files to upload, stored as one post
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Format to store the images as
        #[arg(long, default_value = "jpeg")]
        format: ImageFormat,

        /// Box to resize into, e.g. 1024 or 1024x768; 0 keeps the dimensions
        #[arg(long, default_value = "0")]
        size: ImageSize,

        /// How to fit the image into the box
        #[arg(long)]
        fit: Option<ImageFit>,

        /// Backend to store on; defaults to s3 when configured, else disk
        #[arg(long)]
        store: Option<String>,
    },

    /// Delete images, their stored bytes and cached variants
    Delete {
        /// Image ids
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },

    /// Remove every cached variant
    ClearCache,

    /// Print the signed URL for an image
    Url {
        /// Image id
        id: Uuid,

        /// Box to resize into; 0 serves the stored dimensions
        #[arg(long, default_value = "0")]
        size: ImageSize,

        /// How to fit the image into the box
        #[arg(long)]
        fit: Option<ImageFit>,

        /// Format to serve; defaults to the stored format
        #[arg(long)]
        format: Option<ImageFormat>,
    },
}
