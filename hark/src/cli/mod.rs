// CLI argument parsing and definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "hark")]
#[command(about = "Manage local virtual machines and their base images")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding hark's database, images and logs (default: ~/.hark)
    #[arg(long, global = true, env = "HARKHOME")]
    pub hark_home: Option<PathBuf>,

    /// Log level or filter directives (overrides the configured level)
    #[arg(long, global = true, env = "LOGLEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Manage machines
    Vm {
        #[command(subcommand)]
        command: VmSubcommand,
    },
    /// Manage cached base images
    Image {
        #[command(subcommand)]
        command: ImageSubcommand,
    },
    /// Show the drivers supported on this platform
    Drivers,
    /// Print the hark log file
    Log,
}

#[derive(Debug, Clone, Subcommand)]
pub enum VmSubcommand {
    /// List machines
    List,
    /// Create a new machine
    New {
        /// Unique machine name
        #[arg(long)]
        name: String,
        /// Hypervisor driver
        #[arg(long, default_value = "virtualbox")]
        driver: String,
        /// Guest operating system
        #[arg(long, default_value = "Debian-8")]
        guest: String,
        /// Memory in megabytes
        #[arg(long, default_value_t = 1024)]
        memory_mb: i64,
        /// Start the machine with a GUI once created
        #[arg(long)]
        gui_start: bool,
    },
    /// Start a machine
    Start {
        #[arg(long)]
        name: String,
        /// Show the hypervisor GUI
        #[arg(long)]
        gui: bool,
    },
    /// Stop a machine
    Stop {
        #[arg(long)]
        name: String,
    },
    /// Stop if needed, then delete a machine and its records
    Destroy {
        #[arg(long)]
        name: String,
    },
    /// List configured port mappings
    Mappings,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ImageSubcommand {
    /// List cached images
    List,
    /// Add an image to the cache
    Pull {
        #[arg(long, default_value = "virtualbox")]
        driver: String,
        #[arg(long, default_value = "Debian-8")]
        guest: String,
        #[arg(long)]
        version: u32,
        /// Copy from a local file instead of downloading from the image store
        #[arg(long)]
        local_file: Option<PathBuf>,
    },
}
