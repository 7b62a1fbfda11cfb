//! `hark image ...`

use std::process::ExitCode;

use anyhow::{anyhow, Context};
use colored::Colorize;

use hark_core::user_paths;
use hark_image::{Image, RemoteImageStore};
use hark_orchestrator::LocalClient;

use crate::cli::ImageSubcommand;
use crate::output::print_table;

pub async fn handle_image_command(
    client: &LocalClient,
    command: ImageSubcommand,
) -> anyhow::Result<ExitCode> {
    match command {
        ImageSubcommand::List => list(client),
        ImageSubcommand::Pull {
            driver,
            guest,
            version,
            local_file,
        } => {
            let image = Image::new(driver.parse()?, guest.parse()?, version);
            let path = match local_file {
                Some(source) => client
                    .save_image_from_file(&image, &source)
                    .with_context(|| format!("Failed to copy {}", source.display()))?,
                None => pull_remote(client, &image).await?,
            };
            println!(
                "{}",
                format!("Saved image {} to {}", image, path.display()).green()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn list(client: &LocalClient) -> anyhow::Result<ExitCode> {
    let images = client.images()?;
    println!(
        "{}",
        format!("image list: found {} cached hark images", images.len()).green()
    );

    let rows: Vec<Vec<String>> = images
        .iter()
        .map(|image| Image::FIELDS.iter().map(|f| image.value(f)).collect())
        .collect();
    print_table(&Image::FIELDS, &rows);
    Ok(ExitCode::SUCCESS)
}

async fn pull_remote(client: &LocalClient, image: &Image) -> anyhow::Result<std::path::PathBuf> {
    let context = client.context();
    let url = context.config().image_store.url.as_deref().ok_or_else(|| {
        anyhow!(
            "No image store configured: set image_store.url in {} or pass --local-file",
            user_paths::config_path(context.home()).display()
        )
    })?;

    let store = RemoteImageStore::new(url)?;
    println!("Downloading {} from {}", image, url);
    let path = store
        .pull(image, context.image_cache())
        .await
        .with_context(|| format!("Failed to download {}", image))?;
    Ok(path)
}
