//! The `storylens story` command.

use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use storylens_core::{encoder, CancelSignal, Config, StoryClient};

/// Arguments for the `story` command.
#[derive(Args, Debug)]
pub struct StoryArgs {
    /// Image file to write a story about (JPG, PNG, GIF, WebP, ...)
    pub image: PathBuf,

    /// Vision model to use (defaults to the configured or recommended model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Also write the story to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Save the story into the configured output directory
    #[arg(long)]
    pub save: bool,

    /// Give up after this many seconds, including any model download
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON shape printed with `--json`.
#[derive(Debug, Serialize)]
struct StoryOutput<'a> {
    image: &'a Path,
    model: &'a str,
    media_type: &'a str,
    story: &'a str,
}

/// Execute the story command.
pub async fn execute(args: StoryArgs, config: &Config) -> anyhow::Result<()> {
    if !args.image.is_file() {
        anyhow::bail!(
            "Image not found: {:?}\n\n  Hint: Check the file path and try again.",
            args.image
        );
    }

    let image = tokio::fs::read(&args.image).await?;
    let Some(media_type) = encoder::detect_media_type(&image) else {
        anyhow::bail!(
            "Please select a valid image file: {:?} is not a recognized image format.",
            args.image
        );
    };
    tracing::debug!("Read {} ({media_type}, {} bytes)", args.image.display(), image.len());

    let client = StoryClient::from_config(config)?;
    let model = client.resolve_model(args.model.as_deref());
    if !client.catalog().contains(&model) {
        tracing::warn!(
            "'{model}' is not in the built-in catalog; it will still be used if the server knows it"
        );
    }

    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let spinner = super::create_spinner(&format!("Creating your story with {model}..."));
    let generation = client.generate_story_with_cancel(&image, Some(model.as_str()), &cancel);
    let result = match args.timeout {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), generation).await {
            Ok(result) => result,
            Err(_) => {
                spinner.finish_and_clear();
                anyhow::bail!(
                    "Story generation timed out after {secs}s.\n\n  \
                     Hint: The first run may need to download the model; \
                     try `storylens models pull {model}` first."
                );
            }
        },
        None => generation.await,
    };
    spinner.finish_and_clear();
    let story = result?;

    if args.json {
        let output = StoryOutput {
            image: &args.image,
            model: &model,
            media_type,
            story: &story,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{story}");
    }

    if let Some(path) = &args.output {
        let path = expand_path(path);
        write_story(&path, &story)?;
    }

    if args.save {
        let dir = config.output_dir();
        std::fs::create_dir_all(&dir)?;
        let path = next_story_path(&dir, &args.image);
        write_story(&path, &story)?;
    }

    Ok(())
}

fn expand_path(path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    PathBuf::from(expanded)
}

fn write_story(path: &Path, story: &str) -> anyhow::Result<()> {
    std::fs::write(path, format!("{}\n", story.trim_end()))?;
    tracing::info!("Story saved to {}", path.display());
    Ok(())
}

/// `<dir>/<image stem>-story.txt`, numbered to avoid overwriting earlier stories.
fn next_story_path(dir: &Path, image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let first = dir.join(format!("{stem}-story.txt"));
    if !first.exists() {
        return first;
    }
    (2u32..)
        .map(|n| dir.join(format!("{stem}-story-{n}.txt")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}
