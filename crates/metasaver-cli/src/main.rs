// File: crates/metasaver-cli/src/main.rs

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::Parser;
use metasaver_core::{
    Dirs, FfmpegTranscoder, LocalFs, MediaKind, MediaPicker, MetaSaverError, Notice,
    ScreenController, StripConfig, StripPipeline, inspect_file,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Strip location, device and time metadata from photos and videos.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// The ffmpeg binary to run
    #[arg(long, global = true, env = "METASAVER_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Where cleaned files are written [default: <documents>/metasaver]
    #[arg(long, global = true, env = "METASAVER_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Where `save` puts the final copy [default: <pictures>/MetaSaver]
    #[arg(long, global = true, env = "METASAVER_SAVE_DIR")]
    save_dir: Option<PathBuf>,

    /// Where gallery picks are copied before processing
    #[arg(long, global = true, env = "METASAVER_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Fail if the transcoder writes an empty file
    #[arg(long, global = true)]
    require_nonempty: bool,

    /// Log every transcoder command line
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// View metadata for an image
    View {
        /// The path to the file
        #[arg(required = true)]
        file_path: PathBuf,
    },
    /// Write a metadata-free copy of a photo or video
    Strip {
        /// The path to the file
        #[arg(required = true)]
        file_path: PathBuf,
    },
    /// Pick or capture a file, strip it, and save the clean copy
    Save {
        /// Gallery reference: a path, a file:// URI or a URL to fetch
        #[arg(required_unless_present = "camera", conflicts_with = "camera")]
        source: Option<String>,

        /// Treat the file as a fresh camera capture instead of a gallery pick
        #[arg(long)]
        camera: Option<PathBuf>,

        /// Save without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Hands the command-line arguments to the controller as if a user picked them.
struct ArgPicker {
    camera: Option<String>,
    gallery: Option<String>,
}

#[async_trait]
impl MediaPicker for ArgPicker {
    async fn capture(&self) -> Result<Option<String>, MetaSaverError> {
        Ok(self.camera.clone())
    }

    async fn pick(&self) -> Result<Option<String>, MetaSaverError> {
        Ok(self.gallery.clone())
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut dirs = Dirs::from_platform();
    if let Some(cache) = &cli.cache_dir {
        dirs.cache = cache.clone();
    }
    let output_dir = cli.output_dir.clone().unwrap_or_else(|| dirs.output_dir());
    let mut config = StripConfig::new(output_dir);
    config.require_nonempty_output = cli.require_nonempty;

    let gateway = Arc::new(LocalFs::new());
    let pipeline = StripPipeline::new(
        gateway.clone(),
        Arc::new(FfmpegTranscoder::new(&cli.ffmpeg)),
        config,
    );

    match cli.command {
        Commands::View { file_path } => {
            let metadata = inspect_file(&file_path)
                .await
                .with_context(|| format!("Failed to inspect file: {}", file_path.display()))?;

            if metadata.is_empty() {
                println!("No metadata found in {}.", file_path.display());
            } else {
                println!("Metadata for {}:", file_path.display());
                for entry in metadata {
                    println!("  - {}: {} = {}", entry.category, entry.key, entry.value);
                }
            }
        }

        Commands::Strip { file_path } => {
            let before = count_entries(&file_path).await;
            let outcome = pipeline
                .strip_metadata(&file_path)
                .await
                .with_context(|| format!("Failed to strip {}", file_path.display()))?;

            if let Some(count) = before {
                println!("Found {count} metadata entries in {}.", file_path.display());
            }
            println!("Cleaned with {}.", outcome.strategy);
            if outcome.kind == MediaKind::Image {
                if let Some(left) = count_entries(&outcome.output_path).await {
                    println!("Metadata entries remaining: {left}");
                }
            }
            println!("Cleaned file saved to: {}", outcome.output_path.display());
        }

        Commands::Save {
            source,
            camera,
            yes,
        } => {
            let is_camera = camera.is_some();
            let picker = Arc::new(ArgPicker {
                camera: camera.map(|p| p.to_string_lossy().into_owned()),
                gallery: source,
            });
            let mut screen = ScreenController::new(pipeline, picker, gateway, dirs);
            if let Some(save_dir) = cli.save_dir {
                screen = screen.with_save_dir(save_dir);
            }

            let notice = if is_camera {
                screen.take_photo().await
            } else {
                screen.pick_from_gallery().await
            };
            let media = match notice {
                Notice::Preview(media) => media,
                Notice::Cancelled => {
                    println!("Nothing selected.");
                    return Ok(());
                }
                other => return report(other),
            };
            println!("Previewing {}", media.display());

            expect_notice(screen.request_save(), |n| matches!(n, Notice::ConfirmSave(_)))?;
            if !yes
                && !confirm("Metadata will be stripped from the saved copy. Continue? [y/N] ")
                    .await?
            {
                expect_notice(screen.cancel_save(), |n| matches!(n, Notice::Preview(_)))?;
                expect_notice(screen.discard(), |n| *n == Notice::Discarded)?;
                println!("Discarded.");
                return Ok(());
            }
            report(screen.confirm_save().await)?;
        }
    }

    Ok(())
}

async fn count_entries(path: &Path) -> Option<usize> {
    match inspect_file(path).await {
        Ok(entries) => Some(entries.len()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "metadata not inspectable");
            None
        }
    }
}

async fn confirm(prompt: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Fails unless the controller moved the way the flow expects.
fn expect_notice(notice: Notice, expected: impl Fn(&Notice) -> bool) -> Result<()> {
    debug!(?notice, "screen notice");
    if expected(&notice) {
        Ok(())
    } else {
        report(notice)
    }
}

fn report(notice: Notice) -> Result<()> {
    match notice {
        Notice::Saved(dest) => {
            println!("Saved: {}", dest.display());
            Ok(())
        }
        Notice::Error(message) => bail!(message),
        Notice::Ignored => bail!("Another job is already running"),
        other => bail!("Unexpected screen state: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_notice_passes_and_anything_else_fails() {
        let preview = Notice::Preview(PathBuf::from("/app/cache/picked.jpg"));
        assert!(expect_notice(preview.clone(), |n| matches!(n, Notice::Preview(_))).is_ok());
        assert!(expect_notice(Notice::Discarded, |n| *n == Notice::Discarded).is_ok());

        let err = expect_notice(Notice::Ignored, |n| matches!(n, Notice::ConfirmSave(_)))
            .unwrap_err();
        assert_eq!(err.to_string(), "Another job is already running");

        let err = expect_notice(preview, |n| *n == Notice::Discarded).unwrap_err();
        assert!(err.to_string().starts_with("Unexpected screen state"));
    }
}
