//! Analyze command - prompt the model tiers.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::info;
use tubegate_core::ModelTier;
use tubegate_fetch::GenerationRequest;

use super::{load_config, orchestrator};
use crate::{Cli, OutputFormat};

/// Arguments for the analyze command.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Prompt text.
    #[arg(long, short)]
    pub prompt: String,

    /// Image to send with the prompt; repeat for several.
    #[arg(long = "image", short)]
    pub images: Vec<PathBuf>,

    /// Force a tier (primary/pro or fallback/flash) instead of falling back.
    #[arg(long, short)]
    pub tier: Option<ModelTier>,
}

/// MIME type for an image path, from its extension.
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

async fn build_request(args: &AnalyzeArgs) -> Result<GenerationRequest> {
    let mut request = GenerationRequest::text(args.prompt.clone());
    for path in &args.images {
        let mime = image_mime_type(path)
            .with_context(|| format!("Unsupported image type: {}", path.display()))?;
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        request = request.with_image(mime, data);
    }
    Ok(request)
}

/// Runs the analyze command.
pub async fn run(args: &AnalyzeArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli).await?;
    let request = build_request(args).await?;
    let orchestrator = orchestrator(&config, true).await?;

    let response = match args.tier {
        Some(tier) => {
            info!(tier = %tier, "Querying forced tier");
            orchestrator.query_with_tier(tier, &request).await?
        }
        None => orchestrator.query(&request).await?,
    };

    match cli.format {
        OutputFormat::Json => println!("{}", cli.json().format(&response)?),
        OutputFormat::Text => {
            if !cli.quiet {
                eprintln!("{}", cli.text().format_tier_banner(&response));
            }
            println!("{}", response.output);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_type() {
        assert_eq!(image_mime_type(Path::new("thumb.JPG")), Some("image/jpeg"));
        assert_eq!(image_mime_type(Path::new("a/b.png")), Some("image/png"));
        assert_eq!(image_mime_type(Path::new("clip.mp4")), None);
        assert_eq!(image_mime_type(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn test_build_request_reads_images() {
        let dir = tempfile::TempDir::new().unwrap();
        let png = dir.path().join("pixel.png");
        std::fs::write(&png, [0x89, b'P', b'N', b'G']).unwrap();
        let jpg = dir.path().join("thumb.jpg");
        std::fs::write(&jpg, [0xff, 0xd8, 0xff]).unwrap();

        let args = AnalyzeArgs {
            prompt: "what is this".to_string(),
            images: vec![png, jpg],
            tier: None,
        };
        let request = build_request(&args).await.unwrap();
        assert_eq!(request.images.len(), 2);
        assert_eq!(request.images[0].mime_type, "image/png");
        assert_eq!(request.images[0].data.len(), 4);
        assert_eq!(request.images[1].mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_build_request_without_images() {
        let args = AnalyzeArgs {
            prompt: "hello".to_string(),
            images: Vec::new(),
            tier: None,
        };
        let request = build_request(&args).await.unwrap();
        assert!(request.images.is_empty());
    }

    #[test]
    fn test_image_flag_repeats() {
        use clap::Parser;

        let cli = Cli::try_parse_from([
            "tubegate", "analyze", "--prompt", "compare", "--image", "a.png", "-i", "b.jpg",
        ])
        .unwrap();
        let Some(crate::Commands::Analyze(args)) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.images, vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")]);
    }
}
