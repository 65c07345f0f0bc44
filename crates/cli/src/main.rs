use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use image::ImageFormat;

use frameloop_core::planner::{plan_sequence, AnimationVersion};
use frameloop_core::quality::QualityTier;
use frameloop_core::request::{AnimationRequest, RequestParams};
use frameloop_core::upload::SourceImage;
use frameloop_pipeline::artifact::MP4_MIME;
use frameloop_pipeline::config::parse_provider_list;
use frameloop_pipeline::{GenerationJob, PipelineConfig, ProviderChain, VideoArtifact};

#[derive(Parser, Debug)]
#[command(name = "frameloop", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Animate an image into an MP4.
    Render(RenderArgs),
    /// Print the step table of an animation version.
    Plan(PlanArgs),
    /// Print the quality profiles.
    Profiles,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Source image (PNG, JPEG or WebP).
    #[arg(long)]
    image: PathBuf,

    /// Output MP4 path. When a fallback returns the upload itself, the
    /// extension is swapped to match.
    #[arg(long)]
    out: PathBuf,

    /// `version1` or `version2`.
    #[arg(long)]
    version: Option<String>,

    /// Frames in the output, the upload included.
    #[arg(long)]
    frames: Option<u32>,

    #[arg(long)]
    fps: Option<u32>,

    /// `fast`, `balanced` or `high`.
    #[arg(long)]
    quality: Option<String>,

    /// Diffusion seed for a reproducible chain (overrides `DIFFUSION_SEED`).
    #[arg(long)]
    seed: Option<u64>,

    /// Comma-separated provider order (overrides `PROVIDERS`).
    #[arg(long)]
    providers: Option<String>,

    /// Copy intermediate frames into this directory.
    #[arg(long)]
    save_frames: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[arg(long, default_value = "version1")]
    version: String,

    /// Print JSON instead of a table.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "frameloop_pipeline=info,frameloop_core=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args).await,
        Command::Plan(args) => cmd_plan(args),
        Command::Profiles => cmd_profiles(),
    }
}

async fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = PipelineConfig::from_env();
    if let Some(list) = args.providers.as_deref() {
        config.providers = parse_provider_list(list);
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("read image '{}'", args.image.display()))?;
    anyhow::ensure!(
        bytes.len() <= config.max_upload_bytes,
        "image exceeds the {} byte upload limit",
        config.max_upload_bytes
    );

    let params = RequestParams {
        version: args.version,
        frames: args.frames,
        fps: args.fps,
        quality: args.quality,
    };
    let source = SourceImage::from_bytes(bytes)?;
    let request = AnimationRequest::accept(source, &params, config.overflow_policy)?;
    if request.was_clamped() {
        tracing::warn!(
            requested = request.requested_frames,
            frames = request.frame_count,
            version = %request.version,
            "Frame count reduced to the version's table"
        );
    }

    let chain = ProviderChain::from_config(&config).await?;
    let mut job = GenerationJob::prepare(request, config.scratch_dir.as_deref()).await?;
    if let Some(dir) = args.save_frames {
        job = job.with_saved_frames(dir);
    }

    let generated = chain.generate(&job).await?;

    match &generated.artifact {
        VideoArtifact::Inline { bytes, mime } => {
            let out = output_path_for(&args.out, mime);
            if out != args.out {
                tracing::warn!(
                    provider = generated.provider,
                    %mime,
                    requested = %args.out.display(),
                    written = %out.display(),
                    "Provider did not return a video, adjusting the output extension"
                );
            }
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            tokio::fs::write(&out, bytes)
                .await
                .with_context(|| format!("write output '{}'", out.display()))?;
            eprintln!("wrote {} via {}", out.display(), generated.provider);
        }
        VideoArtifact::External { url } => {
            eprintln!("provider {} returned an external video", generated.provider);
            println!("{url}");
        }
    }
    Ok(())
}

/// `out`, with its extension swapped when it does not fit `mime`.
fn output_path_for(out: &Path, mime: &str) -> PathBuf {
    let extensions: &[&str] = match mime {
        MP4_MIME => &["mp4"],
        other => match ImageFormat::from_mime_type(other) {
            Some(format) => format.extensions_str(),
            None => return out.to_path_buf(),
        },
    };
    let Some(preferred) = extensions.first() else {
        return out.to_path_buf();
    };

    let current = out
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if extensions.contains(&current.as_str()) {
        out.to_path_buf()
    } else {
        out.with_extension(preferred)
    }
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let version = AnimationVersion::from_label(&args.version)?;
    let steps = plan_sequence(version, version.max_frames())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&steps)?);
        return Ok(());
    }

    println!("{version}: {}", version.description());
    for step in &steps {
        println!("{:>3}  {:.2}  {}", step.index, step.strength, step.prompt);
    }
    Ok(())
}

fn cmd_profiles() -> anyhow::Result<()> {
    for tier in QualityTier::all() {
        let profile = tier.profile();
        println!(
            "{:<9} {}x{}  {} steps",
            tier.as_str(),
            profile.width,
            profile.height,
            profile.inference_steps
        );
    }
    Ok(())
}
