use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use animorph::reference::ReferenceLoader;
use animorph::{
    Checkpoint, Device, FrameShape, LandmarkDetector, ModelConfig, ModelLoader as _, RunOpts,
    TransferMode,
};

#[derive(Parser, Debug)]
#[command(name = "animorph", version, about = "Animate a still image with a driving video")]
struct Cli {
    /// Model config JSON.
    #[arg(long)]
    config: PathBuf,

    /// Checkpoint JSON with the network parameter groups.
    #[arg(long)]
    checkpoint: PathBuf,

    /// Image to animate.
    #[arg(long)]
    source_image: PathBuf,

    /// Driving video, image directory, or numbered pattern such as `frames/%05d.png`.
    #[arg(long)]
    driving_video: PathBuf,

    /// Output video, or a directory (trailing `/`) for numbered PNGs.
    #[arg(long, default_value = "result.mp4")]
    result_video: PathBuf,

    /// Frame shape as `W,H`.
    #[arg(long, default_value = "256,256")]
    img_shape: FrameShape,

    /// Keypoint transfer mode.
    #[arg(long, value_enum, default_value_t = ModeChoice::Relative)]
    mode: ModeChoice,

    /// Start animating from the driving frame best aligned with the source.
    #[arg(long)]
    find_best_frame: bool,

    /// Run on CPU.
    #[arg(long)]
    cpu: bool,

    /// Run per-frame inference in reduced precision.
    #[arg(long)]
    autocast: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Standard,
    Relative,
    Avd,
}

impl From<ModeChoice> for TransferMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Standard => Self::Standard,
            ModeChoice::Relative => Self::Relative,
            ModeChoice::Avd => Self::Avd,
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = ModelConfig::from_path(&cli.config)
        .with_context(|| format!("load config '{}'", cli.config.display()))?;
    let checkpoint = Checkpoint::from_path(&cli.checkpoint)
        .with_context(|| format!("load checkpoint '{}'", cli.checkpoint.display()))?;

    let device = if cli.cpu {
        Device::Cpu
    } else {
        Device::Accelerator
    };
    let models = ReferenceLoader.load(&config, &checkpoint, device)?;
    let landmarks = if cli.find_best_frame {
        Some(ReferenceLoader::landmarks(&config)?)
    } else {
        None
    };

    let opts = RunOpts {
        shape: cli.img_shape,
        mode: cli.mode.into(),
        find_best_frame: cli.find_best_frame,
        device,
        reduced_precision: cli.autocast,
        ..RunOpts::new(cli.source_image, cli.driving_video, cli.result_video)
    };
    let stats = animorph::run(
        &models,
        landmarks.as_ref().map(|l| l as &dyn LandmarkDetector),
        &opts,
    )?;

    eprintln!(
        "wrote {} frames to {}",
        stats.frames_written,
        opts.output.display()
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
