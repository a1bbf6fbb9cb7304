use anyhow::{bail, Context, Result};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use yoga_pose::{
    audio::{AudioCue, SilentCue},
    camera::Camera,
    canvas::MatCanvas,
    classify::{PoseClassifier, TargetPose},
    config::DetectionConfig,
    detection::{DetectionLoop, Pipeline, PoseEstimator},
    engine::{read_image, MoveNet, TfLiteClassifier},
    normalize::{Normalizer, PoseSizeMode},
    reference::ReferenceImages,
    session::SessionHandle,
    view::SessionView,
    Error,
};

#[cfg(feature = "gui")]
const WINDOW_NAME: &str = "yoga-pose";

#[derive(structopt::StructOpt)]
struct Models {
    /// Path to a single-pose MoveNet TensorFlow Lite model.
    #[structopt(long)]
    movenet: PathBuf,

    /// Path to the TensorFlow Lite pose classifier.
    #[structopt(long)]
    classifier: PathBuf,

    /// Interpreter threads per model; TensorFlow Lite picks when unset.
    #[structopt(long)]
    num_threads: Option<i32>,
}

impl Models {
    fn load(&self) -> Result<(MoveNet, TfLiteClassifier)> {
        let estimator = MoveNet::new(&self.movenet, self.num_threads)
            .with_context(|| format!("failed to load pose estimator {:?}", self.movenet))?;
        let classifier = TfLiteClassifier::new(&self.classifier, self.num_threads)
            .with_context(|| format!("failed to load pose classifier {:?}", self.classifier))?;
        Ok((estimator, classifier))
    }
}

#[derive(structopt::StructOpt)]
struct Live {
    #[structopt(flatten)]
    models: Models,

    #[structopt(flatten)]
    config: DetectionConfig,

    /// The pose to practice: tree, chair, cobra, warrior, dog, shoulderstand or triangle.
    #[structopt(short, long, default_value = "tree")]
    pose: TargetPose,

    /// A v4l2 compatible device: /dev/videoDEVICE
    #[structopt(short, long, default_value = "0")]
    device: i32,

    /// The requested width of camera frames.
    #[structopt(long, default_value = "640")]
    width: u32,

    /// The requested height of camera frames.
    #[structopt(short = "-H", long, default_value = "480")]
    height: u32,

    /// Directory of reference pictures named after the poses, e.g. tree.jpg.
    #[structopt(long)]
    reference_dir: Option<PathBuf>,

    /// Width of the reference picture drawn over the feed; a quarter of the
    /// frame width when unset.
    #[structopt(long)]
    reference_width: Option<u32>,

    /// WAV file looped while the pose is held.
    #[structopt(long)]
    cue: Option<PathBuf>,

    /// Milliseconds between status refreshes.
    #[structopt(long, default_value = "100")]
    refresh_ms: u64,

    /// Don't show the hold time spinner.
    #[structopt(short, long)]
    quiet: bool,
}

#[derive(structopt::StructOpt)]
struct Image {
    #[structopt(flatten)]
    models: Models,

    /// The image to classify.
    image: PathBuf,

    /// Reject the image if any keypoint scores below this.
    #[structopt(long, default_value = "0.1")]
    min_landmark_score: f32,

    #[structopt(long, default_value = "2.5")]
    torso_multiplier: f32,

    #[structopt(long, default_value = "landmark")]
    pose_size_mode: PoseSizeMode,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Practice a pose in front of the webcam.
    Live(Live),
    /// Print the class confidences for the pose in a still image.
    Image(Image),
}

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    #[structopt(subcommand)]
    command: Command,
}

#[cfg(feature = "audio")]
type CuePlayer = yoga_pose::audio::CuePlayer;
#[cfg(not(feature = "audio"))]
type CuePlayer = ();

/// The cue the detection worker drives, plus the player that must outlive it
/// on this thread.
#[cfg(feature = "audio")]
fn open_cue(path: Option<&Path>) -> Result<(Box<dyn AudioCue + Send>, Option<CuePlayer>)> {
    match path {
        Some(path) => {
            let player = CuePlayer::open(path).context("failed to open audio cue")?;
            Ok((Box::new(player.handle()), Some(player)))
        }
        None => Ok((Box::new(SilentCue::default()), None)),
    }
}

#[cfg(not(feature = "audio"))]
fn open_cue(path: Option<&Path>) -> Result<(Box<dyn AudioCue + Send>, Option<CuePlayer>)> {
    if let Some(path) = path {
        tracing::warn!(
            message = "built without audio support, ignoring cue",
            path = %path.display()
        );
    }
    Ok((Box::new(SilentCue::default()), None))
}

fn live(opt: Live) -> Result<()> {
    let (estimator, classifier) = opt.models.load()?;
    let camera = Camera::open(opt.device, opt.width, opt.height).context("failed to open camera")?;
    let (audio, _player) = open_cue(opt.cue.as_deref())?;

    #[cfg(feature = "gui")]
    let (keys_tx, keys_rx) = crossbeam::channel::unbounded();
    #[cfg(feature = "gui")]
    let canvas = MatCanvas::with_window(WINDOW_NAME, keys_tx);
    #[cfg(not(feature = "gui"))]
    let canvas = MatCanvas::new();

    let (frame_width, _) = camera.resolution();
    let reference = opt
        .reference_dir
        .as_ref()
        .map(|dir| ReferenceImages::load(dir, opt.reference_width.unwrap_or(frame_width / 4)))
        .transpose()
        .context("failed to load reference images")?;
    let canvas = match reference.as_ref() {
        Some(reference) => canvas.with_reference(reference.slot()),
        None => canvas,
    };

    let session = SessionHandle::new(opt.pose);
    let pipeline = Pipeline::new(
        camera,
        estimator,
        classifier,
        canvas,
        audio,
        opt.config,
        session.clone(),
    );

    let mut view = SessionView::new(session, DetectionLoop::new(pipeline, opt.config.interval()));
    if !opt.quiet {
        view = view.with_spinner();
    }
    if let Some(reference) = reference {
        view = view.with_reference(reference);
    }
    #[cfg(feature = "gui")]
    {
        view = view.with_keys(keys_rx);
    }

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrl_c = running.clone();

    ctrlc::set_handler(move || {
        running_ctrl_c.store(false, Ordering::SeqCst);
    })
    .context("failed setting Ctrl-C handler")?;

    let snapshot = view
        .run(&running, Duration::from_millis(opt.refresh_ms))
        .context("session failed")?;
    let stats = view.stats();

    info!(
        message = "session finished",
        pose = %snapshot.target,
        best_secs = snapshot.best.as_secs_f64(),
        cycles = stats.cycles,
        skipped_ticks = stats.skipped_ticks,
        failures = stats.failures,
        not_ready = stats.not_ready
    );
    Ok(())
}

fn image(opt: Image) -> Result<()> {
    let (mut estimator, mut classifier) = opt.models.load()?;
    let frame = read_image(&opt.image)?;

    let pose = estimator
        .estimate(&frame)
        .context("pose estimation failed")?
        .into_iter()
        .next()
        .ok_or(Error::NoPoseDetected)?;

    if let Some(keypoint) = pose
        .keypoints
        .iter()
        .find(|keypoint| keypoint.score < opt.min_landmark_score)
    {
        bail!(
            "{:?} scored {:.2}, below the minimum landmark score of {}: {:?}",
            keypoint.kind,
            keypoint.score,
            opt.min_landmark_score,
            opt.image
        );
    }

    let embedding = Normalizer::new(opt.torso_multiplier, opt.pose_size_mode)
        .embed(pose.landmarks().view())
        .context("failed to normalize pose")?;
    let scores = classifier
        .classify(&embedding)
        .context("pose classification failed")?;

    for (class, score) in scores.ranked() {
        println!("{:<14} {:.4}", class, score);
    }
    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(opt.log_level),
    )?;

    match opt.command {
        Command::Live(live_opt) => live(live_opt),
        Command::Image(image_opt) => image(image_opt),
    }
}
