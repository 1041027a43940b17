//! Render one frame of a skeleton session as JSON.
//!
//! Loads the four keypoint streams of an instance and prints the drawable
//! scene for a requested frame, for inspection or piping into other tools.

use std::path::PathBuf;

use signpal::config;
use signpal::skeleton::frames::{PoseFrameSet, StreamPaths};
use signpal::skeleton::player::SkeletonPlayer;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = signpal::logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let settings = config::load_or_default().map_err(|err| err.to_string())?;
    let frames = PoseFrameSet::load(&options.paths).map_err(|err| err.to_string())?;
    let player = SkeletonPlayer::new(frames, &settings.playback);
    let scene = player
        .render_frame(options.frame)
        .map_err(|err| err.to_string())?;

    let json = serde_json::to_string_pretty(&scene).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}

#[derive(Debug)]
struct CliOptions {
    paths: StreamPaths,
    frame: usize,
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut pose = None;
    let mut left_hand = None;
    let mut right_hand = None;
    let mut face = None;
    let mut frame = 0usize;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            "--pose" => pose = Some(expect_path(&mut iter, "--pose")?),
            "--left-hand" => left_hand = Some(expect_path(&mut iter, "--left-hand")?),
            "--right-hand" => right_hand = Some(expect_path(&mut iter, "--right-hand")?),
            "--face" => face = Some(expect_path(&mut iter, "--face")?),
            "--frame" => {
                let value = iter.next().ok_or("--frame requires a number")?;
                frame = value
                    .parse()
                    .map_err(|_| format!("Invalid frame index: {value}"))?;
            }
            other => return Err(format!("Unknown argument: {other}")),
        }
    }

    let (Some(pose), Some(left_hand), Some(right_hand), Some(face)) =
        (pose, left_hand, right_hand, face)
    else {
        print_usage();
        return Err("All four stream files are required".to_string());
    };
    Ok(Some(CliOptions {
        paths: StreamPaths {
            pose,
            left_hand,
            right_hand,
            face,
        },
        frame,
    }))
}

fn expect_path(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<PathBuf, String> {
    iter.next()
        .map(PathBuf::from)
        .ok_or_else(|| format!("{flag} requires a path"))
}

fn print_usage() {
    println!(
        "Usage: signpal-scene --pose <npy> --left-hand <npy> --right-hand <npy> --face <npy> [--frame N]"
    );
}
