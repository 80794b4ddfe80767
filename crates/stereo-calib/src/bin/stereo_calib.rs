//! Operator CLI for the stereo calibration workflow:
//! `calibrate` a camera from a directory of chessboard captures,
//! `build-maps` to derive and cache undistortion tables, and
//! `rectify` a stored left/right pair through stereo maps.

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::error::Error;
use std::path::PathBuf;
use stereo_calib::observer::{CalibrationObserver, DebugDumpObserver, NullObserver};
use stereo_calib::pipeline::{calibrate_and_store, PipelineOptions};
use stereo_calib::rectify::quantize_map_for_preview;
use stereo_calib::store;
use stereo_calib::{build_undistort_map, ChessboardSpec, StereoRectifier, UndistortPolicy};

#[derive(Parser)]
#[command(name = "stereo-calib", version, about = "Stereo camera calibration and rectification")]
struct Cli {
    /// Verbose logging (debug level).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Calibrate one camera from a directory of chessboard images.
    Calibrate {
        /// Directory of *.png calibration captures.
        #[arg(long)]
        images: PathBuf,
        /// Output calibration artifact (JSON).
        #[arg(long)]
        output: PathBuf,
        /// Camera label used in logs and errors.
        #[arg(long, default_value = "camera")]
        camera: String,
        /// Inner corners per chessboard row.
        #[arg(long, default_value_t = 9)]
        cols: u32,
        /// Inner corners per chessboard column.
        #[arg(long, default_value_t = 6)]
        rows: u32,
        /// Square side length in meters.
        #[arg(long, default_value_t = 0.025)]
        square_size: f64,
        /// Write corner-overlay debug PNGs into this directory.
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },
    /// Derive undistortion maps from a stored calibration.
    BuildMaps {
        /// Calibration artifact produced by `calibrate`.
        #[arg(long)]
        calibration: PathBuf,
        /// Rewritten artifact including the cached map (may equal the
        /// input path).
        #[arg(long)]
        output: PathBuf,
        /// Balance parameter: omit for the identity-target policy,
        /// 0 crops to valid pixels, 1 keeps the full source frame.
        #[arg(long)]
        alpha: Option<f64>,
        /// Write a quantized 16-bit map visualization PNG.
        #[arg(long)]
        preview: Option<PathBuf>,
        /// Undistort this example image next to the preview.
        #[arg(long)]
        example: Option<PathBuf>,
    },
    /// Rectify a stored left/right pair through stereo maps.
    Rectify {
        /// Stereo map artifact (gzipped JSON).
        #[arg(long)]
        maps: PathBuf,
        #[arg(long)]
        left: PathBuf,
        #[arg(long)]
        right: PathBuf,
        #[arg(long)]
        out_left: PathBuf,
        #[arg(long)]
        out_right: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    stereo_calib::core::init_with_level(level)?;

    match cli.command {
        Command::Calibrate {
            images,
            output,
            camera,
            cols,
            rows,
            square_size,
            debug_dir,
        } => {
            let options = PipelineOptions {
                board: ChessboardSpec {
                    inner_cols: cols,
                    inner_rows: rows,
                    square_size_m: square_size,
                },
                ..PipelineOptions::default()
            }
            .with_camera_label(camera);

            let mut debug_observer;
            let mut null_observer = NullObserver;
            let observer: &mut dyn CalibrationObserver = match debug_dir {
                Some(dir) => {
                    debug_observer = DebugDumpObserver::new(dir)?;
                    &mut debug_observer
                }
                None => &mut null_observer,
            };

            let calibration = calibrate_and_store(&images, &output, &options, observer)?;
            println!(
                "calibrated {} views, rms = {:.4} px -> {}",
                calibration.poses.len(),
                calibration.reprojection_rms,
                output.display()
            );
        }
        Command::BuildMaps {
            calibration,
            output,
            alpha,
            preview,
            example,
        } => {
            let mut record = store::load_calibration(&calibration)?;
            let policy = match alpha {
                Some(alpha) => UndistortPolicy::Balanced { alpha },
                None => UndistortPolicy::Identity,
            };
            let map = build_undistort_map(
                &record.calibration,
                record.calibration.resolution,
                policy,
            )?;

            if let Some(preview_path) = preview {
                write_map_preview(&map.table, &preview_path)?;
                println!("map preview -> {}", preview_path.display());
            }
            if let Some(example_path) = example {
                let src = image::ImageReader::open(&example_path)?.decode()?.to_luma8();
                let out = stereo_calib::rectify::remap(
                    &stereo_calib::detect::gray_view(&src),
                    &map.table,
                    stereo_calib::InterpolationMode::Bicubic,
                    0,
                );
                let out_img =
                    image::GrayImage::from_raw(out.width as u32, out.height as u32, out.data)
                        .expect("remap output dimensions");
                let out_path = example_path.with_extension("undistorted.png");
                out_img.save(&out_path)?;
                println!("undistorted example -> {}", out_path.display());
            }

            let region = map.valid_region;
            record.undistort_map = Some(map);
            store::save_calibration(&output, &record)?;
            println!(
                "maps cached (valid region {}x{}+{}+{}) -> {}",
                region.width,
                region.height,
                region.x,
                region.y,
                output.display()
            );
        }
        Command::Rectify {
            maps,
            left,
            right,
            out_left,
            out_right,
        } => {
            let maps = store::load_stereo_maps(&maps)?;
            let rectifier = StereoRectifier::new(maps);

            let left_img = image::ImageReader::open(&left)?.decode()?.to_luma8();
            let right_img = image::ImageReader::open(&right)?.decode()?.to_luma8();

            let (rect_left, rect_right) = rectifier.rectify_pair(
                &stereo_calib::detect::gray_view(&left_img),
                &stereo_calib::detect::gray_view(&right_img),
            )?;

            save_gray(rect_left, &out_left)?;
            save_gray(rect_right, &out_right)?;
            println!(
                "rectified pair -> {}, {}",
                out_left.display(),
                out_right.display()
            );
        }
    }

    Ok(())
}

fn save_gray(img: stereo_calib::GrayImage, path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let out = image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data)
        .expect("remap output dimensions");
    out.save(path)?;
    Ok(())
}

/// Quantized map visualization: x plane in red, y plane in green, the
/// blue channel left empty, as a 16-bit PNG.
fn write_map_preview(
    table: &stereo_calib::RemapTable,
    path: &PathBuf,
) -> Result<(), Box<dyn Error>> {
    let (plane_x, plane_y) = quantize_map_for_preview(table);
    let mut buf = Vec::with_capacity(table.width * table.height * 3);
    for (x, y) in plane_x.iter().zip(&plane_y) {
        buf.extend_from_slice(&[*x, *y, 0]);
    }
    let img = image::ImageBuffer::<image::Rgb<u16>, Vec<u16>>::from_raw(
        table.width as u32,
        table.height as u32,
        buf,
    )
    .expect("preview dimensions");
    img.save(path)?;
    Ok(())
}
