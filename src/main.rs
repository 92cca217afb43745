mod augment;
mod camera;
mod cli;
mod dataset;
mod draw;
mod error;
mod external;
mod importer;
mod labeler;
mod logging;
mod manifest;
mod operator;
mod pipeline;
mod status;
#[cfg(test)]
mod test_support;
mod train;

use anyhow::{Context, Result};
use camera::{enumerate_cameras, CameraBackend, CommandCamera, ReplayCamera};
use clap::Parser;
use cli::{CameraArgs, CamerasArgs, Command, RootArgs, RunArgs, StatusArgs};
use external::{resolve_program, CommandDetector, CommandPredictorFactory, CommandTrainer};
use operator::ConsoleOperator;
use pipeline::{run_pipeline, Collaborators};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    match args.command {
        Command::Run(args) => cmd_run(&args),
        Command::Cameras(args) => cmd_cameras(&args),
        Command::Status(args) => cmd_status(&args),
    }
}

fn camera_backend(args: &CameraArgs) -> Result<Box<dyn CameraBackend>> {
    match &args.camera_dir {
        Some(dir) => Ok(Box::new(ReplayCamera::new(dir.clone()))),
        None => {
            let command = args.camera_command();
            resolve_program("camera", &command)?;
            Ok(Box::new(CommandCamera::new(&command)))
        }
    }
}

fn cmd_run(args: &RunArgs) -> Result<()> {
    logging::init(args.verbose)?;
    operator::install_interrupt_handler()?;

    let config = args.to_config();
    config.validate()?;
    config.commands.check_programs(config.inference)?;

    let mut camera = camera_backend(&args.camera_args)?;
    let mut detector = CommandDetector::new(&config.commands.detector);
    let mut trainer = CommandTrainer::new(&config.commands.trainer);
    let mut predictors = CommandPredictorFactory::new(&config.commands.predictor);
    let mut console = ConsoleOperator::new();

    let report = run_pipeline(
        &config,
        Collaborators {
            camera: camera.as_mut(),
            detector: &mut detector,
            trainer: &mut trainer,
            predictors: &mut predictors,
            operator: &mut console,
        },
    )?;

    println!("Working folder: {}", report.folder.display());
    println!("Classes: {}", report.classes.join(", "));
    if let Some(training) = &report.training {
        println!("AP50: {:.3}", training.verdict.metric());
    }
    match report.weights() {
        Some(weights) => println!("Accepted weights: {}", weights.display()),
        None => println!("No weights accepted."),
    }
    Ok(())
}

fn cmd_cameras(args: &CamerasArgs) -> Result<()> {
    logging::init(args.verbose)?;
    let mut backend = camera_backend(&args.camera_args)?;
    let cameras = enumerate_cameras(backend.as_mut(), args.camera_args.camera_range);
    if args.json {
        let text = serde_json::to_string_pretty(&cameras).context("serialize cameras")?;
        println!("{text}");
    } else if cameras.is_empty() {
        println!("No cameras found.");
    } else {
        for index in cameras {
            println!("{index}");
        }
    }
    Ok(())
}

fn cmd_status(args: &StatusArgs) -> Result<()> {
    logging::init(args.verbose)?;
    let summary = status::folder_status(&args.folder)?;
    if args.json {
        let text = serde_json::to_string_pretty(&summary).context("serialize status")?;
        println!("{text}");
    } else {
        print!("{}", status::render_text(&summary));
    }
    Ok(())
}
