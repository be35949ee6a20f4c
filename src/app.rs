//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - reads TextGrid/PitchTier inputs and runs the fit
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use log::info;

use crate::cli::{Cli, Command, FitArgs, PlotArgs, SynthArgs};
use crate::data::{SynthSpec, generate_contour};
use crate::domain::FitConfig;
use crate::error::AppError;

pub mod pipeline;

/// Largest residuals listed under the summary.
const RESIDUAL_ROWS: usize = 5;

/// Entry point for the `tam` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` may carry RUST_LOG, so it is loaded before the logger.
    dotenvy::dotenv().ok();
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).try_init();

    let cli = Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Synth(args) => handle_synth(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(
            &run.boundaries,
            run.observed.len(),
            &run.parameters,
            run.onset,
            &run.targets,
            &run.quality,
        )
    );
    println!(
        "{}",
        crate::report::format_residuals(&crate::report::largest_residuals(&run.residuals, RESIDUAL_ROWS))
    );

    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &run.observed,
            &run.fitted,
            &run.boundaries,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_gesture {
        crate::io::write_gesture_file(path, run.onset, &run.targets)?;
        info!("Wrote gestural score to '{}'", path.display());
    }
    if let Some(path) = &config.export_csv {
        crate::io::write_targets_csv(path, run.onset, &run.targets)?;
        info!("Wrote targets CSV to '{}'", path.display());
    }
    if let Some(path) = &config.export_pitch_tier {
        crate::io::write_pitch_tier(path, &run.fitted)?;
        info!("Wrote fitted PitchTier to '{}'", path.display());
    }
    if let Some(path) = &config.export_json {
        crate::io::write_report_json(path, &pipeline::build_report(&run))?;
        info!("Wrote report JSON to '{}'", path.display());
    }

    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let contour = generate_contour(&synth_spec_from_args(&args))?;

    crate::io::write_pitch_tier(&args.out, &contour.signal)?;
    if let Some(path) = &args.boundaries_out {
        crate::io::write_boundary_list(path, &contour.boundaries)?;
    }

    println!(
        "Wrote {} samples ({} segments) to '{}'",
        contour.signal.len(),
        contour.targets.len(),
        args.out.display()
    );
    println!("{}", crate::report::format_targets(&contour.targets));
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let report = crate::io::read_report_json(&args.report)?;
    let plot = crate::plot::render_ascii_plot_from_report(&report, args.width, args.height);
    println!("{plot}");
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        textgrid_path: args.textgrid.clone(),
        pitch_tier_path: args.pitch_tier.clone(),

        delta_slope: args.m_range,
        delta_offset: args.b_range,
        delta_tau: args.t_range,
        weight_slope: args.m_weight,
        weight_offset: args.b_weight,
        weight_tau: args.t_weight,
        lambda: args.lambda,
        mean_slope: args.mean_slope,
        mean_offset: args.mean_offset,
        mean_tau: args.mean_tau,

        extra_restarts: args.restarts,
        seed: args.seed,
        filter_order: args.order,
        max_evaluations: args.max_evals,
        output_rate: args.output_rate,

        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,

        export_gesture: args.gesture.clone(),
        export_csv: args.csv.clone(),
        export_pitch_tier: args.pitch_tier_out.clone(),
        export_json: args.export_json.clone(),
    }
}

pub fn synth_spec_from_args(args: &SynthArgs) -> SynthSpec {
    SynthSpec {
        boundaries: args.boundaries.clone(),
        onset_value: args.onset,
        slopes: args.slopes.clone(),
        offsets: args.offsets.clone(),
        taus: args.taus.clone(),
        sample_rate: args.rate,
        noise_std: args.noise,
        seed: args.seed,
        filter_order: args.order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_is_on_by_default() {
        let cli = Cli::parse_from(["tam", "fit", "a", "b"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit subcommand");
        };
        assert!(fit_config_from_args(&args).plot);
    }

    #[test]
    fn no_plot_flag_wins() {
        let cli = Cli::parse_from(["tam", "fit", "a", "b", "--no-plot", "--lambda", "0.5", "-g", "out.ges"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit subcommand");
        };
        let config = fit_config_from_args(&args);
        assert!(!config.plot);
        assert_eq!(config.lambda, 0.5);
        assert_eq!(config.export_gesture.as_deref(), Some(std::path::Path::new("out.ges")));
        assert_eq!(config.mean_offset, None);
    }

    #[test]
    fn synth_defaults_reproduce_two_segment_scenario() {
        let cli = Cli::parse_from(["tam", "synth", "-o", "x.PitchTier"]);
        let Command::Synth(args) = cli.command else {
            panic!("expected synth subcommand");
        };
        let contour = generate_contour(&synth_spec_from_args(&args)).unwrap();
        assert_eq!(contour.signal.len(), 101);
        assert_eq!(contour.targets[1].offset, 105.0);
    }
}
