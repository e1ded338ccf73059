//! spicemos command-line bench.
//!
//! Loads a JSON device card, drives the four terminals from ideal sources
//! and reports operating-point values, DC sweeps or AC admittances.

mod card;
mod logger;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use num_complex::Complex64;
use spicemos_devices::{InstanceParam, InstanceQuery, ModelParam};
use spicemos_solver::ac::log_frequencies;

use crate::card::{Bias, Card, DEVICE, SOURCES};
use crate::output::{Format, Report, Table};

#[derive(Parser)]
#[command(name = "spicemos")]
#[command(about = "Evaluate SPICE MOSFET models (levels 1, 2, 3 and 6) on a test bench")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct BiasArgs {
    /// Drain voltage (V)
    #[arg(long, default_value = "5.0", allow_hyphen_values = true)]
    vd: f64,

    /// Gate voltage (V)
    #[arg(long, default_value = "2.0", allow_hyphen_values = true)]
    vg: f64,

    /// Source voltage (V)
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    vs: f64,

    /// Bulk voltage (V)
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    vb: f64,
}

impl From<BiasArgs> for Bias {
    fn from(a: BiasArgs) -> Self {
        Bias {
            vd: a.vd,
            vg: a.vg,
            vs: a.vs,
            vb: a.vb,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the operating point and print every device query
    Op {
        /// Path to the JSON device card
        card: PathBuf,

        #[command(flatten)]
        bias: BiasArgs,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Sweep one terminal source and tabulate currents and conductances
    Sweep {
        card: PathBuf,

        #[command(flatten)]
        bias: BiasArgs,

        /// Source to sweep: vd, vg, vs or vb
        #[arg(long, default_value = "vg")]
        source: String,

        #[arg(long, allow_hyphen_values = true)]
        start: f64,

        #[arg(long, allow_hyphen_values = true)]
        stop: f64,

        #[arg(long)]
        step: f64,

        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },

    /// Gate-driven AC sweep reporting drain and gate admittances
    Ac {
        card: PathBuf,

        #[command(flatten)]
        bias: BiasArgs,

        #[arg(long, default_value = "1e3")]
        fstart: f64,

        #[arg(long, default_value = "1e10")]
        fstop: f64,

        /// Number of logarithmically spaced points
        #[arg(long, default_value = "21")]
        points: usize,

        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },

    /// List model, instance and query names
    Params,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let result = match cli.command {
        Commands::Op { card, bias, format } => cmd_op(card, bias.into(), format),
        Commands::Sweep {
            card,
            bias,
            source,
            start,
            stop,
            step,
            format,
        } => cmd_sweep(card, bias.into(), &source, (start, stop, step), format),
        Commands::Ac {
            card,
            bias,
            fstart,
            fstop,
            points,
            format,
        } => cmd_ac(card, bias.into(), (fstart, fstop, points), format),
        Commands::Params => {
            cmd_params();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_op(path: PathBuf, bias: Bias, format: Format) -> Result<()> {
    let card = Card::read(&path)?;
    let mut circuit = card.bench(bias)?;
    let op = circuit.operating_point().context("operating point")?;
    log::info!("operating point converged in {} iterations", op.iterations);

    let mut report = Report::default();
    for &q in InstanceQuery::ALL {
        report.insert(q.name(), circuit.query(DEVICE, q)?);
    }
    print!("{}", report.render(format)?);
    Ok(())
}

/// Values from `start` to `stop` inclusive in increments of `step`.
fn sweep_values(start: f64, stop: f64, step: f64) -> Result<Vec<f64>> {
    if step == 0.0 || !step.is_finite() || (stop - start) * step < 0.0 {
        bail!("step {step} does not move from {start} towards {stop}");
    }
    let count = ((stop - start) / step + 1e-9).floor() as usize + 1;
    Ok((0..count).map(|i| start + step * i as f64).collect())
}

fn cmd_sweep(
    path: PathBuf,
    bias: Bias,
    source: &str,
    (start, stop, step): (f64, f64, f64),
    format: Format,
) -> Result<()> {
    if !SOURCES.contains(&source) {
        bail!("source must be one of {SOURCES:?}, got {source:?}");
    }
    let card = Card::read(&path)?;
    let mut circuit = card.bench(bias)?;
    let columns = [
        InstanceQuery::Id,
        InstanceQuery::Gm,
        InstanceQuery::Gds,
        InstanceQuery::Gmbs,
        InstanceQuery::Von,
        InstanceQuery::Vdsat,
    ];
    let mut table = Table::new(std::iter::once(source).chain(columns.iter().map(|q| q.name())));
    for value in sweep_values(start, stop, step)? {
        circuit
            .dc_sweep(source, &[value])
            .with_context(|| format!("{source} = {value}"))?;
        let mut row = vec![value];
        for q in columns {
            row.push(circuit.query(DEVICE, q)?);
        }
        table.push(row);
    }
    print!("{}", table.render(format)?);
    Ok(())
}

fn cmd_ac(
    path: PathBuf,
    bias: Bias,
    (fstart, fstop, points): (f64, f64, usize),
    format: Format,
) -> Result<()> {
    let card = Card::read(&path)?;
    let mut circuit = card.bench(bias)?;
    let frequencies = log_frequencies(fstart, fstop, points)?;
    let solution = circuit.ac(&frequencies)?;
    let drain = circuit.branch("vd")?;
    let gate = circuit.branch("vg")?;

    let mut table = Table::new(["freq", "y21_mag", "y21_deg", "y11_mag", "y11_deg"]);
    for point in &solution {
        // Branch currents flow into the source's positive node, so the
        // terminal current is the negative.
        let y21: Complex64 = -point.voltage(drain);
        let y11: Complex64 = -point.voltage(gate);
        table.push(vec![
            point.frequency,
            y21.norm(),
            y21.arg().to_degrees(),
            y11.norm(),
            y11.arg().to_degrees(),
        ]);
    }
    print!("{}", table.render(format)?);
    Ok(())
}

fn cmd_params() {
    let names = |list: Vec<&'static str>| list.join(" ");
    println!("model:    {}", names(ModelParam::ALL.iter().map(|p| p.name()).collect()));
    println!("instance: {}", names(InstanceParam::ALL.iter().map(|p| p.name()).collect()));
    println!("query:    {}", names(InstanceQuery::ALL.iter().map(|p| p.name()).collect()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_values_inclusive() {
        let v = sweep_values(0.0, 1.0, 0.25).unwrap();
        assert_eq!(v.len(), 5);
        assert!((v[4] - 1.0).abs() < 1e-12);
        let down = sweep_values(1.0, 0.0, -0.5).unwrap();
        assert_eq!(down, vec![1.0, 0.5, 0.0]);
        assert!(sweep_values(0.0, 1.0, -0.1).is_err());
        assert!(sweep_values(0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "spicemos", "-vv", "sweep", "card.json", "--vd", "-1", "--start", "0", "--stop",
            "-3", "--step", "-0.1",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Sweep { bias, stop, .. } => {
                assert_eq!(bias.vd, -1.0);
                assert_eq!(stop, -3.0);
            }
            _ => panic!("expected sweep"),
        }
    }
}
