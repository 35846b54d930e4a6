use tigrillo::config::{CpgConfig, Integrator};
use tigrillo::decoder::{build_oscillator_network, decode, DecoderMode};
use tigrillo::error::{CpgError, Result};
use tracing::{info, warn};

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" || args[1] == "help" {
        print_help();
        return;
    }

    let result = match args[1].as_str() {
        "decode" => run_decode(&args[2..]),
        "trace" => run_trace(&args[2..]),
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_help() {
    println!("tigrillo (quadruped CPG controller)");
    println!("usage:");
    println!("  tigrillo decode <v,v,...> [--normalized]");
    println!("  tigrillo trace <v,v,...> [--normalized] [--duration S] [--rate HZ] [--config FILE]");
    println!("  tigrillo help");
    println!();
    println!("Genomes have 12 values (full) or 8 values (bound gait).");
    println!("--normalized reads values in [0,1] against the default search bounds.");
    println!("TIGRILLO_INTEGRATOR=euler|rk4 overrides the configured integrator.");
}

fn parse_genome(arg: Option<&String>) -> Result<Vec<f64>> {
    let arg = arg.ok_or_else(|| CpgError::configuration("genome", "missing value list"))?;
    arg.split(',')
        .map(|v| {
            v.trim().parse::<f64>().map_err(|_| {
                CpgError::configuration("genome", format!("cannot parse '{}' as a number", v.trim()))
            })
        })
        .collect()
}

/// Physical genome from the first argument, mapping it out of the unit box
/// when `--normalized` is given.
fn read_genome(args: &[String]) -> Result<Vec<f64>> {
    let values = parse_genome(args.first())?;
    if !args.iter().any(|a| a == "--normalized") {
        return Ok(values);
    }
    let bounds = DecoderMode::from_genome_len(values.len())?.default_bounds();
    bounds.denormalize_clamped(&values)
}

fn parse_flag(args: &[String], name: &'static str) -> Result<Option<String>> {
    match args.iter().position(|a| a == name) {
        None => Ok(None),
        Some(i) => args
            .get(i + 1)
            .cloned()
            .map(Some)
            .ok_or_else(|| CpgError::configuration(name, "missing value")),
    }
}

fn parse_number(args: &[String], name: &'static str, default: f64) -> Result<f64> {
    match parse_flag(args, name)? {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| CpgError::configuration(name, format!("cannot parse '{v}' as a number"))),
    }
}

fn load_config(args: &[String]) -> Result<CpgConfig> {
    let mut cfg = match parse_flag(args, "--config")? {
        Some(path) => {
            info!(path = %path, "loading config");
            CpgConfig::load(path)?
        }
        None => CpgConfig::default(),
    };

    // Values: euler|rk4
    if let Ok(v) = std::env::var("TIGRILLO_INTEGRATOR") {
        match Integrator::parse(&v) {
            Some(integrator) => cfg.integrator = integrator,
            None => warn!("Unknown TIGRILLO_INTEGRATOR value: {}", v),
        }
    }
    Ok(cfg)
}

fn run_decode(args: &[String]) -> Result<()> {
    let genome = read_genome(args)?;
    let params = decode(&genome)?;
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

fn run_trace(args: &[String]) -> Result<()> {
    let genome = read_genome(args)?;
    let duration = parse_number(args, "--duration", 5.0)?;
    let rate = parse_number(args, "--rate", 100.0)?;
    let cfg = load_config(args)?;

    let mut cpg = build_oscillator_network(&genome, cfg)?;
    info!(duration, rate, integrator = ?cfg.integrator, "tracing");

    println!("t,fl,fr,bl,br");
    for (t, a) in cpg.trace(rate, duration)? {
        println!("{t:.4},{:.6},{:.6},{:.6},{:.6}", a[0], a[1], a[2], a[3]);
    }
    Ok(())
}
