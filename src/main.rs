use clap::error::ErrorKind;
use clap::Parser;
use tdoa_locator::isochrone::StrategyKind;
use tdoa_locator::report::error_json;
use tdoa_locator::{LocatorParams, TdoaError, TdoaLocator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Locate an acoustic event from its arrival times at four stations.
///
/// Prints exactly one JSON document on stdout: the location report, or `{"error": ...}`.
#[derive(Debug, Parser)]
#[command(name = "tdoa-locate")]
#[command(about = "Locate an acoustic event from arrival delays at four stations")]
struct Cli {
    /// lat1 lon1 lat2 lon2 lat3 lon3 lat4 lon4 t1 t2 t3 t4 [temperature_c]
    #[arg(value_name = "VALUES", num_args = 0.., allow_negative_numbers = true)]
    values: Vec<String>,

    /// Abscissae sampled per isochrone
    #[arg(long, default_value_t = 200)]
    samples: usize,

    /// Column root search: bracketed or grid
    #[arg(long, default_value = "bracketed")]
    strategy: StrategyKind,

    /// Cells per half-column for the grid strategy
    #[arg(long, default_value_t = 200)]
    grid_rows: usize,

    /// Tracing domain padding, as a multiple of the largest baseline
    #[arg(long, default_value_t = 3.0)]
    expansion: f64,

    /// Absolute clamp of the tracing domain around station 1 (m)
    #[arg(long, default_value_t = 20_000.0)]
    max_extent: f64,

    /// Resample every branch to this many points with a cubic spline
    #[arg(long)]
    smooth: Option<usize>,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn params(&self) -> Result<LocatorParams, TdoaError> {
        LocatorParams::builder()
            .sample_count(self.samples)
            .strategy(self.strategy)
            .grid_rows(self.grid_rows)
            .domain_expansion(self.expansion)
            .max_extent_m(self.max_extent)
            .smoothing_points(self.smooth)
            .build()
    }
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("tdoa_locator=debug,tdoa_locate=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tdoa_locator=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return;
        }
        Err(err) => {
            let rendered = err.to_string();
            let message = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ");
            let err = TdoaError::InvalidLocatorParameter(message.to_string());
            println!("{}", error_json(&err, false));
            return;
        }
    };

    init_logger(cli.verbose);
    tracing::debug!(?cli, "parsed command line");

    let json = match cli.params() {
        Ok(params) => TdoaLocator::new(params).run_to_json(&cli.values, cli.pretty),
        Err(err) => error_json(&err, cli.pretty),
    };
    println!("{json}");
}
