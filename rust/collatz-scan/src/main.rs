//! `collatz-scan`: search a range of chunk indices for Collatz counterexamples.
//!
//! Chunk `i` covers the integers `[256i, 256i + 256)`.
//!
//! Exit codes:
//! - 0: scan completed, every start value fell
//! - 1: invalid range or configuration (nothing was evaluated)
//! - 2: a start value could not be shown to fall; it is printed on stdout

use clap::{Parser, ValueEnum};
use collatz_core::{Limits, Width};
use collatz_scan::{
    default_threads, scan, ScanConfig, ScanOutcome, Schedule, Sieve, DEFAULT_DYNAMIC_BLOCK,
    DEFAULT_STATIC_BLOCK,
};

const EXIT_OK: i32 = 0;
const EXIT_INVALID: i32 = 1;
const EXIT_FINDING: i32 = 2;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    Static,
    Dynamic,
}

/// Scan chunk indices [lower, upper) for Collatz counterexamples.
#[derive(Parser, Debug)]
#[command(name = "collatz-scan", version, about)]
struct Args {
    /// First chunk index (inclusive).
    #[arg(long)]
    lower: u128,

    /// Last chunk index (exclusive).
    #[arg(long)]
    upper: u128,

    /// Worker threads (default: available parallelism).
    #[arg(long)]
    threads: Option<usize>,

    /// Integer width: 64, 128 or arbitrary.
    #[arg(long, default_value = "64")]
    width: Width,

    /// Test all 256 integers per chunk instead of the 19 surviving residues.
    #[arg(long)]
    unfiltered: bool,

    /// Work distribution policy.
    #[arg(long, value_enum, default_value_t = Policy::Dynamic)]
    schedule: Policy,

    /// Chunk indices per scheduling block (default: 512 static, 1024 dynamic).
    #[arg(long)]
    block: Option<u64>,

    /// Give up on a start value after this many 3n+1 steps.
    #[arg(long, default_value_t = Limits::default().max_odd_steps)]
    max_steps: u64,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn config(&self) -> ScanConfig {
        let schedule = match self.schedule {
            Policy::Static => Schedule::Static {
                block: self.block.unwrap_or(DEFAULT_STATIC_BLOCK),
            },
            Policy::Dynamic => Schedule::Dynamic {
                block: self.block.unwrap_or(DEFAULT_DYNAMIC_BLOCK),
            },
        };
        let sieve = if self.unfiltered {
            Sieve::Unfiltered
        } else {
            Sieve::Residues
        };
        ScanConfig::new(self.lower, self.upper)
            .with_threads(self.threads.unwrap_or_else(default_threads))
            .with_width(self.width)
            .with_sieve(sieve)
            .with_schedule(schedule)
            .with_limits(Limits {
                max_odd_steps: self.max_steps,
            })
    }
}

fn main() {
    env_logger::init();
    // Usage errors share exit code 1 with range errors; 2 is reserved for findings.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_INVALID } else { EXIT_OK };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    let config = args.config();
    log::debug!("{:?}", config);

    if !args.json {
        println!("Computing on {} threads...", config.threads);
    }

    let report = match scan(&config) {
        Ok(report) => report,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_INVALID);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: failed to serialize report: {}", e),
        }
    } else {
        println!(
            "Scanned chunks [{}, {}): {} chunks, {} candidates in {:.3}s ({:.0}/s)",
            report.lower,
            report.upper,
            report.chunks_scanned,
            report.candidates_tested,
            report.elapsed.as_secs_f64(),
            report.throughput()
        );
        if report.escalations > 0 {
            println!("Re-checked {} overflows in arbitrary precision", report.escalations);
        }
    }

    let code = match report.outcome() {
        ScanOutcome::Completed => {
            if !args.json {
                println!("No counterexample found.");
            }
            EXIT_OK
        }
        ScanOutcome::Finding => {
            if let Some(finding) = &report.finding {
                if !args.json {
                    println!("counterexample candidate: {}", finding.start);
                    println!("  {}", finding);
                }
            }
            EXIT_FINDING
        }
        ScanOutcome::Cancelled => EXIT_OK,
    };
    std::process::exit(code);
}
