//! `residue-table`: print the residue classes mod 2^k that survive the sieve,
//! with the closed form each one collapses to.

use clap::Parser;
use residue_sieve::{derive, Form, ResidueRule, MAX_BITS};
use serde::Serialize;

/// Derive and print the Collatz residue sieve table.
#[derive(Parser)]
#[command(name = "residue-table", about = "Derive the residue classes a Collatz scan must test")]
struct Args {
    /// Sieve depth k; residues are taken mod 2^k.
    #[arg(long, default_value_t = 8)]
    bits: u32,

    /// Emit JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct TableReport<'a> {
    bits: u32,
    modulus: u64,
    survivors: usize,
    rules: &'a [ResidueRule],
}

fn pattern_string(rule: &ResidueRule, bits: u32) -> String {
    (0..bits)
        .map(|s| if rule.pattern & (1 << s) != 0 { '1' } else { '0' })
        .collect()
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let Some(rules) = derive(args.bits) else {
        eprintln!("Error: --bits must be between 1 and {}", MAX_BITS);
        std::process::exit(1);
    };
    let modulus = 1u64 << args.bits;
    log::debug!("derived {} survivors mod {}", rules.len(), modulus);

    if args.json {
        let report = TableReport {
            bits: args.bits,
            modulus,
            survivors: rules.len(),
            rules: &rules,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!(
        "{:>4}  {:<16} {:<20} {:>6} {:>6}  {}",
        "#", "form", "forced", "odd", "steps", "pattern"
    );
    println!("{}", "-".repeat(72));
    for (count, rule) in rules.iter().enumerate() {
        let start = Form::new(modulus as u128, rule.residue as u128);
        let end = Form::new(rule.multiplier as u128, rule.offset as u128);
        println!(
            "{:>4}  {:<16} {:<20} {:>6} {:>6}  {}",
            count + 1,
            start.to_string(),
            end.to_string(),
            rule.odd_steps,
            rule.steps,
            pattern_string(rule, args.bits)
        );
    }
    println!();
    println!(
        "{} of every {} residues need testing ({:.2}% skipped).",
        rules.len(),
        modulus,
        100.0 * (modulus as f64 - rules.len() as f64) / modulus as f64
    );
}
