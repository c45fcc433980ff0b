//! Synthetic Tandem Repeat Table Generator
//!
//! Writes a random annotated TR table with every column both classifiers
//! need, for load-testing `rexprt-score`.

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rexprt_scorer::schema::all_feature_columns;
use rexprt_scorer::types::ID_COLUMNS;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gen-records", about = "Generate a synthetic annotated tandem repeat table")]
struct Args {
    /// Number of records to generate
    #[arg(short, long, default_value_t = 100_000)]
    rows: usize,

    /// Output table
    #[arg(short, long, default_value = "final_annotated.txt")]
    output: PathBuf,

    /// RNG seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Fraction of feature values written as NA
    #[arg(long, default_value_t = 0.0)]
    na_rate: f64,
}

const CHROMOSOMES: [&str; 24] = [
    "chr1", "chr2", "chr3", "chr4", "chr5", "chr6", "chr7", "chr8", "chr9", "chr10", "chr11",
    "chr12", "chr13", "chr14", "chr15", "chr16", "chr17", "chr18", "chr19", "chr20", "chr21",
    "chr22", "chrX", "chrY",
];

const GENES: [&str; 8] = ["HTT", "FMR1", "DMPK", "ATXN1", "ATXN3", "C9orf72", "FXN", "CACNA1A"];

/// Record generator for load testing
struct RecordGenerator {
    rng: StdRng,
    features: Vec<&'static str>,
    na_rate: f64,
}

impl RecordGenerator {
    fn new(seed: u64, na_rate: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            features: all_feature_columns(),
            na_rate: na_rate.clamp(0.0, 1.0),
        }
    }

    fn header(&self) -> String {
        ID_COLUMNS
            .iter()
            .chain(self.features.iter())
            .copied()
            .collect::<Vec<_>>()
            .join("\t")
    }

    fn generate(&mut self, idx: usize) -> String {
        let chr = self.random_choice(&CHROMOSOMES);
        let start: u64 = self.rng.gen_range(10_000..200_000_000);
        let motif = self.random_motif();
        let end = start + motif.len() as u64 * self.rng.gen_range(3..60);
        let gene = self.random_choice(&GENES);

        let mut fields = vec![
            chr.to_string(),
            start.to_string(),
            end.to_string(),
            motif,
            format!("S{:05}", idx % 500),
            gene.to_string(),
        ];

        let features = self.features.clone();
        let composition = self.random_composition();
        for column in features {
            fields.push(self.feature_value(column, &composition));
        }

        fields.join("\t")
    }

    fn feature_value(&mut self, column: &str, composition: &[f64; 4]) -> String {
        if self.rng.gen_bool(self.na_rate) {
            return "NA".to_string();
        }
        match column {
            "per_a" => format!("{:.4}", composition[0]),
            "per_c" => format!("{:.4}", composition[1]),
            "per_g" => format!("{:.4}", composition[2]),
            "per_t" => format!("{:.4}", composition[3]),
            "gerp" => format!("{:.3}", self.rng.gen_range(-12.0..6.0)),
            "loeuf" => format!("{:.3}", self.rng.gen_range(0.0..2.0)),
            "pLi" | "gc_content" => format!("{:.4}", self.rng.gen_range(0.0..1.0)),
            "gene_distance" => self.rng.gen_range(0..100_000).to_string(),
            // indicator columns
            _ => u8::from(self.rng.gen_bool(0.2)).to_string(),
        }
    }

    /// Base fractions (a, c, g, t) summing to 1.
    fn random_composition(&mut self) -> [f64; 4] {
        let raw: [f64; 4] = [
            self.rng.gen_range(0.0..1.0),
            self.rng.gen_range(0.0..1.0),
            self.rng.gen_range(0.0..1.0),
            self.rng.gen_range(0.0..1.0),
        ];
        let total: f64 = raw.iter().sum::<f64>().max(f64::EPSILON);
        raw.map(|x| x / total)
    }

    fn random_motif(&mut self) -> String {
        let len = self.rng.gen_range(1..=6);
        (0..len)
            .map(|_| self.random_choice(&["A", "C", "G", "T"]))
            .collect()
    }

    fn random_choice(&mut self, choices: &[&'static str]) -> &'static str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gen_records=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!(
        rows = args.rows,
        output = %args.output.display(),
        seed = args.seed,
        na_rate = args.na_rate,
        "Generating synthetic tandem repeat table"
    );

    let mut generator = RecordGenerator::new(args.seed, args.na_rate);
    let mut out = BufWriter::new(File::create(&args.output)?);
    writeln!(out, "{}", generator.header())?;

    for i in 0..args.rows {
        writeln!(out, "{}", generator.generate(i))?;
        if (i + 1) % 100_000 == 0 {
            info!("Generated {}/{} records", i + 1, args.rows);
        }
    }
    out.flush()?;

    info!("Completed! Wrote {} records to {}", args.rows, args.output.display());
    Ok(())
}
