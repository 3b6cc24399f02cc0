use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use nexus_cli::{annotate_match, init_logging, ConsoleSink, Preset};
use nexus_core::init_thread_pool;
use nexus_scan::{compare_images, ScanConfig, ScanOutcome, Scanner};

#[derive(Parser, Debug)]
#[command(name = "nexus", about = "Find images that look like a source image")]
struct Cli {
    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score every image in a directory against a source image.
    Scan {
        /// Image to look for
        #[arg(long)]
        source: PathBuf,
        /// Directory of candidate images
        #[arg(long)]
        dir: PathBuf,
        /// Scan settings (.toml or .json)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Detector preset, replaces the detector section of the config file
        #[arg(long, value_enum)]
        preset: Option<Preset>,
        /// Lowe ratio for descriptor matching, overrides the config file
        #[arg(long)]
        ratio: Option<f32>,
        /// Minimum match percentage, overrides the config file
        #[arg(long)]
        threshold: Option<f64>,
        /// Save outlined copies of matching images here
        #[arg(long)]
        annotate_dir: Option<PathBuf>,
    },

    /// Score one image against another.
    Compare {
        source: PathBuf,
        candidate: PathBuf,
        /// Scan settings (.toml or .json)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Detector preset, replaces the detector section of the config file
        #[arg(long, value_enum)]
        preset: Option<Preset>,
    },

    /// Write or inspect a settings file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write the default settings to a new file
    Init {
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the settings a file resolves to, defaults filled in
    Show { path: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Scan { source, dir, config, preset, ratio, threshold, annotate_dir } => {
            let mut cfg = load_config(config.as_ref(), preset)?;
            if let Some(ratio) = ratio {
                cfg.ratio_test_threshold = ratio;
            }
            if let Some(threshold) = threshold {
                cfg.match_percentage_threshold = threshold;
            }
            cmd_scan(cfg, source, dir, annotate_dir)?;
        }
        Commands::Compare { source, candidate, config, preset } => {
            let cfg = load_config(config.as_ref(), preset)?;
            cmd_compare(&cfg, &source, &candidate)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => {
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                ScanConfig::default()
                    .save(&path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Wrote default settings to {}", path.display());
            }
            ConfigAction::Show { path } => {
                let cfg = ScanConfig::load(&path)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                println!("{}", cfg.to_toml()?);
            }
        },
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>, preset: Option<Preset>) -> anyhow::Result<ScanConfig> {
    let mut cfg = match path {
        Some(path) => ScanConfig::load(path).with_context(|| format!("failed to load {}", path.display()))?,
        None => ScanConfig::default(),
    };
    if let Some(preset) = preset {
        cfg.detector = preset.apply(cfg.detector).context("invalid detector preset")?;
    }
    Ok(cfg)
}

fn cmd_scan(cfg: ScanConfig, source: PathBuf, dir: PathBuf, annotate_dir: Option<PathBuf>) -> anyhow::Result<()> {
    if let Err(e) = init_thread_pool(cfg.detector.n_threads) {
        log::warn!("using existing thread pool: {}", e);
    }
    let scanner = Scanner::new(cfg).context("invalid scan settings")?;

    let t0 = Instant::now();
    let stdout = std::io::stdout();
    let mut sink = ConsoleSink::new(stdout.lock());
    let outcome = scanner.scan(Some(source.as_path()), Some(dir.as_path()), &mut sink)?;
    let elapsed = t0.elapsed();

    if outcome == ScanOutcome::NotStarted {
        return Ok(());
    }

    let ranked = sink.ranked();
    drop(sink);

    println!("\nTime taken: {:.2?}", elapsed);
    if ranked.is_empty() {
        println!("No similar images found.");
    } else {
        println!("Similar images, best first:");
        for (rank, m) in ranked.iter().enumerate() {
            println!("{:>3}. {:6.2}%  {}", rank + 1, m.percentage, m.path.display());
        }
    }

    if let Some(out_dir) = annotate_dir {
        for m in &ranked {
            match annotate_match(m, &out_dir) {
                Ok(Some(path)) => println!("Saved {}", path.display()),
                Ok(None) => {}
                Err(e) => log::warn!("cannot annotate {}: {}", m.path.display(), e),
            }
        }
    }

    Ok(())
}

fn cmd_compare(cfg: &ScanConfig, source: &Path, candidate: &Path) -> anyhow::Result<()> {
    let t0 = Instant::now();
    let cmp = compare_images(source, candidate, cfg)?;

    println!("Time taken: {:.2?}", t0.elapsed());
    println!("Source keypoints:    {}", cmp.source_keypoints);
    println!("Candidate keypoints: {}", cmp.candidate_keypoints);
    println!("Correspondences:     {}", cmp.correspondences);
    println!("Similarity:          {:.2}%", cmp.percentage);
    if let Some(r) = cmp.region {
        println!(
            "Matched region:      ({:.0}, {:.0}) - ({:.0}, {:.0})",
            r.min_x, r.min_y, r.max_x, r.max_y
        );
    }
    if cmp.percentage > cfg.match_percentage_threshold {
        println!("Verdict: similar (above {:.1}%)", cfg.match_percentage_threshold);
    } else {
        println!("Verdict: not similar (at or below {:.1}%)", cfg.match_percentage_threshold);
    }
    Ok(())
}
