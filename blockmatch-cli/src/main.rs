use blockmatch::io::load_gray_image;
use blockmatch::{
    best_matches, BlockMatchError, BlockMatcher, BoundsPolicy, ComputeEnvironment, EnvConfig,
    MatchConfig, MatchResult, Offset, ReferenceBlock, VectorWidth,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Blockmatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BoundsConfig {
    #[default]
    Reject,
    MarkRejected,
}

impl From<BoundsConfig> for BoundsPolicy {
    fn from(value: BoundsConfig) -> Self {
        match value {
            BoundsConfig::Reject => BoundsPolicy::Reject,
            BoundsConfig::MarkRejected => BoundsPolicy::MarkRejected,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ReferenceJson {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SearchJson {
    radius: usize,
    step: usize,
}

impl Default for SearchJson {
    fn default() -> Self {
        Self { radius: 16, step: 1 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatchConfigJson {
    th_sse: f32,
    dist_mul: f32,
    bounds: BoundsConfig,
}

impl Default for MatchConfigJson {
    fn default() -> Self {
        let cfg = MatchConfig::default();
        Self {
            th_sse: cfg.th_sse,
            dist_mul: cfg.dist_mul,
            bounds: BoundsConfig::Reject,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EnvConfigJson {
    work_group_size: usize,
    threads: Option<usize>,
    vector_width: usize,
    local_cache_capacity: usize,
    parallel: bool,
}

impl Default for EnvConfigJson {
    fn default() -> Self {
        let cfg = EnvConfig::default();
        Self {
            work_group_size: cfg.work_group_size,
            threads: cfg.threads,
            vector_width: cfg.vector_width.lanes(),
            local_cache_capacity: cfg.local_cache_capacity,
            parallel: cfg.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    image_path: String,
    output_path: Option<String>,
    topk: usize,
    reference: ReferenceJson,
    search: SearchJson,
    #[serde(rename = "match")]
    match_cfg: MatchConfigJson,
    env: EnvConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: String::new(),
            output_path: None,
            topk: 5,
            reference: ReferenceJson::default(),
            search: SearchJson::default(),
            match_cfg: MatchConfigJson::default(),
            env: EnvConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    x: i32,
    y: i32,
    distance: f32,
}

impl From<MatchResult> for MatchRecord {
    fn from(value: MatchResult) -> Self {
        Self {
            x: value.position.x,
            y: value.position.y,
            distance: value.distance,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    device: String,
    candidates: usize,
    accepted: usize,
    best: Vec<MatchRecord>,
}

/// Dense grid of offsets around the reference position, clipped so every
/// window stays inside the image.
fn search_grid(
    cfg: &Config,
    img_width: usize,
    img_height: usize,
) -> Result<Vec<Offset>, Box<dyn std::error::Error>> {
    let r = &cfg.reference;
    let max_x = img_width.saturating_sub(r.width);
    let max_y = img_height.saturating_sub(r.height);
    let x0 = r.x.saturating_sub(cfg.search.radius);
    let y0 = r.y.saturating_sub(cfg.search.radius);
    let x1 = (r.x + cfg.search.radius).min(max_x);
    let y1 = (r.y + cfg.search.radius).min(max_y);

    let mut out = Vec::new();
    for y in (y0..=y1).step_by(cfg.search.step) {
        for x in (x0..=x1).step_by(cfg.search.step) {
            out.push(Offset::new(i32::try_from(x)?, i32::try_from(y)?));
        }
    }
    Ok(out)
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_path.is_empty() {
        return Err("image_path must be set in the config".into());
    }
    if config.topk == 0 {
        return Err("topk must be at least 1".into());
    }
    if config.search.step == 0 {
        return Err("search.step must be at least 1".into());
    }
    let vector_width = VectorWidth::from_lanes(config.env.vector_width)
        .ok_or("env.vector_width must be 1, 4 or 8")?;

    let image = load_gray_image(&config.image_path)?;
    let view = image.view();
    let r = &config.reference;
    let block = ReferenceBlock::from_view(view, r.x, r.y, r.width, r.height)?;
    let candidates = search_grid(&config, image.width(), image.height())?;

    let env = ComputeEnvironment::acquire(EnvConfig {
        work_group_size: config.env.work_group_size,
        threads: config.env.threads,
        vector_width,
        local_cache_capacity: config.env.local_cache_capacity,
        parallel: config.env.parallel,
    })?;

    let matcher = BlockMatcher::new(&env).with_config(MatchConfig {
        th_sse: config.match_cfg.th_sse,
        dist_mul: config.match_cfg.dist_mul,
        bounds: config.match_cfg.bounds.into(),
    });
    let results = matcher.match_block(&block, view, &candidates)?;
    let accepted = results.iter().filter(|r| r.is_accepted()).count();
    tracing::info!(candidates = candidates.len(), accepted, "search finished");

    let output = Output {
        device: env.device_name().to_string(),
        candidates: candidates.len(),
        accepted,
        best: best_matches(&results, config.topk)
            .into_iter()
            .map(MatchRecord::from)
            .collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.trace {
        let filter = match "blockmatch=info".parse() {
            Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
            Err(_) => EnvFilter::from_default_env(),
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return ExitCode::SUCCESS;
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return ExitCode::SUCCESS;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Environment failures carry the failing stage and, for program
            // builds, the full build log.
            if let Some(BlockMatchError::Environment { stage, reason }) =
                err.downcast_ref::<BlockMatchError>()
            {
                eprintln!("error: compute environment {stage} failed:\n{reason}");
            } else {
                eprintln!("error: {err}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{search_grid, Config};
    use blockmatch::Offset;

    #[test]
    fn config_defaults_fill_missing_sections() {
        let cfg: Config = serde_json::from_str(
            r#"{ "image_path": "a.png", "reference": { "x": 4, "y": 4, "width": 8, "height": 8 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.topk, 5);
        assert_eq!(cfg.search.radius, 16);
        assert_eq!(cfg.env.vector_width, 4);
        assert!(cfg.match_cfg.th_sse.is_infinite());
    }

    #[test]
    fn search_grid_is_clipped_to_image() {
        let cfg: Config = serde_json::from_str(
            r#"{ "image_path": "a.png",
                 "reference": { "x": 1, "y": 0, "width": 4, "height": 4 },
                 "search": { "radius": 2, "step": 1 } }"#,
        )
        .unwrap();
        let grid = search_grid(&cfg, 6, 5).unwrap();
        assert_eq!(grid.first(), Some(&Offset::new(0, 0)));
        assert_eq!(grid.last(), Some(&Offset::new(2, 1)));
        assert_eq!(grid.len(), 6);
    }

    #[test]
    fn example_config_parses() {
        let cfg: Config = serde_json::from_str(super::EXAMPLE_JSON).unwrap();
        assert_eq!(cfg.reference.width, 8);
        assert_eq!(cfg.env.work_group_size, 64);
    }
}
