/// Offline runner for the world generator: build a map from CLI
/// parameters, print a summary (or the ASCII preview), optionally dump the
/// JSON artifact, and sweep seed batches in parallel.
use anyhow::{bail, Context, Result};
use clap::Parser;

use civmap_core::{
    generate, generate_batch, GeneratorMode, MapConfig, MapData, StartPosMode,
};

#[derive(Parser, Debug)]
#[command(name = "civmap-cli", about = "Offline map generation runner")]
struct Args {
    /// Seed string; hashed into the generator state.
    #[arg(short, long, default_value = "1")]
    seed: String,

    #[arg(long, default_value_t = 80)]
    width: usize,

    #[arg(long, default_value_t = 50)]
    height: usize,

    /// Generator mode: random, fractal, island, or fair.
    #[arg(short, long, default_value = "fractal")]
    mode: String,

    /// Starting-position policy: single, two-on-three, all, or variable.
    #[arg(long, default_value = "variable")]
    start_pos: String,

    #[arg(short, long, default_value_t = 4)]
    players: usize,

    #[arg(long, default_value_t = 30)]
    land_percent: u32,

    /// Write the full MapData JSON here.
    #[arg(short, long)]
    out: Option<String>,

    /// Print the ASCII preview instead of the summary.
    #[arg(long)]
    ascii: bool,

    /// Generate this many consecutive seeds ("<seed>-0".."<seed>-N") in
    /// parallel and summarize each.
    #[arg(long)]
    batch: Option<usize>,
}

fn parse_mode(s: &str) -> Result<GeneratorMode> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "random" => GeneratorMode::Random,
        "fractal" => GeneratorMode::Fractal,
        "island" => GeneratorMode::Island,
        "fair" => GeneratorMode::Fair,
        other => bail!("unknown mode {other:?}"),
    })
}

fn parse_start_pos(s: &str) -> Result<StartPosMode> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "single" => StartPosMode::SingleContinent,
        "two-on-three" => StartPosMode::TwoOnThree,
        "all" => StartPosMode::AllContinents,
        "variable" => StartPosMode::Variable,
        other => bail!("unknown start-pos mode {other:?}"),
    })
}

fn summarize(seed: &str, map: &MapData) -> String {
    let rivers = map.tiles.iter().filter(|t| t.river_mask > 0).count();
    let continents = map
        .tiles
        .iter()
        .map(|t| t.continent_id)
        .max()
        .unwrap_or(0);
    format!(
        "seed {seed}: {}x{}, {}% land, {continents} continents, {rivers} river tiles, {} spawns",
        map.width,
        map.height,
        map.land_percent(),
        map.starting_positions.len()
    )
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = MapConfig {
        width: args.width,
        height: args.height,
        generator: parse_mode(&args.mode)?,
        land_percent: args.land_percent,
        start_pos_mode: parse_start_pos(&args.start_pos)?,
        ..Default::default()
    };
    let players: Vec<String> = (1..=args.players).map(|i| format!("player-{i}")).collect();

    if let Some(count) = args.batch {
        let seeds: Vec<Vec<u8>> = (0..count)
            .map(|i| format!("{}-{i}", args.seed).into_bytes())
            .collect();
        let results = generate_batch(&seeds, &config, &players);
        let mut failures = 0usize;
        for (i, result) in results.iter().enumerate() {
            match result {
                Ok(map) => println!("{}", summarize(&format!("{}-{i}", args.seed), map)),
                Err(err) => {
                    failures += 1;
                    eprintln!("seed {}-{i}: {err}", args.seed);
                }
            }
        }
        if failures > 0 {
            bail!("{failures} of {count} seeds failed");
        }
        return Ok(());
    }

    let map = generate(args.seed.as_bytes(), &config, &players, None)
        .with_context(|| format!("generating seed {:?}", args.seed))?;

    if args.ascii {
        print!("{}", map.render_ascii());
    } else {
        println!("{}", summarize(&args.seed, &map));
    }
    if let Some(path) = args.out {
        let json = serde_json::to_string_pretty(&map)?;
        std::fs::write(&path, json).with_context(|| format!("writing {path}"))?;
        eprintln!("wrote {path}");
    }
    Ok(())
}
