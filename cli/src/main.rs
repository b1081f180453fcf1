mod cli;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use stellar_empires_core::{GameBuilder, ScenarioDefinition};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "stellar-empires")]
#[command(about = "ターン制の銀河戦略シミュレーター", version)]
struct Args {
    /// 乱数シード。指定すると同じ展開を再現できる
    #[arg(long)]
    seed: Option<u64>,

    /// シナリオファイル (省略時は config/scenario.json)
    #[arg(long)]
    scenario: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stellar_empires_core=info,stellar_empires_cli=info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let scenario_path = match args.scenario {
        Some(path) => path,
        None => resolve_scenario_path()?,
    };
    let content = fs::read_to_string(&scenario_path).with_context(|| {
        format!(
            "シナリオファイルを開けません: {}",
            scenario_path.display()
        )
    })?;
    let scenario = ScenarioDefinition::from_json(&content).with_context(|| {
        format!(
            "シナリオファイルの解析に失敗しました: {}",
            scenario_path.display()
        )
    })?;

    let builder = GameBuilder::new(scenario);
    let builder = match args.seed {
        Some(seed) => builder.with_seed(seed),
        None => builder,
    };
    let mut game = builder.build().with_context(|| {
        format!(
            "シナリオの読み込みに失敗しました: {}",
            scenario_path.display()
        )
    })?;
    info!(
        scenario = %scenario_path.display(),
        empires = game.empires().len(),
        "シナリオを読み込みました"
    );

    cli::run(&mut game)
}

fn resolve_scenario_path() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("カレントディレクトリの取得に失敗しました")?;
    let candidates = [
        cwd.join("config").join("scenario.json"),
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("config")
            .join("scenario.json"),
    ];

    for path in candidates {
        if path.exists() {
            return Ok(path);
        }
    }

    anyhow::bail!("シナリオファイルが見つかりません。config/scenario.json を配置してください。")
}
