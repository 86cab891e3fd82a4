use anyhow::Context;
use clap::Parser;
use monty::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// 按指定主持人行为和策略批量模拟三门问题
#[derive(Debug, Parser)]
#[command(name = "monty", version)]
struct Args {
    /// 主持人行为：standard、evil、secretive、custom
    #[arg(long, default_value = "standard")]
    profile: ProfileKind,

    /// 自定义主持人配置文件（JSON），使用 custom 时必须提供
    #[arg(long)]
    custom: Option<PathBuf>,

    /// 模拟设置文件（JSON），命令行参数优先
    #[arg(long)]
    config: Option<PathBuf>,

    /// 门数
    #[arg(long)]
    doors: Option<u32>,

    /// 模拟轮数
    #[arg(long)]
    trials: Option<u32>,

    /// 挑战者策略：stay、switch、random
    #[arg(long)]
    strategy: Option<Strategy>,

    /// 每批次模拟轮数
    #[arg(long)]
    batch_size: Option<u32>,

    /// 随机数种子，提供时结果可复现
    #[arg(long)]
    seed: Option<u64>,

    /// 依次模拟三种策略并对比
    #[arg(long)]
    compare: bool,
}

impl Args {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read settings {}", path.display()))?;
                Settings::from_json(&json)
                    .with_context(|| format!("invalid settings {}", path.display()))?
            }
            None => Settings::default(),
        };
        if let Some(doors) = self.doors {
            settings.doors = Doors::new(doors)?;
        }
        if let Some(trials) = self.trials {
            settings.trials = trials;
        }
        if let Some(strategy) = self.strategy {
            settings.strategy = strategy;
        }
        if let Some(batch_size) = self.batch_size {
            settings.batch_size = batch_size;
        }
        Ok(settings)
    }

    fn profile(&self) -> anyhow::Result<Profile> {
        let config = match &self.custom {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read custom config {}", path.display()))?;
                let config: CustomConfig = serde_json::from_str(&json)
                    .with_context(|| format!("invalid custom config {}", path.display()))?;
                Some(config)
            }
            None => None,
        };
        Ok(Profile::from_kind(self.profile, config)?)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let settings = args.settings()?;
    let profile = args.profile()?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let strategies = if args.compare {
        vec![
            Strategy::AlwaysStay,
            Strategy::AlwaysSwitch,
            Strategy::RandomChoice,
        ]
    } else {
        vec![settings.strategy]
    };

    println!(
        "游戏设置: 共 {} 个门，主持人 {}，每种策略进行 {} 轮游戏；",
        settings.doors.count(),
        profile.name(),
        settings.trials
    );

    for strategy in strategies {
        let simulator = Simulator::from_settings(
            profile.clone(),
            &Settings {
                strategy,
                ..settings
            },
        )?;

        // 每个检查点刷新一次进度
        let result = simulator.run_with_progress(&mut rng, |progress| {
            print!(
                "\r策略 {}: {}/{}",
                strategy.name(),
                progress.trials_run,
                progress.trial_count
            );
            let _ = std::io::stdout().flush();
            ControlFlow::Continue(())
        })?;
        println!();

        println!(
            "策略 {}: 共赢得奖品 {} 轮，未赢得奖品 {} 轮，胜率 {:.2}%。",
            strategy.name(),
            result.wins(),
            result.losses(),
            result.win_rate() * 100.0
        );
    }

    Ok(())
}
