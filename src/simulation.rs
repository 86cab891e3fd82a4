//! 蒙特卡洛模拟：按固定策略反复进行多轮游戏并统计胜负。
//!
//! 模拟按批次推进，每批结束时汇报一次进度。取消只在批次之间检查，
//! 已经统计的轮数不会因为取消而丢失。

use crate::error::*;
use crate::profile::{Profile, ProfileKind};
use crate::random::RandomSource;
use crate::round::{Round, Stage};
use crate::{Decision, Doors, Outcome, Settings};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// 默认每批次模拟的轮数
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// 挑战者策略
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Strategy {
    /// 总是坚持
    #[serde(rename = "stay")]
    AlwaysStay,

    /// 提供换门机会时总是换门
    #[serde(rename = "switch")]
    AlwaysSwitch,

    /// 每轮以 0.5 的概率换门
    #[serde(rename = "random")]
    RandomChoice,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::AlwaysSwitch
    }
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::AlwaysStay => "stay",
            Strategy::AlwaysSwitch => "switch",
            Strategy::RandomChoice => "random",
        }
    }

    /// 提供换门机会时挑战者的抉择，随机策略每次独立抽取
    pub fn decision<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Decision {
        match self {
            Strategy::AlwaysStay => Decision::Stick,
            Strategy::AlwaysSwitch => Decision::Switch,
            Strategy::RandomChoice => {
                if rng.next_f64() < 0.5 {
                    Decision::Switch
                } else {
                    Decision::Stick
                }
            }
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stay" => Ok(Strategy::AlwaysStay),
            "switch" => Ok(Strategy::AlwaysSwitch),
            "random" => Ok(Strategy::RandomChoice),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

/// 模拟结果
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    trials_run: u32,
    wins: u32,
    losses: u32,
    strategy: Strategy,
    profile: ProfileKind,
    cancelled: bool,
}

impl SimulationResult {
    fn new(profile: ProfileKind, strategy: Strategy) -> Self {
        Self {
            trials_run: 0,
            wins: 0,
            losses: 0,
            strategy,
            profile,
            cancelled: false,
        }
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Lose => self.losses += 1,
            Outcome::Unresolved => return,
        }
        self.trials_run += 1;
    }

    /// 已完成的轮数
    pub fn trials_run(&self) -> u32 {
        self.trials_run
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn profile(&self) -> ProfileKind {
        self.profile
    }

    /// 模拟是否被提前终止
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// 胜率，没有完成任何一轮时为 0
    pub fn win_rate(&self) -> f64 {
        if self.trials_run == 0 {
            0.0
        } else {
            self.wins as f64 / self.trials_run as f64
        }
    }
}

/// 模拟进度快照
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub trials_run: u32,
    pub trial_count: u32,
    pub wins: u32,
    pub losses: u32,
    /// 模拟已结束（完成或被取消）
    pub done: bool,
    pub cancelled: bool,
}

/// 跨任务共享的取消标记
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// 蒙特卡洛模拟器，独占本次模拟的统计结果
#[derive(Debug)]
pub struct Simulator {
    round: Round,
    strategy: Strategy,
    trial_count: u32,
    batch_size: u32,
    result: SimulationResult,
    finished: bool,
}

impl Simulator {
    pub fn new(profile: Profile, doors: Doors, strategy: Strategy, trial_count: u32) -> Result<Self> {
        let kind = profile.kind();
        // 奖品位置在每轮开始前重新随机
        let round = Round::with_prize(profile, doors, 1)?;
        Ok(Self {
            round,
            strategy,
            trial_count,
            batch_size: DEFAULT_BATCH_SIZE,
            result: SimulationResult::new(kind, strategy),
            finished: false,
        })
    }

    pub fn from_settings(profile: Profile, settings: &Settings) -> Result<Self> {
        Ok(Self::new(profile, settings.doors, settings.strategy, settings.trials)?
            .with_batch_size(settings.batch_size))
    }

    /// 每批次模拟的轮数，至少为 1
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn result(&self) -> &SimulationResult {
        &self.result
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn progress(&self) -> Progress {
        Progress {
            trials_run: self.result.trials_run,
            trial_count: self.trial_count,
            wins: self.result.wins,
            losses: self.result.losses,
            done: self.finished,
            cancelled: self.result.cancelled,
        }
    }

    /// 模拟一批，返回这一批结束时的进度
    pub fn step<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> Result<Progress> {
        if self.finished {
            return Ok(self.progress());
        }

        let batch = (self.trial_count - self.result.trials_run).min(self.batch_size);
        for _ in 0..batch {
            let outcome = self.run_trial(rng)?;
            self.result.record(outcome);
        }

        if self.result.trials_run >= self.trial_count {
            self.finished = true;
            info!(
                profile = self.result.profile.name(),
                strategy = self.strategy.name(),
                trials = self.result.trials_run,
                wins = self.result.wins,
                "simulation completed"
            );
        } else {
            debug!(
                trials = self.result.trials_run,
                wins = self.result.wins,
                "simulation checkpoint"
            );
        }
        Ok(self.progress())
    }

    /// 提前终止模拟，已经统计的结果保持不变
    pub fn cancel(&mut self) {
        if !self.finished {
            self.finished = true;
            self.result.cancelled = true;
            info!(
                profile = self.result.profile.name(),
                trials = self.result.trials_run,
                "simulation cancelled"
            );
        }
    }

    pub fn finish(self) -> SimulationResult {
        self.result
    }

    /// 运行到结束，每个检查点调用 `on_progress`，返回 `Break` 时提前终止
    pub fn run_with_progress<R, F>(mut self, rng: &mut R, mut on_progress: F) -> Result<SimulationResult>
    where
        R: RandomSource + ?Sized,
        F: FnMut(&Progress) -> ControlFlow<()>,
    {
        loop {
            let progress = self.step(rng)?;
            let flow = on_progress(&progress);
            if progress.done {
                break;
            }
            if flow.is_break() {
                self.cancel();
                break;
            }
        }
        Ok(self.finish())
    }

    /// 异步运行，每批结束后让出执行权，并在批次之间检查取消标记
    pub async fn run_async<R, F>(
        mut self,
        rng: &mut R,
        cancel: &CancelFlag,
        mut on_progress: F,
    ) -> Result<SimulationResult>
    where
        R: RandomSource + Send + ?Sized,
        F: FnMut(&Progress) + Send,
    {
        while !self.finished {
            if cancel.is_cancelled() {
                self.cancel();
                on_progress(&self.progress());
                break;
            }
            let progress = self.step(rng)?;
            on_progress(&progress);
            tokio::task::yield_now().await;
        }
        Ok(self.finish())
    }

    fn run_trial<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> Result<Outcome> {
        self.round.reset(rng);
        let pick = self.round.doors().random(rng);
        let mut stage = self.round.pick(pick, rng)?;

        if stage == Stage::AwaitingSwitchDecision {
            stage = self.round.decide(self.strategy.decision(rng))?;
        }

        if stage == Stage::AwaitingSecondPick {
            let candidates = self.round.second_pick_candidates();
            let door = candidates
                .get(rng.below(candidates.len().max(1)))
                .copied()
                .ok_or(Error::Impossible)?;
            stage = self.round.second_pick(door)?;
        }

        match stage {
            Stage::Resolved { outcome, .. } => Ok(outcome),
            _ => Err(Error::Impossible),
        }
    }
}

/// 在 3 个门的游戏上按策略模拟 `trial_count` 轮
pub fn run<R: RandomSource + ?Sized>(
    profile: Profile,
    strategy: Strategy,
    trial_count: u32,
    rng: &mut R,
) -> Result<SimulationResult> {
    Simulator::new(profile, Doors::default(), strategy, trial_count)?
        .run_with_progress(rng, |_| ControlFlow::Continue(()))
}
