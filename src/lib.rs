mod error;
pub mod host;
pub mod profile;
pub mod random;
pub mod round;
pub mod simulation;
pub mod stats;

pub use error::*;
pub use host::decide;
pub use profile::{
    ActionTable, CustomConfig, CustomConfigBuilder, HostAction, Knowledge, PickedOtherWeights,
    PickedPrizeWeights, Profile, ProfileKind,
};
pub use random::{RandomSource, ScriptedSource};
pub use round::{DoorStatus, Resolution, Round, Stage};
pub use simulation::{CancelFlag, Progress, SimulationResult, Simulator, Strategy};
pub use stats::{MemoryStats, RoundReport, StatsRepository, StatsSummary};
pub use uuid::Uuid;

use rand::distributions::Standard;
use rand::prelude::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 门序号，从 1 开始编号
pub type Door = u32;

/// 一局游戏中的门，编号为 `1..=count`
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
#[serde(try_from = "u32", into = "u32")]
pub struct Doors {
    count: u32,
}

impl Doors {
    /// 最少需要 3 个门，否则主持人无门可开
    pub const MIN: u32 = 3;

    /// 门数上限，主持人每次决策都要遍历所有门
    pub const MAX: u32 = 1000;

    pub fn new(count: u32) -> Result<Self> {
        if count < Self::MIN {
            return Err(ConfigError::TooFewDoors { doors: count }.into());
        }
        if count > Self::MAX {
            return Err(ConfigError::TooManyDoors {
                doors: count,
                max: Self::MAX,
            }
            .into());
        }
        Ok(Self { count })
    }

    /// 门数
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn contains(&self, door: Door) -> bool {
        (1..=self.count).contains(&door)
    }

    pub fn iter(&self) -> impl Iterator<Item = Door> {
        1..=self.count
    }

    /// 均匀随机选择一个门
    pub fn random<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Door {
        rng.below(self.count as usize) as Door + 1
    }

    /// 在 `excluded` 之外的门中均匀随机选择一个，没有可选的门时返回 `None`
    pub fn random_except<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        excluded: &[Door],
    ) -> Option<Door> {
        let options: Vec<Door> = self.iter().filter(|d| !excluded.contains(d)).collect();
        match options.len() {
            0 => None,
            1 => Some(options[0]),
            n => Some(options[rng.below(n)]),
        }
    }
}

impl Default for Doors {
    fn default() -> Self {
        Self { count: Self::MIN }
    }
}

impl TryFrom<u32> for Doors {
    type Error = Error;

    fn try_from(count: u32) -> Result<Self> {
        Doors::new(count)
    }
}

impl From<Doors> for u32 {
    fn from(doors: Doors) -> Self {
        doors.count
    }
}

/// 挑战者抉择
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    /// 改变选择
    Switch,

    /// 坚持选择
    Stick,
}

impl Default for Decision {
    fn default() -> Self {
        Self::Switch
    }
}

impl Distribution<Decision> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Decision {
        if rng.gen_bool(0.5) {
            Decision::Switch
        } else {
            Decision::Stick
        }
    }
}

/// 一轮游戏的结果
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
    Unresolved,
}

impl Default for Outcome {
    fn default() -> Self {
        Self::Unresolved
    }
}

impl Outcome {
    pub fn of(final_pick: Door, prize: Door) -> Self {
        if final_pick == prize {
            Outcome::Win
        } else {
            Outcome::Lose
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Outcome::Unresolved)
    }
}

/// 模拟设置
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// 门数
    pub doors: Doors,

    /// 模拟轮数
    pub trials: u32,

    /// 每批次模拟轮数，每批结束时汇报进度并让出执行权
    pub batch_size: u32,

    /// 挑战者策略
    pub strategy: Strategy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            doors: Doors::default(),
            trials: 1000,
            batch_size: simulation::DEFAULT_BATCH_SIZE,
            strategy: Strategy::AlwaysSwitch,
        }
    }
}

impl Settings {
    /// 从 JSON 文本读取设置，缺省字段使用默认值
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
