use crate::error::*;
use crate::random::RandomSource;
use crate::Doors;
use serde::{Deserialize, Serialize};

/// 概率之和的容差
pub const TOLERANCE: f64 = 1e-6;

/// 主持人行为的名称，供界面、命令行和网络请求选择
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Standard,
    Evil,
    Secretive,
    Custom,
}

impl ProfileKind {
    /// 内置的三种主持人行为
    pub const BUILTIN: [ProfileKind; 3] = [
        ProfileKind::Standard,
        ProfileKind::Evil,
        ProfileKind::Secretive,
    ];

    /// 随机选择一种内置主持人行为（隐藏主持人类型的游戏模式）
    pub fn random_builtin<R: RandomSource + ?Sized>(rng: &mut R) -> Self {
        Self::BUILTIN[rng.below(Self::BUILTIN.len())]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProfileKind::Standard => "standard",
            ProfileKind::Evil => "evil",
            ProfileKind::Secretive => "secretive",
            ProfileKind::Custom => "custom",
        }
    }
}

impl std::str::FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(ProfileKind::Standard),
            "evil" => Ok(ProfileKind::Evil),
            "secretive" => Ok(ProfileKind::Secretive),
            "custom" => Ok(ProfileKind::Custom),
            other => Err(format!("unknown profile: {other}")),
        }
    }
}

/// 主持人的四种动作，顺序即概率表中行的顺序
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum HostAction {
    /// 打开奖品所在的门
    OpenPrize,
    /// 打开挑战者选择的门
    OpenPlayerPick,
    /// 打开另一个既不是奖品也不是挑战者选择的门
    OpenOtherNonPrize,
    /// 不开门
    OpenNone,
}

impl HostAction {
    pub const ORDER: [HostAction; 4] = [
        HostAction::OpenPrize,
        HostAction::OpenPlayerPick,
        HostAction::OpenOtherNonPrize,
        HostAction::OpenNone,
    ];
}

/// 内置主持人的 4×2 概率表
///
/// 每一行对应 [`HostAction::ORDER`] 中的一个动作；第 0 列在挑战者选中奖品时生效，
/// 第 1 列在挑战者未选中奖品时生效。某一列之和不足 1 时，剩余的概率即为不开门。
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct ActionTable {
    rows: [[f64; 2]; 4],
}

impl ActionTable {
    pub const STANDARD: ActionTable = ActionTable {
        rows: [[0.0, 0.0], [0.0, 0.0], [1.0, 1.0], [0.0, 0.0]],
    };

    pub const EVIL: ActionTable = ActionTable {
        rows: [[0.0, 1.0], [0.0, 0.0], [1.0, 0.0], [0.0, 0.0]],
    };

    pub const SECRETIVE: ActionTable = ActionTable {
        rows: [[0.0, 0.0], [0.0, 0.0], [0.0, 0.0], [1.0, 1.0]],
    };

    pub const fn new(rows: [[f64; 2]; 4]) -> Self {
        Self { rows }
    }

    /// 按挑战者是否选中奖品取出对应列的 `(动作, 概率)`
    pub fn column(&self, picked_prize: bool) -> [(HostAction, f64); 4] {
        let column = if picked_prize { 0 } else { 1 };
        let mut weights = [(HostAction::OpenNone, 0.0); 4];
        for (slot, (action, row)) in weights
            .iter_mut()
            .zip(HostAction::ORDER.iter().zip(self.rows.iter()))
        {
            *slot = (*action, row[column]);
        }
        weights
    }
}

/// 主持人知道奖品位置且挑战者选中奖品时的动作分布
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PickedPrizeWeights {
    pub open_selected: f64,
    pub open_closest_non_prize: f64,
    pub open_farthest_non_prize: f64,
    pub none: f64,
}

impl PickedPrizeWeights {
    pub fn sum(&self) -> f64 {
        self.open_selected + self.open_closest_non_prize + self.open_farthest_non_prize + self.none
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        probability("whenPickedPrize.openSelected", self.open_selected)?;
        probability("whenPickedPrize.openClosestNonPrize", self.open_closest_non_prize)?;
        probability("whenPickedPrize.openFarthestNonPrize", self.open_farthest_non_prize)?;
        probability("whenPickedPrize.none", self.none)?;
        let sum = self.sum();
        if (sum - 1.0).abs() > TOLERANCE {
            return Err(ConfigError::PickedPrizeSum { sum });
        }
        Ok(())
    }
}

impl Default for PickedPrizeWeights {
    fn default() -> Self {
        Self {
            open_selected: 0.25,
            open_closest_non_prize: 0.25,
            open_farthest_non_prize: 0.25,
            none: 0.25,
        }
    }
}

/// 主持人知道奖品位置且挑战者未选中奖品时的动作分布
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PickedOtherWeights {
    pub open_selected: f64,
    pub open_prize: f64,
    pub open_other_non_prize: f64,
}

impl PickedOtherWeights {
    pub fn sum(&self) -> f64 {
        self.open_selected + self.open_prize + self.open_other_non_prize
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        probability("whenPickedNotPrize.openSelected", self.open_selected)?;
        probability("whenPickedNotPrize.openPrize", self.open_prize)?;
        probability("whenPickedNotPrize.openOtherNonPrize", self.open_other_non_prize)?;
        let sum = self.sum();
        if (sum - 1.0).abs() > TOLERANCE {
            return Err(ConfigError::PickedOtherSum { sum });
        }
        Ok(())
    }
}

impl Default for PickedOtherWeights {
    fn default() -> Self {
        Self {
            open_selected: 0.33,
            open_prize: 0.33,
            open_other_non_prize: 0.34,
        }
    }
}

/// 主持人对奖品位置的了解
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum Knowledge {
    /// 知道奖品位置，按挑战者是否选中奖品使用两套动作分布
    #[serde(rename_all = "camelCase")]
    KnowsPrize {
        when_picked_prize: PickedPrizeWeights,
        when_picked_not_prize: PickedOtherWeights,
    },

    /// 不知道奖品位置，按门给出打开的概率（下标 0 对应 1 号门）
    #[serde(rename_all = "camelCase")]
    Unknown { door_weights: Vec<f64> },
}

impl Knowledge {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        match self {
            Knowledge::KnowsPrize {
                when_picked_prize,
                when_picked_not_prize,
            } => {
                when_picked_prize.validate()?;
                when_picked_not_prize.validate()
            }
            Knowledge::Unknown { door_weights } => {
                for (index, weight) in door_weights.iter().enumerate() {
                    probability(&format!("unknownPrize.door{}", index + 1), *weight)?;
                }
                let sum: f64 = door_weights.iter().sum();
                if sum > 1.0 + TOLERANCE {
                    return Err(ConfigError::UnknownPrizeSum { sum });
                }
                Ok(())
            }
        }
    }
}

/// 自定义主持人配置，只能通过校验后构造
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(try_from = "RawCustomConfig", rename_all = "camelCase")]
pub struct CustomConfig {
    open_chance: f64,
    offer_switch_until_open: bool,
    knowledge: Knowledge,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCustomConfig {
    open_chance: f64,
    offer_switch_until_open: bool,
    knowledge: Knowledge,
}

impl TryFrom<RawCustomConfig> for CustomConfig {
    type Error = Error;

    fn try_from(raw: RawCustomConfig) -> Result<Self> {
        CustomConfig::new(raw.open_chance, raw.offer_switch_until_open, raw.knowledge)
    }
}

impl CustomConfig {
    pub fn new(open_chance: f64, offer_switch_until_open: bool, knowledge: Knowledge) -> Result<Self> {
        if !open_chance.is_finite() || !(0.0..=1.0).contains(&open_chance) {
            return Err(ConfigError::OpenChanceOutOfRange { value: open_chance }.into());
        }
        knowledge.validate()?;
        Ok(Self {
            open_chance,
            offer_switch_until_open,
            knowledge,
        })
    }

    pub fn builder() -> CustomConfigBuilder {
        CustomConfigBuilder::default()
    }

    /// 主持人开门的总体概率
    pub fn open_chance(&self) -> f64 {
        self.open_chance
    }

    /// 在主持人打开奖品或挑战者的门之前一直提供换门机会
    pub fn offer_switch_until_open(&self) -> bool {
        self.offer_switch_until_open
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    pub fn knows_prize(&self) -> bool {
        matches!(self.knowledge, Knowledge::KnowsPrize { .. })
    }

    /// 检查配置是否适用于给定的门数
    pub fn check_doors(&self, doors: Doors) -> Result<()> {
        if let Knowledge::Unknown { door_weights } = &self.knowledge {
            if door_weights.len() != doors.count() as usize {
                return Err(ConfigError::DoorCountMismatch {
                    weights: door_weights.len(),
                    doors: doors.count(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// 自定义配置构造器，默认值与配置表单一致
#[derive(Debug, Clone)]
pub struct CustomConfigBuilder {
    open_chance: f64,
    offer_switch_until_open: bool,
    knows_prize: bool,
    when_picked_prize: PickedPrizeWeights,
    when_picked_not_prize: PickedOtherWeights,
    door_weights: Vec<f64>,
}

impl Default for CustomConfigBuilder {
    fn default() -> Self {
        Self {
            open_chance: 1.0,
            offer_switch_until_open: true,
            knows_prize: true,
            when_picked_prize: PickedPrizeWeights::default(),
            when_picked_not_prize: PickedOtherWeights::default(),
            door_weights: vec![0.3; Doors::MIN as usize],
        }
    }
}

impl CustomConfigBuilder {
    pub fn open_chance(mut self, open_chance: f64) -> Self {
        self.open_chance = open_chance;
        self
    }

    pub fn offer_switch_until_open(mut self, offer: bool) -> Self {
        self.offer_switch_until_open = offer;
        self
    }

    pub fn knows_prize(mut self, knows_prize: bool) -> Self {
        self.knows_prize = knows_prize;
        self
    }

    pub fn when_picked_prize(mut self, weights: PickedPrizeWeights) -> Self {
        self.when_picked_prize = weights;
        self
    }

    pub fn when_picked_not_prize(mut self, weights: PickedOtherWeights) -> Self {
        self.when_picked_not_prize = weights;
        self
    }

    pub fn door_weights<I>(mut self, weights: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        self.door_weights = weights.into_iter().collect();
        self
    }

    /// 只校验当前生效的那一套分布
    pub fn build(self) -> Result<CustomConfig> {
        let knowledge = if self.knows_prize {
            Knowledge::KnowsPrize {
                when_picked_prize: self.when_picked_prize,
                when_picked_not_prize: self.when_picked_not_prize,
            }
        } else {
            Knowledge::Unknown {
                door_weights: self.door_weights,
            }
        };
        CustomConfig::new(self.open_chance, self.offer_switch_until_open, knowledge)
    }
}

/// 主持人行为
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", content = "config", rename_all = "lowercase")]
pub enum Profile {
    /// 总是打开一个既不是奖品也不是挑战者选择的门
    Standard,
    /// 挑战者没选中奖品时打开奖品门，否则随机打开另一个门
    Evil,
    /// 从不开门
    Secretive,
    /// 按自定义配置行事
    Custom(CustomConfig),
}

impl Default for Profile {
    fn default() -> Self {
        Self::Standard
    }
}

impl Profile {
    /// 按名称构造主持人行为，自定义行为必须提供配置
    pub fn from_kind(kind: ProfileKind, config: Option<CustomConfig>) -> Result<Self> {
        match (kind, config) {
            (ProfileKind::Standard, _) => Ok(Profile::Standard),
            (ProfileKind::Evil, _) => Ok(Profile::Evil),
            (ProfileKind::Secretive, _) => Ok(Profile::Secretive),
            (ProfileKind::Custom, Some(config)) => Ok(Profile::Custom(config)),
            (ProfileKind::Custom, None) => Err(Error::MissingCustomConfig),
        }
    }

    pub fn kind(&self) -> ProfileKind {
        match self {
            Profile::Standard => ProfileKind::Standard,
            Profile::Evil => ProfileKind::Evil,
            Profile::Secretive => ProfileKind::Secretive,
            Profile::Custom(_) => ProfileKind::Custom,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// 内置主持人对应的概率表，自定义主持人没有概率表
    pub fn table(&self) -> Option<&'static ActionTable> {
        match self {
            Profile::Standard => Some(&ActionTable::STANDARD),
            Profile::Evil => Some(&ActionTable::EVIL),
            Profile::Secretive => Some(&ActionTable::SECRETIVE),
            Profile::Custom(_) => None,
        }
    }

    /// 主持人是否知道奖品位置
    pub fn knows_prize(&self) -> bool {
        match self {
            Profile::Standard | Profile::Evil | Profile::Secretive => true,
            Profile::Custom(config) => config.knows_prize(),
        }
    }

    /// 主持人打开挑战者自己的门时，本轮是否直接判负
    ///
    /// 只有知道奖品位置的主持人才会因此直接判负；不知道奖品位置的自定义主持人
    /// 打开挑战者的门后，本轮仍按换门规则继续。
    pub fn opening_pick_loses(&self) -> bool {
        self.knows_prize()
    }

    /// 检查主持人行为是否适用于给定的门数
    pub fn check_doors(&self, doors: Doors) -> Result<()> {
        match self {
            Profile::Custom(config) => config.check_doors(doors),
            _ => Ok(()),
        }
    }
}

fn probability(field: &str, value: f64) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability {
            field: field.to_string(),
            value,
        })
    }
}
