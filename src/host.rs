//! 主持人决策：根据主持人行为、奖品位置和挑战者的选择决定打开哪个门。

use crate::error::*;
use crate::profile::{ActionTable, CustomConfig, HostAction, Knowledge, Profile};
use crate::random::RandomSource;
use crate::{Door, Doors};
use tracing::trace;

/// 主持人动作落到具体门上之前的目标
#[derive(Debug, Copy, Clone, PartialEq)]
enum Target {
    Door(Door),
    /// 既不是奖品也不是挑战者选择的门，多于一个时均匀随机选择
    OtherNonPrize,
    Nothing,
}

impl Target {
    fn of(action: HostAction, prize: Door, pick: Door) -> Self {
        match action {
            HostAction::OpenPrize => Target::Door(prize),
            HostAction::OpenPlayerPick => Target::Door(pick),
            HostAction::OpenOtherNonPrize => Target::OtherNonPrize,
            HostAction::OpenNone => Target::Nothing,
        }
    }
}

/// 决定主持人打开哪个门，返回 `None` 表示不开门
///
/// 每次调用都会从 `rng` 重新抽取随机数，同样的输入可能得到不同的门。
pub fn decide<R: RandomSource + ?Sized>(
    profile: &Profile,
    doors: Doors,
    prize: Door,
    pick: Door,
    rng: &mut R,
) -> Result<Option<Door>> {
    if !doors.contains(prize) || !doors.contains(pick) {
        return Err(Error::InvalidDoorIndex);
    }

    let target = match profile {
        Profile::Standard => from_table(&ActionTable::STANDARD, prize, pick, rng),
        Profile::Evil => from_table(&ActionTable::EVIL, prize, pick, rng),
        Profile::Secretive => from_table(&ActionTable::SECRETIVE, prize, pick, rng),
        Profile::Custom(config) => {
            config.check_doors(doors)?;
            from_config(config, doors, prize, pick, rng)
        }
    };

    let opened = match target {
        Target::Door(door) => Some(door),
        Target::OtherNonPrize => doors.random_except(rng, &[prize, pick]),
        Target::Nothing => None,
    };
    trace!(profile = profile.name(), prize, pick, ?opened, "host decided");
    Ok(opened)
}

fn from_table<R: RandomSource + ?Sized>(
    table: &ActionTable,
    prize: Door,
    pick: Door,
    rng: &mut R,
) -> Target {
    let column = table.column(pick == prize);
    select(&column, rng.next_f64())
        .map(|action| Target::of(action, prize, pick))
        .unwrap_or(Target::Nothing)
}

fn from_config<R: RandomSource + ?Sized>(
    config: &CustomConfig,
    doors: Doors,
    prize: Door,
    pick: Door,
    rng: &mut R,
) -> Target {
    // 先独立判定主持人这次是否开门
    if rng.next_f64() >= config.open_chance() {
        return Target::Nothing;
    }

    let chosen = match config.knowledge() {
        Knowledge::KnowsPrize {
            when_picked_prize: weights,
            ..
        } if pick == prize => {
            // 非奖品门按序号升序排列，最近取第一个，最远取最后一个
            let non_prize: Vec<Door> = doors.iter().filter(|d| *d != prize).collect();
            let closest = non_prize.first().copied().map_or(Target::Nothing, Target::Door);
            let farthest = non_prize.last().copied().map_or(Target::Nothing, Target::Door);
            select(
                &[
                    (Target::Door(pick), weights.open_selected),
                    (closest, weights.open_closest_non_prize),
                    (farthest, weights.open_farthest_non_prize),
                    (Target::Nothing, weights.none),
                ],
                rng.next_f64(),
            )
        }
        Knowledge::KnowsPrize {
            when_picked_not_prize: weights,
            ..
        } => select(
            &[
                (Target::Door(pick), weights.open_selected),
                (Target::Door(prize), weights.open_prize),
                (Target::OtherNonPrize, weights.open_other_non_prize),
            ],
            rng.next_f64(),
        ),
        Knowledge::Unknown { door_weights } => {
            let weights: Vec<(Target, f64)> = doors
                .iter()
                .zip(door_weights.iter())
                .map(|(door, weight)| (Target::Door(door), *weight))
                .collect();
            select(&weights, rng.next_f64())
        }
    };

    chosen.unwrap_or(Target::Nothing)
}

/// 按顺序累加概率，返回累加值首次超过 `draw` 的选项
///
/// 概率之和不足 1 时，落在剩余区间的抽取返回 `None`，即不开门；
/// 全部概率为 0 时同样返回 `None`。
fn select<T: Copy>(weights: &[(T, f64)], draw: f64) -> Option<T> {
    let mut accumulator = 0.0;
    for (item, weight) in weights {
        accumulator += weight;
        if draw < accumulator {
            return Some(*item);
        }
    }
    None
}
