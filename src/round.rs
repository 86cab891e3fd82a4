use crate::error::*;
use crate::host;
use crate::profile::Profile;
use crate::random::RandomSource;
use crate::stats::RoundReport;
use crate::{Decision, Door, Doors, Outcome};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 一轮游戏的各个阶段
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum Stage {
    /// 等待挑战者第一次选择
    AwaitingInitialPick,

    /// 主持人已行动，等待挑战者决定是否换门
    AwaitingSwitchDecision,

    /// 挑战者决定换门但剩余不止一个门，等待挑战者第二次选择
    AwaitingSecondPick,

    /// 本轮结束
    Resolved {
        outcome: Outcome,
        resolution: Resolution,
    },
}

impl Default for Stage {
    fn default() -> Self {
        Self::AwaitingInitialPick
    }
}

impl Stage {
    pub fn is_end(&self) -> bool {
        matches!(self, Stage::Resolved { .. })
    }
}

/// 一轮游戏是如何结束的
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// 主持人打开了奖品门，或知道奖品位置的主持人打开了挑战者的门
    HostRevealed,
    /// 没有提供换门机会，按坚持原选择结算
    AutoStay,
    /// 挑战者坚持原选择
    Stayed,
    /// 挑战者换了门
    Switched,
}

/// 门在界面上的显示状态
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DoorStatus {
    Closed,
    Selected,
    Opened,
    Prize,
}

/// 一轮游戏，奖品位置在创建时确定且整轮不变
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    doors: Doors,
    profile: Profile,
    prize: Door,
    player_pick: Option<Door>,
    host_opens: Option<Door>,
    switch_offered: bool,
    final_pick: Option<Door>,
    outcome: Outcome,
    switched: bool,
    stage: Stage,
}

impl Round {
    /// 创建一轮游戏并将奖品随机放到一个门内
    pub fn new<R: RandomSource + ?Sized>(profile: Profile, doors: Doors, rng: &mut R) -> Result<Self> {
        let prize = doors.random(rng);
        Self::with_prize(profile, doors, prize)
    }

    /// 创建一轮游戏并将奖品放到序号指定的门内
    pub fn with_prize(profile: Profile, doors: Doors, prize: Door) -> Result<Self> {
        if !doors.contains(prize) {
            return Err(Error::InvalidDoorIndex);
        }
        profile.check_doors(doors)?;
        Ok(Self {
            doors,
            profile,
            prize,
            player_pick: None,
            host_opens: None,
            switch_offered: false,
            final_pick: None,
            outcome: Outcome::Unresolved,
            switched: false,
            stage: Stage::AwaitingInitialPick,
        })
    }

    /// 沿用主持人行为和门数，重新开始一轮
    pub fn reset<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        self.prize = self.doors.random(rng);
        self.player_pick = None;
        self.host_opens = None;
        self.switch_offered = false;
        self.final_pick = None;
        self.outcome = Outcome::Unresolved;
        self.switched = false;
        self.stage = Stage::AwaitingInitialPick;
    }

    pub fn doors(&self) -> Doors {
        self.doors
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// 奖品所在门序号
    pub fn prize(&self) -> Door {
        self.prize
    }

    /// 挑战者第一次选择的门
    pub fn player_pick(&self) -> Option<Door> {
        self.player_pick
    }

    /// 主持人打开的门
    pub fn host_opens(&self) -> Option<Door> {
        self.host_opens
    }

    pub fn switch_offered(&self) -> bool {
        self.switch_offered
    }

    /// 挑战者最终选择的门
    pub fn final_pick(&self) -> Option<Door> {
        self.final_pick
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// 最终选择是否与第一次选择不同
    pub fn switched(&self) -> bool {
        self.switched
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// 挑战者第一次选择，主持人随即行动
    pub fn pick<R: RandomSource + ?Sized>(&mut self, door: Door, rng: &mut R) -> Result<Stage> {
        if !self.doors.contains(door) {
            return Err(Error::InvalidDoorIndex);
        }
        if self.stage != Stage::AwaitingInitialPick {
            return Err(Error::InvalidOperation);
        }

        let opened = host::decide(&self.profile, self.doors, self.prize, door, rng)?;
        let revealed = self.host_revealed(door, opened);
        let offer = !revealed && self.offers_switch(door, opened);
        debug!(
            profile = self.profile.name(),
            pick = door,
            ?opened,
            revealed,
            offer,
            "initial pick"
        );

        self.player_pick = Some(door);
        self.host_opens = opened;
        self.switch_offered = offer;

        if revealed {
            self.finalize(door, Resolution::HostRevealed);
        } else if offer {
            self.stage = Stage::AwaitingSwitchDecision;
        } else {
            // 不提供换门机会时按坚持原选择结算，避免本轮永远停在这里
            self.finalize(door, Resolution::AutoStay);
        }
        Ok(self.stage)
    }

    /// 挑战者决定换门或坚持
    pub fn decide(&mut self, decision: Decision) -> Result<Stage> {
        let pick = match (self.stage, self.player_pick) {
            (Stage::AwaitingSwitchDecision, Some(pick)) => pick,
            _ => return Err(Error::InvalidOperation),
        };

        match decision {
            Decision::Stick => self.finalize(pick, Resolution::Stayed),
            Decision::Switch => {
                let candidates = self.remaining_doors(pick);
                match (self.host_opens, candidates.as_slice()) {
                    (Some(_), [only]) => self.finalize(*only, Resolution::Switched),
                    _ => self.stage = Stage::AwaitingSecondPick,
                }
            }
        }
        debug!(?decision, stage = ?self.stage, "switch decision");
        Ok(self.stage)
    }

    /// 挑战者在剩余的门中做第二次选择
    pub fn second_pick(&mut self, door: Door) -> Result<Stage> {
        if !self.doors.contains(door) {
            return Err(Error::InvalidDoorIndex);
        }
        if self.stage != Stage::AwaitingSecondPick {
            return Err(Error::InvalidOperation);
        }
        if Some(door) == self.player_pick || Some(door) == self.host_opens {
            return Err(Error::InvalidOperation);
        }

        self.finalize(door, Resolution::Switched);
        debug!(door, stage = ?self.stage, "second pick");
        Ok(self.stage)
    }

    /// 第二次选择时可以选的门
    pub fn second_pick_candidates(&self) -> Vec<Door> {
        match (self.stage, self.player_pick) {
            (Stage::AwaitingSecondPick, Some(pick)) => self.remaining_doors(pick),
            _ => vec![],
        }
    }

    /// 门的显示状态，结束后所有门都揭晓
    pub fn door_status(&self, door: Door) -> Option<DoorStatus> {
        if !self.doors.contains(door) {
            return None;
        }
        let status = if self.stage.is_end() {
            if door == self.prize {
                DoorStatus::Prize
            } else {
                DoorStatus::Opened
            }
        } else if Some(door) == self.host_opens {
            DoorStatus::Opened
        } else if Some(door) == self.player_pick {
            DoorStatus::Selected
        } else {
            DoorStatus::Closed
        };
        Some(status)
    }

    pub fn door_statuses(&self) -> Vec<(Door, DoorStatus)> {
        self.doors
            .iter()
            .filter_map(|door| self.door_status(door).map(|status| (door, status)))
            .collect()
    }

    /// 本轮结束后需要上报的结果
    pub fn report(&self) -> Option<RoundReport> {
        if !self.outcome.is_resolved() {
            return None;
        }
        Some(RoundReport::new(
            self.profile.name(),
            self.switched,
            self.outcome == Outcome::Win,
        ))
    }

    // 主持人打开奖品门时立即结算；打开挑战者的门只在主持人知道奖品位置时才立即判负
    fn host_revealed(&self, pick: Door, opened: Option<Door>) -> bool {
        match opened {
            Some(door) if door == self.prize => true,
            Some(door) if door == pick => self.profile.opening_pick_loses(),
            _ => false,
        }
    }

    fn offers_switch(&self, pick: Door, opened: Option<Door>) -> bool {
        match &self.profile {
            Profile::Standard | Profile::Evil => opened.is_some(),
            Profile::Secretive => true,
            Profile::Custom(config) => {
                config.offer_switch_until_open()
                    && opened.map_or(true, |door| door != pick && door != self.prize)
            }
        }
    }

    fn remaining_doors(&self, pick: Door) -> Vec<Door> {
        self.doors
            .iter()
            .filter(|door| *door != pick && Some(*door) != self.host_opens)
            .collect()
    }

    fn finalize(&mut self, final_pick: Door, resolution: Resolution) {
        let outcome = Outcome::of(final_pick, self.prize);
        self.final_pick = Some(final_pick);
        self.outcome = outcome;
        self.switched = Some(final_pick) != self.player_pick;
        self.stage = Stage::Resolved {
            outcome,
            resolution,
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::{CustomConfig, PickedOtherWeights};
    use crate::ScriptedSource;

    fn round(profile: Profile, prize: Door) -> Round {
        Round::with_prize(profile, Doors::default(), prize).unwrap()
    }

    fn no_draws() -> ScriptedSource {
        ScriptedSource::new([])
    }

    #[test]
    fn standard_switch_wins_when_first_pick_missed() {
        let mut round = round(Profile::Standard, 2);
        let stage = round.pick(1, &mut ScriptedSource::new([0.5])).unwrap();
        assert_eq!(stage, Stage::AwaitingSwitchDecision);
        assert_eq!(round.host_opens(), Some(3));
        assert!(round.switch_offered());
        assert_eq!(round.outcome(), Outcome::Unresolved);

        let stage = round.decide(Decision::Switch).unwrap();
        assert_eq!(
            stage,
            Stage::Resolved {
                outcome: Outcome::Win,
                resolution: Resolution::Switched
            }
        );
        assert_eq!(round.final_pick(), Some(2));
        assert!(round.switched());
    }

    #[test]
    fn standard_stay_keeps_first_pick() {
        let mut round = round(Profile::Standard, 2);
        round.pick(2, &mut ScriptedSource::new([0.5, 0.9])).unwrap();
        assert_eq!(round.host_opens(), Some(3));
        round.decide(Decision::Stick).unwrap();
        assert_eq!(round.outcome(), Outcome::Win);
        assert_eq!(round.final_pick(), Some(2));
        assert!(!round.switched());
    }

    #[test]
    fn evil_reveal_is_an_immediate_loss() {
        let mut round = round(Profile::Evil, 3);
        let stage = round.pick(1, &mut ScriptedSource::new([0.5])).unwrap();
        assert_eq!(
            stage,
            Stage::Resolved {
                outcome: Outcome::Lose,
                resolution: Resolution::HostRevealed
            }
        );
        assert_eq!(round.host_opens(), Some(3));
        assert!(!round.switch_offered());
        assert!(!round.switched());
        assert_eq!(round.decide(Decision::Switch), Err(Error::InvalidOperation));
    }

    #[test]
    fn secretive_switch_needs_second_pick() {
        let mut round = round(Profile::Secretive, 3);
        let stage = round.pick(1, &mut ScriptedSource::new([0.5])).unwrap();
        assert_eq!(stage, Stage::AwaitingSwitchDecision);
        assert!(round.switch_offered());
        assert_eq!(round.host_opens(), None);

        assert_eq!(round.decide(Decision::Switch), Ok(Stage::AwaitingSecondPick));
        assert_eq!(round.second_pick_candidates(), vec![2, 3]);
        assert_eq!(round.second_pick(1), Err(Error::InvalidOperation));
        assert_eq!(round.second_pick(4), Err(Error::InvalidDoorIndex));
        assert_eq!(round.stage(), Stage::AwaitingSecondPick);

        round.second_pick(3).unwrap();
        assert_eq!(round.outcome(), Outcome::Win);
        assert!(round.switched());
        assert_eq!(
            round.door_statuses(),
            vec![
                (1, DoorStatus::Opened),
                (2, DoorStatus::Opened),
                (3, DoorStatus::Prize)
            ]
        );
    }

    #[test]
    fn secretive_reveals_all_doors_on_stay() {
        let mut round = round(Profile::Secretive, 2);
        round.pick(1, &mut ScriptedSource::new([0.1])).unwrap();
        assert_eq!(round.door_status(1), Some(DoorStatus::Selected));
        assert_eq!(round.door_status(2), Some(DoorStatus::Closed));
        round.decide(Decision::Stick).unwrap();
        assert_eq!(round.outcome(), Outcome::Lose);
        assert_eq!(round.door_status(2), Some(DoorStatus::Prize));
        assert_eq!(round.door_status(1), Some(DoorStatus::Opened));
        assert_eq!(round.door_status(3), Some(DoorStatus::Opened));
        assert_eq!(round.door_status(4), None);
    }

    #[test]
    fn known_prize_host_opening_pick_loses_immediately() {
        let config = CustomConfig::builder()
            .when_picked_not_prize(PickedOtherWeights {
                open_selected: 1.0,
                open_prize: 0.0,
                open_other_non_prize: 0.0,
            })
            .build()
            .unwrap();
        let mut round = round(Profile::Custom(config), 3);
        let stage = round.pick(1, &mut ScriptedSource::new([0.0, 0.5])).unwrap();
        assert_eq!(
            stage,
            Stage::Resolved {
                outcome: Outcome::Lose,
                resolution: Resolution::HostRevealed
            }
        );
        assert_eq!(round.host_opens(), Some(1));
    }

    #[test]
    fn blind_host_opening_pick_is_not_a_reveal() {
        let config = CustomConfig::builder()
            .knows_prize(false)
            .door_weights([1.0, 0.0, 0.0])
            .build()
            .unwrap();
        let mut round = round(Profile::Custom(config), 3);
        let stage = round.pick(1, &mut ScriptedSource::new([0.0, 0.5])).unwrap();
        // 不是直接判负，而是没有换门机会后按坚持结算
        assert_eq!(
            stage,
            Stage::Resolved {
                outcome: Outcome::Lose,
                resolution: Resolution::AutoStay
            }
        );
        assert!(!round.switch_offered());
        assert_eq!(round.final_pick(), Some(1));
    }

    #[test]
    fn blind_host_opening_prize_still_resolves() {
        let config = CustomConfig::builder()
            .knows_prize(false)
            .door_weights([0.0, 0.0, 1.0])
            .build()
            .unwrap();
        let mut round = round(Profile::Custom(config), 3);
        round.pick(3, &mut ScriptedSource::new([0.0, 0.5])).unwrap();
        assert_eq!(
            round.stage(),
            Stage::Resolved {
                outcome: Outcome::Win,
                resolution: Resolution::HostRevealed
            }
        );
    }

    #[test]
    fn custom_without_offer_flag_auto_stays() {
        let config = CustomConfig::builder()
            .open_chance(0.0)
            .offer_switch_until_open(false)
            .build()
            .unwrap();
        let mut round = round(Profile::Custom(config), 2);
        let stage = round.pick(2, &mut ScriptedSource::new([0.5])).unwrap();
        assert_eq!(
            stage,
            Stage::Resolved {
                outcome: Outcome::Win,
                resolution: Resolution::AutoStay
            }
        );
        assert_eq!(round.host_opens(), None);
        assert!(!round.switch_offered());
    }

    fn opens_other_goat(offer_switch_until_open: bool) -> Profile {
        let config = CustomConfig::builder()
            .offer_switch_until_open(offer_switch_until_open)
            .when_picked_not_prize(PickedOtherWeights {
                open_selected: 0.0,
                open_prize: 0.0,
                open_other_non_prize: 1.0,
            })
            .build()
            .unwrap();
        Profile::Custom(config)
    }

    #[test]
    fn custom_offer_after_safe_door_switches_to_last_door() {
        let mut round = round(opens_other_goat(true), 2);
        let stage = round.pick(1, &mut ScriptedSource::new([0.0, 0.5])).unwrap();
        assert_eq!(stage, Stage::AwaitingSwitchDecision);
        assert_eq!(round.host_opens(), Some(3));
        assert!(round.switch_offered());
        assert_eq!(round.door_status(3), Some(DoorStatus::Opened));

        let stage = round.decide(Decision::Switch).unwrap();
        assert_eq!(
            stage,
            Stage::Resolved {
                outcome: Outcome::Win,
                resolution: Resolution::Switched
            }
        );
        assert_eq!(round.final_pick(), Some(2));
        assert!(round.switched());
    }

    #[test]
    fn custom_without_offer_flag_auto_stays_after_safe_door() {
        let mut round = round(opens_other_goat(false), 2);
        let stage = round.pick(1, &mut ScriptedSource::new([0.0, 0.5])).unwrap();
        assert_eq!(
            stage,
            Stage::Resolved {
                outcome: Outcome::Lose,
                resolution: Resolution::AutoStay
            }
        );
        assert_eq!(round.host_opens(), Some(3));
        assert!(!round.switch_offered());
        assert_eq!(round.final_pick(), Some(1));
        assert!(!round.switched());
        assert_eq!(round.decide(Decision::Switch), Err(Error::InvalidOperation));
    }

    #[test]
    fn custom_closed_host_offers_second_pick() {
        let config = CustomConfig::builder().open_chance(0.0).build().unwrap();
        let mut round = round(Profile::Custom(config), 2);
        assert_eq!(
            round.pick(1, &mut ScriptedSource::new([0.5])),
            Ok(Stage::AwaitingSwitchDecision)
        );
        assert_eq!(round.decide(Decision::Switch), Ok(Stage::AwaitingSecondPick));
        round.second_pick(2).unwrap();
        assert_eq!(round.outcome(), Outcome::Win);
    }

    #[test]
    fn illegal_moves_leave_state_untouched() {
        let mut round = round(Profile::Standard, 1);
        assert_eq!(round.decide(Decision::Stick), Err(Error::InvalidOperation));
        assert_eq!(round.second_pick(2), Err(Error::InvalidOperation));
        assert_eq!(round.pick(0, &mut no_draws()), Err(Error::InvalidDoorIndex));
        assert_eq!(round.stage(), Stage::AwaitingInitialPick);
        assert_eq!(round.player_pick(), None);

        round.pick(2, &mut ScriptedSource::new([0.5])).unwrap();
        assert_eq!(round.pick(3, &mut no_draws()), Err(Error::InvalidOperation));
        assert_eq!(round.player_pick(), Some(2));
        assert_eq!(round.second_pick(1), Err(Error::InvalidOperation));
        assert_eq!(round.stage(), Stage::AwaitingSwitchDecision);
    }

    #[test]
    fn resolved_round_reads_the_same_twice() {
        let mut round = round(Profile::Standard, 1);
        round.pick(2, &mut ScriptedSource::new([0.5])).unwrap();
        round.decide(Decision::Switch).unwrap();

        let first = (round.outcome(), round.final_pick(), round.report());
        let second = (round.outcome(), round.final_pick(), round.report());
        assert_eq!(first, second);
        assert_eq!(round.decide(Decision::Stick), Err(Error::InvalidOperation));
        assert_eq!(round.outcome(), Outcome::Win);
        assert_eq!(
            round.report(),
            Some(RoundReport::new("standard", true, true))
        );
    }

    #[test]
    fn switching_with_more_doors_asks_for_second_pick() {
        let doors = Doors::new(4).unwrap();
        let mut round = Round::with_prize(Profile::Standard, doors, 4).unwrap();
        // 主持人在 2、3 号门中随机打开一个
        round.pick(1, &mut ScriptedSource::new([0.5, 0.0])).unwrap();
        assert_eq!(round.host_opens(), Some(2));
        assert_eq!(round.decide(Decision::Switch), Ok(Stage::AwaitingSecondPick));
        assert_eq!(round.second_pick_candidates(), vec![3, 4]);
        assert_eq!(round.second_pick(2), Err(Error::InvalidOperation));
        round.second_pick(4).unwrap();
        assert_eq!(round.outcome(), Outcome::Win);
    }

    #[test]
    fn reset_keeps_profile_and_clears_state() {
        let mut round = round(Profile::Evil, 1);
        round.pick(2, &mut ScriptedSource::new([0.5])).unwrap();
        assert!(round.stage().is_end());

        round.reset(&mut ScriptedSource::new([0.9]));
        assert_eq!(round.prize(), 3);
        assert_eq!(round.profile(), &Profile::Evil);
        assert_eq!(round.stage(), Stage::AwaitingInitialPick);
        assert_eq!(round.outcome(), Outcome::Unresolved);
        assert_eq!(round.report(), None);
    }

    #[test]
    fn round_serializes_for_display() {
        let mut round = round(Profile::Standard, 2);
        round.pick(1, &mut ScriptedSource::new([0.5])).unwrap();
        let json = serde_json::to_value(&round).unwrap();
        assert_eq!(json["playerPick"], 1);
        assert_eq!(json["hostOpens"], 3);
        assert_eq!(json["stage"]["stage"], "awaitingSwitchDecision");
    }

    #[test]
    fn prize_must_be_a_door_of_the_game() {
        assert!(matches!(
            Round::with_prize(Profile::Standard, Doors::default(), 0),
            Err(Error::InvalidDoorIndex)
        ));
    }
}
