use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// 一轮游戏结束后上报的结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    /// 主持人行为名称
    pub monty_name: String,

    /// 挑战者是否换了门
    pub switched: bool,

    /// 是否赢得奖品
    pub won: bool,
}

impl RoundReport {
    pub fn new<S: Into<String>>(monty_name: S, switched: bool, won: bool) -> Self {
        Self {
            monty_name: monty_name.into(),
            switched,
            won,
        }
    }
}

/// 游戏结果的存储，由宿主程序持有，游戏逻辑只负责上报
pub trait StatsRepository: Send + Sync {
    fn report(&self, record: RoundReport);

    fn list_results(&self) -> Vec<RoundReport>;
}

/// 内存中的游戏结果存储
#[derive(Debug, Default)]
pub struct MemoryStats {
    records: RwLock<Vec<RoundReport>>,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsRepository for MemoryStats {
    fn report(&self, record: RoundReport) {
        let mut records = match self.records.write() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.push(record);
    }

    fn list_results(&self) -> Vec<RoundReport> {
        match self.records.read() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// 某一种主持人行为的汇总结果
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StatsSummary {
    /// 主持人行为名称
    monty_name: String,
    /// 总轮数
    rounds: u32,
    /// 赢的轮数
    win: u32,
    /// 改变选择的次数
    switch: u32,
    /// 坚持选择的次数
    stick: u32,
    /// 改变选择后赢的次数
    switch_win: u32,
    /// 坚持选择后赢的次数
    stick_win: u32,
}

impl StatsSummary {
    /// 汇总 `records` 中属于 `monty_name` 的结果
    pub fn calculate<'a, I>(monty_name: &str, records: I) -> Self
    where
        I: IntoIterator<Item = &'a RoundReport>,
    {
        let mut summary = StatsSummary {
            monty_name: monty_name.to_string(),
            rounds: 0,
            win: 0,
            switch: 0,
            stick: 0,
            switch_win: 0,
            stick_win: 0,
        };

        for record in records
            .into_iter()
            .filter(|record| record.monty_name == monty_name)
        {
            summary.rounds += 1;
            if record.won {
                summary.win += 1;
            }
            if record.switched {
                summary.switch += 1;
                if record.won {
                    summary.switch_win += 1;
                }
            } else {
                summary.stick += 1;
                if record.won {
                    summary.stick_win += 1;
                }
            }
        }

        summary
    }

    pub fn monty_name(&self) -> &str {
        &self.monty_name
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// 赢的轮数
    pub fn win(&self) -> u32 {
        self.win
    }

    /// 输的轮数
    pub fn lose(&self) -> u32 {
        self.rounds - self.win
    }

    pub fn switch(&self) -> u32 {
        self.switch
    }

    pub fn stick(&self) -> u32 {
        self.stick
    }

    pub fn switch_win(&self) -> u32 {
        self.switch_win
    }

    pub fn stick_win(&self) -> u32 {
        self.stick_win
    }

    /// 胜率，没有任何记录时为 0
    pub fn win_rate(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.win as f64 / self.rounds as f64
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn memory_stats_keeps_report_order() {
        let stats = MemoryStats::new();
        stats.report(RoundReport::new("evil", false, false));
        stats.report(RoundReport::new("standard", true, true));
        let results = stats.list_results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].monty_name, "evil");
        assert_eq!(results[1], RoundReport::new("standard", true, true));
    }

    #[test]
    fn summary_counts_only_its_profile() {
        let records = vec![
            RoundReport::new("standard", true, true),
            RoundReport::new("standard", true, false),
            RoundReport::new("standard", false, true),
            RoundReport::new("evil", false, false),
        ];
        let summary = StatsSummary::calculate("standard", &records);
        assert_eq!(summary.rounds(), 3);
        assert_eq!(summary.win(), 2);
        assert_eq!(summary.lose(), 1);
        assert_eq!(summary.switch(), 2);
        assert_eq!(summary.switch_win(), 1);
        assert_eq!(summary.stick(), 1);
        assert_eq!(summary.stick_win(), 1);

        let empty = StatsSummary::calculate("secretive", &records);
        assert_eq!(empty.rounds(), 0);
        assert_eq!(empty.win_rate(), 0.0);
    }

    #[test]
    fn report_uses_camel_case_keys() {
        let json = serde_json::to_value(RoundReport::new("custom", false, true)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "montyName": "custom", "switched": false, "won": true })
        );
    }
}
