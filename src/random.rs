use rand::{Rng, RngCore};
use std::collections::VecDeque;

/// 均匀随机数来源，每次抽取 [0, 1) 内的浮点数
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;

    /// 在 [0, n) 范围内均匀抽取一个下标
    fn below(&mut self, n: usize) -> usize {
        assert!(n > 0, "cannot draw below 0");
        let index = (self.next_f64() * n as f64) as usize;
        index.min(n - 1)
    }
}

impl<R: RngCore + ?Sized> RandomSource for R {
    fn next_f64(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// 按顺序回放预先给定的随机数，用于可复现的测试
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    draws: VecDeque<f64>,
}

impl ScriptedSource {
    pub fn new<I>(draws: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self {
            draws: draws.into_iter().collect(),
        }
    }

    /// 剩余未使用的随机数个数
    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl RandomSource for ScriptedSource {
    fn next_f64(&mut self) -> f64 {
        let draw = self
            .draws
            .pop_front()
            .expect("scripted random source ran out of draws");
        assert!(
            (0.0..1.0).contains(&draw),
            "scripted draw {} is outside [0, 1)",
            draw
        );
        draw
    }
}
