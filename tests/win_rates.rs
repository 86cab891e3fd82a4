use monty::simulation::run;
use monty::{CustomConfig, Doors, Profile, Simulator, Strategy};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ops::ControlFlow;

const TRIALS: u32 = 10_000;
const TOLERANCE: f64 = 0.03;

fn win_rate(profile: Profile, strategy: Strategy, seed: u64) -> f64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let result = run(profile, strategy, TRIALS, &mut rng).expect("simulation runs");
    assert_eq!(result.trials_run(), TRIALS);
    result.win_rate()
}

fn assert_near(observed: f64, expected: f64, label: &str) {
    assert!(
        (observed - expected).abs() <= TOLERANCE,
        "{label}: observed {observed:.4}, expected {expected:.4}"
    );
}

#[test]
fn standard_switch_wins_two_thirds() {
    let observed = win_rate(Profile::Standard, Strategy::AlwaysSwitch, 11);
    assert_near(observed, 2.0 / 3.0, "standard/switch");
}

#[test]
fn standard_stay_wins_one_third() {
    let observed = win_rate(Profile::Standard, Strategy::AlwaysStay, 12);
    assert_near(observed, 1.0 / 3.0, "standard/stay");
}

#[test]
fn standard_random_wins_half() {
    let observed = win_rate(Profile::Standard, Strategy::RandomChoice, 13);
    assert_near(observed, 0.5, "standard/random");
}

#[test]
fn evil_stay_wins_one_third() {
    let observed = win_rate(Profile::Evil, Strategy::AlwaysStay, 14);
    assert_near(observed, 1.0 / 3.0, "evil/stay");
}

#[test]
fn secretive_switch_is_a_coin_flip_between_two_doors() {
    // 第一次没选中时换门有一半机会选中
    let observed = win_rate(Profile::Secretive, Strategy::AlwaysSwitch, 15);
    assert_near(observed, 1.0 / 3.0, "secretive/switch");
}

#[test]
fn custom_standard_like_config_matches_standard() {
    let config = CustomConfig::builder()
        .when_picked_prize(monty::PickedPrizeWeights {
            open_selected: 0.0,
            open_closest_non_prize: 0.5,
            open_farthest_non_prize: 0.5,
            none: 0.0,
        })
        .when_picked_not_prize(monty::PickedOtherWeights {
            open_selected: 0.0,
            open_prize: 0.0,
            open_other_non_prize: 1.0,
        })
        .build()
        .expect("valid config");
    let observed = win_rate(Profile::Custom(config), Strategy::AlwaysSwitch, 16);
    assert_near(observed, 2.0 / 3.0, "custom/switch");
}

#[test]
fn more_doors_favour_switching_less() {
    // 4 个门时主持人只开一个门，换门后在剩下两个门中随机选择：(3/4) * (1/2)
    let mut rng = StdRng::seed_from_u64(17);
    let result = Simulator::new(
        Profile::Standard,
        Doors::new(4).expect("four doors"),
        Strategy::AlwaysSwitch,
        TRIALS,
    )
    .expect("simulator")
    .run_with_progress(&mut rng, |_| ControlFlow::Continue(()))
    .expect("simulation runs");
    assert_near(result.win_rate(), 3.0 / 8.0, "standard/switch/4 doors");
}
