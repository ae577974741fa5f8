//! Replay Equivalence Tests
//!
//! Random operation sequences are mined block by block; the resulting state
//! must match a from-scratch replay, and disconnecting must match replaying
//! the shorter chain.

use std::collections::HashMap;

use proptest::prelude::*;

use lib_names::{
    CommitmentHash, HistoryLog, Name, NameBlock, NameChainState, NameOp, NameParams, NameTx,
    NameValue, Salt,
};
use lib_types::Address;

const NAMES: [&str; 3] = ["alpha", "beta", "gamma"];

/// Short windows so expiry and lapse happen inside a test run
fn params() -> NameParams {
    NameParams {
        expiry_window: 8,
        min_maturity: 2,
        max_reveal_window: 20,
    }
}

#[derive(Debug, Clone)]
enum Action {
    Commit { name: usize, salt: u8 },
    Reveal { name: usize, salt: u8 },
    Update { name: usize, value: u8 },
    Idle,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0..NAMES.len(), 0u8..2).prop_map(|(name, salt)| Action::Commit { name, salt }),
        (0..NAMES.len(), 0u8..2).prop_map(|(name, salt)| Action::Reveal { name, salt }),
        (0..NAMES.len(), any::<u8>()).prop_map(|(name, value)| Action::Update { name, value }),
        Just(Action::Idle),
    ]
}

struct Driver {
    state: NameChainState,
    blocks: Vec<NameBlock>,
    commits: HashMap<(usize, u8), NameTx>,
    nonce: u64,
}

impl Driver {
    fn new() -> Self {
        Self {
            state: NameChainState::new(params(), HistoryLog::in_memory()),
            blocks: Vec::new(),
            commits: HashMap::new(),
            nonce: 0,
        }
    }

    fn build_tx(&mut self, action: &Action) -> Option<NameTx> {
        self.nonce += 1;
        match *action {
            Action::Commit { name, salt } => {
                let commitment = CommitmentHash::compute(&Name::from(NAMES[name]), &Salt::new([salt; 20]));
                Some(NameTx::new(NameOp::New { commitment }, vec![], Address::zero(), self.nonce))
            }
            Action::Reveal { name, salt } => {
                let commit = self.commits.get(&(name, salt))?;
                Some(NameTx::new(
                    NameOp::FirstUpdate {
                        name: Name::from(NAMES[name]),
                        salt: Salt::new([salt; 20]),
                        value: NameValue::from("first"),
                    },
                    vec![commit.name_outpoint()],
                    Address::new([salt + 1; 32]),
                    self.nonce,
                ))
            }
            Action::Update { name, value } => {
                let record = self.state.store().lookup(&Name::from(NAMES[name]))?;
                Some(NameTx::new(
                    NameOp::Update {
                        name: Name::from(NAMES[name]),
                        value: NameValue::new(vec![value]),
                    },
                    vec![record.owning_output],
                    record.owner,
                    self.nonce,
                ))
            }
            Action::Idle => None,
        }
    }

    /// Mine one block for `action`; a rejected operation yields an empty block
    ///
    /// Returns whether the operation was included.
    fn step(&mut self, action: &Action) -> bool {
        let height = self.state.next_height();
        if let Some(tx) = self.build_tx(action) {
            let block = NameBlock::new(height, vec![tx.clone()]);
            if self.state.connect_block(&block).is_ok() {
                if let Action::Commit { name, salt } = *action {
                    self.commits.insert((name, salt), tx);
                }
                self.blocks.push(block);
                return true;
            }
        }
        let block = NameBlock::empty(height);
        self.state.connect_block(&block).unwrap();
        self.blocks.push(block);
        false
    }
}

fn replay(blocks: &[NameBlock]) -> NameChainState {
    NameChainState::replay(params(), HistoryLog::in_memory(), blocks).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_replay_matches_incremental(actions in prop::collection::vec(action(), 1..60)) {
        let mut driver = Driver::new();
        for action in &actions {
            driver.step(action);
        }
        prop_assert_eq!(replay(&driver.blocks).snapshot(), driver.state.snapshot());
    }

    #[test]
    fn prop_disconnect_matches_prefix_replay(
        actions in prop::collection::vec(action(), 1..60),
        back in 0usize..60,
    ) {
        let mut driver = Driver::new();
        for action in &actions {
            driver.step(action);
        }
        let back = back.min(driver.blocks.len());
        for _ in 0..back {
            driver.state.disconnect_block().unwrap();
        }
        let keep = driver.blocks.len() - back;
        prop_assert_eq!(replay(&driver.blocks[..keep]).snapshot(), driver.state.snapshot());
    }

    #[test]
    fn prop_reveal_never_overrides_active_record(actions in prop::collection::vec(action(), 1..80)) {
        let mut driver = Driver::new();
        for action in &actions {
            let height = driver.state.next_height();
            let blocked = match action {
                Action::Reveal { name, .. } => driver
                    .state
                    .store()
                    .active_record(&Name::from(NAMES[*name]), height)
                    .is_some(),
                _ => false,
            };
            let included = driver.step(action);
            if let Action::Reveal { salt, name } = action {
                if included {
                    prop_assert!(!blocked);
                    let record = driver.state.store().lookup(&Name::from(NAMES[*name])).unwrap();
                    prop_assert_eq!(record.owner, Address::new([salt + 1; 32]));
                    prop_assert_eq!(record.registration_height, height);
                }
            }
        }

        let tip = driver.state.tip();
        for record in driver.state.store().records() {
            prop_assert!(record.registration_height <= tip);
            prop_assert_eq!(record.expiration_height, record.registration_height + params().expiry_window);
        }
    }
}
