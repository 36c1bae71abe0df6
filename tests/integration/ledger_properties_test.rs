// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{create_test_app, date};
use chronotrak::domain::models::credits::MovementOutcome;
use chronotrak::domain::models::notification::EventKind;
use proptest::prelude::*;

const THRESHOLD: i64 = 120;

#[derive(Debug, Clone)]
enum LedgerOp {
    Credit(i64),
    Debit(i64),
    LogTime(i64),
    Tracking(bool),
}

fn op_strategy() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        3 => (1i64..240).prop_map(LedgerOp::Credit),
        4 => (1i64..240).prop_map(LedgerOp::Debit),
        3 => (1i64..180).prop_map(LedgerOp::LogTime),
        1 => any::<bool>().prop_map(LedgerOp::Tracking),
    ]
}

fn hours(minutes: i64) -> f64 {
    minutes as f64 / 60.0
}

/// 账本的参考模型
struct Model {
    tracking: bool,
    balance: i64,
    crossings: usize,
}

impl Model {
    fn apply(&mut self, amount: i64) {
        if !self.tracking {
            return;
        }
        let before = self.balance;
        self.balance += amount;
        if before >= THRESHOLD && self.balance < THRESHOLD {
            self.crossings += 1;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_ledger_matches_log_and_alerts_once_per_crossing(
        seed in 0i64..360,
        ops in proptest::collection::vec(op_strategy(), 1..25),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let t = create_test_app(date(2025, 1, 6)).await;
            let ledger = &t.app.ledger;
            let project = t.project(hours(seed)).await;
            let task = t.task(project.id, "Support call").await;
            let mut model = Model {
                tracking: true,
                balance: seed,
                crossings: 0,
            };

            for op in &ops {
                let outcome = match op {
                    LedgerOp::Credit(m) => {
                        let outcome = ledger.credit(project.id, hours(*m), None).await.unwrap();
                        model.apply(*m);
                        Some(outcome)
                    }
                    LedgerOp::Debit(m) => {
                        let outcome = ledger.debit(project.id, hours(*m), None, None).await.unwrap();
                        model.apply(-m);
                        Some(outcome)
                    }
                    LedgerOp::LogTime(m) => {
                        let logged = ledger
                            .log_time(task.id, t.tech_id, hours(*m), None, false)
                            .await
                            .unwrap();
                        model.apply(-m);
                        Some(logged.ledger)
                    }
                    LedgerOp::Tracking(enabled) => {
                        ledger.set_time_tracking(project.id, *enabled).await.unwrap();
                        if model.tracking && !enabled {
                            model.balance = 0;
                        }
                        model.tracking = *enabled;
                        None
                    }
                };

                if !model.tracking {
                    if let Some(outcome) = outcome {
                        assert!(matches!(outcome, MovementOutcome::TrackingDisabled));
                    }
                    assert!(ledger.history(project.id).await.unwrap().is_empty());
                }
                assert_eq!(ledger.balance(project.id).await.unwrap(), model.balance);
                assert_eq!(ledger.audit(project.id).await.unwrap(), model.balance);
            }

            let alerts = t
                .sink
                .take()
                .into_iter()
                .filter(|i| i.event == EventKind::ProjectCreditLow)
                .filter(|i| i.recipient.email == "alice@example.com")
                .count();
            assert_eq!(alerts, model.crossings);
        });
    }
}
