//! Concurrent callers against a file-backed database with a full pool
//!
//! The in-memory fixture has a single connection, so requests there never
//! overlap. These tests let several connections contend for the write lock.

mod common;

use common::Fixture;
use sx_progress::Outcome;

const CALLS: i64 = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_submitted_answers_all_apply_once() {
    let fx = Fixture::on_disk().await;
    let caller = fx.learner("ana").await;
    let challenge = fx.challenges(fx.spanish).await[0];

    let mut handles = Vec::new();
    for _ in 0..CALLS {
        let service = fx.service.clone();
        let caller = caller.clone();
        handles.push(tokio::spawn(async move {
            service.record_challenge_outcome(&caller, challenge).await
        }));
    }

    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(outcome.is_applied(), "refused: {:?}", outcome);
    }

    let attempts: i64 = sqlx::query_scalar(
        "SELECT attempts FROM challenge_attempts WHERE user_id = ? AND challenge_id = ?",
    )
    .bind(caller.as_str())
    .bind(challenge)
    .fetch_one(&fx.pool)
    .await
    .unwrap();
    let enrollment = fx.enrollment(&caller, fx.spanish).await;
    let user = fx.user_row(&caller).await;

    assert_eq!(fx.attempt_rows(&caller).await, 1);
    assert_eq!(attempts, CALLS);
    assert_eq!(enrollment.course_points, 10 * CALLS);
    assert_eq!(user.total_points, 10 * CALLS);
    assert_eq!(enrollment.course_hearts, 5);
    assert_eq!(user.hearts, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_heart_loss_racing_refill_keeps_balances_consistent() {
    let fx = Fixture::on_disk().await;
    let caller = fx.learner("ana").await;
    let challenge = fx.challenges(fx.spanish).await[0];

    for round in 0..10 {
        fx.set_balances(&caller, 2, 50).await;

        let (consumed, refilled) = tokio::join!(
            {
                let service = fx.service.clone();
                let caller = caller.clone();
                tokio::spawn(async move { service.consume_heart(&caller, challenge).await })
            },
            {
                let service = fx.service.clone();
                let caller = caller.clone();
                tokio::spawn(async move { service.refill_hearts(&caller).await })
            },
        );
        let consumed = consumed.unwrap().unwrap();
        let refilled = refilled.unwrap().unwrap();

        assert!(matches!(consumed, Outcome::Applied(_)), "round {}", round);
        assert!(matches!(refilled, Outcome::Applied(_)), "round {}", round);

        let enrollment = fx.enrollment(&caller, fx.spanish).await;
        let user = fx.user_row(&caller).await;

        // Miss then refill ends full; refill then miss ends one short
        assert!(
            enrollment.course_hearts == 5 || enrollment.course_hearts == 4,
            "round {}: hearts {}",
            round,
            enrollment.course_hearts
        );
        assert_eq!(user.hearts, enrollment.course_hearts, "round {}", round);
        assert_eq!(user.total_points, 40, "round {}", round);
    }
}
