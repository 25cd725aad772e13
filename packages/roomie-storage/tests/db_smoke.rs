use std::sync::Arc;

use time::macros::datetime;

use roomie_config::Postgres;
use roomie_domain::{match_key, match_state::MatchStatus};
use roomie_storage::{
	Error, Store,
	db::Db,
	models::{MessageKind, NewMessage, NewUser},
};
use roomie_testkit::ScratchDb;

async fn bootstrap(scratch: &ScratchDb, pool_max_conns: u32) -> Db {
	let cfg = Postgres { dsn: scratch.dsn().to_string(), pool_max_conns };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ROOMIE_PG_DSN to run."]
async fn db_connects_and_bootstraps_twice() {
	let Some(scratch) = ScratchDb::from_env().await else {
		eprintln!("Skipping; set ROOMIE_PG_DSN to run this test.");

		return;
	};
	let scratch = scratch.expect("Failed to create scratch database.");
	let db = bootstrap(&scratch, 1).await;

	db.ensure_schema().await.expect("Schema bootstrap must be repeatable.");

	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM information_schema.tables WHERE table_name = 'message_threads'",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 1);

	scratch.release().await.expect("Failed to drop scratch database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ROOMIE_PG_DSN to run."]
async fn duplicate_user_is_a_conflict() {
	let Some(scratch) = ScratchDb::from_env().await else {
		eprintln!("Skipping; set ROOMIE_PG_DSN to run this test.");

		return;
	};
	let scratch = scratch.expect("Failed to create scratch database.");
	let db = bootstrap(&scratch, 1).await;
	let user = NewUser {
		user_id: "alice".to_string(),
		email: None,
		student_email: None,
		student_number: None,
		full_name: "Alice".to_string(),
		created_at: datetime!(2026-01-05 10:00 UTC),
	};

	db.insert_user(user.clone()).await.expect("Insert failed.");

	let err = db.insert_user(user).await.expect_err("Expected conflict.");

	assert!(matches!(err, Error::Conflict(_)));

	scratch.release().await.expect("Failed to drop scratch database.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires external Postgres. Set ROOMIE_PG_DSN to run."]
async fn concurrent_mutual_accepts_create_one_thread() {
	let Some(scratch) = ScratchDb::from_env().await else {
		eprintln!("Skipping; set ROOMIE_PG_DSN to run this test.");

		return;
	};
	let scratch = scratch.expect("Failed to create scratch database.");
	let db = Arc::new(bootstrap(&scratch, 4).await);
	let key = match_key::match_key("alice", "bob").expect("Valid pair.");
	let now = datetime!(2026-01-05 10:00 UTC);
	let left = {
		let db = db.clone();
		let key = key.clone();

		tokio::spawn(async move { db.record_accept(&key, "alice", "bob", now).await })
	};
	let right = {
		let db = db.clone();
		let key = key.clone();

		tokio::spawn(async move { db.record_accept(&key, "bob", "alice", now).await })
	};
	let left = left.await.expect("Task panicked.").expect("Accept failed.");
	let right = right.await.expect("Task panicked.").expect("Accept failed.");

	assert!(left.outcome.is_matched() ^ right.outcome.is_matched());

	let record = db.get_match(&key).await.expect("Read failed.").expect("Missing match.");

	assert_eq!(record.state.status, MatchStatus::Matched);

	let threads: i64 = sqlx::query_scalar("SELECT count(*) FROM message_threads")
		.fetch_one(&db.pool)
		.await
		.expect("Failed to count threads.");

	assert_eq!(threads, 1);

	let first = db
		.append_message(
			&key,
			NewMessage {
				sender_id: "alice".to_string(),
				text: "hi".to_string(),
				kind: MessageKind::Text,
				sent_at: now,
			},
		)
		.await
		.expect("Append failed.");

	assert_eq!(first.seq, 1);
	assert_eq!(db.list_messages(&key).await.expect("List failed."), vec![first]);

	drop(db);
	scratch.release().await.expect("Failed to drop scratch database.");
}
