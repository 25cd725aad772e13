use std::{sync::Arc, time::Duration};

use roomie_domain::{match_key, match_state::MatchStatus};
use roomie_identity::StaticVerifier;
use roomie_service::{
	BioRequest, QuestionnaireSubmission, RegisterRequest, RoomieService, SwipeRequest,
};
use roomie_storage::{Store, memory::MemoryStore};

const CONFIG: &str = r#"
[service]
http_bind          = "127.0.0.1:0"
admin_bind         = "127.0.0.1:0"
log_level          = "info"
request_timeout_ms = 2000
feed_default_limit = 3
feed_max_limit     = 10

[storage]
backend = "memory"

[identity]
provider = "static"

[identity.static_tokens]
token-alice = "alice"
token-bob   = "bob"
token-odd   = "has_separator"
"#;

struct Harness {
	store: Arc<MemoryStore>,
	service: Arc<RoomieService>,
}

fn harness() -> Harness {
	harness_with_timeout(None)
}

fn harness_with_timeout(request_timeout_ms: Option<u64>) -> Harness {
	let mut cfg = roomie_config::parse(CONFIG).expect("Failed to parse test config.");

	if let Some(timeout) = request_timeout_ms {
		cfg.service.request_timeout_ms = timeout;
	}

	let store = Arc::new(MemoryStore::new());
	let identity = Arc::new(StaticVerifier::new(cfg.identity.static_tokens.clone()));
	let service = Arc::new(RoomieService::new(cfg, store.clone(), identity));

	Harness { store, service }
}

async fn register(service: &RoomieService, user_id: &str) {
	service
		.register(
			user_id,
			RegisterRequest {
				email: Some(format!("{user_id}@example.com")),
				student_email: Some(format!("{user_id}@uni.example.edu")),
				full_name: format!("{user_id} Example"),
				student_number: Some("12345".to_string()),
			},
		)
		.await
		.expect("Failed to register user.");
}

fn swipe(target: &str, action: &str) -> SwipeRequest {
	SwipeRequest { target_user_id: Some(target.to_string()), action: Some(action.to_string()) }
}

fn feed_ids(response: &roomie_service::FeedResponse) -> Vec<String> {
	response.feed.iter().map(|profile| profile.user_id.clone()).collect()
}

#[tokio::test]
async fn authenticate_distinguishes_missing_and_invalid_credentials() {
	let h = harness();

	assert_eq!(h.service.authenticate(Some("Bearer token-alice")).await.expect("auth"), "alice");

	let missing = h.service.authenticate(None).await.expect_err("expected failure");

	assert_eq!(missing.code(), "UNAUTHENTICATED");

	let malformed = h.service.authenticate(Some("token-alice")).await.expect_err("failure");

	assert_eq!(malformed.code(), "UNAUTHENTICATED");

	let invalid = h.service.authenticate(Some("Bearer nope")).await.expect_err("failure");

	assert_eq!(invalid.code(), "INVALID_CREDENTIAL");

	let unusable = h.service.authenticate(Some("Bearer token-odd")).await.expect_err("failure");

	assert_eq!(unusable.code(), "INVALID_CREDENTIAL");
}

#[tokio::test]
async fn feed_excludes_self_when_store_has_five_users() {
	let h = harness();

	for id in ["a", "b", "c", "d", "e"] {
		register(&h.service, id).await;
	}

	let feed = h.service.feed("a", Some(10)).await.expect("Feed failed.");

	assert_eq!(feed_ids(&feed), vec!["b", "c", "d", "e"]);
	assert!(!feed.has_more);
}

#[tokio::test]
async fn feed_limit_defaults_and_clamps() {
	let h = harness();

	for id in ["a", "b", "c", "d", "e"] {
		register(&h.service, id).await;
	}

	let default_page = h.service.feed("a", None).await.expect("Feed failed.");

	assert_eq!(default_page.feed.len(), 3);
	assert!(default_page.has_more);

	let zero = h.service.feed("a", Some(0)).await.expect("Feed failed.");

	assert_eq!(zero.feed.len(), 3);
	assert_eq!(h.service.effective_limit(Some(500)), 10);

	// Exactly `limit` remaining still reports more; the flag is a full-page heuristic.
	let exact = h.service.feed("a", Some(4)).await.expect("Feed failed.");

	assert_eq!(exact.feed.len(), 4);
	assert!(exact.has_more);
}

#[tokio::test]
async fn feed_never_repeats_swiped_users() {
	let h = harness();

	for id in ["a", "b", "c", "d"] {
		register(&h.service, id).await;
	}

	let first = h.service.feed("a", Some(2)).await.expect("Feed failed.");

	for id in feed_ids(&first) {
		h.service.swipe("a", swipe(&id, "reject")).await.expect("Swipe failed.");
	}

	let second = h.service.feed("a", Some(10)).await.expect("Feed failed.");

	assert_eq!(feed_ids(&first), vec!["b", "c"]);
	assert_eq!(feed_ids(&second), vec!["d"]);
	assert!(!feed_ids(&second).contains(&"a".to_string()));
}

#[tokio::test]
async fn reject_marks_shown_without_match_record() {
	let h = harness();

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;

	let response = h.service.swipe("alice", swipe("bob", "reject")).await.expect("Swipe failed.");

	assert!(response.success);
	assert!(!response.matched);
	assert!(response.match_id.is_none());

	h.service.swipe("alice", swipe("bob", "reject")).await.expect("Swipe failed.");

	let key = match_key::match_key("alice", "bob").expect("key");
	let state = h.store.get_feed_state("alice").await.expect("read").expect("feed state");

	assert!(h.store.get_match(&key).await.expect("read").is_none());
	assert_eq!(state.shown_users.len(), 1);
	assert!(state.shown_users.contains("bob"));
}

#[tokio::test]
async fn mutual_accept_forms_match_and_thread() {
	let h = harness();

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;

	let key = match_key::match_key("alice", "bob").expect("key");
	let first = h.service.swipe("alice", swipe("bob", "accept")).await.expect("Swipe failed.");

	assert!(!first.matched);
	assert!(first.match_id.is_none());

	let pending = h.store.get_match(&key).await.expect("read").expect("match record");

	assert_eq!(pending.state.status, MatchStatus::Pending);
	assert_eq!(pending.state.users.iter().collect::<Vec<_>>(), vec!["alice"]);
	assert!(h.store.get_thread(&key).await.expect("read").is_none());

	let second = h.service.swipe("bob", swipe("alice", "accept")).await.expect("Swipe failed.");

	assert!(second.matched);
	assert_eq!(second.match_id.as_deref(), Some("alice_bob"));

	let matched = h.store.get_match(&key).await.expect("read").expect("match record");
	let thread = h.store.get_thread(&key).await.expect("read").expect("thread");

	assert_eq!(matched.state.status, MatchStatus::Matched);
	assert_eq!(matched.state.users.len(), 2);
	assert!(matched.state.matched_at.is_some());
	assert_eq!(thread.participants, vec!["alice", "bob"]);
	assert!(thread.last_message.is_none());

	// Accepting again is idempotent and keeps the original match time.
	let again = h.service.swipe("alice", swipe("bob", "accept")).await.expect("Swipe failed.");
	let after = h.store.get_match(&key).await.expect("read").expect("match record");

	assert!(again.matched);
	assert_eq!(after.state.matched_at, matched.state.matched_at);
	assert_eq!(h.store.thread_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutual_accepts_converge() {
	for round in 0..20 {
		let h = harness();
		let a = format!("a{round}");
		let b = format!("b{round}");

		register(&h.service, &a).await;
		register(&h.service, &b).await;

		let left = {
			let service = h.service.clone();
			let (a, b) = (a.clone(), b.clone());

			tokio::spawn(async move { service.swipe(&a, swipe(&b, "accept")).await })
		};
		let right = {
			let service = h.service.clone();
			let (a, b) = (a.clone(), b.clone());

			tokio::spawn(async move { service.swipe(&b, swipe(&a, "accept")).await })
		};
		let left = left.await.expect("task").expect("Swipe failed.");
		let right = right.await.expect("task").expect("Swipe failed.");
		let key = match_key::match_key(&a, &b).expect("key");
		let record = h.store.get_match(&key).await.expect("read").expect("match record");

		assert!(left.matched || right.matched);
		assert_eq!(record.state.status, MatchStatus::Matched);
		assert_eq!(h.store.thread_count(), 1);
	}
}

#[tokio::test]
async fn swipe_validates_input_before_touching_feed_state() {
	let h = harness();

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;

	let cases = [
		(SwipeRequest { target_user_id: None, action: Some("accept".into()) }, "INVALID_REQUEST"),
		(SwipeRequest { target_user_id: Some("bob".into()), action: None }, "INVALID_REQUEST"),
		(swipe("bob", "superlike"), "INVALID_REQUEST"),
		(swipe("alice", "accept"), "INVALID_REQUEST"),
		(swipe("ghost", "accept"), "NOT_FOUND"),
	];

	for (req, code) in cases {
		let err = h.service.swipe("alice", req).await.expect_err("expected failure");

		assert_eq!(err.code(), code);
	}

	assert!(h.store.get_feed_state("alice").await.expect("read").is_none());
}

#[tokio::test]
async fn storage_failures_map_to_boundary_errors() {
	let h = harness();

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;

	h.store.fail_operation("list_users");

	let err = h.service.feed("alice", None).await.expect_err("expected failure");

	assert_eq!(err.code(), "FEED_UNAVAILABLE");

	h.store.restore_operation("list_users");
	h.store.fail_operation("record_accept");

	let err = h.service.swipe("alice", swipe("bob", "accept")).await.expect_err("failure");

	assert_eq!(err.code(), "SWIPE_FAILED");

	// The shown marking committed before the accept failed and is not rolled back.
	let state = h.store.get_feed_state("alice").await.expect("read").expect("feed state");

	assert!(state.shown_users.contains("bob"));

	h.store.restore_operation("record_accept");
	h.store.fail_operation("list_matched_for");

	let err = h.service.list_matches("alice").await.expect_err("expected failure");

	assert_eq!(err.code(), "MATCH_QUERY_FAILED");
}

#[tokio::test]
async fn stalled_storage_times_out_as_retryable() {
	let h = harness_with_timeout(Some(50));

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;

	h.store.stall_operation("list_users", Duration::from_secs(5));

	let err = h.service.feed("alice", None).await.expect_err("expected timeout");

	assert_eq!(err.code(), "TIMEOUT");

	h.store.restore_operation("list_users");
	h.store.stall_operation("record_accept", Duration::from_secs(5));

	let err = h.service.swipe("alice", swipe("bob", "accept")).await.expect_err("timeout");

	assert_eq!(err.code(), "TIMEOUT");

	h.store.restore_operation("record_accept");

	let feed = h.service.feed("alice", None).await.expect("feed after restore");

	assert!(feed.feed.is_empty());
}

#[tokio::test]
async fn accept_survives_failed_shown_marking() {
	let h = harness();

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;
	h.store.fail_operation("mark_shown");

	h.service.swipe("alice", swipe("bob", "accept")).await.expect("Swipe failed.");

	let response = h.service.swipe("bob", swipe("alice", "accept")).await.expect("Swipe failed.");

	assert!(response.matched);

	let err = h.service.swipe("alice", swipe("bob", "reject")).await.expect_err("failure");

	assert_eq!(err.code(), "SWIPE_FAILED");
}

#[tokio::test]
async fn list_matches_returns_redacted_counterparty() {
	let h = harness();

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;
	h.service.swipe("alice", swipe("bob", "accept")).await.expect("Swipe failed.");
	h.service.swipe("bob", swipe("alice", "accept")).await.expect("Swipe failed.");

	let response = h.service.list_matches("alice").await.expect("List failed.");
	let record = h.store.get_match("alice_bob").await.expect("read").expect("match record");

	assert_eq!(response.matches.len(), 1);
	assert_eq!(response.matches[0].match_id, "alice_bob");
	assert_eq!(response.matches[0].user.user_id, "bob");
	assert_eq!(Some(response.matches[0].matched_at), record.state.matched_at);

	let json = serde_json::to_value(&response).expect("serialize");
	let user = json["matches"][0]["user"].as_object().expect("user object");

	assert!(!user.contains_key("email"));
	assert!(!user.contains_key("studentEmail"));
	assert!(!user.contains_key("studentNumber"));
	assert!(json["matches"][0]["matchedAt"].is_string());
}

#[tokio::test]
async fn list_matches_skips_missing_counterparty() {
	let h = harness();

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;

	// "ghost" never registered, so only the store knows about this pair.
	let ghost_key = match_key::match_key("alice", "ghost").expect("key");
	let now = time::OffsetDateTime::now_utc();

	h.store.record_accept(&ghost_key, "ghost", "alice", now).await.expect("accept");
	h.store.record_accept(&ghost_key, "alice", "ghost", now).await.expect("accept");
	h.service.swipe("alice", swipe("bob", "accept")).await.expect("Swipe failed.");
	h.service.swipe("bob", swipe("alice", "accept")).await.expect("Swipe failed.");

	let response = h.service.list_matches("alice").await.expect("List failed.");
	let ids: Vec<&str> = response.matches.iter().map(|m| m.match_id.as_str()).collect();

	assert_eq!(ids, vec!["alice_bob"]);
}

#[tokio::test]
async fn messages_are_ordered_and_update_the_header() {
	let h = harness();

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;
	h.service.swipe("alice", swipe("bob", "accept")).await.expect("Swipe failed.");
	h.service.swipe("bob", swipe("alice", "accept")).await.expect("Swipe failed.");

	assert!(h.service.send_message("alice_bob", "alice", "  hi  ").await);
	assert!(h.service.send_message("alice_bob", "bob", "there").await);

	let messages = h.service.list_messages("alice", "alice_bob").await.expect("List failed.");
	let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
	let thread = h.store.get_thread("alice_bob").await.expect("read").expect("thread");

	assert_eq!(texts, vec!["hi", "there"]);
	assert!(messages.iter().all(|m| !m.read));
	assert_eq!(thread.last_message.as_deref(), Some("there"));
	assert_eq!(thread.last_message_sender.as_deref(), Some("bob"));
}

#[tokio::test]
async fn send_message_reports_failures_as_false() {
	let h = harness();

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;
	register(&h.service, "carol").await;
	h.service.swipe("alice", swipe("bob", "accept")).await.expect("Swipe failed.");
	h.service.swipe("bob", swipe("alice", "accept")).await.expect("Swipe failed.");

	assert!(!h.service.send_message("alice_bob", "alice", "   ").await);
	assert!(!h.service.send_message("alice_bob", "carol", "hello").await);
	assert!(!h.service.send_message("alice_carol", "alice", "hello").await);

	h.store.fail_operation("append_message");

	assert!(!h.service.send_message("alice_bob", "alice", "hello").await);
	assert_eq!(h.store.message_count("alice_bob"), Some(0));

	let forbidden = h.service.list_messages("carol", "alice_bob").await.expect_err("failure");
	let missing = h.service.list_messages("alice", "alice_carol").await.expect_err("failure");

	assert_eq!(forbidden.code(), "FORBIDDEN");
	assert_eq!(missing.code(), "NOT_FOUND");
}

#[tokio::test]
async fn subscription_delivers_snapshot_then_new_messages() {
	let h = harness();

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;
	h.service.swipe("alice", swipe("bob", "accept")).await.expect("Swipe failed.");
	h.service.swipe("bob", swipe("alice", "accept")).await.expect("Swipe failed.");

	assert!(h.service.send_message("alice_bob", "alice", "first").await);

	let mut subscription = h.service.subscribe("bob", "alice_bob").await.expect("subscribe");
	let snapshot = subscription.take_snapshot();

	assert_eq!(snapshot.iter().map(|m| m.text.as_str()).collect::<Vec<_>>(), vec!["first"]);
	assert!(subscription.take_snapshot().is_empty());

	assert!(h.service.send_message("alice_bob", "bob", "second").await);
	assert!(h.service.send_message("alice_bob", "alice", "third").await);

	let mut delivered = Vec::new();

	while delivered.len() < 2 {
		let batch = tokio::time::timeout(Duration::from_secs(2), subscription.next_batch())
			.await
			.expect("Timed out waiting for messages.")
			.expect("Subscription ended.");

		delivered.extend(batch.into_iter().map(|m| (m.seq, m.text)));
	}

	assert_eq!(delivered, vec![(2, "second".to_string()), (3, "third".to_string())]);

	let err = h.service.subscribe("carol", "alice_bob").await.err().expect("expected failure");

	assert_eq!(err.code(), "FORBIDDEN");
}

#[tokio::test]
async fn onboarding_flow_updates_profile_and_traits() {
	let h = harness();

	register(&h.service, "alice").await;

	let duplicate = h
		.service
		.register("alice", RegisterRequest { full_name: "Alice".into(), ..Default::default() })
		.await
		.expect_err("expected conflict");

	assert_eq!(duplicate.code(), "CONFLICT");

	let blank = h
		.service
		.register("bob", RegisterRequest { full_name: "  ".into(), ..Default::default() })
		.await
		.expect_err("expected failure");

	assert_eq!(blank.code(), "INVALID_REQUEST");

	let too_young = h
		.service
		.submit_bio(
			"alice",
			BioRequest {
				name: "Alice".into(),
				age: 17,
				bio: String::new(),
				profile_image: String::new(),
			},
		)
		.await
		.expect_err("expected failure");

	assert_eq!(too_young.code(), "INVALID_REQUEST");

	let profile = h
		.service
		.submit_bio(
			"alice",
			BioRequest {
				name: " Alice ".into(),
				age: 21,
				bio: "Quiet, tidy.".into(),
				profile_image: "img/alice.png".into(),
			},
		)
		.await
		.expect("Bio failed.");

	assert!(profile.profile.profile_complete);
	assert!(!profile.profile.onboarding_complete);
	assert_eq!(profile.profile.name.as_deref(), Some("Alice"));

	let unknown = h
		.service
		.submit_questionnaire(
			"alice",
			QuestionnaireSubmission { answers: [("Q99".to_string(), 3)].into_iter().collect() },
		)
		.await
		.expect_err("expected failure");

	assert_eq!(unknown.code(), "INVALID_REQUEST");

	let vector = h
		.service
		.submit_questionnaire(
			"alice",
			QuestionnaireSubmission { answers: [("Q4".to_string(), 5)].into_iter().collect() },
		)
		.await
		.expect("Questionnaire failed.");

	assert!((vector.traits.budgetness - 5.0).abs() < 1e-9);
	assert!((vector.traits.organizedness - 3.0).abs() < 1e-9);
	assert_eq!(vector.traits.cleanliness, 0.0);

	let me = h.service.me("alice").await.expect("me failed");

	assert!(me.profile.onboarding_complete);
	assert!(me.profile.profile_complete);
	assert_eq!(me.email.as_deref(), Some("alice@example.com"));
	assert!(h.store.get_traits("alice").await.expect("read").is_some());

	let missing = h.service.me("nobody").await.expect_err("expected failure");

	assert_eq!(missing.code(), "NOT_FOUND");
}

#[tokio::test]
async fn admin_listing_includes_pending_records() {
	let h = harness();

	register(&h.service, "alice").await;
	register(&h.service, "bob").await;
	register(&h.service, "carol").await;
	h.service.swipe("alice", swipe("bob", "accept")).await.expect("Swipe failed.");
	h.service.swipe("bob", swipe("alice", "accept")).await.expect("Swipe failed.");
	h.service.swipe("carol", swipe("alice", "accept")).await.expect("Swipe failed.");

	let response = h.service.admin_list_matches("alice").await.expect("List failed.");
	let statuses: Vec<(&str, &str)> = response
		.matches
		.iter()
		.map(|m| (m.match_id.as_str(), m.status.as_str()))
		.collect();

	assert_eq!(statuses, vec![("alice_bob", "matched"), ("alice_carol", "pending")]);
	assert_eq!(response.matches[1].users, vec!["carol"]);
	assert!(response.matches[1].matched_at.is_none());
}
