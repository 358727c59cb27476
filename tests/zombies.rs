use actstream::{
	api::Api,
	common::{Document, EntityRef},
	model::NewAction,
	test::*,
};
use chrono::{Duration, TimeZone, Utc};
use futures::{pin_mut, TryStreamExt};
use rand::Rng;


#[ctor::ctor]
fn initialize() { env_logger::init(); }

const HUMANS: i64 = 10;

/// A single zombie bites every human, one at a time and in random order, at
/// random moments.
async fn zombie_apocalypse(filename: &str) -> Api {
	let api = load_api(filename).await;
	let mut rng = initialize_rng();
	let zombie = User(1000).entity_ref();
	let mut humans: Vec<EntityRef> = (1..=HUMANS).map(|i| User(i).entity_ref()).collect();
	let start = Utc.with_ymd_and_hms(2020, 10, 31, 23, 0, 0).unwrap();

	while !humans.is_empty() {
		let victim = humans.swap_remove(rng.gen_range(0..humans.len()));
		let moment = start + Duration::minutes(rng.gen_range(0..600));
		api.emit(
			NewAction::new(zombie.clone(), "killed")
				.target(victim)
				.timestamp(moment),
		)
		.await
		.unwrap();
	}
	api
}


#[tokio::test]
async fn test_document_stream() {
	let api = zombie_apocalypse("zombies-all").await;
	let actions = api.document_stream(&User::TYPE).unwrap().all().await.unwrap();
	assert_eq!(actions.len(), HUMANS as usize);
	for pair in actions.windows(2) {
		assert!(pair[0].timestamp >= pair[1].timestamp);
	}
}

#[tokio::test]
async fn test_document_stream_sliced() {
	let api = zombie_apocalypse("zombies-sliced").await;
	let feed = api.document_stream(&User::TYPE).unwrap();
	let all = feed.all().await.unwrap();

	let first_five = feed.clone().slice(0, Some(5));
	assert_eq!(first_five.all().await.unwrap(), all[..5]);
	assert_eq!(first_five.count().await.unwrap(), 5);

	// Slicing a slice is relative to the first one.
	let middle = feed.clone().slice(2, Some(8)).slice(1, Some(3));
	assert_eq!(middle.all().await.unwrap(), all[3..5]);
	assert_eq!(middle.first().await.unwrap().as_ref(), Some(&all[3]));

	let tail = feed.clone().slice(7, None);
	assert_eq!(tail.count().await.unwrap(), 3);
	assert_eq!(tail.all().await.unwrap(), all[7..]);
	assert!(feed.slice(20, None).all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_document_stream_cursor() {
	let api = zombie_apocalypse("zombies-cursor").await;
	let feed = api.document_stream(&User::TYPE).unwrap();
	let expected = feed.all().await.unwrap();

	let mut found = Vec::new();
	let rows = feed.stream().await.unwrap();
	pin_mut!(rows);
	while let Some(action) = rows.try_next().await.unwrap() {
		found.push(action);
	}
	assert_eq!(found, expected);
}

#[tokio::test]
async fn test_time_range() {
	let api = zombie_apocalypse("zombies-range").await;
	let feed = api.document_stream(&User::TYPE).unwrap();
	let all = feed.all().await.unwrap();
	let middle = all[all.len() / 2].datetime();

	let before = feed.clone().until(middle).all().await.unwrap();
	let after = feed.clone().since(middle).all().await.unwrap();
	assert_eq!(before.len() + after.len(), all.len());
	assert!(before.iter().all(|a| a.datetime() < middle));
	assert!(after.iter().all(|a| a.datetime() >= middle));
}

#[tokio::test]
async fn test_evaluation_is_not_cached() {
	let api = zombie_apocalypse("zombies-fresh").await;
	let feed = api.document_stream(&User::TYPE).unwrap();
	assert_eq!(feed.count().await.unwrap(), HUMANS as u64);

	api.purge(&User(1).entity_ref()).await.unwrap();
	assert_eq!(feed.count().await.unwrap(), HUMANS as u64 - 1);
}
