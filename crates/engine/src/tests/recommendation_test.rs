//! Recommendation property tests over a synthetic catalog

use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::snapshot::{BuildSnapshot, Snapshot};
use crate::types::{Event, FallbackReason, Item, RecommendationOrigin, User};
use crate::weights::EventWeightPolicy;

const KINDS: [&str; 6] = ["play", "complete", "like", "save", "pause", "skip"];

/// Deterministic linear congruential generator, good enough for fixtures
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

pub(super) fn synthetic_items() -> Vec<Item> {
    (0..15)
        .map(|i| {
            let content_type = if i % 3 == 0 { "series" } else { "movie" };
            Item::new(format!("i{:02}", i), format!("Title {}", i), content_type, "drama")
        })
        .collect()
}

pub(super) fn synthetic_events(seed: u64) -> Vec<Event> {
    let mut rng = Lcg(seed);
    let mut events = Vec::new();
    for user in 0..20 {
        let count = 1 + rng.next() % 8;
        for _ in 0..count {
            let item = rng.next() % 15;
            let kind = KINDS[(rng.next() % KINDS.len() as u64) as usize];
            let seconds = (rng.next() % 3600) as f64;
            events.push(Event::new(
                format!("u{:02}", user),
                format!("i{:02}", item),
                kind,
                seconds,
            ));
        }
    }
    events
}

fn synthetic_snapshot(config: &EngineConfig) -> Snapshot {
    let users: Vec<User> = (0..22).map(|u| User::new(format!("u{:02}", u))).collect();
    BuildSnapshot::execute(&synthetic_events(42), &users, &synthetic_items(), config).unwrap()
}

#[test]
fn test_never_recommends_seen_items() {
    let snapshot = synthetic_snapshot(&EngineConfig::default());

    for (_, user_id) in snapshot.interactions().users().iter() {
        let seen: HashSet<String> = snapshot
            .user_history(user_id.as_str(), usize::MAX)
            .unwrap()
            .into_iter()
            .map(|entry| entry.item_id.to_string())
            .collect();

        let list = snapshot.recommend(user_id.as_str(), 50).unwrap();
        for rec in &list.items {
            assert!(
                !seen.contains(rec.item_id.as_str()),
                "{} was recommended {} which is in its history",
                user_id,
                rec.item_id
            );
        }
    }
}

#[test]
fn test_scores_exclude_self_similarity() {
    let snapshot = synthetic_snapshot(&EngineConfig::default());
    let similarity = snapshot.similarity();

    for (user_idx, user_id) in snapshot.interactions().users().iter() {
        let history = snapshot.interactions().user_history(user_idx);
        let list = snapshot.recommend(user_id.as_str(), 50).unwrap();

        for rec in list
            .items
            .iter()
            .filter(|r| r.origin == RecommendationOrigin::Collaborative)
        {
            let candidate = snapshot
                .interactions()
                .items()
                .index_of(rec.item_id.as_str())
                .unwrap();
            let expected: f64 = history
                .iter()
                .map(|&(s, score)| similarity.get(candidate, s) * score)
                .sum();
            assert!((rec.score - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        }
    }
}

#[test]
fn test_collaborative_items_precede_padding_without_duplicates() {
    let snapshot = synthetic_snapshot(&EngineConfig::default());

    for (_, user_id) in snapshot.interactions().users().iter() {
        let list = snapshot.recommend(user_id.as_str(), 15).unwrap();

        let mut ids = HashSet::new();
        assert!(list.items.iter().all(|r| ids.insert(r.item_id.clone())));

        let first_padding = list
            .items
            .iter()
            .position(|r| r.origin == RecommendationOrigin::Popularity)
            .unwrap_or(list.items.len());
        assert!(list.items[first_padding..]
            .iter()
            .all(|r| r.origin == RecommendationOrigin::Popularity));

        let collaborative = &list.items[..first_padding];
        assert!(collaborative.iter().all(|r| r.score > 0.0));
        assert!(collaborative.windows(2).all(|w| w[0].score >= w[1].score));

        // Full list unless the catalog ran out of unseen items
        let seen = snapshot.user_history(user_id.as_str(), usize::MAX).unwrap().len();
        assert_eq!(list.items.len(), 15usize.min(15 - seen));
    }
}

#[test]
fn test_unknown_user_receives_popular_list() {
    let snapshot = synthetic_snapshot(&EngineConfig::default());

    let list = snapshot.recommend("not-a-user", 5).unwrap();
    let popular = snapshot.popular(5, None).unwrap();

    assert_eq!(list.fallback_reason(), Some(FallbackReason::UnknownUser));
    let recommended: Vec<_> = list.items.iter().map(|r| (&r.item_id, r.score)).collect();
    let expected: Vec<_> = popular.iter().map(|p| (&p.item_id, p.score)).collect();
    assert_eq!(recommended, expected);
}

#[test]
fn test_registered_user_without_events_is_distinguished() {
    let snapshot = synthetic_snapshot(&EngineConfig::default());

    // u20 and u21 exist only as user records
    let list = snapshot.recommend("u21", 5).unwrap();
    assert_eq!(list.fallback_reason(), Some(FallbackReason::EmptyHistory));
    assert_ne!(list.fallback_reason(), Some(FallbackReason::UnknownUser));
}

#[test]
fn test_heavier_weight_never_lowers_interaction_scores() {
    let base = EngineConfig::default();
    let heavier = EngineConfig::default()
        .with_weights(EventWeightPolicy::default().with_weight("like", 5.0));

    let before = synthetic_snapshot(&base);
    let after = synthetic_snapshot(&heavier);

    for (user_idx, user_id) in before.interactions().users().iter() {
        for (item_idx, item_id) in before.interactions().items().iter() {
            let old = before.interactions().values()[[user_idx, item_idx]];
            let new = after
                .interactions()
                .score(user_id.as_str(), item_id.as_str());
            assert!(new >= old);
        }
    }
}

#[test]
fn test_content_type_filter_restricts_every_item() {
    let snapshot = synthetic_snapshot(&EngineConfig::default());

    for (_, user_id) in snapshot.interactions().users().iter() {
        let options = crate::recommendation::RecommendOptions::top(10).with_content_type("series");
        let list = snapshot.recommend_with(user_id.as_str(), &options).unwrap();
        assert!(list
            .items
            .iter()
            .all(|r| snapshot.item(r.item_id.as_str()).unwrap().content_type == "series"));
    }
}

#[test]
fn test_complete_and_play_scenario() {
    let events = vec![
        Event::new("u1", "i1", "complete", 4000.0),
        Event::new("u1", "i1", "play", 1000.0),
    ];
    let snapshot = BuildSnapshot::execute(&events, &[], &[], &EngineConfig::default()).unwrap();

    assert_eq!(snapshot.interactions().score("u1", "i1"), 13000.0);
}

#[test]
fn test_proportional_items_are_fully_similar() {
    // Item A = [8000, 0, 2000], item B = [4000, 0, 1000] over users u1..u3
    let events = vec![
        Event::new("u1", "A", "play", 8000.0),
        Event::new("u3", "A", "play", 2000.0),
        Event::new("u1", "B", "play", 4000.0),
        Event::new("u3", "B", "play", 1000.0),
        Event::new("u2", "C", "play", 300.0),
    ];
    let snapshot = BuildSnapshot::execute(&events, &[], &[], &EngineConfig::default()).unwrap();
    let items = snapshot.interactions().items();
    let a = items.index_of("A").unwrap();
    let b = items.index_of("B").unwrap();

    assert_eq!(snapshot.similarity().get(a, b), 1.0);
    assert_eq!(snapshot.similarity().get(a, b), snapshot.similarity().get(b, a));
}

#[test]
fn test_unwatched_item_is_similar_to_nothing() {
    let events = vec![
        Event::new("u1", "A", "play", 10.0),
        Event::new("u2", "B", "play", 10.0),
    ];
    let items = vec![Item::new("Z", "Never watched", "movie", "drama")];
    let snapshot = BuildSnapshot::execute(&events, &[], &items, &EngineConfig::default()).unwrap();
    let z = snapshot.interactions().items().index_of("Z").unwrap();

    for j in 0..snapshot.similarity().len() {
        assert_eq!(snapshot.similarity().get(z, j), 0.0);
    }
}
