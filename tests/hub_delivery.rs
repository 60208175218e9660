//! Broadcast fabric behavior: ordering, eviction, idempotence.

use ludo_server::game::session::GameSession;
use ludo_server::ws::event::{Event, EventKind};
use ludo_server::ws::hub::{EventHub, SUBSCRIBER_BUFFER};

const CODE: &str = "12345678";

fn roll_event(roll: u8) -> Event {
    let game = GameSession::new(CODE.into(), "H".into(), "Host".into(), 2);
    Event::now(EventKind::DiceRolled {
        game: game.snapshot(),
        player_id: "H".into(),
        roll,
        three_sixes: false,
        valid_moves: Vec::new(),
    })
}

fn frame_roll(frame: &str) -> u8 {
    let value: serde_json::Value = serde_json::from_str(frame).unwrap();
    value["data"]["roll"].as_u64().unwrap() as u8
}

#[tokio::test]
async fn delivery_order_matches_broadcast_order() {
    let hub = EventHub::new();
    let mut alice = hub.subscribe(CODE, "A");
    let mut bob = hub.subscribe(CODE, "B");

    for roll in 1..=5u8 {
        hub.broadcast(CODE, &roll_event(roll));
    }

    for rx in [&mut alice.rx, &mut bob.rx] {
        for expected in 1..=5u8 {
            let frame = rx.recv().await.unwrap();
            assert_eq!(frame_roll(&frame), expected);
        }
        // At-most-once: nothing extra is queued.
        assert!(rx.try_recv().is_err());
    }
}

#[tokio::test]
async fn slow_subscribers_are_evicted_at_capacity() {
    let hub = EventHub::new();
    let mut sub = hub.subscribe(CODE, "A");

    for roll in 0..(SUBSCRIBER_BUFFER + 1) {
        hub.broadcast(CODE, &roll_event((roll % 6) as u8 + 1));
    }

    assert_eq!(hub.subscriber_count(CODE), 0);
    assert!(hub.connected_players(CODE).is_empty());

    // The buffered frames are still readable, then the channel closes.
    let mut delivered = 0;
    while sub.rx.recv().await.is_some() {
        delivered += 1;
    }
    assert_eq!(delivered, SUBSCRIBER_BUFFER);
}

#[tokio::test]
async fn eviction_spares_healthy_subscribers() {
    let hub = EventHub::new();
    let _stalled = hub.subscribe(CODE, "A");
    let mut healthy = hub.subscribe(CODE, "B");

    for roll in 0..(SUBSCRIBER_BUFFER + 1) {
        hub.broadcast(CODE, &roll_event((roll % 6) as u8 + 1));
        // The healthy subscriber keeps draining.
        while healthy.rx.try_recv().is_ok() {}
    }

    assert_eq!(hub.subscriber_count(CODE), 1);
    assert_eq!(hub.connected_players(CODE), vec!["B".to_string()]);
}

#[tokio::test]
async fn unsubscribe_is_idempotent() {
    let hub = EventHub::new();
    let sub = hub.subscribe(CODE, "A");
    hub.unsubscribe(CODE, sub.id);
    hub.unsubscribe(CODE, sub.id);
    assert_eq!(hub.subscriber_count(CODE), 0);
    assert!(hub.connected_players(CODE).is_empty());
}

#[tokio::test]
async fn broadcast_to_an_unknown_room_is_a_no_op() {
    let hub = EventHub::new();
    hub.broadcast("00000000", &roll_event(3));
    assert_eq!(hub.subscriber_count("00000000"), 0);
}

#[tokio::test]
async fn connected_players_deduplicates_multi_tab_ids() {
    let hub = EventHub::new();
    let _one = hub.subscribe(CODE, "A");
    let _two = hub.subscribe(CODE, "A");
    let _other = hub.subscribe(CODE, "B");
    assert_eq!(
        hub.connected_players(CODE),
        vec!["A".to_string(), "B".to_string()]
    );
    assert_eq!(hub.subscriber_count(CODE), 3);
}

#[tokio::test]
async fn send_to_reaches_only_the_target() {
    let hub = EventHub::new();
    let mut alice = hub.subscribe(CODE, "A");
    let mut bob = hub.subscribe(CODE, "B");

    hub.send_to(CODE, alice.id, "direct".to_string());

    assert_eq!(alice.rx.recv().await.unwrap(), "direct");
    assert!(bob.rx.try_recv().is_err());
}
