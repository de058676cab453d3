use crate::domain::cards::DECK_SIZE;
use crate::domain::errors::GameError;
use crate::domain::state::{GamePhase, RoomStatus};
use crate::services::test_support::{Harness, Target};
use crate::store::GameStore;
use crate::ws::protocol::ServerMsg;

const ALICE: (&str, &str) = ("p-alice", "alice");
const BOB: (&str, &str) = ("p-bob", "bob");
const CAROL: (&str, &str) = ("p-carol", "carol");

// ----------------------------------------------------------------------
// Room lifecycle
// ----------------------------------------------------------------------

#[tokio::test]
async fn create_room_announces_to_creator_and_room() {
    let h = Harness::new();
    let conn = Harness::conn();
    let room_id = h
        .service
        .create_room(conn, ALICE.0, ALICE.1, 4)
        .await
        .unwrap();
    assert_eq!(room_id.len(), 8);

    let events = h.hub.events();
    assert!(events.iter().any(|(target, msg)| {
        *target == Target::Conn(conn)
            && matches!(msg, ServerMsg::RoomCreated { room_id: r } if *r == room_id)
    }));
    assert!(h.hub.broadcasts(&room_id).iter().any(|msg| matches!(
        msg,
        ServerMsg::PlayerJoined { nickname, player_count: 1, players, .. }
            if nickname == "alice" && players == &["alice".to_string()]
    )));
}

#[tokio::test]
async fn join_unknown_room_is_rejected() {
    let h = Harness::new();
    let err = h
        .service
        .join_room(Harness::conn(), BOB.0, "nope1234", BOB.1)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::RoomNotFound { .. }));
}

#[tokio::test]
async fn join_after_start_is_rejected() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    let err = h
        .service
        .join_room(Harness::conn(), CAROL.0, &room_id, CAROL.1)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::GameAlreadyStarted));
}

#[tokio::test]
async fn join_full_room_is_rejected() {
    let h = Harness::new();
    let room_id = h.waiting_room(&[ALICE, BOB], 2).await;
    let err = h
        .service
        .join_room(Harness::conn(), CAROL.0, &room_id, CAROL.1)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::RoomFull));
}

#[tokio::test]
async fn duplicate_nickname_is_rejected() {
    let h = Harness::new();
    let room_id = h.waiting_room(&[ALICE], 4).await;
    let err = h
        .service
        .join_room(Harness::conn(), BOB.0, &room_id, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NicknameTaken { .. }));
}

#[tokio::test]
async fn rejoin_by_a_member_is_idempotent() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;

    // Reconnect mid-game: succeeds even though the room is Playing,
    // and the member list does not grow.
    h.service
        .join_room(Harness::conn(), BOB.0, &room_id, BOB.1)
        .await
        .unwrap();
    assert_eq!(h.store.player_count(&room_id).await.unwrap(), 2);
}

#[tokio::test]
async fn only_the_host_can_start() {
    let h = Harness::new();
    let room_id = h.waiting_room(&[ALICE, BOB], 4).await;
    let err = h.service.start_game(BOB.0, &room_id).await.unwrap_err();
    assert!(matches!(err, GameError::NotHost));
}

#[tokio::test]
async fn starting_alone_is_rejected() {
    let h = Harness::new();
    let room_id = h.waiting_room(&[ALICE], 4).await;
    let err = h.service.start_game(ALICE.0, &room_id).await.unwrap_err();
    assert!(matches!(err, GameError::NotEnoughPlayers));
}

#[tokio::test]
async fn start_deals_a_full_deck_and_gives_the_host_the_first_turn() {
    let h = Harness::new();
    let room_id = h.waiting_room(&[ALICE, BOB], 4).await;
    h.hub.clear();
    h.service.start_game(ALICE.0, &room_id).await.unwrap();

    assert_eq!(h.store.deck_count(&room_id).await.unwrap(), DECK_SIZE);
    let broadcasts = h.hub.broadcasts(&room_id);
    assert!(broadcasts.iter().any(|msg| matches!(
        msg,
        ServerMsg::GameStarted { deck_count, first_player, players }
            if *deck_count == DECK_SIZE
                && first_player == "alice"
                && players == &["alice".to_string(), "bob".to_string()]
    )));

    // First field is empty, so the first phase is Draw.
    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.current_nickname, "alice");
    assert_eq!(turn.phase, GamePhase::Draw);
}

#[tokio::test]
async fn starting_twice_is_rejected() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    let err = h.service.start_game(ALICE.0, &room_id).await.unwrap_err();
    assert!(matches!(err, GameError::GameAlreadyStarted));
}

// ----------------------------------------------------------------------
// Draw
// ----------------------------------------------------------------------

#[tokio::test]
async fn draw_with_no_steal_target_moves_to_drawn() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.stack_deck(&room_id, &[1, 2, 3, 4]).await;
    h.hub.clear();

    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    assert_eq!(h.store.field(&room_id, "alice").await.unwrap(), vec![4]);
    assert_eq!(h.store.deck_count(&room_id).await.unwrap(), 3);
    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.phase, GamePhase::Drawn);
    assert_eq!(turn.drawn_card, None);

    assert!(h.hub.broadcasts(&room_id).iter().any(|msg| matches!(
        msg,
        ServerMsg::CardDrawn { player, card: 4, field }
            if player == "alice" && field == &[4]
    )));
}

#[tokio::test]
async fn drawing_out_of_turn_is_rejected() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    let err = h.service.draw_card(BOB.0, &room_id).await.unwrap_err();
    assert!(matches!(err, GameError::NotYourTurn));
}

#[tokio::test]
async fn actions_before_start_are_rejected() {
    let h = Harness::new();
    let room_id = h.waiting_room(&[ALICE, BOB], 4).await;
    let err = h.service.draw_card(ALICE.0, &room_id).await.unwrap_err();
    assert!(matches!(err, GameError::GameNotStarted));
}

#[tokio::test]
async fn non_members_cannot_act() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    let err = h.service.draw_card(CAROL.0, &room_id).await.unwrap_err();
    assert!(matches!(err, GameError::NotYourTurn));
}

#[tokio::test]
async fn draw_enters_steal_when_an_opponent_holds_the_value() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.store.add_to_field(&room_id, "bob", 5).await.unwrap();
    h.stack_deck(&room_id, &[1, 2, 5]).await;

    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.phase, GamePhase::Steal);
    assert_eq!(turn.drawn_card, Some(5));
}

#[tokio::test]
async fn own_field_is_not_a_steal_target() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    // Alice already holds a 5; the drawn 5 must not offer a steal.
    h.store.add_to_field(&room_id, "alice", 5).await.unwrap();
    h.stack_deck(&room_id, &[1, 2, 5]).await;

    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.phase, GamePhase::Drawn);
}

// ----------------------------------------------------------------------
// Steal
// ----------------------------------------------------------------------

#[tokio::test]
async fn steal_moves_the_card_value_to_the_thief_score() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.store.add_to_field(&room_id, "bob", 5).await.unwrap();
    h.stack_deck(&room_id, &[1, 2, 5]).await;
    h.service.draw_card(ALICE.0, &room_id).await.unwrap();
    h.hub.clear();

    h.service
        .steal_card(ALICE.0, &room_id, "bob", 5)
        .await
        .unwrap();

    assert!(h.store.field(&room_id, "bob").await.unwrap().is_empty());
    let scores = h.store.all_scores(&room_id).await.unwrap();
    assert_eq!(scores["alice"], 5);

    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.phase, GamePhase::Drawn);
    assert_eq!(turn.drawn_card, None);

    assert!(h.hub.broadcasts(&room_id).iter().any(|msg| matches!(
        msg,
        ServerMsg::CardStolen { from_player, to_player, card: 5 }
            if from_player == "bob" && to_player == "alice"
    )));
}

#[tokio::test]
async fn only_the_drawn_value_can_be_stolen() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.store.add_to_field(&room_id, "bob", 5).await.unwrap();
    h.store.add_to_field(&room_id, "bob", 3).await.unwrap();
    h.stack_deck(&room_id, &[1, 2, 5]).await;
    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    let err = h
        .service
        .steal_card(ALICE.0, &room_id, "bob", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::CannotSteal { .. }));

    // Failed steal leaves the turn untouched.
    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.phase, GamePhase::Steal);
    assert_eq!(h.store.field(&room_id, "bob").await.unwrap(), vec![5, 3]);
}

#[tokio::test]
async fn stealing_from_a_player_without_the_card_is_rejected() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB, CAROL], 4).await;
    h.store.add_to_field(&room_id, "bob", 5).await.unwrap();
    h.stack_deck(&room_id, &[1, 2, 5]).await;
    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    let err = h
        .service
        .steal_card(ALICE.0, &room_id, "carol", 5)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::CannotSteal { .. }));
}

#[tokio::test]
async fn steal_outside_the_steal_phase_is_rejected() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    let err = h
        .service
        .steal_card(ALICE.0, &room_id, "bob", 5)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::InvalidPhase { .. }));
}

#[tokio::test]
async fn skipping_a_steal_continues_the_turn() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.store.add_to_field(&room_id, "bob", 5).await.unwrap();
    h.stack_deck(&room_id, &[1, 2, 5]).await;
    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    h.service.skip_steal(ALICE.0, &room_id).await.unwrap();

    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.phase, GamePhase::Drawn);
    assert_eq!(turn.drawn_card, None);
    // Bob keeps his card.
    assert_eq!(h.store.field(&room_id, "bob").await.unwrap(), vec![5]);
}

// ----------------------------------------------------------------------
// Score
// ----------------------------------------------------------------------

#[tokio::test]
async fn scoring_banks_the_field_sum_and_moves_to_draw() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.store.add_to_field(&room_id, "alice", 3).await.unwrap();
    h.store.add_to_field(&room_id, "alice", 4).await.unwrap();
    h.store
        .set_turn(&room_id, "alice", GamePhase::Score, None)
        .await
        .unwrap();
    h.hub.clear();

    h.service.score_cards(ALICE.0, &room_id).await.unwrap();

    assert!(h.store.field(&room_id, "alice").await.unwrap().is_empty());
    assert_eq!(h.store.all_scores(&room_id).await.unwrap()["alice"], 7);
    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.phase, GamePhase::Draw);

    assert!(h.hub.broadcasts(&room_id).iter().any(|msg| matches!(
        msg,
        ServerMsg::CardsScored { player, cards, score: 7 }
            if player == "alice" && cards == &[3, 4]
    )));
}

#[tokio::test]
async fn scoring_an_empty_field_is_rejected() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.store
        .set_turn(&room_id, "alice", GamePhase::Score, None)
        .await
        .unwrap();

    let err = h.service.score_cards(ALICE.0, &room_id).await.unwrap_err();
    assert!(matches!(err, GameError::InvalidPhase { .. }));
}

#[tokio::test]
async fn scoring_during_draw_phase_is_rejected() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    let err = h.service.score_cards(ALICE.0, &room_id).await.unwrap_err();
    assert!(matches!(err, GameError::InvalidPhase { .. }));
}

// ----------------------------------------------------------------------
// Burst
// ----------------------------------------------------------------------

#[tokio::test]
async fn burst_loses_the_field_and_passes_the_turn() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.store.add_to_field(&room_id, "alice", 7).await.unwrap();
    h.store.add_to_field(&room_id, "alice", 2).await.unwrap();
    h.store
        .set_turn(&room_id, "alice", GamePhase::Drawn, None)
        .await
        .unwrap();
    h.stack_deck(&room_id, &[1, 2, 7]).await;
    h.hub.clear();

    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    assert!(h.store.field(&room_id, "alice").await.unwrap().is_empty());
    assert!(h.hub.broadcasts(&room_id).iter().any(|msg| matches!(
        msg,
        ServerMsg::Burst { player, lost_cards }
            if player == "alice" && lost_cards == &[7, 2, 7]
    )));

    // No points banked, and the turn is now Bob's.
    assert_eq!(h.store.all_scores(&room_id).await.unwrap()["alice"], 0);
    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.current_nickname, "bob");
    assert_eq!(turn.phase, GamePhase::Draw);
}

#[tokio::test]
async fn two_matching_cards_alone_do_not_burst() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.store.add_to_field(&room_id, "alice", 7).await.unwrap();
    h.store
        .set_turn(&room_id, "alice", GamePhase::Drawn, None)
        .await
        .unwrap();
    h.stack_deck(&room_id, &[1, 2, 7]).await;

    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    // Field is [7, 7]: still below the three-card threshold.
    assert_eq!(h.store.field(&room_id, "alice").await.unwrap(), vec![7, 7]);
}

// ----------------------------------------------------------------------
// Turn handoff
// ----------------------------------------------------------------------

#[tokio::test]
async fn end_turn_hands_over_in_join_order() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB, CAROL], 4).await;
    h.stack_deck(&room_id, &[1, 2, 3, 4]).await;
    h.service.draw_card(ALICE.0, &room_id).await.unwrap();
    h.hub.clear();

    h.service.end_turn(ALICE.0, &room_id).await.unwrap();

    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.current_nickname, "bob");
    assert_eq!(turn.phase, GamePhase::Draw);
    assert!(h.hub.broadcasts(&room_id).iter().any(|msg| matches!(
        msg,
        ServerMsg::TurnChanged { current_player } if current_player == "bob"
    )));
}

#[tokio::test]
async fn ending_a_turn_before_drawing_is_rejected() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    let err = h.service.end_turn(ALICE.0, &room_id).await.unwrap_err();
    assert!(matches!(err, GameError::InvalidPhase { .. }));
}

#[tokio::test]
async fn a_turn_with_leftover_field_cards_starts_in_score() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.store.add_to_field(&room_id, "bob", 9).await.unwrap();
    h.stack_deck(&room_id, &[1, 2, 3, 4]).await;
    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    h.service.end_turn(ALICE.0, &room_id).await.unwrap();

    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.current_nickname, "bob");
    assert_eq!(turn.phase, GamePhase::Score);
}

#[tokio::test]
async fn turn_order_skips_a_departed_member() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB, CAROL], 4).await;
    h.stack_deck(&room_id, &[1, 2, 3, 4]).await;
    h.service.draw_card(ALICE.0, &room_id).await.unwrap();
    h.service.handle_disconnect(BOB.0, &room_id).await.unwrap();

    h.service.end_turn(ALICE.0, &room_id).await.unwrap();

    let turn = h.store.turn(&room_id).await.unwrap().unwrap();
    assert_eq!(turn.current_nickname, "carol");
}

// ----------------------------------------------------------------------
// Game end
// ----------------------------------------------------------------------

#[tokio::test]
async fn drawing_from_an_empty_deck_ends_the_game() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.stack_deck(&room_id, &[]).await;
    h.hub.clear();

    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    let room = h.store.room(&room_id).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Finished);
    assert!(h
        .hub
        .broadcasts(&room_id)
        .iter()
        .any(|msg| matches!(msg, ServerMsg::GameEnded { .. })));
}

#[tokio::test]
async fn drawing_the_last_card_ends_the_game() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.stack_deck(&room_id, &[4]).await;
    h.hub.clear();

    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    // The card lands on the field, then exhaustion ends the game.
    assert_eq!(h.store.field(&room_id, "alice").await.unwrap(), vec![4]);
    let room = h.store.room(&room_id).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Finished);
}

#[tokio::test]
async fn a_burst_on_the_last_card_still_ends_the_game() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;
    h.store.add_to_field(&room_id, "alice", 7).await.unwrap();
    h.store.add_to_field(&room_id, "alice", 2).await.unwrap();
    h.store
        .set_turn(&room_id, "alice", GamePhase::Drawn, None)
        .await
        .unwrap();
    h.stack_deck(&room_id, &[7]).await;
    h.hub.clear();

    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    let broadcasts = h.hub.broadcasts(&room_id);
    assert!(broadcasts.iter().any(|msg| matches!(msg, ServerMsg::Burst { .. })));
    assert!(broadcasts.iter().any(|msg| matches!(msg, ServerMsg::GameEnded { .. })));
    let room = h.store.room(&room_id).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Finished);
}

#[tokio::test]
async fn rankings_sort_by_score_with_join_order_ties() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB, CAROL], 4).await;
    h.store.add_score(&room_id, "alice", 10).await.unwrap();
    h.store.add_score(&room_id, "bob", 20).await.unwrap();
    h.store.add_score(&room_id, "carol", 20).await.unwrap();
    h.stack_deck(&room_id, &[]).await;
    h.hub.clear();

    h.service.draw_card(ALICE.0, &room_id).await.unwrap();

    let broadcasts = h.hub.broadcasts(&room_id);
    let ended = broadcasts
        .iter()
        .find_map(|msg| match msg {
            ServerMsg::GameEnded { winner, rankings } => Some((winner.clone(), rankings.clone())),
            _ => None,
        })
        .unwrap();
    assert_eq!(ended.0, "bob");
    let order: Vec<&str> = ended.1.iter().map(|r| r.player.as_str()).collect();
    assert_eq!(order, ["bob", "carol", "alice"]);
}

// ----------------------------------------------------------------------
// Disconnects
// ----------------------------------------------------------------------

#[tokio::test]
async fn an_emptied_playing_room_is_deleted() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB], 4).await;

    h.service.handle_disconnect(ALICE.0, &room_id).await.unwrap();
    assert!(h.store.room(&room_id).await.unwrap().is_some());

    h.service.handle_disconnect(BOB.0, &room_id).await.unwrap();
    assert!(h.store.room(&room_id).await.unwrap().is_none());
}

#[tokio::test]
async fn an_emptied_waiting_room_survives() {
    let h = Harness::new();
    let room_id = h.waiting_room(&[ALICE], 4).await;

    h.service.handle_disconnect(ALICE.0, &room_id).await.unwrap();

    // Left to its TTL rather than deleted eagerly.
    assert!(h.store.room(&room_id).await.unwrap().is_some());
    assert_eq!(h.store.player_count(&room_id).await.unwrap(), 0);
}

#[tokio::test]
async fn a_departed_member_keeps_field_and_score() {
    let h = Harness::new();
    let room_id = h.playing_room(&[ALICE, BOB, CAROL], 4).await;
    h.store.add_to_field(&room_id, "bob", 6).await.unwrap();
    h.store.add_score(&room_id, "bob", 12).await.unwrap();

    h.service.handle_disconnect(BOB.0, &room_id).await.unwrap();

    assert_eq!(h.store.field(&room_id, "bob").await.unwrap(), vec![6]);
    assert_eq!(h.store.all_scores(&room_id).await.unwrap()["bob"], 12);
}
