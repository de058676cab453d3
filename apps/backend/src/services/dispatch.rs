//! Action router: maps decoded client actions onto session-engine
//! operations. Engine failures surface as `Err(GameError)` and are
//! answered to the offending connection by the session actor.

use crate::domain::errors::GameError;
use crate::services::games::GameService;
use crate::ws::hub::{ConnId, LOBBY};
use crate::ws::protocol::ClientAction;

/// Route one action. Returns the session's new group association when
/// the action changed it (create/join/leave).
pub async fn route_action(
    service: &GameService,
    conn: ConnId,
    player_id: &str,
    room_id: &str,
    action: ClientAction,
) -> Result<Option<String>, GameError> {
    match action {
        ClientAction::CreateRoom {
            nickname,
            max_players,
        } => {
            let room_id = service
                .create_room(conn, player_id, &nickname, max_players)
                .await?;
            Ok(Some(room_id))
        }
        ClientAction::JoinRoom {
            room_id: target,
            nickname,
        } => {
            service
                .join_room(conn, player_id, &target, &nickname)
                .await?;
            Ok(Some(target))
        }
        ClientAction::StartGame => {
            service.start_game(player_id, room_id).await?;
            Ok(None)
        }
        ClientAction::ScoreCards => {
            service.score_cards(player_id, room_id).await?;
            Ok(None)
        }
        ClientAction::DrawCard => {
            service.draw_card(player_id, room_id).await?;
            Ok(None)
        }
        ClientAction::StealCard {
            target_player,
            card_number,
        } => {
            service
                .steal_card(player_id, room_id, &target_player, card_number)
                .await?;
            Ok(None)
        }
        ClientAction::SkipSteal => {
            service.skip_steal(player_id, room_id).await?;
            Ok(None)
        }
        ClientAction::EndTurn => {
            service.end_turn(player_id, room_id).await?;
            Ok(None)
        }
        ClientAction::LeaveRoom => {
            service.leave_room(conn, player_id, room_id).await?;
            Ok(Some(LOBBY.to_string()))
        }
    }
}
