//! Per-connection WebSocket actor.
//!
//! One actor per socket. The path segment of `/ws/{player_id}` is the
//! opaque player identifier; the actor tracks which logical group
//! (lobby or room) the connection currently belongs to and dispatches
//! decoded actions to the session engine.

use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::errors::GameError;
use crate::services::dispatch;
use crate::state::app_state::AppState;
use crate::ws::hub::{ConnId, Outbound, LOBBY};
use crate::ws::protocol::{ClientAction, ServerMsg};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let player_id = path.into_inner();
    let session = WsSession::new(Uuid::new_v4(), player_id, app_state);
    ws::start(session, &req, stream)
}

pub struct WsSession {
    conn_id: ConnId,
    player_id: String,
    /// Current group association; starts in the lobby.
    room_id: String,
    app_state: web::Data<AppState>,
    last_heartbeat: Instant,
}

impl WsSession {
    fn new(conn_id: ConnId, player_id: String, app_state: web::Data<AppState>) -> Self {
        Self {
            conn_id,
            player_id,
            room_id: LOBBY.to_string(),
            app_state,
            last_heartbeat: Instant::now(),
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "failed to serialize outbound message"),
        }
    }

    fn send_game_error(ctx: &mut ws::WebsocketContext<Self>, err: &GameError) {
        Self::send_json(ctx, &ServerMsg::from_game_error(err));
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(
                    conn_id = %actor.conn_id,
                    player_id = %actor.player_id,
                    "heartbeat timed out"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }

    /// Run one action to completion before the next frame is polled.
    /// `ctx.wait` keeps a connection's actions sequential, so a frame
    /// sent right after create/join sees the updated group association.
    fn dispatch(&mut self, ctx: &mut ws::WebsocketContext<Self>, action: ClientAction) {
        let service = self.app_state.service();
        let conn = self.conn_id;
        let player_id = self.player_id.clone();
        let room_id = self.room_id.clone();

        ctx.wait(
            async move { dispatch::route_action(&service, conn, &player_id, &room_id, action).await }
                .into_actor(self)
                .map(|res, actor, ctx| match res {
                    Ok(Some(new_room)) => actor.room_id = new_room,
                    Ok(None) => {}
                    Err(err) => {
                        if matches!(err, GameError::Store(_)) {
                            error!(
                                conn_id = %actor.conn_id,
                                player_id = %actor.player_id,
                                error = %err,
                                "action failed on store access"
                            );
                        }
                        Self::send_game_error(ctx, &err);
                    }
                }),
        );
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.conn_id, player_id = %self.player_id, "session started");
        let recipient = ctx.address().recipient::<Outbound>();
        self.app_state.hub().register(self.conn_id, recipient);
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.app_state.hub().unregister(self.conn_id);
        if self.room_id != LOBBY {
            let service = self.app_state.service();
            let player_id = self.player_id.clone();
            let room_id = self.room_id.clone();
            actix::spawn(async move {
                if let Err(err) = service.handle_disconnect(&player_id, &room_id).await {
                    error!(error = %err, %room_id, %player_id, "disconnect cleanup failed");
                }
            });
        }
        info!(conn_id = %self.conn_id, player_id = %self.player_id, "session stopped");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                match ClientAction::parse(&text) {
                    Ok(action) => self.dispatch(ctx, action),
                    Err(err) => Self::send_game_error(ctx, &err),
                }
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                Self::send_game_error(
                    ctx,
                    &GameError::Validation {
                        detail: "binary frames are not supported".to_string(),
                    },
                );
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(
                    conn_id = %self.conn_id,
                    player_id = %self.player_id,
                    error = %err,
                    "websocket protocol error"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}

impl Handler<Outbound> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) -> Self::Result {
        ctx.text(msg.0);
    }
}
