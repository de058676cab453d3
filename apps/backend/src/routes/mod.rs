//! HTTP route registration.

pub mod health;
pub mod rooms;

use actix_web::web;

use crate::ws::session;

pub fn configure(cfg: &mut web::ServiceConfig) {
    health::configure(cfg);
    rooms::configure(cfg);
    cfg.route("/ws/{player_id}", web::get().to(session::upgrade));
}
