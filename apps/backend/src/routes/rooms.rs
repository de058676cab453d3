use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::state::app_state::AppState;

/// List joinable rooms (Waiting status only).
pub async fn list_rooms(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let rooms = app_state.store().list_waiting_rooms().await?;
    Ok(HttpResponse::Ok().json(rooms))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/rooms", web::get().to(list_rooms));
}
