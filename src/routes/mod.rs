use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::entities::light::LightState;
use crate::entities::sensor::{self, SensorReading, StatusSensor};
use crate::error::ApiResult;
use crate::server::appstate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tanks", get(get_tanks))
        .route("/api/tanks/{name}", get(get_tank))
        .route("/api/tanks/{name}/sensors", get(get_tank_sensors))
        .route(
            "/api/tanks/{name}/light",
            get(get_tank_light).put(put_tank_light),
        )
        .route("/api/tanks/{name}/refresh", post(post_tank_refresh))
        .with_state(state)
}

async fn get_tanks(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.tank_keys())
}

async fn get_tank(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<StatusSensor>> {
    let tank = state.tank(&name)?;
    Ok(Json(sensor::status_sensor(&tank.coordinator.state())))
}

async fn get_tank_sensors(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<SensorReading>>> {
    let tank = state.tank(&name)?;
    Ok(Json(sensor::attribute_sensors(&tank.coordinator.state())))
}

async fn get_tank_light(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<LightState>> {
    let tank = state.tank(&name)?;
    Ok(Json(tank.light.state()))
}

#[derive(Debug, Deserialize)]
struct LightRequest {
    on: bool,
    /// 0-255; full-scale when omitted.
    brightness: Option<u8>,
    /// (red, green, blue, white), each 0-255; full-scale when omitted.
    rgbw_color: Option<(u8, u8, u8, u8)>,
}

async fn put_tank_light(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<LightRequest>,
) -> ApiResult<Json<LightState>> {
    let tank = state.tank(&name)?;

    if req.on {
        tank.light.turn_on(req.brightness, req.rgbw_color).await?;
    } else {
        tank.light.turn_off().await?;
    }

    Ok(Json(tank.light.state()))
}

async fn post_tank_refresh(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<StatusSensor>> {
    let tank = state.tank(&name)?;
    tank.coordinator.refresh().await;
    Ok(Json(sensor::status_sensor(&tank.coordinator.state())))
}
