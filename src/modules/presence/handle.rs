use actix_web::{get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::presence::{
        model::{BatchStatusQuery, PresenceInfo},
        service::PresenceService,
    },
    utils::ValidatedQuery,
};

#[post("/presence/heartbeat")]
pub async fn heartbeat(
    presence_svc: web::Data<PresenceService>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    presence_svc.heartbeat(user_id).await?;

    Ok(success::Success::ok(None).message("Heartbeat recorded"))
}

#[get("/presence/batch")]
pub async fn get_status_batch(
    presence_svc: web::Data<PresenceService>,
    query: ValidatedQuery<BatchStatusQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<PresenceInfo>>, error::Error> {
    get_claims(&req)?;

    let user_ids = query
        .0
        .ids
        .split(',')
        .map(|id| Uuid::parse_str(id.trim()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| error::Error::bad_request("ids must be a comma-separated list of uuids"))?;

    let statuses = presence_svc.status_batch(&user_ids).await;

    Ok(success::Success::ok(Some(statuses)))
}

#[get("/presence/{user_id}")]
pub async fn get_status(
    presence_svc: web::Data<PresenceService>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<PresenceInfo>, error::Error> {
    get_claims(&req)?;

    let status = presence_svc.status(*user_id).await;

    Ok(success::Success::ok(Some(status)))
}
