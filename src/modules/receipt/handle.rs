use actix_web::{post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        conversation::{repository_pg::ParticipantPgRepository, schema::ParticipantEntity},
        receipt::service::ReceiptService,
    },
};

pub type ReceiptSvc = ReceiptService<ParticipantPgRepository>;

#[post("/conversations/{conversation_id}/read")]
pub async fn mark_read(
    receipt_svc: web::Data<ReceiptSvc>,
    conversation_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ParticipantEntity>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let participant = receipt_svc
        .mark_read(*conversation_id, user_id, chrono::Utc::now())
        .await?;

    Ok(success::Success::ok(Some(participant)).message("Successfully marked as read"))
}
