use actix_web::{get, patch, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        conversation::{
            model::{ConversationDetail, ConversationSummary, NewConversation, UpdateRetention},
            repository_pg::{ConversationPgRepository, ParticipantPgRepository},
            schema::ConversationEntity,
            service::ConversationService,
        },
        message::{model::HistoryQuery, model::MessagePage, repository_pg::MessagePgRepository},
    },
    utils::{ValidatedJson, ValidatedQuery},
};

pub type ConversationSvc =
    ConversationService<ConversationPgRepository, ParticipantPgRepository, MessagePgRepository>;

#[get("/conversations")]
pub async fn get_conversations(
    conversation_svc: web::Data<ConversationSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ConversationSummary>>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let conversations = conversation_svc.get_by_user_id(user_id).await?;

    Ok(success::Success::ok(Some(conversations)).message("Successfully retrieved conversations"))
}

#[post("/conversations")]
pub async fn create_conversation(
    conversation_svc: web::Data<ConversationSvc>,
    body: ValidatedJson<NewConversation>,
    req: HttpRequest,
) -> Result<success::Success<ConversationEntity>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let conversation = conversation_svc.create_conversation(body.into_inner(), user_id).await?;

    Ok(success::Success::ok(Some(conversation)).message("Successfully created conversation"))
}

#[get("/conversations/{conversation_id}")]
pub async fn get_conversation(
    conversation_svc: web::Data<ConversationSvc>,
    conversation_id: web::Path<Uuid>,
    query: ValidatedQuery<HistoryQuery>,
    req: HttpRequest,
) -> Result<success::Success<ConversationDetail>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let query = query.into_inner();

    let detail = conversation_svc
        .get_detail(*conversation_id, user_id, query.limit.unwrap_or(50), query.cursor)
        .await?;

    Ok(success::Success::ok(Some(detail)).message("Successfully retrieved conversation"))
}

#[get("/conversations/{conversation_id}/messages")]
pub async fn get_messages(
    conversation_svc: web::Data<ConversationSvc>,
    conversation_id: web::Path<Uuid>,
    query: ValidatedQuery<HistoryQuery>,
    req: HttpRequest,
) -> Result<success::Success<MessagePage>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let query = query.into_inner();

    let page = conversation_svc
        .get_messages(*conversation_id, user_id, query.limit.unwrap_or(50), query.cursor)
        .await?;

    Ok(success::Success::ok(Some(page)).message("Successfully retrieved messages"))
}

#[patch("/conversations/{conversation_id}/retention")]
pub async fn update_retention(
    conversation_svc: web::Data<ConversationSvc>,
    conversation_id: web::Path<Uuid>,
    body: ValidatedJson<UpdateRetention>,
    req: HttpRequest,
) -> Result<success::Success<ConversationEntity>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let days = body
        .into_inner()
        .auto_delete_days
        .ok_or_else(|| error::Error::bad_request("auto_delete_days is required"))?;

    let conversation =
        conversation_svc.update_retention(*conversation_id, user_id, days).await?;

    Ok(success::Success::ok(Some(conversation)).message("Successfully updated retention policy"))
}
