use actix_web::{get, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        conversation::repository_pg::ConversationPgRepository,
        message::model::MessageResponse,
        search::{
            model::{SearchHit, SearchQuery},
            repository_pg::SearchPgRepository,
            service::SearchService,
        },
    },
    utils::ValidatedQuery,
};

pub type SearchSvc = SearchService<SearchPgRepository, ConversationPgRepository>;

#[get("/conversations/{conversation_id}/search")]
pub async fn search_in_conversation(
    search_svc: web::Data<SearchSvc>,
    conversation_id: web::Path<Uuid>,
    query: ValidatedQuery<SearchQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<MessageResponse>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let query = query.into_inner();

    let messages = search_svc
        .search_in_conversation(
            *conversation_id,
            user_id,
            &query.q,
            query.limit.unwrap_or(50) as i64,
        )
        .await?;

    Ok(success::Success::ok(Some(messages)).message("Successfully searched conversation"))
}

#[get("/search")]
pub async fn search_global(
    search_svc: web::Data<SearchSvc>,
    query: ValidatedQuery<SearchQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<SearchHit>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let query = query.into_inner();

    let hits = search_svc
        .search_global(user_id, &query.q, query.limit.unwrap_or(50) as i64)
        .await?;

    Ok(success::Success::ok(Some(hits)).message("Successfully searched conversations"))
}
