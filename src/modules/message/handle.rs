use actix_multipart::Multipart;
use actix_web::{delete, patch, post, web, HttpRequest};
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        conversation::repository_pg::ConversationPgRepository,
        message::{
            model::{EditMessage, MessageResponse, PostMessage},
            repository_pg::MessagePgRepository,
            service::MessageService,
        },
    },
    utils::ValidatedJson,
};

pub type MessageSvc = MessageService<MessagePgRepository, ConversationPgRepository>;

#[post("/conversations/{conversation_id}/messages")]
pub async fn post_message(
    message_svc: web::Data<MessageSvc>,
    conversation_id: web::Path<Uuid>,
    body: ValidatedJson<PostMessage>,
    req: HttpRequest,
) -> Result<success::Success<MessageResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let message = message_svc
        .post_message(*conversation_id, user_id, body.into_inner())
        .await?;

    Ok(success::Success::created(Some(message)).message("Successfully sent message"))
}

#[post("/conversations/{conversation_id}/messages/file")]
pub async fn upload_file(
    message_svc: web::Data<MessageSvc>,
    conversation_id: web::Path<Uuid>,
    mut payload: Multipart,
    req: HttpRequest,
) -> Result<success::Success<MessageResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut text: Option<String> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|_| error::Error::bad_request("Malformed multipart payload"))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .ok_or_else(|| error::Error::bad_request("Missing filename"))?
                    .to_string();

                let mime_type = field.content_type().map(|m| m.to_string()).unwrap_or_else(|| {
                    mime_guess::from_path(&filename).first_or_octet_stream().to_string()
                });

                let mut bytes = Vec::new();
                while let Some(chunk) =
                    field.try_next().await.map_err(|_| error::Error::InternalServer)?
                {
                    bytes.extend_from_slice(&chunk);
                }

                file = Some((filename, mime_type, bytes));
            }
            "text" => {
                let mut buf = Vec::new();
                while let Some(chunk) =
                    field.try_next().await.map_err(|_| error::Error::InternalServer)?
                {
                    buf.extend_from_slice(&chunk);
                }

                text = Some(String::from_utf8_lossy(&buf).into_owned());
            }
            _ => {
                // drain unknown fields so the stream can advance
                while field
                    .try_next()
                    .await
                    .map_err(|_| error::Error::InternalServer)?
                    .is_some()
                {}
            }
        }
    }

    let (filename, mime_type, bytes) =
        file.ok_or_else(|| error::Error::bad_request("No file found in request"))?;

    let message = message_svc
        .upload_file(*conversation_id, user_id, &filename, &mime_type, &bytes, text)
        .await?;

    Ok(success::Success::created(Some(message)).message("File uploaded successfully"))
}

#[patch("/messages/{message_id}")]
pub async fn edit_message(
    message_svc: web::Data<MessageSvc>,
    message_id: web::Path<Uuid>,
    body: ValidatedJson<EditMessage>,
    req: HttpRequest,
) -> Result<success::Success<MessageResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let message = message_svc
        .edit_message(*message_id, user_id, body.into_inner().content)
        .await?;

    Ok(success::Success::ok(Some(message)).message("Successfully edited message"))
}

#[delete("/messages/{message_id}")]
pub async fn delete_message(
    message_svc: web::Data<MessageSvc>,
    message_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    message_svc.delete_message(*message_id, user_id).await?;

    Ok(success::Success::no_content())
}
