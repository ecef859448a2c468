use actix_web::web::ServiceConfig;

use crate::modules::message::handle::*;

// Full paths on the handlers; nesting scopes here would shadow the
// conversation module's routes under the same prefix.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(post_message)
        .service(upload_file)
        .service(edit_message)
        .service(delete_message);
}
