use actix_web::web::ServiceConfig;

use crate::modules::presence::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    // /presence/batch registers before /presence/{user_id} so the literal
    // segment is not captured as a user id
    cfg.service(heartbeat).service(get_status_batch).service(get_status);
}
