use actix_web::web::ServiceConfig;

use crate::modules::search::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(search_in_conversation).service(search_global);
}
