use actix_web::web::ServiceConfig;

use crate::modules::receipt::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(mark_read);
}
