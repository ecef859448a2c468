pub mod conversation {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod message {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod receipt {
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod search {
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod retention {
    pub mod service;
}

pub mod mention {
    pub mod model;
    pub mod parser;
    pub mod service;
}

pub mod directory {
    pub mod client;
    pub mod model;
}

pub mod storage {
    pub mod model;
    pub mod service;
}

pub mod presence {
    pub mod model;
    pub mod handle;
    pub mod service;
    pub mod route;
}
