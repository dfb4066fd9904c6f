pub mod models {
    pub mod sensor;
}

pub mod client;
pub mod config;
pub mod db {
    pub mod migrate;
    pub mod models;
    pub mod sensors;
}
pub mod env_file;
pub mod http;
pub mod schema;
pub mod services {
    pub mod aggregate;
    pub mod extract;
    pub mod load;
    pub mod pipeline;
    pub mod registry;
    pub mod seed;
}
pub mod store;
