pub mod documents;
pub mod health;

pub use documents::{
    delete_many, delete_one, find, insert_many, insert_one, update_many, update_one,
};
pub use health::{health_check, metrics_endpoint, readiness_check, route_not_found};
