pub mod settings;
pub mod user;

pub use settings::{AppConfig, DispatchConfig, StoreConfig};
pub use user::User;
