pub mod app_config_repo;

pub use app_config_repo::AppConfigRepo;
