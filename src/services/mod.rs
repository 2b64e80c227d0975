pub mod backup_service;
pub mod bookmark_service;
pub mod database_service;
pub mod edit_service;
pub mod fetch_service;
pub mod git_service;
pub mod import_service;
pub mod locker_service;
pub mod summary_service;
pub mod tag_service;

pub use backup_service::*;
pub use bookmark_service::*;
pub use database_service::*;
pub use edit_service::*;
pub use fetch_service::*;
pub use git_service::*;
pub use import_service::*;
pub use locker_service::*;
pub use summary_service::*;
pub use tag_service::*;
