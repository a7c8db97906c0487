pub mod sqlite_club_repo;
pub mod sqlite_resource_repo;
pub mod sqlite_hold_repo;
pub mod sqlite_booking_repo;
pub mod sqlite_webhook_repo;
pub mod sqlite_subscription_repo;

pub mod postgres_club_repo;
pub mod postgres_resource_repo;
pub mod postgres_hold_repo;
pub mod postgres_booking_repo;
pub mod postgres_webhook_repo;
pub mod postgres_subscription_repo;
