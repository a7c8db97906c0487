pub mod club;
pub mod resource;
pub mod hold;
pub mod booking;
pub mod payment;
pub mod subscription;
pub mod webhook_event;
