pub mod app_service;
pub mod request_queue;
