pub mod chat_repository;
pub mod ticket_repository;
pub mod upload_repository;
pub mod user_repository;
