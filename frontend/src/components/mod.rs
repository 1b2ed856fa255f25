pub mod chat;
pub mod ticket_form;
pub mod ticket_status;
