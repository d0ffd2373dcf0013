pub mod credentials;
pub mod errors;
pub mod mailer;
pub mod pdf_report;
