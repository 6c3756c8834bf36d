pub mod health;
pub mod submission;
pub mod submission_list;
pub mod ttd_preview;
